//! Fetch command - resolve a chart and report where it came from

use chartscope_source::SourceResolver;

use crate::config::AnalyzerConfig;
use crate::display;
use crate::error::Result;
use crate::pipeline::{ChartSummary, source_request};

pub async fn run(
    config: &AnalyzerConfig,
    chart_url: Option<&str>,
    local_path: Option<&str>,
    git_ref: &str,
    subpath: &str,
    json: bool,
) -> Result<()> {
    let request = source_request(chart_url, local_path, git_ref, subpath)?;
    let resolver = SourceResolver::new(config.resolver_options())?;

    let progress = super::spinner("Fetching chart...", json);
    let workspace = resolver.resolve(&request).await;
    progress.finish_and_clear();
    let mut workspace = workspace?;

    let summary = ChartSummary::from_workspace(&workspace);
    workspace.release();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        display::print_chart(&summary);
    }
    Ok(())
}
