//! Analyze command - resolve, render and inspect a chart

use chartscope_engine::HelmRenderer;
use chartscope_registry::{CachingInspector, RegistryInspector};
use chartscope_source::SourceResolver;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::AnalyzerConfig;
use crate::display;
use crate::error::{CliError, Result};
use crate::pipeline::{AnalyzeRequest, Pipeline};

/// Command-line inputs for `analyze`
#[derive(Debug, Default)]
pub struct AnalyzeArgs {
    pub chart_url: Option<String>,
    pub local_path: Option<String>,
    pub git_ref: String,
    pub subpath: String,
    pub values_file: Option<PathBuf>,
    pub set: Vec<String>,
    pub platform: Option<String>,
    pub download: bool,
    pub download_dir: Option<PathBuf>,
    pub json: bool,
}

pub async fn run(config: &AnalyzerConfig, args: AnalyzeArgs) -> Result<()> {
    let values_yaml = match &args.values_file {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| CliError::Io {
            message: format!("{}: {}", path.display(), e),
        })?),
        None => None,
    };

    let request = AnalyzeRequest {
        chart_url: args.chart_url,
        local_path: args.local_path,
        git_ref: args.git_ref,
        subpath: args.subpath,
        values_yaml,
        overrides: parse_set_args(&args.set)?,
        platform: args.platform,
        download: args.download,
        download_dir: args.download_dir,
    };

    let resolver = SourceResolver::new(config.resolver_options())?;
    let renderer = HelmRenderer::new()
        .binary(&config.helm_binary)
        .release_name(&config.release_name)
        .timeout(config.render_timeout);
    let inspector = CachingInspector::new(registry_inspector(config));

    let pipeline = Pipeline::new(&resolver, &renderer, &inspector)
        .concurrency(config.inspect_concurrency)
        .default_platform(config.platform());

    let progress = super::spinner("Analyzing chart...", args.json);
    let report = pipeline.analyze(&request).await;
    progress.finish_and_clear();
    let report = report?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_report(&report);
    }
    Ok(())
}

fn registry_inspector(config: &AnalyzerConfig) -> RegistryInspector {
    let inspector = RegistryInspector::new()
        .timeout(config.registry_timeout)
        .insecure_registries(config.insecure_registries.clone());
    match &config.registry_auth {
        Some(auth) => inspector.basic_auth(&auth.username, &auth.password),
        None => inspector,
    }
}

/// Parse `key=value` pairs; later keys win
pub fn parse_set_args(args: &[String]) -> Result<BTreeMap<String, String>> {
    let mut overrides = BTreeMap::new();
    for arg in args {
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            CliError::input_with_help(
                format!("invalid --set value '{}'", arg),
                "use the form key=value",
            )
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::input(format!("invalid --set value '{}': empty key", arg)));
        }
        overrides.insert(key.to_string(), value.to_string());
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_args() {
        let overrides = parse_set_args(&[
            "image.tag=1.25".to_string(),
            "replicas=2".to_string(),
            "replicas=3".to_string(),
            "annotation=a=b".to_string(),
        ])
        .unwrap();

        assert_eq!(overrides.len(), 3);
        assert_eq!(overrides["replicas"], "3");
        assert_eq!(overrides["annotation"], "a=b");
        let keys: Vec<&str> = overrides.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["annotation", "image.tag", "replicas"]);
    }

    #[test]
    fn test_parse_set_args_rejects_malformed() {
        assert!(parse_set_args(&["novalue".to_string()]).is_err());
        assert!(parse_set_args(&["=value".to_string()]).is_err());
    }
}
