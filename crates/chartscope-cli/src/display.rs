//! Human-readable output
//!
//! JSON output bypasses this module entirely.

use console::style;

use crate::pipeline::{AnalyzeReport, ChartSummary, ImageReport};

/// Print the chart header block
pub fn print_chart(chart: &ChartSummary) {
    let title = match (&chart.name, &chart.version) {
        (Some(name), Some(version)) => format!("{} {}", name, version),
        (Some(name), None) => name.clone(),
        _ => "chart".to_string(),
    };
    println!("{}", style(title).cyan().bold());

    print_field("source", Some(&chart.source));
    print_field("ref", chart.git_ref.as_ref());
    print_field("subpath", chart.subpath.as_ref());
    print_field("appVersion", chart.app_version.as_ref());
    if let Some(count) = chart.rendered_documents {
        print_field("documents", Some(&count.to_string()));
    }
}

fn print_field(label: &str, value: Option<&String>) {
    if let Some(value) = value {
        println!("  {:<11} {}", style(label).dim(), value);
    }
}

/// Print the full analysis as a table of images
pub fn print_report(report: &AnalyzeReport) {
    print_chart(&report.chart);
    println!();

    if report.images.is_empty() {
        println!("{}", style("No container images found").yellow());
        return;
    }

    let width = report
        .images
        .iter()
        .map(|r| r.info.image.len())
        .max()
        .unwrap_or(0)
        .max("IMAGE".len());

    println!(
        "{:<width$}  {:>6}  {:>10}  {}",
        style("IMAGE").bold(),
        style("LAYERS").bold(),
        style("SIZE").bold(),
        style("DIGEST").bold(),
        width = width
    );
    for image in &report.images {
        print_image_row(image, width);
    }

    let failed = report.images.iter().filter(|r| r.error.is_some()).count();
    println!();
    if failed == 0 {
        println!(
            "{} {} image(s) inspected",
            style("✓").green(),
            report.images.len()
        );
    } else {
        println!(
            "{} {} of {} image(s) could not be inspected",
            style("⚠").yellow(),
            failed,
            report.images.len()
        );
    }
}

fn print_image_row(report: &ImageReport, width: usize) {
    let info = &report.info;
    match &report.error {
        Some(error) => println!(
            "{:<width$}  {}",
            info.image,
            style(format!("✗ {}", error)).red(),
            width = width
        ),
        None => {
            println!(
                "{:<width$}  {:>6}  {:>10}  {}",
                info.image,
                info.layers,
                info.size_human,
                style(short_digest(&info.digest)).dim(),
                width = width
            );
            if let Some(path) = &info.downloaded {
                println!("  {} {}", style("saved").dim(), path.display());
            }
        }
    }
}

/// `sha256:` plus the first 12 hex characters
fn short_digest(digest: &str) -> &str {
    let end = digest
        .char_indices()
        .nth("sha256:".len() + 12)
        .map(|(i, _)| i)
        .unwrap_or(digest.len());
    &digest[..end]
}
