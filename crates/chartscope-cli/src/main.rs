//! chartscope CLI - find the container images a Helm chart deploys

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod display;
mod error;
mod exit_codes;
mod pipeline;

use commands::analyze::AnalyzeArgs;
use config::AnalyzerConfig;
use error::Result;

#[derive(Parser)]
#[command(name = "chartscope")]
#[command(version)]
#[command(about = "Resolve a Helm chart, render it and inspect its container images", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (default: ~/.config/chartscope/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// helm executable
    #[arg(long, global = true, env = "CHARTSCOPE_HELM")]
    helm: Option<String>,
}

/// Where the chart lives
#[derive(clap::Args)]
struct SourceArgs {
    /// GitHub tree URL, .tgz URL or git remote
    #[arg(long, conflicts_with = "local_path")]
    chart_url: Option<String>,

    /// Local chart directory
    #[arg(long)]
    local_path: Option<String>,

    /// Branch or tag (names starting with v are treated as tags)
    #[arg(long = "ref", default_value = "")]
    git_ref: String,

    /// Chart directory inside the fetched content
    #[arg(long, default_value = "")]
    subpath: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve, render and inspect a chart
    Analyze {
        #[command(flatten)]
        source: SourceArgs,

        /// Values file passed to helm
        #[arg(short = 'f', long = "values")]
        values: Option<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Target platform (os/arch[/variant])
        #[arg(long, env = "CHARTSCOPE_PLATFORM")]
        platform: Option<String>,

        /// Save each image as a docker load archive
        #[arg(long)]
        download: bool,

        /// Directory for downloaded archives
        #[arg(long, requires = "download")]
        download_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List container images in rendered manifests
    Images {
        /// Rendered manifests file, `-` for stdin
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a chart and show its provenance
    Fetch {
        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = AnalyzerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            source,
            values,
            set,
            platform,
            download,
            download_dir,
            json,
        } => {
            let config = config.with_overrides(cli.helm, None);
            commands::analyze::run(
                &config,
                AnalyzeArgs {
                    chart_url: source.chart_url,
                    local_path: source.local_path,
                    git_ref: source.git_ref,
                    subpath: source.subpath,
                    values_file: values,
                    set,
                    platform,
                    download,
                    download_dir,
                    json,
                },
            )
            .await
        }

        Commands::Images { file, json } => commands::images::run(file.as_deref(), json),

        Commands::Fetch { source, json } => {
            commands::fetch::run(
                &config,
                source.chart_url.as_deref(),
                source.local_path.as_deref(),
                &source.git_ref,
                &source.subpath,
                json,
            )
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_source_flags_conflict() {
        let result = Cli::try_parse_from([
            "chartscope",
            "fetch",
            "--chart-url",
            "https://example.com/c.tgz",
            "--local-path",
            ".",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_internal_error_exit_code() {
        assert_eq!(CliError::internal("x").exit_code(), exit_codes::ERROR);
    }
}
