//! Notebook accessibility checker
//!
//! Runs the headless analyzer set over a `.ipynb` file and prints a report.
//! Logs go to stderr so stdout carries only the report.

use std::path::{Path, PathBuf};

use a11y_engine::{
    load_notebook_str, A11yEngine, AnalyzeOptions, AnalyzerConfig, DefaultImageLoader,
    EngineError, NotebookReport,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "nb-a11y")]
#[command(version, about = "Find WCAG accessibility issues in Jupyter notebooks")]
struct Args {
    /// Notebook file to check
    notebook: PathBuf,

    /// JSON file overriding detection heuristics
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory relative image paths resolve against (default: the notebook's directory)
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Exit with status 1 when any issue is found
    #[arg(long)]
    fail_on_issues: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn base_path_for(notebook: &Path, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| match notebook.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    })
}

fn load_config(args: &Args) -> Result<AnalyzerConfig> {
    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };
    Ok(config.with_base_path(base_path_for(&args.notebook, args.base_path.clone())))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw = tokio::fs::read_to_string(&args.notebook)
        .await
        .with_context(|| format!("Failed to read {}", args.notebook.display()))?;
    let cells = load_notebook_str(&raw)
        .with_context(|| format!("Failed to load {}", args.notebook.display()))?;
    let config = load_config(&args)?;
    tracing::debug!(cells = cells.len(), "Notebook loaded");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, reporting issues found so far");
            on_interrupt.cancel();
        }
    });

    let engine = A11yEngine::headless(config);
    let loader = DefaultImageLoader::new();
    let options = AnalyzeOptions::new()
        .with_image_loader(&loader)
        .with_cancel(&cancel);

    let mut issues = Vec::new();
    match engine.analyze_into(&cells, options, &mut issues).await {
        Ok(()) | Err(EngineError::Cancelled) => {}
        Err(e) => return Err(e.into()),
    }

    let report = NotebookReport::from_issues(args.notebook.display().to_string(), issues);
    match args.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if args.fail_on_issues && !report.is_clean() {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["nb-a11y", "work/analysis.ipynb"]).unwrap();
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.fail_on_issues);
        assert_eq!(
            base_path_for(&args.notebook, args.base_path.clone()),
            PathBuf::from("work")
        );
    }

    #[test]
    fn test_explicit_base_path_and_json() {
        let args = Args::try_parse_from([
            "nb-a11y",
            "analysis.ipynb",
            "--base-path",
            "/data/figures",
            "--format",
            "json",
            "--fail-on-issues",
        ])
        .unwrap();
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.fail_on_issues);
        let config = load_config(&args).unwrap();
        assert_eq!(config.base_path, Some(PathBuf::from("/data/figures")));
    }

    #[test]
    fn test_bare_file_name_resolves_against_cwd() {
        assert_eq!(
            base_path_for(Path::new("analysis.ipynb"), None),
            PathBuf::from(".")
        );
    }
}
