//! Weight-sweep evaluator.
//!
//! Reads a directory of `ASE_Evaluation_*.csv` result files (one baseline run
//! plus runs that vary a single ranking weight), prints the baseline
//! statistics and writes charts, a JSON summary and a markdown report.
//!
//! Usage:
//!     cargo run -p rankeval-weight-sweep -- <RESULTS_DIR> [--output plots] [--config plots/config.json]

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use rankeval_core::{
    comparison_sections, ensure_report_file, update_sections, ChartSink, ComparisonEngine,
    EvaluatorConfig, RenderedChart, SvgRenderer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "weight-sweep", about = "Compare recommendation accuracy across weight settings")]
struct Args {
    /// Directory containing the evaluation result files
    results_dir: Option<PathBuf>,

    /// Directory for charts, summary and report
    #[arg(long, default_value = "plots")]
    output: PathBuf,

    /// Configuration file, created with defaults when missing [default: <OUTPUT>/config.json]
    #[arg(long)]
    config: Option<PathBuf>,
}

struct OutputPaths {
    config: PathBuf,
    report: PathBuf,
    summary: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    let engine = ComparisonEngine::load(args.results_dir.as_deref())?;

    let paths = initialize_paths(&args.output, args.config)?;
    let config = EvaluatorConfig::load_or_create(&paths.config)?;

    match engine.general_statistics() {
        Some(statistics) => print!("{statistics}"),
        None => warn!("no baseline run; skipping general statistics"),
    }

    let charts = render_charts(&engine, &args.output, &config)?;
    write_summary(&paths.summary, &engine)?;
    write_report(&paths.report, &args.output, &engine, &charts, &config)?;

    println!(
        "wrote {} charts, {} and {}",
        charts.len(),
        paths.summary.display(),
        paths.report.display()
    );

    Ok(())
}

fn initialize_paths(output: &Path, config: Option<PathBuf>) -> Result<OutputPaths> {
    fs::create_dir_all(output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;

    Ok(OutputPaths {
        config: config.unwrap_or_else(|| output.join("config.json")),
        report: output.join("report.md"),
        summary: output.join("summary.json"),
    })
}

fn render_charts(
    engine: &ComparisonEngine,
    output: &Path,
    config: &EvaluatorConfig,
) -> Result<Vec<RenderedChart>> {
    let mut renderer = SvgRenderer::new(output, config.charts.clone());
    let mut rendered = Vec::new();

    for chart in engine.charts() {
        let path = renderer.render(&chart)?;
        info!(path = %path.display(), "rendered {}", chart.title);
        rendered.push(RenderedChart {
            title: chart.title,
            path,
        });
    }

    Ok(rendered)
}

fn write_summary(path: &Path, engine: &ComparisonEngine) -> Result<()> {
    let serialized = serde_json::to_string_pretty(&engine.summaries())?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write summary to {}", path.display()))
}

fn write_report(
    report_path: &Path,
    output: &Path,
    engine: &ComparisonEngine,
    charts: &[RenderedChart],
    config: &EvaluatorConfig,
) -> Result<()> {
    ensure_report_file(report_path)?;
    let sections = comparison_sections(engine, charts, output, config.report.embed_charts)?;
    update_sections(report_path, &sections)
}
