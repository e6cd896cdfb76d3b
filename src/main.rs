mod cli;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use mc_pattern_analysis::batch::{analyze_directory, analyze_file, summarize_reports};
use mc_pattern_analysis::AnalysisConfig;
use tracing_appender::non_blocking;
use tracing_subscriber::{prelude::*, EnvFilter};

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout is reserved for report output
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
        let (non_blocking_writer, guard) = non_blocking(file);
        // The guard must outlive every log call; keep it for the whole process.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking_writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

fn run_analyze(input: &Path, out: Option<&Path>, config: &AnalysisConfig) -> Result<()> {
    let report =
        analyze_file(input, config).with_context(|| format!("analysis of {} failed", input.display()))?;
    match out {
        Some(dir) => {
            let path = report.write_to_dir(dir)?;
            tracing::info!(report = %path.display(), "report written");
        }
        None => println!("{}", report.to_json_pretty()?),
    }
    Ok(())
}

fn run_batch(dir: &Path, out: Option<PathBuf>, config: &AnalysisConfig) -> Result<()> {
    let out_dir = out.unwrap_or_else(|| dir.to_path_buf());
    let summary = analyze_directory(dir, config, Some(&out_dir))
        .with_context(|| format!("batch over {} failed", dir.display()))?;

    println!(
        "{} of {} files analyzed, reports in {}",
        summary.succeeded,
        summary.total(),
        out_dir.display()
    );
    for failure in &summary.failed {
        println!("FAILED {}: {}", failure.source.display(), failure.error);
    }
    Ok(())
}

fn run_summarize(dir: &Path) -> Result<()> {
    let rows = summarize_reports(dir).with_context(|| format!("cannot summarize {}", dir.display()))?;
    if rows.is_empty() {
        println!("no reports found in {}", dir.display());
        return Ok(());
    }

    println!(
        "{:<10} {:>8} {:>10} {:>10} {:>10} {:>8}  {:<10} {:<12} file",
        "run_id", "sharpe", "max_dd", "mc_p05", "mc_p95", "uplift+", "grade", "best_hours"
    );
    for row in &rows {
        let hours: Vec<String> = row.best_hours.iter().map(|h| h.to_string()).collect();
        println!(
            "{:<10} {:>8.3} {:>10.3} {:>10.3} {:>10.3} {:>7.1}%  {:<10} {:<12} {}",
            row.run_id,
            row.sharpe,
            row.max_dd,
            row.mc_sharpe_p05,
            row.mc_sharpe_p95,
            row.uplift_frac_positive * 100.0,
            row.grade,
            hours.join(","),
            row.file.display()
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Analyze { input, out } => {
            let config = cli.analysis.into_config()?;
            run_analyze(&input, out.as_deref(), &config)
        }
        Commands::Batch { dir, out } => {
            let config = cli.analysis.into_config()?;
            run_batch(&dir, out, &config)
        }
        Commands::Summarize { dir } => run_summarize(&dir),
    }
}
