use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mc_pattern_analysis::{AnalysisConfig, EquityBaseline};

#[derive(Parser, Debug)]
#[command(
    name = "mc-patterns",
    version,
    about = "Monte Carlo robustness and pattern analysis for trade sequences"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Also write logs to this file
    #[arg(long = "log-file", global = true, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze one trades/equity JSON file
    Analyze {
        /// Input JSON file (`{"equity": [...]}` or `{"trades": [...]}`)
        #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Directory to write the report into; prints to stdout when omitted
        #[arg(long = "out", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
        out: Option<PathBuf>,
    },
    /// Analyze every JSON file in a directory
    Batch {
        /// Directory of input JSON files
        #[arg(value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,

        /// Directory to write reports into (defaults to the input directory)
        #[arg(long = "out", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
        out: Option<PathBuf>,
    },
    /// Print a table of previously written reports
    Summarize {
        /// Directory of report JSON files
        #[arg(value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
        dir: PathBuf,
    },
}

/// Analysis parameters shared by every subcommand.
#[derive(Parser, Debug, Default)]
pub struct AnalysisArgs {
    /// JSON file with an analysis configuration; flags below override it
    #[arg(long = "config", global = true, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Total Monte Carlo paths (split between permutation and block bootstrap)
    #[arg(long, global = true)]
    pub runs: Option<usize>,

    /// Block length for the block bootstrap
    #[arg(long, global = true)]
    pub block: Option<usize>,

    /// Motif discovery window width
    #[arg(long, global = true)]
    pub window: Option<usize>,

    /// Base random seed
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Treat the first equity value as the starting balance (first return 0)
    #[arg(long, global = true)]
    pub rebase: bool,
}

impl AnalysisArgs {
    /// Load the config file (if any), apply flag overrides and validate.
    pub fn into_config(self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str::<AnalysisConfig>(&text)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => AnalysisConfig::default(),
        };

        if let Some(runs) = self.runs {
            config = config.with_runs(runs);
        }
        if let Some(block) = self.block {
            config = config.with_block(block);
        }
        if let Some(window) = self.window {
            config = config.with_window(window);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if self.rebase {
            config = config.with_equity_baseline(EquityBaseline::Rebased);
        }

        config.validate().context("invalid analysis configuration")?;
        Ok(config)
    }
}
