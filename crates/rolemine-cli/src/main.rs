//! rolemine - action usage statistics for a corpus of role documents
//!
//! ## Commands
//!
//! - `mine`: run the standard pipeline over a corpus directory and print the report
//! - `stages`: list the standard pipeline's stages in execution order

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use rolemine_core::pipeline::builtin::SUMMARY;
use rolemine_core::{
    render_outcome_md, render_report_md, standard_pipeline, DirectoryCorpus, MineOptions,
    MiningReport, RunOutcome, StageContext,
};

#[derive(Parser)]
#[command(name = "rolemine")]
#[command(author = "rolemine contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mine role documents for action usage statistics", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long = "json-logs", global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the standard pipeline over a corpus directory
    Mine {
        /// Directory of role documents (*.yaml, *.yml, *.json)
        #[arg(env = "ROLEMINE_CORPUS")]
        corpus: PathBuf,

        /// Options file (YAML or JSON)
        #[arg(short, long)]
        options: Option<PathBuf>,

        /// Cap every ranked listing except argument frequency
        #[arg(long)]
        num_modules: Option<usize>,

        /// Minimum |r| for a reported correlation
        #[arg(long)]
        correlation_threshold: Option<f64>,

        /// Minimum probability for a reported transition
        #[arg(long)]
        transition_threshold: Option<f64>,

        /// Cap the argument frequency listing
        #[arg(long)]
        num_arguments: Option<usize>,

        /// Also write report.json and report.md here
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Report format on stdout
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List the standard pipeline's stages in execution order
    Stages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Serialize)]
struct MineOutput<'a> {
    outcome: &'a RunOutcome,
    report: Option<&'a MiningReport>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    rolemine_core::telemetry::init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Mine {
            corpus,
            options,
            num_modules,
            correlation_threshold,
            transition_threshold,
            num_arguments,
            output_dir,
            format,
        } => {
            let mut opts = match options {
                Some(path) => MineOptions::from_path(&path)
                    .with_context(|| format!("Failed to read options from {:?}", path))?,
                None => MineOptions::default(),
            };
            if num_modules.is_some() {
                opts.num_modules = num_modules;
            }
            if num_arguments.is_some() {
                opts.num_arguments = num_arguments;
            }
            if let Some(t) = correlation_threshold {
                opts.correlation_threshold = t;
            }
            if let Some(t) = transition_threshold {
                opts.transition_threshold = t;
            }
            opts.validate().context("Invalid options")?;
            cmd_mine(&corpus, opts, output_dir, format)
        }
        Commands::Stages => cmd_stages(),
    }
}

/// Run the standard pipeline and print its report
fn cmd_mine(
    corpus: &Path,
    options: MineOptions,
    output_dir: Option<PathBuf>,
    format: Format,
) -> Result<()> {
    let mut ctx = StageContext::new(Arc::new(DirectoryCorpus::new(corpus)), options);
    if let Some(dir) = output_dir {
        ctx = ctx.with_output_dir(dir);
    }

    info!(corpus = ?corpus, "mining corpus");
    let pipeline = standard_pipeline().context("Failed to build the standard pipeline")?;
    let run = pipeline.run(&ctx).context("Pipeline is invalid")?;
    let report = run
        .results
        .get::<MiningReport>(SUMMARY)
        .context("Summary result has an unexpected type")?;

    match format {
        Format::Json => {
            let output = MineOutput {
                outcome: &run.outcome,
                report,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialize report")?
            );
        }
        Format::Text => {
            if let Some(report) = report {
                println!("{}", render_report_md(report));
            }
            println!("{}", render_outcome_md(&run.outcome));
        }
    }

    if run.outcome.overall_success() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} stage(s) failed, {} skipped",
            run.outcome.failed.len(),
            run.outcome.skipped.len()
        )
    }
}

/// Print the standard pipeline's stages with their dependencies
fn cmd_stages() -> Result<()> {
    let pipeline = standard_pipeline().context("Failed to build the standard pipeline")?;
    let plan = pipeline.plan().context("Pipeline is invalid")?;

    println!("Pipeline: {}", pipeline.name());
    for (idx, stage) in plan.iter().enumerate() {
        if stage.requires.is_empty() {
            println!("  {}. {}", idx + 1, stage.name);
        } else {
            println!("  {}. {} <- {}", idx + 1, stage.name, stage.requires.join(", "));
        }
    }
    Ok(())
}
