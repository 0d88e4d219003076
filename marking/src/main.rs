//! `marking` CLI: run a pool of TAs over `exams/exam<N>.txt`.
//!
//! Progress lines go to stdout; diagnostics go to stderr via `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use marking::exit_codes;
use marking::io::config::load_config;
use marking::io::events::ConsoleSink;
use marking::io::run_report::write_run_report;
use marking::logging;
use marking::pool::{PoolOptions, run_pool, worker_count};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "marking",
    version,
    about = "Mark a queue of exams with a pool of concurrent TAs"
)]
struct Cli {
    /// Number of TAs. Missing, zero or negative uses the configured default (2).
    #[arg(allow_negative_numbers = true)]
    workers: Option<i64>,

    /// TOML config file; defaults apply when it does not exist.
    #[arg(long, default_value = "marking.toml")]
    config: PathBuf,

    /// Directory holding `exam1.txt`, `exam2.txt`, ...
    #[arg(long)]
    exams_dir: Option<PathBuf>,

    /// Rubric file to load and keep updated.
    #[arg(long)]
    rubric: Option<PathBuf>,

    /// Seed for reproducible worker randomness.
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON summary of the run to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(exit_codes::INVALID);
        }
        Err(err) => err.exit(),
    };
    logging::init();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = load_config(&cli.config)?;
    if let Some(exams_dir) = cli.exams_dir {
        config.exams_dir = exams_dir;
    }
    if let Some(rubric) = cli.rubric {
        config.rubric_path = rubric;
    }

    let options = PoolOptions {
        workers: worker_count(cli.workers, config.default_workers),
        seed: cli.seed,
    };
    info!(workers = options.workers, seed = ?options.seed, "starting marking pool");

    let sink = ConsoleSink::stdout();
    let outcome = run_pool(&config, &options, &sink)?;

    if let Some(path) = &cli.report {
        write_run_report(path, &outcome.to_report())?;
    }
    let failed = outcome.failed_workers();
    if !failed.is_empty() {
        bail!("workers did not finish cleanly: {:?}", failed);
    }
    Ok(exit_codes::OK)
}
