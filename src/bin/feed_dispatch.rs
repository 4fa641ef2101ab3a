//! feed_dispatch: runs the feed engine over stdin/stdout.
//!
//! Without arguments requests are handled on one thread. Passing a consumer count
//! switches to pooled mode. Logs go to stderr, filtered by `RUST_LOG`.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use feed_dispatch::{init_tracing, AppResult, Engine, EngineConfig, RunReport};
use tracing::info;

#[derive(Parser)]
#[command(name = "feed_dispatch", about = "Concurrent feed engine driven by JSON commands")]
struct Cli {
    /// Consumer threads; omit for direct (single-threaded) mode
    consumers: Option<usize>,
    /// Maximum concurrent readers admitted by the feed lock
    #[arg(long)]
    reader_capacity: Option<usize>,
    /// JSON engine configuration file, used instead of environment settings
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn engine_config(&self) -> AppResult<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                EngineConfig::from_json_str(&raw)
                    .map_err(|e| anyhow!(e))
                    .with_context(|| format!("loading config file {}", path.display()))?
            }
            None => EngineConfig::from_env().map_err(|e| anyhow!("environment config: {e}"))?,
        };

        if let Some(consumers) = self.consumers {
            config = config.with_consumers(consumers);
        }
        if let Some(capacity) = self.reader_capacity {
            config = config.with_reader_capacity(capacity);
        }
        Ok(config)
    }
}

fn run(cli: &Cli) -> AppResult<RunReport> {
    let engine = Engine::new(cli.engine_config()?)?;
    let report = engine
        .run(io::stdin().lock(), io::stdout())
        .context("engine run failed")?;
    Ok(report)
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                requests = report.requests.total(),
                responses = report.responses,
                implicit_done = report.implicit_done,
                "feed_dispatch finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("feed_dispatch: {e:#}");
            ExitCode::FAILURE
        }
    }
}
