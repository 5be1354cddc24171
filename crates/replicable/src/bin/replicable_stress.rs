//! # Replicable Stress Run
//!
//! Usage: `replicable_stress [CONFIG.toml]`
//!
//! Without a path the built-in defaults are used. Log verbosity follows
//! `RUST_LOG` (default `info`). Exits non-zero if the run fails.

use std::process::ExitCode;

use replicable::{stress, StressConfig};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => StressConfig::from_file(&path),
        None => Ok(StressConfig::default()),
    };

    let report = config.and_then(|config| stress::run(&config));
    match report {
        Ok(report) => {
            println!("strategy:        {}", report.strategy.as_str());
            println!("final version:   {}", report.final_version);
            println!("committed:       {}", report.committed_writes);
            println!("rejected:        {}", report.rejected_writes);
            println!("fast-path hits:  {}", report.fast_path_hits);
            println!("resyncs:         {}", report.resyncs);
            println!("elapsed:         {:?}", report.elapsed);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "stress run failed");
            ExitCode::FAILURE
        }
    }
}
