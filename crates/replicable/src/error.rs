//! # Harness Error Types
//!
//! All errors that can occur while configuring or running the harness.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the stress harness.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`StressConfig`](crate::StressConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but its values are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker observed a broken protocol invariant.
    #[error("invariant violated in {worker}: {detail}")]
    InvariantViolated {
        /// Which worker saw it.
        worker: String,
        /// What it saw.
        detail: String,
    },

    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(String),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
