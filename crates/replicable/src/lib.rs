//! # Replicable
//!
//! Host code for [`replicable_core`]: a configurable stress harness that
//! drives writers and replicas against one source and checks the protocol's
//! invariants while it runs.
//!
//! ## Example
//!
//! ```rust,no_run
//! use replicable::{stress, StressConfig};
//!
//! let config = StressConfig::from_file("config/stress.toml")?;
//! let report = stress::run(&config)?;
//! assert_eq!(report.final_version, report.committed_writes);
//! # Ok::<(), replicable::HarnessError>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod stress;

pub use config::{StrategyKind, StressConfig};
pub use error::{HarnessError, HarnessResult};
pub use stress::{Ledger, StressReport};

pub use replicable_core::{
    AssigningSource, Boxed, Inline, ReplacingSource, Replica, ReplicaStats, SharedReplica, Source,
    Storage, Version,
};
