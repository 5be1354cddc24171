//! # Source / Replica Synchronization
//!
//! ## The Problem
//!
//! ```text
//! Writer threads:  mutate a shared value
//! Reader threads:  read it constantly
//!
//! Mutex on every read:  LOCK CONTENTION on the hot path
//! No synchronization:   TORN VALUES
//! ```
//!
//! ## The Solution: Versioned Replicas
//!
//! ```text
//!   Source { Mutex<stored>, AtomicU64 version }
//!       ▲                     ▲
//!       │ lock + copy         │ atomic load
//!       │ (only when stale)   │ (every check)
//!   Replica { private copy, cached version }
//! ```
//!
//! Each reader keeps its own copy. `ensure_up_to_date` compares the cached
//! version with the source's atomic version; only on a mismatch does it take
//! the lock and copy. Up-to-date readers never touch the lock.

mod replica;
mod source;

pub use replica::{Replica, ReplicaStats, SharedReplica};
pub use source::{AssigningSource, ReplacingSource, Source};

/// Revision number of a source's value. Starts at 0, +1 per committed write.
pub type Version = u64;
