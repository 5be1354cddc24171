//! # Replicable Core
//!
//! A versioned, lock-guarded source value with cheap per-reader replicas.
//!
//! - Writers mutate a [`Source`] under its single lock
//! - Every reader owns a [`Replica`]: a private copy plus a cached version
//! - A reader that is already up to date pays one atomic load, nothing else
//!
//! ## Architecture Rules
//!
//! 1. **One lock per source** - storage and version change together, under it
//! 2. **Lock-free freshness check** - the version is also an atomic
//! 3. **Private copies** - no two replicas ever share storage
//!
//! ## Example
//!
//! ```rust
//! use replicable_core::AssigningSource;
//!
//! let source = AssigningSource::new(String::from("a"));
//! let mut replica = source.replica();
//!
//! source.set(String::from("b"));
//! assert_eq!(replica.get(), "a");
//!
//! assert_eq!(replica.ensure_up_to_date(), 1);
//! assert_eq!(replica.get(), "b");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod storage;
pub mod sync;

pub use storage::{Boxed, Inline, ReplaceableStorage, Storage};
pub use sync::{
    AssigningSource, Replica, ReplicaStats, ReplacingSource, SharedReplica, Source, Version,
};
