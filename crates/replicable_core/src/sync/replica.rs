//! # Replica
//!
//! A private, lazily resynchronized snapshot of a [`Source`].
//!
//! ```text
//!   ensure_up_to_date():
//!     source.version (atomic) == cached?  ──yes──▶  return cached   (fast path)
//!              │ no
//!              ▼
//!     lock source → refresh private copy → cached = version under lock
//! ```
//!
//! Fresh → Stale happens silently whenever the source is written. Stale →
//! Fresh happens only inside the locked branch above.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::source::Source;
use super::Version;
use crate::storage::{Inline, Storage};

/// Per-replica resync counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplicaStats {
    /// `ensure_up_to_date` calls answered without locking or copying.
    pub fast_path_hits: u64,
    /// `ensure_up_to_date` calls that locked the source and copied.
    pub resyncs: u64,
}

impl ReplicaStats {
    /// Total `ensure_up_to_date` calls.
    #[inline]
    #[must_use]
    pub const fn checks(&self) -> u64 {
        self.fast_path_hits + self.resyncs
    }
}

/// The private copy and cached version shared by both replica flavours.
struct Mirror<T, S: Storage<T>> {
    stored: S::Stored,
    version: Version,
    stats: ReplicaStats,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone, S: Storage<T>> Mirror<T, S> {
    fn capture(source: &Source<T, S>) -> Self {
        let (stored, version) = source.snapshot();
        Self {
            stored,
            version,
            stats: ReplicaStats::default(),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn is_up_to_date(&self, source: &Source<T, S>) -> bool {
        self.version == source.version()
    }

    #[inline]
    fn ensure_up_to_date(&mut self, source: &Source<T, S>) -> Version {
        if source.version() == self.version {
            self.stats.fast_path_hits += 1;
            return self.version;
        }
        self.resync(source)
    }

    #[cold]
    fn resync(&mut self, source: &Source<T, S>) -> Version {
        let previous = self.version;
        self.version = source.refresh_into(&mut self.stored);
        self.stats.resyncs += 1;
        tracing::trace!(
            strategy = S::NAME,
            from = previous,
            to = self.version,
            "replica resynchronized"
        );
        self.version
    }

    #[inline]
    fn get(&self) -> &T {
        S::get(&self.stored)
    }
}

/// A replica borrowing its [`Source`].
///
/// The borrow guarantees the source outlives the replica. Replicas are not
/// `Clone`: every one owns exactly one private copy.
///
/// ## Usage
///
/// ```rust
/// use replicable_core::AssigningSource;
///
/// let source = AssigningSource::new(0_u64);
///
/// std::thread::scope(|scope| {
///     scope.spawn(|| {
///         let mut replica = source.replica();
///         while *replica.get() < 10 {
///             replica.ensure_up_to_date();
///         }
///     });
///     for _ in 0..10 {
///         source.modify(|n| *n += 1);
///     }
/// });
/// ```
///
/// A replica cannot outlive the source it borrows:
///
/// ```rust,compile_fail
/// use replicable_core::AssigningSource;
///
/// let replica = {
///     let source = AssigningSource::new(1_u32);
///     source.replica()
/// };
/// assert_eq!(*replica.get(), 1);
/// ```
///
/// Nor can it be cloned; each replica owns its own copy:
///
/// ```rust,compile_fail
/// use replicable_core::{AssigningSource, Replica};
///
/// let source = AssigningSource::new(1_u32);
/// let replica = source.replica();
/// let _copy: Replica<'_, u32> = replica.clone();
/// ```
pub struct Replica<'a, T, S: Storage<T> = Inline> {
    source: &'a Source<T, S>,
    mirror: Mirror<T, S>,
}

impl<'a, T: Clone, S: Storage<T>> Replica<'a, T, S> {
    /// Snapshots `source` under its lock.
    #[must_use]
    pub fn new(source: &'a Source<T, S>) -> Self {
        Self {
            source,
            mirror: Mirror::capture(source),
        }
    }

    /// The source version this replica's copy corresponds to. Never locks.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.mirror.version
    }

    /// Whether the source has not been written since the last sync.
    ///
    /// Best-effort: a writer may commit right after this returns `true`.
    #[inline]
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.mirror.is_up_to_date(self.source)
    }

    /// Resyncs if the source has moved on and returns the cached version.
    ///
    /// Up to date: one atomic load, no lock, no copy. Stale: locks the
    /// source and refreshes the private copy from it.
    pub fn ensure_up_to_date(&mut self) -> Version {
        self.mirror.ensure_up_to_date(self.source)
    }

    /// The private copy. Never touches the source; may be stale.
    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        self.mirror.get()
    }

    /// Resync counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> ReplicaStats {
        self.mirror.stats
    }

    /// The source this replica follows.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &'a Source<T, S> {
        self.source
    }
}

impl<T: Clone + fmt::Debug, S: Storage<T>> fmt::Debug for Replica<'_, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replica")
            .field("version", &self.mirror.version)
            .field("value", self.get())
            .field("stats", &self.mirror.stats)
            .finish()
    }
}

/// A replica that co-owns its [`Source`] through an `Arc`.
///
/// Use when the replica has to move into a thread the source's owner does
/// not scope.
pub struct SharedReplica<T, S: Storage<T> = Inline> {
    source: Arc<Source<T, S>>,
    mirror: Mirror<T, S>,
}

impl<T: Clone, S: Storage<T>> SharedReplica<T, S> {
    /// Snapshots `source` under its lock.
    #[must_use]
    pub fn new(source: Arc<Source<T, S>>) -> Self {
        let mirror = Mirror::capture(&source);
        Self { source, mirror }
    }

    /// The source version this replica's copy corresponds to. Never locks.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.mirror.version
    }

    /// Whether the source has not been written since the last sync. Best-effort.
    #[inline]
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.mirror.is_up_to_date(&self.source)
    }

    /// Resyncs if the source has moved on and returns the cached version.
    pub fn ensure_up_to_date(&mut self) -> Version {
        self.mirror.ensure_up_to_date(&self.source)
    }

    /// The private copy.
    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        self.mirror.get()
    }

    /// Resync counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> ReplicaStats {
        self.mirror.stats
    }

    /// The source this replica follows.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Arc<Source<T, S>> {
        &self.source
    }
}

impl<T: Clone + fmt::Debug, S: Storage<T>> fmt::Debug for SharedReplica<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReplica")
            .field("version", &self.mirror.version)
            .field("value", self.get())
            .field("stats", &self.mirror.stats)
            .finish()
    }
}
