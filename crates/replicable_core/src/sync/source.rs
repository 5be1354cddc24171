//! # Source
//!
//! The single writable, versioned holder of the canonical value.
//!
//! ## Invariants
//!
//! - Storage and version change together, only while the lock is held
//! - The version goes up by exactly one per committed write
//! - A failed `try_*` call commits nothing
//!
//! The version is stored with `Release` while the lock is held and loaded
//! with `Acquire` by readers. A reader that sees version `N` without the lock
//! and then takes the lock is guaranteed to find storage at least as new as
//! `N`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::replica::{Replica, SharedReplica};
use super::Version;
use crate::storage::{Boxed, Inline, ReplaceableStorage, Storage};

/// Source whose replicas resync by assignment into their existing value.
pub type AssigningSource<T> = Source<T, Inline>;

/// Source whose writes and replica resyncs always allocate a fresh box.
pub type ReplacingSource<T> = Source<T, Boxed>;

/// A mutable, versioned value shared between writers and [`Replica`]s.
///
/// Writers go through the lock. Readers should not: they build a replica once
/// and call [`Replica::ensure_up_to_date`], which only locks when the
/// source has moved on.
///
/// `Source` is neither `Clone` nor `Copy`. Replicas borrow it, so the borrow
/// checker keeps it alive for as long as any of them exist. Wrap it in an
/// `Arc` and use [`Source::shared_replica`] when replicas must outlive the
/// owner's scope.
///
/// ## Usage
///
/// ```rust
/// use replicable_core::ReplacingSource;
///
/// let source = ReplacingSource::new(vec![1, 2, 3]);
/// source.modify(|v| v.push(4));
/// source.replace(Box::new(vec![9]));
///
/// assert_eq!(source.version(), 2);
/// assert_eq!(source.read(|v| v.clone()), vec![9]);
/// ```
pub struct Source<T, S: Storage<T> = Inline> {
    /// The canonical value. Its lock also serializes version updates.
    stored: Mutex<S::Stored>,

    /// Committed write count. Written only under `stored`'s lock.
    version: AtomicU64,

    _marker: PhantomData<fn() -> (T, S)>,
}

impl<T, S: Storage<T>> Source<T, S> {
    /// Creates a source holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            stored: Mutex::new(S::construct(value)),
            version: AtomicU64::new(0),
            _marker: PhantomData,
        }
    }

    /// Creates a source from a value constructor.
    #[must_use]
    pub fn new_with<F>(ctor: F) -> Self
    where
        F: FnOnce() -> T,
    {
        Self::new(ctor())
    }

    /// Creates a source from a fallible value constructor.
    ///
    /// # Errors
    ///
    /// Returns whatever `ctor` returns. No source is created.
    pub fn try_new_with<E, F>(ctor: F) -> Result<Self, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        ctor().map(Self::new)
    }

    /// Returns the current version without locking.
    ///
    /// May be stale by the time the caller looks at it.
    #[inline]
    #[must_use]
    pub fn version(&self) -> Version {
        self.version.load(Ordering::Acquire)
    }

    /// Stores `value` and bumps the version.
    pub fn set(&self, value: T) {
        let mut stored = self.stored.lock();
        S::set(&mut stored, value);
        let version = self.commit(&stored);
        tracing::trace!(strategy = S::NAME, version, "source set");
    }

    /// Builds a new value with `ctor`, then stores it.
    ///
    /// `ctor` runs before the lock is taken. If it panics nothing changes.
    pub fn set_with<F>(&self, ctor: F)
    where
        F: FnOnce() -> T,
    {
        self.set(ctor());
    }

    /// Stores a copy of `value`.
    ///
    /// With [`Inline`] storage this is a [`Clone::clone_from`] into the held
    /// value; with [`Boxed`] it is a clone into a new box.
    pub fn set_cloned(&self, value: &T)
    where
        T: Clone,
    {
        let mut stored = self.stored.lock();
        S::assign(&mut stored, value);
        let version = self.commit(&stored);
        tracing::trace!(strategy = S::NAME, version, "source set from reference");
    }

    /// Builds a new value with a fallible `ctor` and stores it on success.
    ///
    /// # Errors
    ///
    /// Returns the error from `ctor`. Storage and version are untouched.
    pub fn try_set_with<E, F>(&self, ctor: F) -> Result<(), E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        match ctor() {
            Ok(value) => {
                self.set(value);
                Ok(())
            }
            Err(err) => {
                tracing::trace!(strategy = S::NAME, "source set rolled back");
                Err(err)
            }
        }
    }

    /// Mutates the held value in place and bumps the version.
    ///
    /// No construction or copy happens beyond what `mutator` does itself.
    ///
    /// If `mutator` panics the version is still bumped before the lock is
    /// released: the value may be half-written, and replicas must not
    /// believe they already hold it. Use [`Source::try_modify`] for
    /// mutations that can fail.
    pub fn modify<R, F>(&self, mutator: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut stored = self.stored.lock();
        // Dropped before `stored`, so the bump lands while the lock is held.
        let _bump = VersionBump(&self.version);
        mutator(S::get_mut(&mut stored))
    }

    /// Mutates the value all-or-nothing.
    ///
    /// `mutator` works on a deep copy staged under the lock. On `Ok` the
    /// copy becomes the stored value and the version is bumped. On `Err`, or
    /// if `mutator` panics, the copy is discarded and nothing changes.
    ///
    /// Costs one copy of `T` per call, unlike [`Source::modify`].
    ///
    /// # Errors
    ///
    /// Returns the error from `mutator`.
    pub fn try_modify<R, E, F>(&self, mutator: F) -> Result<R, E>
    where
        T: Clone,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let mut stored = self.stored.lock();
        let mut staged = S::deep_copy(&stored);

        match mutator(S::get_mut(&mut staged)) {
            Ok(out) => {
                let previous = std::mem::replace(&mut *stored, staged);
                let version = self.commit(&stored);
                drop(stored);
                drop(previous);
                tracing::trace!(strategy = S::NAME, version, "source modify committed");
                Ok(out)
            }
            Err(err) => {
                drop(stored);
                tracing::trace!(strategy = S::NAME, "source modify rolled back");
                Err(err)
            }
        }
    }

    /// Runs `f` against the canonical value under the lock.
    ///
    /// Blocks writers and resyncing replicas while `f` runs. Readers on a hot
    /// path should hold a [`Replica`] instead.
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let stored = self.stored.lock();
        f(S::get(&stored))
    }

    /// Creates a replica borrowing this source.
    #[must_use]
    pub fn replica(&self) -> Replica<'_, T, S>
    where
        T: Clone,
    {
        Replica::new(self)
    }

    /// Creates a replica that shares ownership of this source.
    #[must_use]
    pub fn shared_replica(self: &Arc<Self>) -> SharedReplica<T, S>
    where
        T: Clone,
    {
        SharedReplica::new(Arc::clone(self))
    }

    /// Consumes the source and returns its value.
    #[must_use]
    pub fn into_inner(self) -> T {
        S::into_value(self.stored.into_inner())
    }

    /// Deep-copies the value and reads the version, both under the lock.
    pub(super) fn snapshot(&self) -> (S::Stored, Version)
    where
        T: Clone,
    {
        let stored = self.stored.lock();
        (S::deep_copy(&stored), self.version.load(Ordering::Acquire))
    }

    /// Refreshes `target` from the canonical value under the lock and returns
    /// the version observed while holding it.
    pub(super) fn refresh_into(&self, target: &mut S::Stored) -> Version
    where
        T: Clone,
    {
        let stored = self.stored.lock();
        S::refresh(target, &stored);
        self.version.load(Ordering::Acquire)
    }

    /// Publishes a write. Taking the guard proves the lock is held.
    #[inline]
    fn commit(&self, _held: &MutexGuard<'_, S::Stored>) -> Version {
        self.version.fetch_add(1, Ordering::Release) + 1
    }
}

impl<T, S: ReplaceableStorage<T>> Source<T, S> {
    /// Swaps in already-built storage wholesale and bumps the version.
    ///
    /// For [`Boxed`] this grafts a pre-allocated `Box<T>` in without copying
    /// its contents. The previous allocation is dropped after the lock is
    /// released.
    ///
    /// ```rust
    /// use replicable_core::ReplacingSource;
    ///
    /// let source = ReplacingSource::new(1_u32);
    /// source.replace(Box::new(2));
    /// assert_eq!(source.version(), 1);
    /// ```
    ///
    /// Inline storage has nothing to graft, so it has no `replace`; use
    /// [`Source::set`] instead:
    ///
    /// ```rust,compile_fail
    /// use replicable_core::AssigningSource;
    ///
    /// let source = AssigningSource::new(1_u32);
    /// source.replace(2);
    /// ```
    pub fn replace(&self, stored: S::Stored) {
        let mut guard = self.stored.lock();
        let previous = std::mem::replace(&mut *guard, stored);
        let version = self.commit(&guard);
        drop(guard);
        drop(previous);
        tracing::trace!(strategy = S::NAME, version, "source storage replaced");
    }
}

impl<T: Default, S: Storage<T>> Default for Source<T, S> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, S: Storage<T>> From<T> for Source<T, S> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T, S: Storage<T>> fmt::Debug for Source<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("strategy", &S::NAME)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

/// Bumps the version when dropped, including during unwinding.
struct VersionBump<'a>(&'a AtomicU64);

impl Drop for VersionBump<'_> {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_source_creation() {
        let source = AssigningSource::new(42_u32);
        assert_eq!(source.version(), 0);
        assert_eq!(source.read(|v| *v), 42);
    }

    #[test]
    fn test_every_write_bumps_version_once() {
        let source = ReplacingSource::new(String::from("a"));

        source.set(String::from("b"));
        assert_eq!(source.version(), 1);

        source.set_with(|| String::from("c"));
        assert_eq!(source.version(), 2);

        source.set_cloned(&String::from("d"));
        assert_eq!(source.version(), 3);

        source.modify(|s| s.push('!'));
        assert_eq!(source.version(), 4);

        source.replace(Box::new(String::from("e")));
        assert_eq!(source.version(), 5);

        source.try_modify(|s| {
            s.push('?');
            Ok::<_, ()>(())
        })
        .unwrap();
        assert_eq!(source.version(), 6);

        assert_eq!(source.read(Clone::clone), "e?");
    }

    #[test]
    fn test_failed_try_set_commits_nothing() {
        let source = AssigningSource::new(1_i32);

        let result = source.try_set_with(|| Err::<i32, _>("rejected"));

        assert_eq!(result, Err("rejected"));
        assert_eq!(source.version(), 0);
        assert_eq!(source.read(|v| *v), 1);
    }

    #[test]
    fn test_failed_try_modify_commits_nothing() {
        let source = AssigningSource::new(vec![1, 2, 3]);

        let result = source.try_modify(|v| {
            v.clear();
            Err::<(), _>("halfway")
        });

        assert_eq!(result, Err("halfway"));
        assert_eq!(source.version(), 0);
        assert_eq!(source.read(Clone::clone), vec![1, 2, 3]);
    }

    #[test]
    fn test_try_new_with_propagates_error() {
        let failed = AssigningSource::<u8>::try_new_with(|| "300".parse::<u8>());
        assert!(failed.is_err());

        let built = AssigningSource::<u8>::try_new_with(|| "200".parse::<u8>()).unwrap();
        assert_eq!(built.into_inner(), 200);
    }

    #[test]
    fn test_modify_returns_mutator_output() {
        let source = AssigningSource::new(10_u64);
        let doubled = source.modify(|v| {
            *v *= 2;
            *v
        });
        assert_eq!(doubled, 20);
        assert_eq!(source.version(), 1);
    }

    #[test]
    fn test_panicking_modify_still_bumps_version() {
        let source = AssigningSource::new(vec![1, 2]);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            source.modify(|v| {
                v.push(3);
                panic!("mutator failed");
            });
        }));

        assert!(outcome.is_err());
        assert_eq!(source.version(), 1);
        // parking_lot does not poison: the lock is usable again.
        source.set(vec![]);
        assert_eq!(source.version(), 2);
    }

    #[test]
    fn test_panicking_try_modify_commits_nothing() {
        let source = AssigningSource::new(7_i64);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = source.try_modify(|v| -> Result<(), ()> {
                *v = 0;
                panic!("mutator failed");
            });
        }));

        assert!(outcome.is_err());
        assert_eq!(source.version(), 0);
        assert_eq!(source.read(|v| *v), 7);
    }

    #[test]
    fn test_replace_grafts_allocation() {
        let source = ReplacingSource::new(1_u32);
        let boxed = Box::new(99_u32);
        let graft: *const u32 = &*boxed;

        source.replace(boxed);

        let held = source.read(|v| v as *const u32);
        assert_eq!(held, graft);
        assert_eq!(source.version(), 1);
    }

    #[test]
    fn test_debug_reports_version_and_strategy() {
        let source = ReplacingSource::new(0_u8);
        source.set(1);
        let rendered = format!("{source:?}");
        assert!(rendered.contains("boxed"));
        assert!(rendered.contains("version: 1"));
    }

    #[test]
    fn test_default_and_from() {
        let source: AssigningSource<String> = Source::default();
        assert!(source.read(String::is_empty));

        let source: ReplacingSource<u16> = 5.into();
        assert_eq!(source.into_inner(), 5);
    }
}
