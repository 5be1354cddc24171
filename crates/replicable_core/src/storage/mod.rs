//! # Storage Strategies
//!
//! How a [`Source`](crate::Source) or [`Replica`](crate::Replica) physically
//! holds its value.
//!
//! ```text
//!   Inline:  Stored = T        set = move in,  refresh = clone_from (assign)
//!   Boxed:   Stored = Box<T>   set = new box,  refresh = new box (copy)
//! ```
//!
//! Inline reuses the existing value in place and never allocates on its own.
//! Boxed never writes into an allocation that already exists: every update
//! builds a brand-new box and drops the old one, which is what you want when
//! `T` is expensive to assign or when whole allocations get swapped in with
//! [`Source::replace`](crate::Source::replace).
//!
//! The strategy is a type parameter. A replica borrows its source's type, so
//! the two always agree.

mod boxed;
mod inline;

pub use boxed::Boxed;
pub use inline::Inline;

/// A policy for holding a value of type `T`.
///
/// Implementors are zero-sized marker types; all methods are associated
/// functions operating on [`Storage::Stored`].
pub trait Storage<T> {
    /// The physical representation of the value.
    type Stored;

    /// Short strategy name for logs and `Debug` output.
    const NAME: &'static str;

    /// Builds fresh storage around `value`.
    fn construct(value: T) -> Self::Stored;

    /// Replaces the logical value with an owned one.
    fn set(stored: &mut Self::Stored, value: T);

    /// Replaces the logical value with a copy of `value`.
    fn assign(stored: &mut Self::Stored, value: &T)
    where
        T: Clone;

    /// Read-only access to the held value.
    fn get(stored: &Self::Stored) -> &T;

    /// Mutable access to the held value, for in-place modification.
    fn get_mut(stored: &mut Self::Stored) -> &mut T;

    /// Unwraps the storage.
    fn into_value(stored: Self::Stored) -> T;

    /// Produces independent storage holding a value-equal copy.
    fn deep_copy(stored: &Self::Stored) -> Self::Stored
    where
        T: Clone,
    {
        Self::construct(Self::get(stored).clone())
    }

    /// Brings `target` up to the value held by `source`.
    ///
    /// This is the replica resync step.
    fn refresh(target: &mut Self::Stored, source: &Self::Stored)
    where
        T: Clone,
    {
        Self::assign(target, Self::get(source));
    }
}

/// Strategies whose storage can be transplanted wholesale.
///
/// [`Source::replace`](crate::Source::replace) is only available for these.
/// Transplanting an inline value is just [`Storage::set`], so [`Inline`]
/// deliberately does not implement this.
pub trait ReplaceableStorage<T>: Storage<T> {}
