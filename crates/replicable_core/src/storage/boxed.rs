//! Boxed storage: the value lives in its own heap allocation.

use super::{ReplaceableStorage, Storage};

/// Holds `T` behind a `Box`.
///
/// Never assigns into an existing allocation. [`Storage::set`] and
/// [`Storage::assign`] both build a new box first and drop the old one after,
/// so the old and new values never share memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Boxed;

#[allow(clippy::borrowed_box)]
impl<T> Storage<T> for Boxed {
    type Stored = Box<T>;

    const NAME: &'static str = "boxed";

    #[inline]
    fn construct(value: T) -> Box<T> {
        Box::new(value)
    }

    #[inline]
    fn set(stored: &mut Box<T>, value: T) {
        *stored = Box::new(value);
    }

    #[inline]
    fn assign(stored: &mut Box<T>, value: &T)
    where
        T: Clone,
    {
        *stored = Box::new(value.clone());
    }

    #[inline]
    fn get(stored: &Box<T>) -> &T {
        stored
    }

    #[inline]
    fn get_mut(stored: &mut Box<T>) -> &mut T {
        stored
    }

    #[inline]
    fn into_value(stored: Box<T>) -> T {
        *stored
    }
}

impl<T> ReplaceableStorage<T> for Boxed {}
