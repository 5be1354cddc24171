//! Inline storage: the value lives directly inside its owner.

use super::Storage;

/// Holds `T` directly.
///
/// Updates reuse the existing value: [`Storage::assign`] goes through
/// [`Clone::clone_from`], so types that can recycle their buffers (strings,
/// vectors) do so on every replica resync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Inline;

impl<T> Storage<T> for Inline {
    type Stored = T;

    const NAME: &'static str = "inline";

    #[inline]
    fn construct(value: T) -> T {
        value
    }

    #[inline]
    fn set(stored: &mut T, value: T) {
        *stored = value;
    }

    #[inline]
    fn assign(stored: &mut T, value: &T)
    where
        T: Clone,
    {
        stored.clone_from(value);
    }

    #[inline]
    fn get(stored: &T) -> &T {
        stored
    }

    #[inline]
    fn get_mut(stored: &mut T) -> &mut T {
        stored
    }

    #[inline]
    fn into_value(stored: T) -> T {
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_reuses_buffer() {
        let mut stored = <Inline as Storage<String>>::construct(String::with_capacity(64));
        let before = stored.as_ptr();

        <Inline as Storage<String>>::assign(&mut stored, &String::from("short"));

        assert_eq!(stored, "short");
        assert_eq!(stored.as_ptr(), before);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let original = <Inline as Storage<Vec<u32>>>::construct(vec![1, 2, 3]);
        let mut copy = <Inline as Storage<Vec<u32>>>::deep_copy(&original);

        <Inline as Storage<Vec<u32>>>::get_mut(&mut copy).push(4);

        assert_eq!(original, vec![1, 2, 3]);
        assert_eq!(copy, vec![1, 2, 3, 4]);
    }
}
