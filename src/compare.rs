//! Orderings consumed by [`RbTree`](crate::RbTree).
//!
//! The tree never looks at keys itself: every ordering decision goes through a
//! [`Comparator`]. Any `Fn(&K, &K) -> Ordering` closure is a comparator, and a
//! few ready-made orderings cover the common cases.

use std::cmp::Ordering;

/// A total order over keys of type `K`.
///
/// Implementations must be deterministic, free of side effects, and consistent
/// (antisymmetric and transitive) over every key stored in one tree. The tree
/// calls `compare` in the middle of rebalancing, so it must not touch the tree.
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Ascending order by `Ord`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Natural;

impl<K: Ord + ?Sized> Comparator<K> for Natural {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Descending order by `Ord`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reverse;

impl<K: Ord + ?Sized> Comparator<K> for Reverse {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }
}

/// Ascending order over `f64` using IEEE 754 `totalOrder`.
///
/// `-0.0` sorts before `0.0` and NaNs sort to the ends, so the order stays
/// total even for the values plain `<` cannot compare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FloatAsc;

impl Comparator<f64> for FloatAsc {
    #[inline]
    fn compare(&self, a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }
}

impl Comparator<f32> for FloatAsc {
    #[inline]
    fn compare(&self, a: &f32, b: &f32) -> Ordering {
        a.total_cmp(b)
    }
}

/// Descending counterpart of [`FloatAsc`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FloatDesc;

impl Comparator<f64> for FloatDesc {
    #[inline]
    fn compare(&self, a: &f64, b: &f64) -> Ordering {
        b.total_cmp(a)
    }
}

impl Comparator<f32> for FloatDesc {
    #[inline]
    fn compare(&self, a: &f32, b: &f32) -> Ordering {
        b.total_cmp(a)
    }
}
