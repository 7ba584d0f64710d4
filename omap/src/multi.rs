//! Unsynchronized ordered multimap.
//!
//! Keys are kept sorted in an [`RbTree`] whose values are the per-key value
//! lists, so the sorted index and the key-to-values mapping never drift apart.
//! Most keys carry one or two values, which stay inline in the `SmallVec`.

use std::fmt;
use std::ops::Bound;

use log::debug;
use rbtree_rs::{Comparator, RbTree};
use smallvec::{smallvec, SmallVec};

/// Values stored under one key, in insertion order.
pub type Values<V> = SmallVec<[V; 2]>;

/// An ordered map from keys to one or more values.
#[derive(Clone)]
pub struct MultiMap<K, V, C> {
    index: RbTree<K, Values<V>, C>,
    /// Total number of values across all keys.
    len: usize,
}

impl<K, V, C: Comparator<K>> MultiMap<K, V, C> {
    /// Create an empty map ordered by `cmp`.
    pub fn new(cmp: C) -> Self {
        Self::with_capacity(cmp, 0)
    }

    /// Create an empty map with room for `capacity` distinct keys.
    pub fn with_capacity(cmp: C, capacity: usize) -> Self {
        Self {
            index: RbTree::with_capacity(cmp, capacity),
            len: 0,
        }
    }

    /// Append `value` to the values stored under `key`.
    ///
    /// Returns how many values the key holds afterwards.
    pub fn put(&mut self, key: K, value: V) -> usize {
        self.len += 1;
        if let Some(values) = self.index.get_mut(&key) {
            values.push(value);
            return values.len();
        }
        self.index.put(key, smallvec![value]);
        1
    }

    /// All values stored under `key`, in insertion order.
    pub fn get_all(&self, key: &K) -> Option<&[V]> {
        self.index.get(key).map(|values| values.as_slice())
    }

    /// The first value stored under `key`.
    pub fn get_first(&self, key: &K) -> Option<&V> {
        self.index.get(key).and_then(|values| values.first())
    }

    /// Remove `key` with all of its values.
    pub fn remove(&mut self, key: &K) -> Option<Vec<V>> {
        let values = self.index.remove(key)?;
        self.len -= values.len();
        Some(values.into_vec())
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Whether every one of `keys` is present. An empty query is satisfied.
    pub fn contains_keys(&self, keys: &[K]) -> bool {
        keys.iter().all(|k| self.index.contains_key(k))
    }

    /// Total number of values across all keys.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every key and value.
    pub fn clear(&mut self) {
        self.index.clear();
        self.len = 0;
    }

    /// The smallest key.
    pub fn first_key(&self) -> Option<&K> {
        self.index.first().map(|(k, _)| k)
    }

    /// The largest key.
    pub fn last_key(&self) -> Option<&K> {
        self.index.last().map(|(k, _)| k)
    }

    /// Keys with their value lists, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[V])> + '_ {
        self.index.iter().map(|(k, values)| (k, values.as_slice()))
    }

    /// Snapshot of the keys in order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.index.keys()
    }

    /// Snapshot of every value, grouped by key in key order.
    pub fn elements(&self) -> Vec<V>
    where
        V: Clone,
    {
        let mut out = Vec::with_capacity(self.len);
        for (_, values) in self.index.iter() {
            out.extend(values.iter().cloned());
        }
        out
    }

    /// Entries with keys strictly below `to`.
    pub fn head(&self, to: &K) -> Self
    where
        K: Clone,
        V: Clone,
        C: Clone,
    {
        self.slice(Bound::Unbounded, Bound::Excluded(to))
    }

    /// Entries with keys at or above `from`.
    pub fn tail(&self, from: &K) -> Self
    where
        K: Clone,
        V: Clone,
        C: Clone,
    {
        self.slice(Bound::Included(from), Bound::Unbounded)
    }

    /// Entries with keys in `[from, to)`. Empty when `from` is not below `to`.
    pub fn sub(&self, from: &K, to: &K) -> Self
    where
        K: Clone,
        V: Clone,
        C: Clone,
    {
        self.slice(Bound::Included(from), Bound::Excluded(to))
    }

    fn slice(&self, lower: Bound<&K>, upper: Bound<&K>) -> Self
    where
        K: Clone,
        V: Clone,
        C: Clone,
    {
        let mut out = Self::new(self.index.comparator().clone());
        for (key, values) in self.index.range(lower, upper) {
            out.len += values.len();
            out.index.put(key.clone(), values.clone());
        }
        debug!(
            "sliced {} of {} keys into a new map",
            out.key_count(),
            self.key_count()
        );
        out
    }
}

impl<K, V, C: Comparator<K> + Default> Default for MultiMap<K, V, C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

/// `OrderedMap{k1:[v1 v2] k2:[v3]}`
impl<K: fmt::Display, V: fmt::Display, C: Comparator<K>> fmt::Display for MultiMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OrderedMap{")?;
        for (i, (key, values)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}:[")?;
            for (j, value) in values.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{value}")?;
            }
            f.write_str("]")?;
        }
        f.write_str("}")
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C: Comparator<K>> fmt::Debug for MultiMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
