//! # omap - Ordered Multimap
//!
//! A thread-safe map from keys to one or more values, kept in key order by a
//! red-black tree index from [`rbtree_rs`].
//!
//! ## Features
//!
//! - **Caller-defined order**: any [`Comparator`] decides key order
//! - **Multiple values per key**: values are kept in insertion order
//! - **Half-open slicing**: [`head`], [`tail`] and [`sub`] copy out `[from, to)`
//!   ranges as new, independent maps
//! - **Shared access**: every call takes an internal `RwLock`
//!
//! [`head`]: OrderedMultiMap::head
//! [`tail`]: OrderedMultiMap::tail
//! [`sub`]: OrderedMultiMap::sub
//!
//! ## Example
//!
//! ```rust
//! use omap::{Natural, OrderedMultiMap};
//!
//! let map = OrderedMultiMap::new(Natural);
//! map.put(2, "b");
//! map.put(1, "a");
//! map.put(1, "aa");
//!
//! assert_eq!(map.get_all(&1), Some(vec!["a", "aa"]));
//! assert_eq!(map.keys(), vec![1, 2]);
//! assert_eq!(map.len(), 3);
//!
//! // Keys below 2
//! let head = map.head(&2);
//! assert_eq!(head.keys(), vec![1]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod multi;

pub use multi::{MultiMap, Values};
pub use rbtree_rs::{Comparator, FloatAsc, FloatDesc, Natural, Reverse};

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::RwLock;

/// Configuration for an [`OrderedMultiMap`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of distinct keys the index can hold before it reallocates
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
        }
    }
}

/// An ordered multimap safe to share between threads.
///
/// Every operation holds the internal lock for its whole duration, including
/// the copy of any returned snapshot, so callers never observe the index in
/// the middle of a rebalance.
pub struct OrderedMultiMap<K, V, C> {
    inner: RwLock<MultiMap<K, V, C>>,
    /// Total number of values, readable without taking the lock
    len: AtomicUsize,
    config: Config,
}

impl<K, V, C> OrderedMultiMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone,
{
    /// Create an empty map ordered by `cmp` with default configuration.
    pub fn new(cmp: C) -> Self {
        Self::with_config(cmp, Config::default())
    }

    /// Create an empty map ordered by `cmp` with the given configuration.
    pub fn with_config(cmp: C, config: Config) -> Self {
        let inner = MultiMap::with_capacity(cmp, config.initial_capacity);
        Self::from_multimap(inner, config)
    }

    fn from_multimap(inner: MultiMap<K, V, C>, config: Config) -> Self {
        Self {
            len: AtomicUsize::new(inner.len()),
            inner: RwLock::new(inner),
            config,
        }
    }

    /// The configuration this map was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Append `value` under `key`.
    ///
    /// Returns how many values the key holds afterwards.
    pub fn put(&self, key: K, value: V) -> usize {
        let mut inner = self.inner.write();
        let n = inner.put(key, value);
        self.len.fetch_add(1, Ordering::Relaxed);
        n
    }

    /// Copy of all values under `key`, in insertion order.
    pub fn get_all(&self, key: &K) -> Option<Vec<V>> {
        let inner = self.inner.read();
        inner.get_all(key).map(|values| values.to_vec())
    }

    /// Copy of the first value under `key`.
    pub fn get_first(&self, key: &K) -> Option<V> {
        let inner = self.inner.read();
        inner.get_first(key).cloned()
    }

    /// Remove `key` with all of its values.
    pub fn remove(&self, key: &K) -> Option<Vec<V>> {
        let mut inner = self.inner.write();
        let old = inner.remove(key);
        if let Some(ref values) = old {
            self.len.fetch_sub(values.len(), Ordering::Relaxed);
        }
        old
    }

    /// Whether every one of `keys` is present.
    pub fn contains_keys(&self, keys: &[K]) -> bool {
        let inner = self.inner.read();
        inner.contains_keys(keys)
    }

    /// Total number of values across all keys.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.inner.read().key_count()
    }

    /// Remove every key and value.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        debug!("clearing ordered multimap with {} values", inner.len());
        inner.clear();
        self.len.store(0, Ordering::Relaxed);
    }

    /// The smallest key.
    pub fn first_key(&self) -> Option<K> {
        self.inner.read().first_key().cloned()
    }

    /// The largest key.
    pub fn last_key(&self) -> Option<K> {
        self.inner.read().last_key().cloned()
    }

    /// Snapshot of the keys in order.
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys()
    }

    /// Snapshot of every value, grouped by key in key order.
    pub fn elements(&self) -> Vec<V> {
        self.inner.read().elements()
    }

    /// New map holding the entries with keys strictly below `to`.
    pub fn head(&self, to: &K) -> Self {
        let slice = self.inner.read().head(to);
        Self::from_multimap(slice, self.config.clone())
    }

    /// New map holding the entries with keys at or above `from`.
    pub fn tail(&self, from: &K) -> Self {
        let slice = self.inner.read().tail(from);
        Self::from_multimap(slice, self.config.clone())
    }

    /// New map holding the entries with keys in `[from, to)`.
    pub fn sub(&self, from: &K, to: &K) -> Self {
        let slice = self.inner.read().sub(from, to);
        Self::from_multimap(slice, self.config.clone())
    }

    /// Unsynchronized copy of the whole map.
    pub fn to_multimap(&self) -> MultiMap<K, V, C> {
        self.inner.read().clone()
    }
}

impl<K, V, C> Default for OrderedMultiMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Comparator<K> + Clone + Default,
{
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<K, V, C> fmt::Display for OrderedMultiMap<K, V, C>
where
    K: fmt::Display,
    V: fmt::Display,
    C: Comparator<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner.read(), f)
    }
}

impl<K, V, C> fmt::Debug for OrderedMultiMap<K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
    C: Comparator<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner.read(), f)
    }
}


#[cfg(test)]
mod stress_tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    #[test]
    fn test_concurrent_puts() {
        let map = OrderedMultiMap::new(Natural);

        std::thread::scope(|s| {
            for t in 0..8u64 {
                let map = &map;
                s.spawn(move || {
                    for i in 0..1000u64 {
                        map.put(i % 250, t * 1000 + i);
                    }
                });
            }
        });

        assert_eq!(map.len(), 8000);
        assert_eq!(map.key_count(), 250);
        assert_eq!(map.keys(), (0..250).collect::<Vec<u64>>());
        for k in 0..250u64 {
            assert_eq!(map.get_all(&k).map(|v| v.len()), Some(32));
        }
        assert!(map.to_multimap().iter().all(|(_, values)| values.len() == 32));
    }

    #[test]
    fn test_concurrent_put_remove() {
        let map = OrderedMultiMap::new(Natural);

        std::thread::scope(|s| {
            for t in 0..4u64 {
                let map = &map;
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(t);
                    for _ in 0..2000 {
                        let k: u32 = rng.gen_range(0..64);
                        if rng.gen_bool(0.3) {
                            map.remove(&k);
                        } else {
                            map.put(k, t);
                        }
                    }
                });
            }
        });

        let snapshot = map.to_multimap();
        assert_eq!(map.len(), snapshot.len());
        assert_eq!(snapshot.elements().len(), snapshot.len());
        let keys = map.keys();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_randomized_against_btreemap() {
        let mut rng = StdRng::seed_from_u64(7);
        let map = OrderedMultiMap::new(Natural);
        let mut model: BTreeMap<u16, Vec<u32>> = BTreeMap::new();

        for _ in 0..20_000 {
            let k: u16 = rng.gen_range(0..512);
            match rng.gen_range(0..100) {
                0..=59 => {
                    let v: u32 = rng.gen();
                    map.put(k, v);
                    model.entry(k).or_default().push(v);
                }
                60..=79 => {
                    assert_eq!(map.remove(&k), model.remove(&k));
                }
                _ => {
                    assert_eq!(map.get_all(&k), model.get(&k).cloned());
                }
            }
        }

        assert_eq!(map.len(), model.values().map(Vec::len).sum::<usize>());
        assert_eq!(map.keys(), model.keys().copied().collect::<Vec<_>>());

        let sub = map.sub(&100, &300);
        let expected: Vec<u32> = model
            .range(100..300)
            .flat_map(|(_, v)| v.iter().copied())
            .collect();
        assert_eq!(sub.elements(), expected);
    }
}
