use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

// A small key space keeps overwrites and removals of present keys frequent.
#[derive(Clone, Debug, Arbitrary)]
enum Op {
    Put(u8, u32),
    Remove(u8),
    Get(u8),
    Clear,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let op = prop_oneof![
        50 => any::<(u8, u32)>().prop_map(|(k, v)| Op::Put(k, v)),
        30 => any::<u8>().prop_map(Op::Remove),
        19 => any::<u8>().prop_map(Op::Get),
        1 => Just(Op::Clear),
    ];
    prop::collection::vec(op, 0..=1000)
}

fn bound_strategy() -> impl Strategy<Value = Bound<u8>> {
    prop_oneof![
        Just(Bound::Unbounded),
        any::<u8>().prop_map(Bound::Included),
        any::<u8>().prop_map(Bound::Excluded),
    ]
}

fn within<T: Ord>(x: &T, lower: Bound<&T>, upper: Bound<&T>) -> bool {
    let above = match lower {
        Bound::Unbounded => true,
        Bound::Included(k) => x >= k,
        Bound::Excluded(k) => x > k,
    };
    let below = match upper {
        Bound::Unbounded => true,
        Bound::Included(k) => x <= k,
        Bound::Excluded(k) => x < k,
    };
    above && below
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut t = RbTree::new(Natural);
        let mut m: BTreeMap<u8, u32> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Put(key, value) => {
                    prop_assert_eq!(t.put(key, value), m.insert(key, value));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(t.remove(&key), m.remove(&key));
                    prop_assert_eq!(t.get(&key), None);
                }
                Op::Get(key) => {
                    prop_assert_eq!(t.get(&key), m.get(&key));
                }
                Op::Clear => {
                    t.clear();
                    m.clear();
                }
            }

            prop_assert_eq!(t.check_invariants(), Ok(()));
            prop_assert_eq!(t.len(), m.len());
        }

        let got: Vec<(u8, u32)> = t.iter().map(|(k, v)| (*k, *v)).collect();
        let expected: Vec<(u8, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(t.keys().len(), t.len());
    }

    #[test]
    fn prop_reverse_order(keys in prop::collection::vec(any::<i16>(), 0..=500)) {
        let mut t = RbTree::new(Reverse);
        for &k in &keys {
            t.put(k, ());
        }
        prop_assert_eq!(t.check_invariants(), Ok(()));

        let mut expected = keys.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        expected.dedup();
        prop_assert_eq!(t.keys(), expected);
    }

    #[test]
    fn prop_range_matches_filter(
        keys in prop::collection::vec(any::<u8>(), 0..=200),
        lower in bound_strategy(),
        upper in bound_strategy(),
    ) {
        let mut t = RbTree::new(Natural);
        for &k in &keys {
            t.put(k, u32::from(k) * 3);
        }

        let got: Vec<(u8, u32)> = t
            .range(lower.as_ref(), upper.as_ref())
            .map(|(k, v)| (*k, *v))
            .collect();
        let expected: Vec<(u8, u32)> = t
            .iter()
            .filter(|(k, _)| within(*k, lower.as_ref(), upper.as_ref()))
            .map(|(k, v)| (*k, *v))
            .collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_contains_values(
        entries in prop::collection::vec((any::<u8>(), 0u8..32), 0..=100),
        queries in prop::collection::vec(0u8..32, 0..=4),
    ) {
        let mut t = RbTree::new(Natural);
        let mut m: BTreeMap<u8, u8> = BTreeMap::new();
        for (k, v) in entries {
            t.put(k, v);
            m.insert(k, v);
        }
        let expected = queries.iter().all(|q| m.values().any(|v| v == q));
        prop_assert_eq!(t.contains(&queries), expected);
    }

    #[test]
    fn prop_derived_ops(ops in prop::collection::vec(any::<Op>(), 0..=300)) {
        let mut t = RbTree::new(Natural);
        for op in ops {
            match op {
                Op::Put(k, v) => { t.put(k, v); }
                Op::Remove(k) => { t.remove(&k); }
                Op::Get(k) => { t.get(&k); }
                Op::Clear => t.clear(),
            }
            prop_assert_eq!(t.check_invariants(), Ok(()));
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys: Vec<u32> = (1..=7).collect();

    for_each_permutation(&keys, |perm| {
        let mut t = RbTree::new(Natural);
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.put(*k, i), None);
            t.check_invariants().unwrap();
        }
        assert_eq!(t.keys(), keys);
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.get(k), Some(&i));
        }
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys: Vec<u32> = (1..=7).collect();

    // Build from a fixed insertion order, then remove in all permutations.
    let mut base = RbTree::new(Natural);
    for &k in &[5, 6, 7, 3, 4, 1, 2] {
        base.put(k, k * 10);
    }

    for_each_permutation(&keys, |perm| {
        let mut t = base.clone();
        for (i, k) in perm.iter().enumerate() {
            assert_eq!(t.remove(k), Some(k * 10));
            assert_eq!(t.len(), keys.len() - i - 1);
            t.check_invariants().unwrap();
        }
        assert!(t.is_empty());
        assert!(t.root.is_nil());
    });
}
