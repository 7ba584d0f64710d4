//! Red-black tree benchmarks against `BTreeMap`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rbtree_rs::{Natural, RbTree};
use std::collections::BTreeMap;

fn random_keys(n: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| rng.gen()).collect()
}

fn bench_insert_remove_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_remove_sequential");

    for size in [1_000u64, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("BTreeMap", size), size, |b, &n| {
            b.iter(|| {
                let mut map = BTreeMap::new();
                for i in 0..n {
                    map.insert(i, i);
                }
                for i in 0..n {
                    map.remove(&i);
                }
                black_box(map)
            });
        });

        group.bench_with_input(BenchmarkId::new("RbTree", size), size, |b, &n| {
            b.iter(|| {
                let mut tree = RbTree::new(Natural);
                for i in 0..n {
                    tree.put(i, i);
                }
                for i in 0..n {
                    tree.remove(&i);
                }
                black_box(tree)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [1_000, 10_000, 100_000].iter() {
        let keys = random_keys(*size);

        let mut btree = BTreeMap::new();
        let mut tree = RbTree::with_capacity(Natural, *size);
        for (i, &key) in keys.iter().enumerate() {
            btree.insert(key, i as u64);
            tree.put(key, i as u64);
        }

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), size, |b, _| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = btree.get(key) {
                        sum = sum.wrapping_add(*v);
                    }
                }
                black_box(sum)
            });
        });

        group.bench_with_input(BenchmarkId::new("RbTree", size), size, |b, _| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(v) = tree.get(key) {
                        sum = sum.wrapping_add(*v);
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_iter(c: &mut Criterion) {
    let keys = random_keys(100_000);
    let mut tree = RbTree::new(Natural);
    for &key in &keys {
        tree.put(key, ());
    }

    c.bench_function("iter_100k", |b| {
        b.iter(|| black_box(tree.iter().count()));
    });
}

criterion_group!(benches, bench_insert_remove_sequential, bench_lookup, bench_iter);
criterion_main!(benches);
