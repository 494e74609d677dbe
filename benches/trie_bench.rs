//! Benchmarks across realistic dictionary sizes.
//!
//! Simulates three workloads:
//! - small:  ~1k keys   (command palette, language keywords)
//! - medium: ~50k keys  (spell-check lexicon)
//! - large:  ~500k keys (URL table, n-gram dictionary)
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

use talpa::{BuildOptions, Keyset, NodeOrder, Trie};

struct DictSize {
    name: &'static str,
    keys: usize,
}

const DICT_SIZES: &[DictSize] = &[
    DictSize {
        name: "small",
        keys: 1_000,
    },
    DictSize {
        name: "medium",
        keys: 50_000,
    },
    DictSize {
        name: "large",
        keys: 500_000,
    },
];

/// Deterministic word-like keys with heavy prefix sharing.
fn synthetic_keys(count: usize) -> Vec<Vec<u8>> {
    const STEMS: &[&str] = &[
        "inter", "trans", "under", "over", "re", "pre", "anti", "micro", "proto", "meta",
    ];
    const CORES: &[&str] = &[
        "act", "form", "port", "struct", "graph", "ware", "state", "cache", "node", "page",
    ];
    const SUFFIXES: &[&str] = &["", "s", "ing", "ed", "er", "ion", "able", "ively"];

    let mut keys = Vec::with_capacity(count);
    let mut i = 0usize;
    while keys.len() < count {
        let stem = STEMS[i % STEMS.len()];
        let core = CORES[(i / STEMS.len()) % CORES.len()];
        let suffix = SUFFIXES[(i / (STEMS.len() * CORES.len())) % SUFFIXES.len()];
        let serial = i / (STEMS.len() * CORES.len() * SUFFIXES.len());
        if serial == 0 {
            keys.push(format!("{}{}{}", stem, core, suffix).into_bytes());
        } else {
            keys.push(format!("{}{}{}{}", stem, core, suffix, serial).into_bytes());
        }
        i += 1;
    }
    keys
}

fn build_dict(keys: &[Vec<u8>], options: BuildOptions) -> Trie {
    let mut keyset = Keyset::new();
    for key in keys {
        keyset.push(key);
    }
    let mut trie = Trie::new();
    trie.build(&keyset, options).expect("benchmark keys build");
    trie
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for size in DICT_SIZES {
        let keys = synthetic_keys(size.keys);
        group.throughput(Throughput::Elements(size.keys as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size.name), &keys, |b, keys| {
            b.iter(|| build_dict(keys, BuildOptions::default()));
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    for size in DICT_SIZES {
        let keys = synthetic_keys(size.keys);
        for (order_name, order) in [("weight", NodeOrder::Weight), ("label", NodeOrder::Label)] {
            let trie = build_dict(&keys, BuildOptions::default().order(order));
            group.throughput(Throughput::Elements(keys.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(order_name, size.name),
                &trie,
                |b, trie| {
                    b.iter(|| {
                        for key in &keys {
                            black_box(trie.lookup(key));
                        }
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_common_prefix(c: &mut Criterion) {
    let mut group = c.benchmark_group("common_prefix");
    for size in DICT_SIZES {
        let keys = synthetic_keys(size.keys);
        let trie = build_dict(&keys, BuildOptions::default());
        let queries: Vec<Vec<u8>> = keys
            .iter()
            .step_by(7)
            .map(|k| {
                let mut q = k.clone();
                q.extend_from_slice(b"xyz");
                q
            })
            .collect();
        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(size.name),
            &trie,
            |b, trie| {
                b.iter(|| {
                    let mut ids = Vec::new();
                    for query in &queries {
                        ids.clear();
                        black_box(trie.find(query, &mut ids, None));
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict");
    for size in DICT_SIZES {
        let keys = synthetic_keys(size.keys);
        let trie = build_dict(&keys, BuildOptions::default());
        group.bench_with_input(
            BenchmarkId::from_parameter(size.name),
            &trie,
            |b, trie| {
                b.iter(|| {
                    let mut ids = Vec::new();
                    black_box(trie.predict_breadth_first(b"inter", &mut ids, Some(64)));
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_lookup,
    bench_common_prefix,
    bench_predict
);
criterion_main!(benches);
