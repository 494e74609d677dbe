//! Dictionary invariants over arbitrary keysets and build options.
//!
//! Each property builds a trie from generated keys and checks one
//! contract against the oracle: round-tripping, id density, duplicate
//! coherence, prefix/predict closure, shortest/longest selection, and
//! the append-only output discipline.

use proptest::prelude::*;

use talpa::{BuildOptions, Keyset, NodeOrder, TailMode, Trie, TrieKind};

use super::oracles::{extensions_of, prefixes_of, unique_keys};

fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    // Narrow alphabet plus occasional wild bytes: collisions and shared
    // prefixes are where the interesting structure lives.
    prop::collection::vec(
        prop_oneof![
            4 => prop::sample::select(b"abcdxy".to_vec()),
            1 => any::<u8>(),
        ],
        0..12,
    )
}

fn keyset_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(key_strategy(), 0..40)
}

fn options_strategy() -> impl Strategy<Value = BuildOptions> {
    (
        1usize..=4,
        prop::bool::ANY,
        prop::sample::select(vec![TailMode::None, TailMode::Text, TailMode::Binary]),
        prop::bool::ANY,
    )
        .prop_map(|(num_tries, prefix, tail, label)| {
            BuildOptions::new()
                .num_tries(num_tries)
                .trie(if prefix {
                    TrieKind::Prefix
                } else {
                    TrieKind::Patricia
                })
                .tail(tail)
                .order(if label {
                    NodeOrder::Label
                } else {
                    NodeOrder::Weight
                })
        })
}

fn build_trie(keys: &[Vec<u8>], options: BuildOptions) -> (Trie, Vec<u32>) {
    let mut keyset = Keyset::new();
    for key in keys {
        keyset.push(key);
    }
    let mut trie = Trie::new();
    let key_ids = trie.build(&keyset, options).expect("build never fails");
    (trie, key_ids)
}

proptest! {
    #[test]
    fn round_trip_by_id(keys in keyset_strategy(), options in options_strategy()) {
        let (trie, key_ids) = build_trie(&keys, options);
        let unique = unique_keys(&keys);

        prop_assert_eq!(trie.num_keys() as usize, unique.len());

        for (key, &id) in keys.iter().zip(&key_ids) {
            prop_assert_eq!(trie.lookup(key), Some(id));
            prop_assert_eq!(trie.restore(id).unwrap(), key.clone());
        }
    }

    #[test]
    fn ids_are_dense(keys in keyset_strategy(), options in options_strategy()) {
        let (trie, key_ids) = build_trie(&keys, options);
        let n = trie.num_keys();

        let mut seen = vec![false; n as usize];
        for &id in &key_ids {
            prop_assert!(id < n);
            seen[id as usize] = true;
        }
        // Every id is hit by some input key.
        prop_assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn duplicates_share_ids(keys in keyset_strategy(), options in options_strategy()) {
        let mut doubled = keys.clone();
        doubled.extend(keys.iter().cloned());
        let (_, key_ids) = build_trie(&doubled, options);

        let n = keys.len();
        for i in 0..n {
            prop_assert_eq!(key_ids[i], key_ids[i + n]);
        }
    }

    #[test]
    fn prefix_closure(
        keys in keyset_strategy(),
        options in options_strategy(),
        query in key_strategy(),
    ) {
        let (trie, _) = build_trie(&keys, options);
        let unique = unique_keys(&keys);
        let expected = prefixes_of(&unique, &query);

        let mut ids = Vec::new();
        let mut lengths = Vec::new();
        let count = trie.find(&query, &mut ids, Some(&mut lengths));

        prop_assert_eq!(count, expected.len());
        prop_assert_eq!(ids.len(), expected.len());
        for ((id, len), key) in ids.iter().zip(&lengths).zip(&expected) {
            prop_assert_eq!(*len, key.len());
            let restored = trie.restore(*id).unwrap();
            prop_assert_eq!(restored.as_slice(), *key);
        }

        // Shortest and longest agree with the ends of the closure.
        match expected.first() {
            None => prop_assert!(trie.find_first(&query).is_none()),
            Some(shortest) => {
                let hit = trie.find_first(&query).unwrap();
                prop_assert_eq!(hit.len, shortest.len());
            }
        }
        match expected.last() {
            None => prop_assert!(trie.find_last(&query).is_none()),
            Some(longest) => {
                let hit = trie.find_last(&query).unwrap();
                prop_assert_eq!(hit.len, longest.len());
            }
        }
    }

    #[test]
    fn predict_closure(
        keys in keyset_strategy(),
        options in options_strategy(),
        prefix in key_strategy(),
    ) {
        let (trie, _) = build_trie(&keys, options);
        let unique = unique_keys(&keys);
        let expected = extensions_of(&unique, &prefix);

        prop_assert_eq!(trie.predict(&prefix), expected.len());

        // Breadth-first: same key set, ids strictly ascending.
        let mut ids = Vec::new();
        prop_assert_eq!(
            trie.predict_breadth_first(&prefix, &mut ids, None),
            expected.len()
        );
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        let mut bfs_keys: Vec<Vec<u8>> =
            ids.iter().map(|&id| trie.restore(id).unwrap()).collect();
        bfs_keys.sort();
        prop_assert_eq!(&bfs_keys, &expected.iter().map(|k| k.to_vec()).collect::<Vec<_>>());

        // Depth-first: same key set, materialised keys match their ids.
        let mut dfs_ids = Vec::new();
        let mut dfs_keys = Vec::new();
        prop_assert_eq!(
            trie.predict_depth_first(&prefix, &mut dfs_ids, Some(&mut dfs_keys), None),
            expected.len()
        );
        for (&id, key) in dfs_ids.iter().zip(&dfs_keys) {
            prop_assert_eq!(trie.lookup(key), Some(id));
        }
        let mut sorted = dfs_keys.clone();
        sorted.sort();
        prop_assert_eq!(&sorted, &expected.iter().map(|k| k.to_vec()).collect::<Vec<_>>());
    }

    #[test]
    fn outputs_accumulate(
        keys in keyset_strategy(),
        options in options_strategy(),
        q1 in key_strategy(),
        q2 in key_strategy(),
    ) {
        let (trie, _) = build_trie(&keys, options);

        let mut ids = vec![42u32];
        let c1 = trie.find(&q1, &mut ids, None);
        prop_assert_eq!(ids.len(), 1 + c1);
        prop_assert_eq!(ids[0], 42);

        let c2 = trie.predict_breadth_first(&q2, &mut ids, None);
        prop_assert_eq!(ids.len(), 1 + c1 + c2);
    }

    #[test]
    fn callback_early_stop_counts_the_stopping_visit(
        keys in keyset_strategy(),
        options in options_strategy(),
        prefix in key_strategy(),
    ) {
        let (trie, _) = build_trie(&keys, options);
        let total = trie.predict(&prefix);

        let mut visits = 0usize;
        let reported = trie.predict_callback(&prefix, |_, _| {
            visits += 1;
            false
        });
        if total == 0 {
            prop_assert_eq!(reported, 0);
        } else {
            prop_assert_eq!(reported, 1);
            prop_assert_eq!(visits, 1);
        }
    }
}
