//! Serialisation properties: idempotence and hostile-input safety.

use proptest::prelude::*;

use talpa::{BuildOptions, Keyset, TailMode, Trie, TrieKind};

fn keys_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..10), 0..25)
}

fn build_trie(keys: &[Vec<u8>], options: BuildOptions) -> Trie {
    let mut keyset = Keyset::new();
    for key in keys {
        keyset.push(key);
    }
    let mut trie = Trie::new();
    trie.build(&keyset, options).expect("build never fails");
    trie
}

proptest! {
    #[test]
    fn serialisation_is_idempotent(
        keys in keys_strategy(),
        num_tries in 1usize..=3,
        binary in prop::bool::ANY,
    ) {
        let options = BuildOptions::new().num_tries(num_tries).tail(if binary {
            TailMode::Binary
        } else {
            TailMode::Text
        });
        let trie = build_trie(&keys, options);

        let bytes = trie.to_bytes().unwrap();
        let loaded = Trie::from_bytes(&bytes).unwrap();

        prop_assert_eq!(loaded.num_keys(), trie.num_keys());
        prop_assert_eq!(loaded.num_nodes(), trie.num_nodes());
        prop_assert_eq!(loaded.to_bytes().unwrap(), bytes);

        // The loaded dictionary answers every query identically.
        for id in 0..trie.num_keys() {
            let key = trie.restore(id).unwrap();
            prop_assert_eq!(loaded.lookup(&key), Some(id));
            prop_assert_eq!(loaded.restore(id).unwrap(), key);
        }
    }

    #[test]
    fn bit_flips_never_panic(
        keys in keys_strategy(),
        flip_at in any::<prop::sample::Index>(),
        flip_mask in 1u8..,
    ) {
        let trie = build_trie(&keys, BuildOptions::new().trie(TrieKind::Prefix));
        let mut bytes = trie.to_bytes().unwrap();
        let i = flip_at.index(bytes.len());
        bytes[i] ^= flip_mask;

        // Either the CRC (or a structural check) rejects it, or the flip
        // hit a dead byte and the load still succeeds; both are fine,
        // panicking is not.
        let _ = Trie::from_bytes(&bytes);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..200)) {
        let _ = Trie::from_bytes(&bytes);
    }
}
