//! Shared test utilities.

#![allow(dead_code)]

use talpa::{BuildOptions, Keyset, Trie};

/// Build a dictionary from literal keys, returning it with the key ids.
pub fn build(keys: &[&[u8]], options: BuildOptions) -> (Trie, Vec<u32>) {
    let mut keyset = Keyset::new();
    for key in keys {
        keyset.push(key);
    }
    let mut trie = Trie::new();
    let key_ids = trie
        .build(&keyset, options)
        .expect("fixture keysets always build");
    (trie, key_ids)
}

/// Assert that every input key round-trips: lookup maps to its id and
/// restore maps back to its bytes.
pub fn assert_round_trip(trie: &Trie, keys: &[&[u8]], key_ids: &[u32]) {
    for (key, &id) in keys.iter().zip(key_ids) {
        assert_eq!(trie.lookup(key), Some(id), "lookup {:?}", key);
        assert_eq!(trie.restore(id).unwrap().as_slice(), *key, "restore {}", id);

        let mut buf = [0u8; 256];
        let len = trie.restore_into(id, &mut buf).unwrap();
        assert_eq!(&buf[..len], *key);
    }
}
