//! Build a dictionary from fuzzer-chosen keys and drive every query
//! against fuzzer-chosen inputs.

#![no_main]

use libfuzzer_sys::fuzz_target;
use talpa::{BuildOptions, Keyset, Trie};

fuzz_target!(|data: &[u8]| {
    let mut chunks = data.split(|&b| b == b'\n');
    let Some(flags) = chunks.next() else { return };
    let bits = u32::from_le_bytes([
        flags.first().copied().unwrap_or(0),
        flags.get(1).copied().unwrap_or(0),
        0,
        0,
    ]);
    let Ok(options) = BuildOptions::from_bits(bits & 0x0003_330F) else {
        return;
    };

    let Some(query) = chunks.next() else { return };
    let mut keyset = Keyset::new();
    for key in chunks.take(64) {
        keyset.push(key);
    }

    let mut trie = Trie::new();
    let Ok(key_ids) = trie.build(&keyset, options) else {
        return;
    };

    for (i, &id) in key_ids.iter().enumerate() {
        assert_eq!(trie.lookup(keyset.key(i)), Some(id));
        assert_eq!(trie.restore(id).unwrap(), keyset.key(i));
    }

    let _ = trie.lookup(query);
    let mut ids = Vec::new();
    let mut lengths = Vec::new();
    let found = trie.find(query, &mut ids, Some(&mut lengths));
    assert_eq!(found, ids.len());
    assert!(trie.predict(query) <= trie.num_keys() as usize);

    let bytes = trie.to_bytes().unwrap();
    let reloaded = Trie::from_bytes(&bytes).unwrap();
    assert_eq!(reloaded.lookup(query), trie.lookup(query));
});
