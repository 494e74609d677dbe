//! Arbitrary bytes through the deserialiser: must reject or load, never
//! panic, and a successful load must answer queries safely.

#![no_main]

use libfuzzer_sys::fuzz_target;
use talpa::Trie;

fuzz_target!(|data: &[u8]| {
    if let Ok(trie) = Trie::from_bytes(data) {
        let _ = trie.lookup(b"probe");
        let mut ids = Vec::new();
        let _ = trie.find(b"probe", &mut ids, None);
        let _ = trie.predict_breadth_first(b"", &mut ids, Some(16));
        for id in 0..trie.num_keys().min(16) {
            let _ = trie.restore(id);
        }
    }
});
