//! Reference implementations the property tests compare against.
//!
//! The oracle is a sorted set of unique keys. Every dictionary query has
//! an obvious quadratic-time answer over that set; the trie must agree
//! exactly, orders included.

use std::collections::BTreeSet;

/// Unique keys in lexicographic order.
pub fn unique_keys(keys: &[Vec<u8>]) -> Vec<Vec<u8>> {
    keys.iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Keys that are prefixes of `query`, shortest first.
pub fn prefixes_of<'a>(keys: &'a [Vec<u8>], query: &[u8]) -> Vec<&'a [u8]> {
    let mut hits: Vec<&[u8]> = keys
        .iter()
        .map(|k| k.as_slice())
        .filter(|k| query.starts_with(k))
        .collect();
    hits.sort_by_key(|k| k.len());
    hits
}

/// Keys that start with `prefix`, in lexicographic order.
pub fn extensions_of<'a>(keys: &'a [Vec<u8>], prefix: &[u8]) -> Vec<&'a [u8]> {
    keys.iter()
        .map(|k| k.as_slice())
        .filter(|k| k.starts_with(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_basics() {
        let keys = vec![b"app".to_vec(), b"apple".to_vec(), b"".to_vec()];
        let unique = unique_keys(&keys);
        assert_eq!(unique.len(), 3);

        let hits = prefixes_of(&unique, b"apples");
        assert_eq!(hits, vec![&b""[..], b"app", b"apple"]);

        let ext = extensions_of(&unique, b"app");
        assert_eq!(ext, vec![&b"app"[..], b"apple"]);
    }
}
