// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The dictionary type.
//!
//! A [`Trie`] is a stack of LOUDS levels plus an optional tail store,
//! built once from a [`Keyset`](crate::Keyset) and read-only afterwards.
//! Level 0 holds the key space: the n-th accepting node in BFS order is
//! key id n. Deeper levels store the reversed edge strings the shallower
//! levels compressed away, and the tail store catches whatever is left
//! when the level budget runs out.
//!
//! Everything is immutable after `build`, so a frozen trie is `Send +
//! Sync` and queries from many threads need no coordination. `clear`
//! resets to the empty state and releases any memory mapping.

mod builder;
mod io;
mod search;

/// Binary format constants, for tools that sniff files.
pub mod io_constants {
    pub use super::io::{FOOTER_MAGIC, MAGIC, VERSION};
}

use memmap2::Mmap;

use crate::error::{Error, Result};
use crate::keyset::Keyset;
use crate::louds::LoudsLevel;
use crate::tail::TailStore;
use crate::types::{BuildOptions, LevelStats, NodeOrder, Stats, TailMode, TrieKind};

pub use search::Match;

/// A static string dictionary over a stack of nested LOUDS tries.
///
/// ```
/// use talpa::{BuildOptions, Keyset, Trie};
///
/// let mut keyset = Keyset::new();
/// keyset.push(b"apple");
/// keyset.push(b"app");
///
/// let mut trie = Trie::new();
/// let key_ids = trie.build(&keyset, BuildOptions::default()).unwrap();
/// assert_eq!(trie.lookup(b"apple"), Some(key_ids[0]));
/// assert_eq!(trie.lookup(b"appl"), None);
/// assert_eq!(trie.restore(key_ids[1]).unwrap(), b"app");
/// ```
#[derive(Debug, Default)]
pub struct Trie {
    pub(crate) levels: Vec<LoudsLevel>,
    pub(crate) tail: Option<TailStore>,
    pub(crate) num_keys: u32,
    pub(crate) kind: TrieKind,
    pub(crate) order: NodeOrder,
    /// Keeps a mapped file alive for `ByteStore::Mapped` slices borrowed
    /// from it. Must not be dropped while `levels`/`tail` exist, which
    /// field order guarantees (fields drop in declaration order and this
    /// one comes last).
    pub(crate) _mmap: Option<Mmap>,
}

impl Trie {
    /// An empty, unbuilt dictionary. Every query returns "not found".
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a keyset, replacing any previous contents. Returns one
    /// key id per pushed key, in input order; duplicates map to the same
    /// id. A failed build leaves the dictionary empty.
    pub fn build(&mut self, keyset: &Keyset, options: BuildOptions) -> Result<Vec<u32>> {
        self.clear();
        options.validate()?;
        let built = builder::build(keyset, options)?;
        self.levels = built.levels;
        self.tail = built.tail;
        self.num_keys = built.num_keys;
        self.kind = options.trie;
        self.order = options.order;
        Ok(built.key_ids)
    }

    /// Reset to the empty state, releasing any memory mapping.
    pub fn clear(&mut self) {
        *self = Trie::new();
    }

    /// Unique keys in the dictionary.
    pub fn num_keys(&self) -> u32 {
        self.num_keys
    }

    /// Levels actually built (1..=16), 0 before any build.
    pub fn num_tries(&self) -> usize {
        self.levels.len()
    }

    /// Total nodes across all levels, each level's root included.
    pub fn num_nodes(&self) -> usize {
        self.levels.iter().map(|l| l.num_nodes()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Serialised size in bytes, header and footer included.
    pub fn io_size(&self) -> usize {
        io::serialized_len(self)
    }

    pub(crate) fn label_sorted(&self) -> bool {
        self.order == NodeOrder::Label
    }

    pub(crate) fn tail_mode(&self) -> TailMode {
        match &self.tail {
            None => TailMode::None,
            Some(tail) => tail.mode(),
        }
    }

    /// Structural statistics for tooling.
    pub fn stats(&self) -> Stats {
        Stats {
            num_keys: self.num_keys,
            num_tries: self.num_tries(),
            num_nodes: self.num_nodes(),
            io_size: self.io_size(),
            tail_mode: self.tail_mode(),
            tail_bytes: self.tail.as_ref().map_or(0, |t| t.buf_len()),
            levels: self
                .levels
                .iter()
                .map(|l| LevelStats {
                    nodes: l.num_nodes(),
                    links: l.num_links(),
                    terminals: l.num_terminals(),
                })
                .collect(),
        }
    }

    pub(crate) fn check_id(&self, id: u32) -> Result<()> {
        if id >= self.num_keys {
            return Err(Error::Param(format!(
                "key id {} out of range (num_keys = {})",
                id, self.num_keys
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_trie_is_empty() {
        let trie = Trie::new();
        assert_eq!(trie.num_keys(), 0);
        assert_eq!(trie.num_tries(), 0);
        assert_eq!(trie.num_nodes(), 0);
        assert!(trie.is_empty());
        assert_eq!(trie.lookup(b"anything"), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut keyset = Keyset::new();
        keyset.push(b"key");
        let mut trie = Trie::new();
        trie.build(&keyset, BuildOptions::default()).unwrap();
        assert_eq!(trie.num_keys(), 1);

        trie.clear();
        assert_eq!(trie.num_keys(), 0);
        assert_eq!(trie.num_tries(), 0);
        assert_eq!(trie.lookup(b"key"), None);
    }

    #[test]
    fn failed_build_leaves_empty() {
        let mut keyset = Keyset::new();
        keyset.push(b"key");
        let mut trie = Trie::new();
        trie.build(&keyset, BuildOptions::default()).unwrap();

        let bad = BuildOptions::default().num_tries(0);
        assert!(trie.build(&keyset, bad).is_err());
        assert!(trie.is_empty());
    }

    #[test]
    fn frozen_trie_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Trie>();
    }
}
