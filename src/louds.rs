// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! One level of the nested trie.
//!
//! The tree shape is a LOUDS sequence: a leading `"10"` for the implicit
//! super-root, then one 1-bit per child and a terminating 0-bit for every
//! node in BFS order. Node *v*'s incoming edge is the (v+1)-th 1-bit, so
//! `rank1` converts an edge position into a node id and `select1` goes the
//! other way. Children of one node are consecutive node ids, which is what
//! makes breadth-first subtree enumeration emit ids in ascending order.
//!
//! Per non-root node there is one label byte (the first byte of the edge
//! string, for link edges too, so child search never cares about the edge
//! kind) and one link flag. Link targets live in a plain `u32` array
//! indexed by link rank: the key id in the next level, or a tail-store
//! offset at the last level.
//!
//! Derivations used below, all relative to the `"10"` prefix:
//! - children of `v` span `(select0(v), select0(v+1))`, exclusive;
//! - the child reached through the 1-bit at `p` is node `rank1(p)`;
//! - the parent of `v` is `select1(v) - v - 1` (the zeros before its
//!   incoming edge, less the super-root terminator).

use crate::bitvec::BitVector;
use crate::store::ByteStore;

#[derive(Debug, Default)]
pub(crate) struct LoudsLevel {
    louds: BitVector,
    terminal_flags: BitVector,
    link_flags: BitVector,
    labels: ByteStore,
    links: Vec<u32>,
}

impl LoudsLevel {
    pub fn from_parts(
        mut louds: BitVector,
        mut terminal_flags: BitVector,
        mut link_flags: BitVector,
        labels: ByteStore,
        links: Vec<u32>,
    ) -> Self {
        louds.freeze(true, true);
        terminal_flags.freeze(false, true);
        link_flags.freeze(false, false);
        Self {
            louds,
            terminal_flags,
            link_flags,
            labels,
            links,
        }
    }

    /// Nodes in this level, root included.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.louds.count_ones()
    }

    /// Accepting nodes in this level.
    #[inline]
    pub fn num_terminals(&self) -> usize {
        self.terminal_flags.count_ones()
    }

    /// Link edges in this level.
    #[inline]
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Children of `v` as a contiguous node range.
    #[inline]
    pub fn children(&self, v: u32) -> std::ops::Range<u32> {
        let run_start = self.louds.select0(v as usize) + 1;
        let run_end = self.louds.select0(v as usize + 1);
        if run_start == run_end {
            return 0..0;
        }
        let first = self.louds.rank1(run_start) as u32;
        first..first + (run_end - run_start) as u32
    }

    /// Parent of a non-root node.
    #[inline]
    pub fn parent(&self, v: u32) -> u32 {
        debug_assert!(v != 0, "root has no parent");
        (self.louds.select1(v as usize) - v as usize - 1) as u32
    }

    /// Label byte on the edge into `v` (the first byte of the edge string
    /// when the edge is a link).
    #[inline]
    pub fn label(&self, v: u32) -> u8 {
        self.labels[v as usize - 1]
    }

    #[inline]
    pub fn is_link(&self, v: u32) -> bool {
        self.link_flags.get(v as usize - 1)
    }

    /// Rank of `v`'s incoming edge among link edges.
    #[inline]
    pub fn link_id(&self, v: u32) -> usize {
        debug_assert!(self.is_link(v));
        self.link_flags.rank1(v as usize - 1)
    }

    /// Link target: next-level key id, or tail-store offset at the last
    /// level.
    #[inline]
    pub fn link_target(&self, v: u32) -> u32 {
        self.links[self.link_id(v)]
    }

    #[inline]
    pub fn is_terminal(&self, v: u32) -> bool {
        self.terminal_flags.get(v as usize)
    }

    /// Terminal rank of an accepting node; this is the key id at level 0.
    #[inline]
    pub fn terminal_id(&self, v: u32) -> u32 {
        debug_assert!(self.is_terminal(v));
        self.terminal_flags.rank1(v as usize) as u32
    }

    /// Accepting node for a terminal rank.
    #[inline]
    pub fn node_of_terminal(&self, id: u32) -> u32 {
        self.terminal_flags.select1(id as usize) as u32
    }

    /// Find the child of `v` whose label equals `b`. Binary search when
    /// the dictionary was built label-ordered, linear scan otherwise.
    pub fn search_child(&self, v: u32, b: u8, label_sorted: bool) -> Option<u32> {
        let range = self.children(v);
        if range.is_empty() {
            return None;
        }
        let lo = range.start as usize - 1;
        let hi = range.end as usize - 1;
        let labels = &self.labels[lo..hi];
        if label_sorted {
            labels
                .binary_search(&b)
                .ok()
                .map(|j| range.start + j as u32)
        } else {
            labels
                .iter()
                .position(|&l| l == b)
                .map(|j| range.start + j as u32)
        }
    }

    // ------------------------------------------------------------------
    // Serialisation plumbing
    // ------------------------------------------------------------------

    pub fn louds_bits(&self) -> &BitVector {
        &self.louds
    }

    pub fn terminal_bits(&self) -> &BitVector {
        &self.terminal_flags
    }

    pub fn link_bits(&self) -> &BitVector {
        &self.link_flags
    }

    pub fn raw_labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn raw_links(&self) -> &[u32] {
        &self.links
    }
}
