// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Suffix storage for the last trie level.
//!
//! Once recursion stops, every remaining link edge resolves into this
//! store instead of a deeper trie. Text mode is the compact default: one
//! buffer, tails stored forward, `'\0'` terminated. Binary mode drops the
//! terminator in favour of an end-boundary bit vector so tails may contain
//! zero bytes; the builder demotes text to binary automatically when it
//! has to.
//!
//! Tails are inserted in reverse-byte sorted order, which lines up shared
//! suffixes: a tail that is a suffix of the previously stored one reuses
//! its bytes and only the offset differs. Same idea as front compression
//! over a sorted vocabulary, applied from the other end.

use crate::bitvec::BitVector;
use crate::store::ByteStore;
use crate::types::TailMode;

/// Outcome of comparing a stored tail against a query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TailMatch {
    /// The whole tail matched; the new query position follows it.
    Matched(usize),
    /// The query ended while the tail was still matching. A failure for
    /// exact lookup, a subtree hit for predictive search.
    Exhausted,
    Failed,
}

#[derive(Debug, Default)]
pub(crate) struct TailStore {
    mode_binary: bool,
    buf: ByteStore,
    /// Binary mode only: bit set on the last byte of each tail.
    boundaries: BitVector,
}

impl TailStore {
    /// Build from the last level's tail strings. Returns the store plus
    /// one buffer offset per input tail, in input order.
    ///
    /// The requested text mode is demoted to binary when any tail
    /// contains `'\0'`.
    pub fn build(tails: &[Vec<u8>], requested: TailMode) -> (Self, Vec<u32>) {
        debug_assert!(tails.iter().all(|t| !t.is_empty()));
        let binary = match requested {
            TailMode::Binary => true,
            _ => tails.iter().any(|t| t.contains(&0)),
        };

        // Reverse-byte order clusters shared suffixes next to each other,
        // shorter before longer. Walking it backwards stores each longest
        // tail first so its suffixes can fold into it.
        let mut order: Vec<usize> = (0..tails.len()).collect();
        order.sort_by(|&a, &b| tails[a].iter().rev().cmp(tails[b].iter().rev()));

        let mut buf: Vec<u8> = Vec::new();
        let mut boundaries = BitVector::new();
        let mut offsets = vec![0u32; tails.len()];
        let mut last: &[u8] = &[];
        let mut last_end = 0usize;

        for &i in order.iter().rev() {
            let tail = &tails[i][..];
            if last.len() >= tail.len() && last.ends_with(tail) {
                offsets[i] = (last_end - tail.len()) as u32;
                continue;
            }
            offsets[i] = buf.len() as u32;
            buf.extend_from_slice(tail);
            last_end = buf.len();
            if binary {
                while boundaries.len() < buf.len() {
                    boundaries.push(boundaries.len() + 1 == buf.len());
                }
            } else {
                buf.push(0);
            }
            last = tail;
        }

        if binary {
            boundaries.freeze(false, true);
        }
        (
            Self {
                mode_binary: binary,
                buf: buf.into(),
                boundaries,
            },
            offsets,
        )
    }

    pub fn mode(&self) -> TailMode {
        if self.mode_binary {
            TailMode::Binary
        } else {
            TailMode::Text
        }
    }

    pub fn buf_len(&self) -> usize {
        self.buf.len()
    }

    /// Exclusive end of the tail starting at `offset`.
    fn end_of(&self, offset: usize) -> usize {
        if self.mode_binary {
            let rank = self.boundaries.rank1(offset);
            self.boundaries.select1(rank) + 1
        } else {
            let mut end = offset;
            while self.buf[end] != 0 {
                end += 1;
            }
            end
        }
    }

    pub fn len_at(&self, offset: usize) -> usize {
        self.end_of(offset) - offset
    }

    /// Compare the tail forward against `query[pos..]`.
    pub fn match_at(&self, offset: usize, query: &[u8], pos: usize) -> TailMatch {
        let len = self.len_at(offset);
        let avail = query.len() - pos;
        let common = self.buf[offset..offset + len]
            .iter()
            .zip(&query[pos..])
            .take_while(|(a, b)| a == b)
            .count();
        if common == len {
            TailMatch::Matched(pos + len)
        } else if common == avail {
            TailMatch::Exhausted
        } else {
            TailMatch::Failed
        }
    }

    /// Push the tail bytes in reverse order. Concatenated with the other
    /// reversed path pieces this reconstructs the key; the caller flips
    /// the assembled buffer once at the end.
    pub fn restore_into(&self, offset: usize, out: &mut Vec<u8>) {
        let end = self.end_of(offset);
        out.extend(self.buf[offset..end].iter().rev());
    }

    // ------------------------------------------------------------------
    // Serialisation plumbing (layout lives in trie/io.rs)
    // ------------------------------------------------------------------

    pub fn raw_buf(&self) -> &[u8] {
        &self.buf
    }

    pub fn boundary_bits(&self) -> &BitVector {
        &self.boundaries
    }

    pub fn from_parts(mode_binary: bool, buf: ByteStore, boundaries: BitVector) -> Self {
        Self {
            mode_binary,
            buf,
            boundaries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tails(strs: &[&[u8]]) -> Vec<Vec<u8>> {
        strs.iter().map(|s| s.to_vec()).collect()
    }

    #[test]
    fn text_round_trip() {
        let input = tails(&[b"fter", b"ar", b"ster"]);
        let (store, offsets) = TailStore::build(&input, TailMode::Text);
        assert_eq!(store.mode(), TailMode::Text);

        for (tail, &off) in input.iter().zip(&offsets) {
            assert_eq!(store.len_at(off as usize), tail.len());
            let mut out = Vec::new();
            store.restore_into(off as usize, &mut out);
            out.reverse();
            assert_eq!(&out, tail);
        }
    }

    #[test]
    fn suffix_folding_shares_bytes() {
        // "ter" is a suffix of "ster": the buffer stores "ster" once.
        let input = tails(&[b"ster", b"ter"]);
        let (store, offsets) = TailStore::build(&input, TailMode::Text);
        assert_eq!(store.buf_len(), b"ster\0".len());
        assert_eq!(offsets[1], offsets[0] + 1);
        assert_eq!(store.len_at(offsets[1] as usize), 3);
    }

    #[test]
    fn duplicate_tails_share_offsets() {
        let input = tails(&[b"ab", b"ab", b"cd"]);
        let (store, offsets) = TailStore::build(&input, TailMode::Text);
        assert_eq!(offsets[0], offsets[1]);
        assert_eq!(store.buf_len(), b"ab\0cd\0".len());
    }

    #[test]
    fn text_demotes_to_binary_on_zero_byte() {
        let input = tails(&[b"NP\0Trie"]);
        let (store, offsets) = TailStore::build(&input, TailMode::Text);
        assert_eq!(store.mode(), TailMode::Binary);
        let mut out = Vec::new();
        store.restore_into(offsets[0] as usize, &mut out);
        out.reverse();
        assert_eq!(out, b"NP\0Trie");
    }

    #[test]
    fn binary_boundaries() {
        let input = tails(&[b"ab", b"xyz"]);
        let (store, offsets) = TailStore::build(&input, TailMode::Binary);
        assert_eq!(store.mode(), TailMode::Binary);
        assert_eq!(store.buf_len(), 5);
        assert_eq!(store.len_at(offsets[0] as usize), 2);
        assert_eq!(store.len_at(offsets[1] as usize), 3);
    }

    #[test]
    fn forward_match_outcomes() {
        let input = tails(&[b"fter"]);
        let (store, offsets) = TailStore::build(&input, TailMode::Text);
        let off = offsets[0] as usize;

        assert_eq!(store.match_at(off, b"after", 1), TailMatch::Matched(5));
        assert_eq!(store.match_at(off, b"afterwards", 1), TailMatch::Matched(5));
        assert_eq!(store.match_at(off, b"aft", 1), TailMatch::Exhausted);
        assert_eq!(store.match_at(off, b"afxer", 1), TailMatch::Failed);
    }

}
