// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Packed bit vector with constant-time rank and select.
//!
//! The acceleration layout is the classic two-level scheme: one absolute
//! `u32` prefix count per 256-bit block for rank, plus a sample table for
//! select that records the word containing every 512th matching bit. A
//! rank query is one table read and at most four popcounts; a select query
//! jumps to the sampled word and scans forward. Space overhead stays under
//! 10% of the raw bits.
//!
//! Vectors are append-only while building and frozen by `freeze()`, which
//! constructs the indices. Only the raw words travel over the wire; the
//! indices are rebuilt on load so no acceleration structure is ever
//! trusted from untrusted input.
//!
//! # References
//!
//! - **LOUDS and rank/select**: G. Jacobson, "Space-efficient static trees
//!   and graphs", FOCS 1989.
//! - **Practical layouts**: D. Okanohara, K. Sadakane, "Practical
//!   entropy-compressed rank/select dictionary", ALENEX 2007.

use crate::error::{Error, Result};

/// Bits per rank block (4 words).
const RANK_BLOCK_BITS: usize = 256;

/// Matching bits between consecutive select samples.
const SELECT_SAMPLE_RATE: usize = 512;

/// Packed bits plus rank/select acceleration.
#[derive(Debug, Clone, Default)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
    num_ones: usize,
    /// Absolute count of ones before each 256-bit block.
    rank_blocks: Vec<u32>,
    /// Word index containing every 512th 1-bit (when enabled).
    select1_samples: Vec<u32>,
    /// Word index containing every 512th 0-bit (when enabled).
    select0_samples: Vec<u32>,
}

impl BitVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bit. Only legal before `freeze`.
    #[inline]
    pub fn push(&mut self, bit: bool) {
        let word = self.len / 64;
        if word == self.words.len() {
            self.words.push(0);
        }
        if bit {
            self.words[word] |= 1u64 << (self.len % 64);
            self.num_ones += 1;
        }
        self.len += 1;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn count_ones(&self) -> usize {
        self.num_ones
    }

    /// Read bit `i`. Out-of-range access is a caller bug.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "bit index {} out of range {}", i, self.len);
        self.words[i / 64] >> (i % 64) & 1 == 1
    }

    /// Build the rank index and the requested select indices. Idempotent
    /// in effect; call once after the last `push`.
    pub fn freeze(&mut self, enable_select0: bool, enable_select1: bool) {
        let words_per_block = RANK_BLOCK_BITS / 64;
        let num_blocks = self.words.len().div_ceil(words_per_block);

        self.rank_blocks = Vec::with_capacity(num_blocks + 1);
        self.select1_samples.clear();
        self.select0_samples.clear();

        let mut ones: usize = 0;
        let mut zeros: usize = 0;
        for (w, &word) in self.words.iter().enumerate() {
            if w % words_per_block == 0 {
                self.rank_blocks.push(ones as u32);
            }
            // Bits past `len` in the final word are zero by construction,
            // but they must not count as zeros.
            let valid = (self.len - w * 64).min(64);
            let pop = (word & mask_low(valid)).count_ones() as usize;
            let zpop = valid - pop;

            // A word holds at most 64 matching bits, so at most one sample
            // (every 512th bit) can land inside it. The sample for bit k
            // (k ≡ 0 mod 512) lands here iff ones <= k < ones + pop.
            if enable_select1 && pop > 0 && ones.next_multiple_of(SELECT_SAMPLE_RATE) < ones + pop {
                self.select1_samples.push(w as u32);
            }
            if enable_select0
                && zpop > 0
                && zeros.next_multiple_of(SELECT_SAMPLE_RATE) < zeros + zpop
            {
                self.select0_samples.push(w as u32);
            }

            ones += pop;
            zeros += zpop;
        }
        self.rank_blocks.push(ones as u32);
        debug_assert_eq!(ones, self.num_ones);
        self.num_ones = ones;
    }

    /// Number of 1-bits in `[0, i)`. `i` may equal `len`.
    #[inline]
    pub fn rank1(&self, i: usize) -> usize {
        assert!(i <= self.len, "rank index {} out of range {}", i, self.len);
        let block = i / RANK_BLOCK_BITS;
        let mut count = self.rank_blocks[block] as usize;
        let first_word = block * (RANK_BLOCK_BITS / 64);
        let last_word = i / 64;
        for w in first_word..last_word {
            count += self.words[w].count_ones() as usize;
        }
        let rem = i % 64;
        if rem > 0 {
            count += (self.words[last_word] & ((1u64 << rem) - 1)).count_ones() as usize;
        }
        count
    }

    /// Number of 0-bits in `[0, i)`.
    #[inline]
    pub fn rank0(&self, i: usize) -> usize {
        i - self.rank1(i)
    }

    /// Position of the (k+1)-th 1-bit (0-based k).
    pub fn select1(&self, k: usize) -> usize {
        assert!(
            k < self.num_ones,
            "select1 rank {} out of range {}",
            k,
            self.num_ones
        );
        let mut w = self
            .select1_samples
            .get(k / SELECT_SAMPLE_RATE)
            .map(|&w| w as usize)
            .unwrap_or(0);
        // Ones before the sampled word, recovered from the rank blocks.
        let words_per_block = RANK_BLOCK_BITS / 64;
        let block = w / words_per_block;
        let mut count = self.rank_blocks[block] as usize;
        for word in &self.words[block * words_per_block..w] {
            count += word.count_ones() as usize;
        }
        loop {
            let pop = self.words[w].count_ones() as usize;
            if count + pop > k {
                return w * 64 + select_in_word(self.words[w], (k - count) as u32) as usize;
            }
            count += pop;
            w += 1;
        }
    }

    /// Position of the (k+1)-th 0-bit (0-based k).
    pub fn select0(&self, k: usize) -> usize {
        let num_zeros = self.len - self.num_ones;
        assert!(
            k < num_zeros,
            "select0 rank {} out of range {}",
            k,
            num_zeros
        );
        let mut w = self
            .select0_samples
            .get(k / SELECT_SAMPLE_RATE)
            .map(|&w| w as usize)
            .unwrap_or(0);
        let words_per_block = RANK_BLOCK_BITS / 64;
        let block = w / words_per_block;
        let mut ones = self.rank_blocks[block] as usize;
        for word in &self.words[block * words_per_block..w] {
            ones += word.count_ones() as usize;
        }
        let mut zeros = w * 64 - ones;
        loop {
            let valid = (self.len - w * 64).min(64);
            let inv = !self.words[w] & mask_low(valid);
            let zpop = inv.count_ones() as usize;
            if zeros + zpop > k {
                return w * 64 + select_in_word(inv, (k - zeros) as u32) as usize;
            }
            zeros += zpop;
            w += 1;
        }
    }

    /// Check internal consistency after decoding untrusted words. Returns
    /// `Error::Range` when the rank index disagrees with the raw bits.
    pub fn validate(&self) -> Result<()> {
        let mut pop = 0usize;
        for (w, &word) in self.words.iter().enumerate() {
            let valid = (self.len.saturating_sub(w * 64)).min(64);
            if valid < 64 && word & !mask_low(valid) != 0 {
                return Err(Error::Range(format!(
                    "set bits past length {} in word {}",
                    self.len, w
                )));
            }
            pop += (word & mask_low(valid)).count_ones() as usize;
        }
        if pop != self.num_ones {
            return Err(Error::Range(format!(
                "rank index claims {} ones, words hold {}",
                self.num_ones, pop
            )));
        }
        Ok(())
    }

    /// Raw words for serialisation.
    pub(crate) fn words(&self) -> &[u64] {
        &self.words
    }

    /// Rebuild from decoded words. `freeze` must be called by the loader
    /// with the same select options the structure was built with.
    pub(crate) fn from_words(words: Vec<u64>, len: usize) -> Result<Self> {
        if words.len() != len.div_ceil(64) {
            return Err(Error::Format(format!(
                "bit vector length {} needs {} words, got {}",
                len,
                len.div_ceil(64),
                words.len()
            )));
        }
        let mut bv = Self {
            words,
            len,
            ..Self::default()
        };
        // Count so validate() can run before freeze().
        bv.num_ones = bv
            .words
            .iter()
            .enumerate()
            .map(|(w, &word)| {
                let valid = (len.saturating_sub(w * 64)).min(64);
                (word & mask_low(valid)).count_ones() as usize
            })
            .sum();
        Ok(bv)
    }
}

/// All-ones mask of the low `n` bits (`n <= 64`).
#[inline]
fn mask_low(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Position of the (k+1)-th set bit within a word. `k < popcount(w)`.
#[inline]
fn select_in_word(mut w: u64, mut k: u32) -> u32 {
    let mut base = 0u32;
    loop {
        let byte_pop = (w & 0xFF).count_ones();
        if k < byte_pop {
            break;
        }
        k -= byte_pop;
        w >>= 8;
        base += 8;
    }
    let mut byte = w & 0xFF;
    loop {
        let bit = byte.trailing_zeros();
        if k == 0 {
            return base + bit;
        }
        byte &= byte - 1;
        k -= 1;
    }
}
