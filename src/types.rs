// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Build configuration and public constants.
//!
//! A dictionary is shaped by four choices: how many nested tries it may
//! use, whether edges carry one byte or compressed runs (prefix vs
//! patricia), where terminal suffixes go (no tails, text tails, binary
//! tails), and how siblings are ordered (label order enables binary-search
//! descent, weight order puts hot children first).
//!
//! The choices pack into a single integer for the wire-facing surface
//! (`BuildOptions::from_bits` / `bits`); the typed API is what the rest of
//! the crate uses.
//!
//! | Bits        | Meaning                                   |
//! |-------------|-------------------------------------------|
//! | `0x0000FF`  | number of tries, 1..=16 (0 = default 3)   |
//! | `0x000100`  | `PREFIX_TRIE`                             |
//! | `0x000200`  | `PATRICIA_TRIE` (default)                 |
//! | `0x001000`  | `WITHOUT_TAIL`                            |
//! | `0x002000`  | `TEXT_TAIL` (default)                     |
//! | `0x004000`  | `BINARY_TAIL`                             |
//! | `0x010000`  | `LABEL_ORDER`                             |
//! | `0x020000`  | `WEIGHT_ORDER` (default)                  |

use serde::Serialize;

use crate::error::{Error, Result};

/// Sentinel id meaning "no such key". Valid ids are `0..num_keys`.
///
/// The Rust API returns `Option<u32>`; this constant exists for the wire
/// format, CLI output, and parity with other implementations.
pub const NOT_FOUND: u32 = u32::MAX;

/// Upper bound on the number of nested tries.
pub const MAX_NUM_TRIES: usize = 16;

/// Default number of nested tries when the flag field says 0.
pub const DEFAULT_NUM_TRIES: usize = 3;

/// Flag bit: one byte per edge, no interior compression.
pub const PREFIX_TRIE: u32 = 0x0100;
/// Flag bit: compress single-child chains into link edges (default).
pub const PATRICIA_TRIE: u32 = 0x0200;
/// Flag bit: no tail store; the last level expands to byte edges.
pub const WITHOUT_TAIL: u32 = 0x1000;
/// Flag bit: `'\0'`-terminated text tails (default).
pub const TEXT_TAIL: u32 = 0x2000;
/// Flag bit: binary tails with a boundary bit vector.
pub const BINARY_TAIL: u32 = 0x4000;
/// Flag bit: siblings ordered by label, enabling binary-search descent.
pub const LABEL_ORDER: u32 = 0x1_0000;
/// Flag bit: siblings ordered by aggregated weight (default).
pub const WEIGHT_ORDER: u32 = 0x2_0000;

const NUM_TRIES_MASK: u32 = 0xFF;
const ALL_KNOWN: u32 = NUM_TRIES_MASK
    | PREFIX_TRIE
    | PATRICIA_TRIE
    | WITHOUT_TAIL
    | TEXT_TAIL
    | BINARY_TAIL
    | LABEL_ORDER
    | WEIGHT_ORDER;

/// Edge shape of the trie.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TrieKind {
    /// Every edge carries exactly one byte.
    Prefix,
    /// Single-child chains compress into multi-byte link edges.
    #[default]
    Patricia,
}

/// Where terminal suffixes are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TailMode {
    /// No tail store; recursion expands everything into trie levels.
    None,
    /// One buffer of `'\0'`-terminated tails. Demoted to `Binary`
    /// automatically when a tail contains a zero byte.
    Text,
    /// Buffer plus end-boundary bit vector; zero bytes allowed.
    Binary,
}

/// Sibling ordering within a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum NodeOrder {
    /// Ascending label; descent uses binary search.
    Label,
    /// Descending aggregated subtree weight, label as tie-break; descent
    /// scans linearly but hot children come first.
    #[default]
    Weight,
}

/// Typed build configuration. Constructed fluently or parsed from the
/// packed flag integer.
///
/// ```
/// use talpa::{BuildOptions, TrieKind, TailMode, NodeOrder};
///
/// let opts = BuildOptions::new()
///     .num_tries(2)
///     .trie(TrieKind::Prefix)
///     .tail(TailMode::Text)
///     .order(NodeOrder::Label);
/// assert_eq!(BuildOptions::from_bits(opts.bits()).unwrap(), opts);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
    pub num_tries: usize,
    pub trie: TrieKind,
    pub tail: TailMode,
    pub order: NodeOrder,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            num_tries: DEFAULT_NUM_TRIES,
            trie: TrieKind::Patricia,
            tail: TailMode::Text,
            order: NodeOrder::Weight,
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_tries(mut self, n: usize) -> Self {
        self.num_tries = n;
        self
    }

    pub fn trie(mut self, kind: TrieKind) -> Self {
        self.trie = kind;
        self
    }

    pub fn tail(mut self, mode: TailMode) -> Self {
        self.tail = mode;
        self
    }

    pub fn order(mut self, order: NodeOrder) -> Self {
        self.order = order;
        self
    }

    /// Parse the packed flag integer. Unknown bits, conflicting
    /// selections, and out-of-range trie counts are rejected.
    pub fn from_bits(bits: u32) -> Result<Self> {
        if bits & !ALL_KNOWN != 0 {
            return Err(Error::Param(format!(
                "unknown flag bits: {:#x}",
                bits & !ALL_KNOWN
            )));
        }

        let n = (bits & NUM_TRIES_MASK) as usize;
        let num_tries = if n == 0 { DEFAULT_NUM_TRIES } else { n };
        if num_tries > MAX_NUM_TRIES {
            return Err(Error::Param(format!(
                "num_tries must be 1..={}, got {}",
                MAX_NUM_TRIES, num_tries
            )));
        }

        let trie = match (bits & PREFIX_TRIE != 0, bits & PATRICIA_TRIE != 0) {
            (false, _) => TrieKind::Patricia,
            (true, false) => TrieKind::Prefix,
            (true, true) => {
                return Err(Error::Param(
                    "PREFIX_TRIE and PATRICIA_TRIE are mutually exclusive".to_string(),
                ))
            }
        };

        let tail_bits = bits & (WITHOUT_TAIL | TEXT_TAIL | BINARY_TAIL);
        let tail = match tail_bits {
            0 | TEXT_TAIL => TailMode::Text,
            WITHOUT_TAIL => TailMode::None,
            BINARY_TAIL => TailMode::Binary,
            _ => {
                return Err(Error::Param(format!(
                    "conflicting tail mode bits: {:#x}",
                    tail_bits
                )))
            }
        };

        let order_bits = bits & (LABEL_ORDER | WEIGHT_ORDER);
        let order = match order_bits {
            0 | WEIGHT_ORDER => NodeOrder::Weight,
            LABEL_ORDER => NodeOrder::Label,
            _ => {
                return Err(Error::Param(
                    "LABEL_ORDER and WEIGHT_ORDER are mutually exclusive".to_string(),
                ))
            }
        };

        Ok(Self {
            num_tries,
            trie,
            tail,
            order,
        })
    }

    /// Pack back into the flag integer.
    pub fn bits(&self) -> u32 {
        let mut bits = self.num_tries as u32;
        bits |= match self.trie {
            TrieKind::Prefix => PREFIX_TRIE,
            TrieKind::Patricia => PATRICIA_TRIE,
        };
        bits |= match self.tail {
            TailMode::None => WITHOUT_TAIL,
            TailMode::Text => TEXT_TAIL,
            TailMode::Binary => BINARY_TAIL,
        };
        bits |= match self.order {
            NodeOrder::Label => LABEL_ORDER,
            NodeOrder::Weight => WEIGHT_ORDER,
        };
        bits
    }

    /// Validate a typed configuration (the fluent API does not check).
    pub fn validate(&self) -> Result<()> {
        if self.num_tries == 0 || self.num_tries > MAX_NUM_TRIES {
            return Err(Error::Param(format!(
                "num_tries must be 1..={}, got {}",
                MAX_NUM_TRIES, self.num_tries
            )));
        }
        Ok(())
    }
}

/// Per-level statistics.
#[derive(Debug, Clone, Serialize)]
pub struct LevelStats {
    pub nodes: usize,
    pub links: usize,
    pub terminals: usize,
}

/// Dictionary statistics, serialisable for tooling.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub num_keys: u32,
    pub num_tries: usize,
    pub num_nodes: usize,
    pub io_size: usize,
    pub tail_mode: TailMode,
    pub tail_bytes: usize,
    pub levels: Vec<LevelStats>,
}
