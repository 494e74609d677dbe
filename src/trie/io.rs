// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Versioned binary serialisation and the mmap consumer.
//!
//! The format is little-endian, 4-byte aligned, and bracketed: a fixed
//! 16-byte header up front, a CRC32 footer with the reversed magic at the
//! end. If the footer is wrong, something got corrupted or truncated.
//! Don't trust the data.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ HEADER (16 bytes)                                        │
//! │   magic: [u8; 4] = "TALP"                                │
//! │   version: u8, flags: u8, reserved: [u8; 2]              │
//! │   num_tries: u32, num_keys: u32                          │
//! ├──────────────────────────────────────────────────────────┤
//! │ LEVEL × num_tries                                        │
//! │   louds, terminal_flags, link_flags (u32 bits + words)   │
//! │   labels (u32 len + bytes, zero-padded to 4)             │
//! │   links (u32 count + u32 targets)                        │
//! ├──────────────────────────────────────────────────────────┤
//! │ TAIL (when the header flags a tail section)              │
//! │   mode byte (1 text, 2 binary) + 3 padding bytes         │
//! │   buffer (u32 len + bytes, padded)                       │
//! │   boundary bits (binary mode only)                       │
//! ├──────────────────────────────────────────────────────────┤
//! │ FOOTER (8 bytes): crc32 + magic "PLAT"                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Rank/select acceleration never travels over the wire; it is rebuilt
//! after decoding, so no index structure is trusted from untrusted input.
//! A memory-mapped dictionary borrows its label and tail bytes from the
//! mapping in place and keeps the mapping alive inside the `Trie`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crc32fast::Hasher as Crc32Hasher;
use memmap2::Mmap;
use tracing::debug;

use crate::bitvec::BitVector;
use crate::error::{Error, Result};
use crate::louds::LoudsLevel;
use crate::store::ByteStore;
use crate::tail::TailStore;
use crate::trie::Trie;
use crate::types::{NodeOrder, TailMode, TrieKind};

/// Header magic: "TALP".
pub const MAGIC: [u8; 4] = *b"TALP";

/// Footer magic: "PLAT" (reversed, marks a complete file).
pub const FOOTER_MAGIC: [u8; 4] = *b"PLAT";

/// Current format version.
pub const VERSION: u8 = 1;

const HEADER_SIZE: usize = 16;
const FOOTER_SIZE: usize = 8;

const FLAG_PREFIX_TRIE: u8 = 0b0000_0001;
const FLAG_LABEL_ORDER: u8 = 0b0000_0010;
/// A tail section follows the levels; its mode byte says which kind.
const FLAG_HAS_TAIL: u8 = 0b0000_0100;
const FLAGS_KNOWN: u8 = FLAG_PREFIX_TRIE | FLAG_LABEL_ORDER | FLAG_HAS_TAIL;

const TAIL_MODE_TEXT: u8 = 1;
const TAIL_MODE_BINARY: u8 = 2;

impl Trie {
    /// Serialise into a writer. The dictionary must have been built.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        w.write_all(&bytes)?;
        Ok(())
    }

    /// Serialise into a byte vector with the CRC32 footer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.levels.is_empty() {
            return Err(Error::State("cannot serialise an unbuilt dictionary"));
        }
        let mut buf = Vec::with_capacity(serialized_len(self));

        buf.extend_from_slice(&MAGIC);
        buf.push(VERSION);
        buf.push(self.flags_byte());
        buf.extend_from_slice(&[0u8; 2]);
        buf.extend_from_slice(&(self.levels.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.num_keys.to_le_bytes());

        for level in &self.levels {
            write_bits(&mut buf, level.louds_bits());
            write_bits(&mut buf, level.terminal_bits());
            write_bits(&mut buf, level.link_bits());
            write_padded_bytes(&mut buf, level.raw_labels());
            buf.extend_from_slice(&(level.raw_links().len() as u32).to_le_bytes());
            for &target in level.raw_links() {
                buf.extend_from_slice(&target.to_le_bytes());
            }
        }

        if let Some(tail) = &self.tail {
            let mode = match tail.mode() {
                TailMode::Binary => TAIL_MODE_BINARY,
                _ => TAIL_MODE_TEXT,
            };
            buf.push(mode);
            buf.extend_from_slice(&[0u8; 3]);
            write_padded_bytes(&mut buf, tail.raw_buf());
            if tail.mode() == TailMode::Binary {
                write_bits(&mut buf, tail.boundary_bits());
            }
        }

        let crc = {
            let mut hasher = Crc32Hasher::new();
            hasher.update(&buf);
            hasher.finalize()
        };
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.extend_from_slice(&FOOTER_MAGIC);

        debug_assert_eq!(buf.len(), serialized_len(self));
        Ok(buf)
    }

    /// Write to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)?;
        file.sync_all()?;
        Ok(())
    }

    /// Deserialise from a reader, copying everything into owned storage.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Deserialise from bytes, copying into owned storage.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let trie = parse(bytes, false)?;
        debug!(
            num_keys = trie.num_keys,
            num_tries = trie.levels.len(),
            "dictionary loaded"
        );
        Ok(trie)
    }

    /// Load from a file, copying into owned storage.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Map a file and use its label and tail bytes in place. The mapping
    /// lives inside the returned dictionary, so the borrowed slices can
    /// never outlive it.
    pub fn mmap<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        // Safety: the mapping is private and read-only; it is stored in
        // the trie and dropped after every field that borrows from it.
        let map = unsafe { Mmap::map(&file)? };
        let bytes: &'static [u8] =
            unsafe { std::slice::from_raw_parts(map.as_ptr(), map.len()) };
        let mut trie = parse(bytes, true)?;
        debug!(
            num_keys = trie.num_keys,
            num_tries = trie.levels.len(),
            bytes = map.len(),
            "dictionary mapped"
        );
        trie._mmap = Some(map);
        Ok(trie)
    }

    fn flags_byte(&self) -> u8 {
        let mut flags = 0u8;
        if self.kind == TrieKind::Prefix {
            flags |= FLAG_PREFIX_TRIE;
        }
        if self.order == NodeOrder::Label {
            flags |= FLAG_LABEL_ORDER;
        }
        if self.tail.is_some() {
            flags |= FLAG_HAS_TAIL;
        }
        flags
    }
}

/// Exact serialised size of a built dictionary; 0 for an empty one.
pub(super) fn serialized_len(trie: &Trie) -> usize {
    if trie.levels.is_empty() {
        return 0;
    }
    let mut size = HEADER_SIZE;
    for level in &trie.levels {
        size += bits_len(level.louds_bits());
        size += bits_len(level.terminal_bits());
        size += bits_len(level.link_bits());
        size += padded_bytes_len(level.raw_labels().len());
        size += 4 + level.raw_links().len() * 4;
    }
    if let Some(tail) = &trie.tail {
        size += 4; // mode byte + padding
        size += padded_bytes_len(tail.raw_buf().len());
        if tail.mode() == TailMode::Binary {
            size += bits_len(tail.boundary_bits());
        }
    }
    size + FOOTER_SIZE
}

fn bits_len(bits: &BitVector) -> usize {
    4 + bits.len().div_ceil(64) * 8
}

fn padded_bytes_len(len: usize) -> usize {
    4 + len.next_multiple_of(4)
}

fn write_bits(buf: &mut Vec<u8>, bits: &BitVector) {
    buf.extend_from_slice(&(bits.len() as u32).to_le_bytes());
    for word in bits.words() {
        buf.extend_from_slice(&word.to_le_bytes());
    }
}

fn write_padded_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
    for _ in bytes.len()..bytes.len().next_multiple_of(4) {
        buf.push(0);
    }
}

// ----------------------------------------------------------------------
// Reading
// ----------------------------------------------------------------------

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    /// When set, byte runs are handed out as `'static` slices borrowed
    /// from a mapping the caller keeps alive.
    borrow: bool,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::Format(format!("truncated {} section", what)))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn align4(&mut self, what: &str) -> Result<()> {
        let rem = self.pos % 4;
        if rem != 0 {
            self.take(4 - rem, what)?;
        }
        Ok(())
    }

    fn bit_vector(&mut self, what: &str) -> Result<BitVector> {
        let nbits = self.u32(what)? as usize;
        let raw = self.take(nbits.div_ceil(64) * 8, what)?;
        let words = raw
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();
        let bits = BitVector::from_words(words, nbits)?;
        bits.validate()?;
        Ok(bits)
    }

    fn byte_store(&mut self, what: &str) -> Result<ByteStore> {
        let len = self.u32(what)? as usize;
        let slice = self.take(len, what)?;
        self.align4(what)?;
        if self.borrow {
            // Safety: `borrow` is only set by `mmap`, which pins the
            // backing mapping inside the returned trie.
            let pinned: &'static [u8] =
                unsafe { std::slice::from_raw_parts(slice.as_ptr(), slice.len()) };
            Ok(ByteStore::Mapped(pinned))
        } else {
            Ok(ByteStore::Owned(slice.to_vec()))
        }
    }
}

fn parse(bytes: &[u8], borrow: bool) -> Result<Trie> {
    if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(Error::Format(format!(
            "file too small: {} bytes (minimum {})",
            bytes.len(),
            HEADER_SIZE + FOOTER_SIZE
        )));
    }

    // Footer first: a wrong tail means truncation, and the CRC guards
    // everything else we are about to trust.
    let footer_start = bytes.len() - FOOTER_SIZE;
    if bytes[footer_start + 4..] != FOOTER_MAGIC {
        return Err(Error::Format("bad footer magic (truncated file?)".to_string()));
    }
    let stored_crc = u32::from_le_bytes([
        bytes[footer_start],
        bytes[footer_start + 1],
        bytes[footer_start + 2],
        bytes[footer_start + 3],
    ]);
    let computed_crc = {
        let mut hasher = Crc32Hasher::new();
        hasher.update(&bytes[..footer_start]);
        hasher.finalize()
    };
    if stored_crc != computed_crc {
        return Err(Error::Format(format!(
            "CRC32 mismatch: stored {:#010x}, computed {:#010x}",
            stored_crc, computed_crc
        )));
    }

    if bytes[..4] != MAGIC {
        return Err(Error::Format(format!(
            "bad magic: expected TALP, got {:?}",
            &bytes[..4]
        )));
    }
    let version = bytes[4];
    if version != VERSION {
        return Err(Error::Format(format!(
            "unsupported version {} (expected {})",
            version, VERSION
        )));
    }
    let flags = bytes[5];
    if flags & !FLAGS_KNOWN != 0 {
        return Err(Error::Format(format!(
            "unknown flag bits {:#04x}",
            flags & !FLAGS_KNOWN
        )));
    }
    let kind = if flags & FLAG_PREFIX_TRIE != 0 {
        TrieKind::Prefix
    } else {
        TrieKind::Patricia
    };
    let order = if flags & FLAG_LABEL_ORDER != 0 {
        NodeOrder::Label
    } else {
        NodeOrder::Weight
    };
    let has_tail = flags & FLAG_HAS_TAIL != 0;

    let mut cursor = Cursor {
        bytes: &bytes[..footer_start],
        pos: 6,
        borrow,
    };
    cursor.take(2, "header")?; // reserved
    let num_tries = cursor.u32("header")? as usize;
    let num_keys = cursor.u32("header")?;
    if num_tries == 0 || num_tries > crate::types::MAX_NUM_TRIES {
        return Err(Error::Format(format!("invalid num_tries {}", num_tries)));
    }

    let mut levels = Vec::with_capacity(num_tries);
    for i in 0..num_tries {
        let louds = cursor.bit_vector("louds")?;
        let terminals = cursor.bit_vector("terminal flags")?;
        let link_flags = cursor.bit_vector("link flags")?;
        let labels = cursor.byte_store("labels")?;
        let link_count = cursor.u32("links")? as usize;
        let mut links = Vec::with_capacity(link_count.min(1 << 20));
        for _ in 0..link_count {
            links.push(cursor.u32("links")?);
        }

        let num_nodes = louds.count_ones();
        // LOUDS shape: the "10" super-root prefix, then one 1-bit per
        // node edge and one terminating 0-bit per node. Navigation
        // assumes exactly this, so reject anything else up front.
        if num_nodes == 0
            || louds.len() != 2 * num_nodes + 1
            || !louds.get(0)
            || louds.get(1)
        {
            return Err(Error::Format(format!(
                "level {}: malformed louds sequence ({} bits, {} ones)",
                i,
                louds.len(),
                num_nodes
            )));
        }
        if labels.as_slice().len() != num_nodes - 1 {
            return Err(Error::Format(format!(
                "level {}: {} labels for {} nodes",
                i,
                labels.as_slice().len(),
                num_nodes
            )));
        }
        if link_flags.len() != num_nodes - 1 || terminals.len() != num_nodes {
            return Err(Error::Format(format!(
                "level {}: flag vectors disagree with {} nodes",
                i, num_nodes
            )));
        }
        if link_flags.count_ones() != link_count {
            return Err(Error::Format(format!(
                "level {}: {} link targets for {} link edges",
                i,
                link_count,
                link_flags.count_ones()
            )));
        }

        levels.push(LoudsLevel::from_parts(
            louds, terminals, link_flags, labels, links,
        ));
    }

    let tail = if !has_tail {
        None
    } else {
        let mode_bytes = cursor.take(4, "tail mode")?;
        let binary = match mode_bytes[0] {
            TAIL_MODE_TEXT => false,
            TAIL_MODE_BINARY => true,
            mode => {
                return Err(Error::Format(format!("unknown tail mode {}", mode)));
            }
        };
        let buf = cursor.byte_store("tail buffer")?;
        let boundaries = if binary {
            let mut bits = cursor.bit_vector("tail boundaries")?;
            // Every byte must belong to a tail that ends somewhere, so
            // the final byte always carries a boundary.
            if bits.len() != buf.as_slice().len()
                || (!bits.is_empty() && !bits.get(bits.len() - 1))
            {
                return Err(Error::Format(format!(
                    "tail boundaries cover {} bytes of a {} byte buffer",
                    bits.len(),
                    buf.as_slice().len()
                )));
            }
            bits.freeze(false, true);
            bits
        } else {
            // Text tails scan to their terminator; an unterminated
            // buffer would run off the end.
            if buf.as_slice().last().is_some_and(|&b| b != 0) {
                return Err(Error::Format(
                    "text tail buffer is not zero-terminated".to_string(),
                ));
            }
            BitVector::new()
        };
        Some(TailStore::from_parts(binary, buf, boundaries))
    };

    if cursor.pos != cursor.bytes.len() {
        return Err(Error::Format(format!(
            "{} trailing bytes after the tail section",
            cursor.bytes.len() - cursor.pos
        )));
    }

    validate_structure(&levels, tail.as_ref(), num_keys)?;

    Ok(Trie {
        levels,
        tail,
        num_keys,
        kind,
        order,
        _mmap: None,
    })
}

/// Cross-section validation: terminal counts, link targets, and tail
/// references must all be resolvable before the trie answers queries.
fn validate_structure(
    levels: &[LoudsLevel],
    tail: Option<&TailStore>,
    num_keys: u32,
) -> Result<()> {
    if levels[0].num_terminals() != num_keys as usize {
        return Err(Error::Format(format!(
            "header claims {} keys, level 0 holds {} terminals",
            num_keys,
            levels[0].num_terminals()
        )));
    }
    for (i, level) in levels.iter().enumerate() {
        let links = level.raw_links();
        if links.is_empty() {
            continue;
        }
        if i + 1 < levels.len() {
            let deeper_terminals = levels[i + 1].num_terminals() as u32;
            if let Some(&bad) = links.iter().find(|&&t| t >= deeper_terminals) {
                return Err(Error::Format(format!(
                    "level {}: link target {} exceeds {} deeper terminals",
                    i, bad, deeper_terminals
                )));
            }
        } else {
            let tail = tail.ok_or_else(|| {
                Error::Format(format!(
                    "level {}: link edges present but no tail section",
                    i
                ))
            })?;
            let buf_len = tail.buf_len() as u32;
            if let Some(&bad) = links.iter().find(|&&t| t >= buf_len) {
                return Err(Error::Format(format!(
                    "level {}: tail offset {} exceeds buffer of {} bytes",
                    i, bad, buf_len
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::Keyset;
    use crate::types::BuildOptions;

    fn sample_trie() -> Trie {
        let mut keyset = Keyset::new();
        for key in [&b"after"[..], b"bar", b"car", b"caster"] {
            keyset.push(key);
        }
        let mut trie = Trie::new();
        trie.build(&keyset, BuildOptions::default().num_tries(2))
            .unwrap();
        trie
    }

    #[test]
    fn byte_round_trip() {
        let trie = sample_trie();
        let bytes = trie.to_bytes().unwrap();
        assert_eq!(bytes.len(), trie.io_size());

        let loaded = Trie::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.num_keys(), trie.num_keys());
        assert_eq!(loaded.num_tries(), trie.num_tries());
        assert_eq!(loaded.num_nodes(), trie.num_nodes());
        assert_eq!(loaded.lookup(b"caster"), trie.lookup(b"caster"));
        assert_eq!(loaded.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn unbuilt_dictionary_refuses_to_serialise() {
        let trie = Trie::new();
        assert!(matches!(trie.to_bytes(), Err(Error::State(_))));
    }

    #[test]
    fn crc_detects_corruption() {
        let trie = sample_trie();
        let mut bytes = trie.to_bytes().unwrap();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        let err = Trie::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("CRC32"));
    }

    #[test]
    fn truncation_detected() {
        let trie = sample_trie();
        let bytes = trie.to_bytes().unwrap();
        let err = Trie::from_bytes(&bytes[..bytes.len() - 5]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    /// Recompute the footer CRC after a deliberate mutation, so the test
    /// exercises the targeted check instead of the checksum.
    fn refresh_crc(bytes: &mut [u8]) {
        let footer_start = bytes.len() - FOOTER_SIZE;
        let crc = {
            let mut hasher = Crc32Hasher::new();
            hasher.update(&bytes[..footer_start]);
            hasher.finalize()
        };
        bytes[footer_start..footer_start + 4].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn bad_magic_rejected() {
        let trie = sample_trie();
        let mut bytes = trie.to_bytes().unwrap();
        bytes[..4].copy_from_slice(b"NOPE");
        refresh_crc(&mut bytes);

        let err = Trie::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn wrong_version_rejected() {
        let trie = sample_trie();
        let mut bytes = trie.to_bytes().unwrap();
        bytes[4] = VERSION + 1;
        refresh_crc(&mut bytes);

        let err = Trie::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn unknown_flag_bits_rejected() {
        let trie = sample_trie();
        let mut bytes = trie.to_bytes().unwrap();
        bytes[5] |= 0x80;
        refresh_crc(&mut bytes);

        let err = Trie::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("flag bits"));
    }

    #[test]
    fn unknown_tail_mode_rejected() {
        let trie = sample_trie();
        let mut bytes = trie.to_bytes().unwrap();

        // The text tail section sits last before the footer: mode byte
        // plus padding, then the length-prefixed buffer padded to 4.
        let tail_bytes = trie.stats().tail_bytes;
        let mode_pos = bytes.len() - FOOTER_SIZE - (4 + tail_bytes.next_multiple_of(4)) - 4;
        assert_eq!(bytes[mode_pos], 1);
        bytes[mode_pos] = 9;
        refresh_crc(&mut bytes);

        let err = Trie::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("tail mode"));
    }
}
