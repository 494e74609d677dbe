// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Recursive trie construction.
//!
//! The builder refines one level at a time. A level is built breadth-first
//! over sorted entry ranges: each queue item is a slice of entries sharing
//! a path, and processing it decides the node's terminal bit, groups the
//! remaining entries by their next byte, orders the sibling groups, and
//! emits one edge per group. An edge is either a plain byte or a *link*:
//! a multi-byte run handed off to the next level (or, at the last level,
//! to the tail store).
//!
//! Link strings are reversed before they become the next level's keys.
//! Shared suffixes of this level turn into shared prefixes of the next,
//! which is where the recursive compression comes from. Identical promoted
//! strings merge (weights summing), so two links may share one deeper
//! terminal.
//!
//! Edge selection rules, per sibling group at depth `d`:
//!
//! | Group            | Condition                           | Edge            |
//! |------------------|-------------------------------------|-----------------|
//! | single entry     | 1 byte left                         | plain byte      |
//! | single entry     | ≥ 2 bytes left, links allowed       | link, whole rest|
//! | single entry     | ≥ 2 bytes left, links forbidden     | byte chain      |
//! | multiple entries | patricia, links allowed, shared run ≥ 2 without an interior key end | link, shared run |
//! | multiple entries | otherwise                           | plain byte      |
//!
//! Links are allowed at a level unless it is the final one and no tail
//! store can exist (`TailMode::None`); in that case the last level
//! degrades to byte edges and the build always succeeds.

use std::collections::VecDeque;

use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::slice::ParallelSliceMut;

use crate::bitvec::BitVector;
use crate::error::{Error, Result};
use crate::keyset::Keyset;
use crate::louds::LoudsLevel;
use crate::tail::TailStore;
use crate::types::{BuildOptions, NodeOrder, TailMode, TrieKind};

pub(super) struct Built {
    pub levels: Vec<LoudsLevel>,
    pub tail: Option<TailStore>,
    pub num_keys: u32,
    pub key_ids: Vec<u32>,
}

/// One unique string fed into a level, with the output slots its id must
/// be written back to: `key_ids` positions at level 0, link indices of the
/// previous level afterwards.
struct WorkEntry {
    bytes: Vec<u8>,
    weight: f32,
    slots: Vec<u32>,
}

/// A link edge emitted while building a level. `string` is the edge run
/// in this level's orientation; its index in the pending list equals the
/// edge's link rank.
struct PendingLink {
    string: Vec<u8>,
    weight: f32,
}

/// Raw level vectors before freezing into a `LoudsLevel`.
#[derive(Default)]
struct RawLevel {
    louds: BitVector,
    terminals: BitVector,
    link_flags: BitVector,
    labels: Vec<u8>,
    links: Vec<u32>,
}

pub(super) fn build(keyset: &Keyset, options: BuildOptions) -> Result<Built> {
    if keyset.len() > u32::MAX as usize {
        return Err(Error::Size(format!(
            "{} input keys exceed u32 positions",
            keyset.len()
        )));
    }
    let (mut entries, key_ids_len) = normalize(keyset);
    let num_keys = entries.len();

    let mut key_ids = vec![0u32; key_ids_len];
    let mut raw_levels: Vec<RawLevel> = Vec::new();
    let mut tail = None;
    let mut total_nodes: u64 = 0;

    loop {
        let level_index = raw_levels.len();
        let links_allowed =
            level_index + 1 < options.num_tries || options.tail != TailMode::None;

        // Terminal ids of this level patch either the caller-visible
        // key_ids (level 0) or the previous level's link targets.
        let (raw, pending) = {
            let patch: &mut [u32] = if level_index == 0 {
                &mut key_ids
            } else {
                &mut raw_levels[level_index - 1].links
            };
            build_level(&entries, options, links_allowed, patch)
        };

        total_nodes += raw.louds.count_ones() as u64;
        if total_nodes > u32::MAX as u64 {
            return Err(Error::Size(format!(
                "{} nodes exceed the 2^32 node limit",
                total_nodes
            )));
        }
        debug!(
            level = level_index,
            nodes = raw.louds.count_ones(),
            links = pending.len(),
            "level built"
        );
        raw_levels.push(raw);

        if pending.is_empty() {
            break;
        }
        if raw_levels.len() == options.num_tries {
            // Remaining links resolve into the tail store.
            let strings: Vec<Vec<u8>> = pending.into_iter().map(|p| p.string).collect();
            let (store, offsets) = TailStore::build(&strings, options.tail);
            let last = raw_levels.len() - 1;
            for (slot, &offset) in offsets.iter().enumerate() {
                raw_levels[last].links[slot] = offset;
            }
            tail = Some(store);
            break;
        }
        entries = promote(pending);
    }

    let levels = raw_levels
        .into_iter()
        .map(|raw| {
            LoudsLevel::from_parts(
                raw.louds,
                raw.terminals,
                raw.link_flags,
                raw.labels.into(),
                raw.links,
            )
        })
        .collect();

    Ok(Built {
        levels,
        tail,
        num_keys: num_keys as u32,
        key_ids,
    })
}

/// Sort the keyset, collapse exact duplicates (summing weights), and map
/// every original position onto its representative's slot list.
fn normalize(keyset: &Keyset) -> (Vec<WorkEntry>, usize) {
    let mut order: Vec<u32> = (0..keyset.len() as u32).collect();

    #[cfg(feature = "parallel")]
    order.par_sort_unstable_by(|&a, &b| keyset.key(a as usize).cmp(keyset.key(b as usize)));
    #[cfg(not(feature = "parallel"))]
    order.sort_unstable_by(|&a, &b| keyset.key(a as usize).cmp(keyset.key(b as usize)));

    let mut entries: Vec<WorkEntry> = Vec::new();
    for &i in &order {
        let bytes = keyset.key(i as usize);
        let weight = keyset.weight(i as usize);
        match entries.last_mut() {
            Some(last) if last.bytes == bytes => {
                last.weight += weight;
                last.slots.push(i);
            }
            _ => entries.push(WorkEntry {
                bytes: bytes.to_vec(),
                weight,
                slots: vec![i],
            }),
        }
    }
    (entries, keyset.len())
}

/// Reverse pending link strings into the next level's entries, merging
/// identical strings.
fn promote(pending: Vec<PendingLink>) -> Vec<WorkEntry> {
    let mut next: Vec<WorkEntry> = pending
        .into_iter()
        .enumerate()
        .map(|(slot, p)| {
            let mut bytes = p.string;
            bytes.reverse();
            WorkEntry {
                bytes,
                weight: p.weight,
                slots: vec![slot as u32],
            }
        })
        .collect();
    next.sort_unstable_by(|a, b| a.bytes.cmp(&b.bytes));

    let mut merged: Vec<WorkEntry> = Vec::with_capacity(next.len());
    for entry in next {
        match merged.last_mut() {
            Some(last) if last.bytes == entry.bytes => {
                last.weight += entry.weight;
                last.slots.extend(entry.slots);
            }
            _ => merged.push(entry),
        }
    }
    merged
}

/// Build one level breadth-first. Writes each terminal's rank into the
/// patch slots of the entry that ends there.
fn build_level(
    entries: &[WorkEntry],
    options: BuildOptions,
    links_allowed: bool,
    patch: &mut [u32],
) -> (RawLevel, Vec<PendingLink>) {
    let mut raw = RawLevel::default();
    let mut pending: Vec<PendingLink> = Vec::new();

    // Implicit super-root: one edge into the root, then its terminator.
    raw.louds.push(true);
    raw.louds.push(false);

    // (lo, hi, depth): entries[lo..hi] share their first `depth` bytes.
    let mut queue: VecDeque<(usize, usize, usize)> = VecDeque::new();
    queue.push_back((0, entries.len(), 0));

    let mut next_terminal: u32 = 0;
    // Reused per node; holds (first_byte, lo, hi, weight) per group.
    let mut groups: Vec<(u8, usize, usize, f32)> = Vec::new();

    while let Some((mut lo, hi, depth)) = queue.pop_front() {
        // A key ending exactly here makes this node accepting. Sorting
        // puts it first in the range.
        if lo < hi && entries[lo].bytes.len() == depth {
            raw.terminals.push(true);
            for &slot in &entries[lo].slots {
                patch[slot as usize] = next_terminal;
            }
            next_terminal += 1;
            lo += 1;
        } else {
            raw.terminals.push(false);
        }

        // Group the remaining entries by their byte at `depth`.
        groups.clear();
        let mut glo = lo;
        while glo < hi {
            let byte = entries[glo].bytes[depth];
            let mut ghi = glo + 1;
            let mut weight = entries[glo].weight;
            while ghi < hi && entries[ghi].bytes[depth] == byte {
                weight += entries[ghi].weight;
                ghi += 1;
            }
            groups.push((byte, glo, ghi, weight));
            glo = ghi;
        }

        // Scanning sorted entries yields label order; weight order is a
        // stable re-sort, so ties stay label-ascending.
        if options.order == NodeOrder::Weight {
            groups.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));
        }

        for &(byte, glo, ghi, weight) in &groups {
            raw.louds.push(true);
            let single = ghi - glo == 1;
            let remainder = entries[glo].bytes.len() - depth;

            let link_run = if !links_allowed {
                0
            } else if single {
                if remainder >= 2 {
                    remainder
                } else {
                    0
                }
            } else if options.trie == TrieKind::Patricia {
                // Longest shared run without an interior key end. The
                // first entry is the shortest (prefixes sort first) and
                // lcp(first, last) bounds the whole sorted group.
                let run = common_prefix_from(
                    &entries[glo].bytes[depth..],
                    &entries[ghi - 1].bytes[depth..],
                );
                let run = run.min(remainder);
                if run >= 2 {
                    run
                } else {
                    0
                }
            } else {
                0
            };

            if link_run >= 2 {
                let string = entries[glo].bytes[depth..depth + link_run].to_vec();
                raw.labels.push(string[0]);
                raw.link_flags.push(true);
                raw.links.push(0); // patched by the next level or tail store
                pending.push(PendingLink { string, weight });
                queue.push_back((glo, ghi, depth + link_run));
            } else {
                raw.labels.push(byte);
                raw.link_flags.push(false);
                queue.push_back((glo, ghi, depth + 1));
            }
        }
        raw.louds.push(false);
    }

    (raw, pending)
}

fn common_prefix_from(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
