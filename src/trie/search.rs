//! Query engine over the frozen level stack.
//!
//! Every query is a walk over level 0; deeper levels and the tail store
//! only ever supply edge strings. Descending a plain edge consumes one
//! query byte. Descending a link edge consumes the whole edge run, which
//! is matched against the query either directly (tail store, forward
//! bytes) or by reconstructing it from the next level (the promoted key
//! read back reversed).
//!
//! Reverse lookup walks rootward. Walking up emits the path reversed, so
//! each recursion level reverses its freshly appended slice once; the
//! orientation flips introduced by reversed promotion cancel out level by
//! level.
//!
//! Enumeration orders are part of the contract: the common-prefix family
//! reports matches by ascending match length (the traversal order), the
//! breadth-first predictive variant reports ascending key ids (BFS over a
//! LOUDS subtree visits node ids in increasing order, and terminal ranks
//! increase with node ids), and the depth-first variants visit siblings
//! in their stored order.

use std::collections::VecDeque;

use crate::tail::TailMatch;
use crate::trie::Trie;

/// A common-prefix hit: the key id and how many query bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub id: u32,
    pub len: usize,
}

impl Trie {
    /// Exact lookup. `None` when the key is absent.
    pub fn lookup(&self, key: &[u8]) -> Option<u32> {
        let level0 = self.levels.first()?;
        let mut node = 0u32;
        let mut pos = 0usize;
        while pos < key.len() {
            let child = level0.search_child(node, key[pos], self.label_sorted())?;
            if level0.is_link(child) {
                match self.match_link_edge(0, child, key, pos) {
                    TailMatch::Matched(next) => pos = next,
                    _ => return None,
                }
            } else {
                pos += 1;
            }
            node = child;
        }
        level0
            .is_terminal(node)
            .then(|| level0.terminal_id(node))
    }

    // ------------------------------------------------------------------
    // Reverse lookup
    // ------------------------------------------------------------------

    /// Reconstruct the key for `id`.
    pub fn restore(&self, id: u32) -> crate::Result<Vec<u8>> {
        self.check_id(id)?;
        Ok(self.key_bytes(self.levels[0].node_of_terminal(id)))
    }

    /// Key spelled by the path root → `node` at level 0.
    fn key_bytes(&self, node: u32) -> Vec<u8> {
        let mut out = Vec::new();
        self.append_key_forward(0, node, &mut out);
        out
    }

    /// Length of the key for `id` without keeping the bytes. This is the
    /// "probe with an empty buffer" form of `restore_into`.
    pub fn key_len(&self, id: u32) -> crate::Result<usize> {
        Ok(self.restore(id)?.len())
    }

    /// Reconstruct the key for `id` into a caller buffer. Returns the key
    /// length; a buffer smaller than the key is a parameter error.
    pub fn restore_into(&self, id: u32, buf: &mut [u8]) -> crate::Result<usize> {
        let key = self.restore(id)?;
        if buf.len() < key.len() {
            return Err(crate::Error::Param(format!(
                "restore buffer holds {} bytes, key {} needs {}",
                buf.len(),
                id,
                key.len()
            )));
        }
        buf[..key.len()].copy_from_slice(&key);
        Ok(key.len())
    }

    /// Append the key spelled by the path root → `node` of `level`, in
    /// forward order: walk up (which emits the path reversed), then flip
    /// the appended slice.
    fn append_key_forward(&self, level: usize, node: u32, out: &mut Vec<u8>) {
        let start = out.len();
        self.append_path_backward(level, node, out);
        out[start..].reverse();
    }

    /// Walk `node` → root pushing each edge string reversed. A link edge
    /// into the next level pushes its promoted key forward (the promoted
    /// key *is* the reversed edge string); a tail-store edge pushes the
    /// stored bytes back to front.
    fn append_path_backward(&self, level: usize, node: u32, out: &mut Vec<u8>) {
        let lv = &self.levels[level];
        let mut v = node;
        while v != 0 {
            if lv.is_link(v) {
                let target = lv.link_target(v);
                if level + 1 == self.levels.len() {
                    self.tail_store().restore_into(target as usize, out);
                } else {
                    let deeper = self.levels[level + 1].node_of_terminal(target);
                    self.append_key_forward(level + 1, deeper, out);
                }
            } else {
                out.push(lv.label(v));
            }
            v = lv.parent(v);
        }
    }

    // ------------------------------------------------------------------
    // Link-edge matching
    // ------------------------------------------------------------------

    /// Compare the edge string of link edge `v` at `level` against
    /// `query[pos..]`.
    fn match_link_edge(&self, level: usize, v: u32, query: &[u8], pos: usize) -> TailMatch {
        let target = self.levels[level].link_target(v);
        if level + 1 == self.levels.len() {
            return self.tail_store().match_at(target as usize, query, pos);
        }
        // Inter-level link: the stored next-level key is the edge string
        // reversed, so reconstruct it and compare back to front.
        let mut promoted = Vec::new();
        let deeper = self.levels[level + 1].node_of_terminal(target);
        self.append_key_forward(level + 1, deeper, &mut promoted);

        let avail = query.len() - pos;
        let common = promoted
            .iter()
            .rev()
            .zip(&query[pos..])
            .take_while(|(a, b)| a == b)
            .count();
        if common == promoted.len() {
            TailMatch::Matched(pos + promoted.len())
        } else if common == avail {
            TailMatch::Exhausted
        } else {
            TailMatch::Failed
        }
    }

    /// The tail store. Only reachable through link edges at the last
    /// level, whose presence load-time validation ties to the store, so a
    /// miss here is a corrupted structure and fatal.
    fn tail_store(&self) -> &crate::tail::TailStore {
        self.tail
            .as_ref()
            .expect("link edges at the last level require a tail store")
    }

    // ------------------------------------------------------------------
    // Common-prefix search
    // ------------------------------------------------------------------

    /// Stream every key that is a prefix of `query` through `visit`, in
    /// ascending match-length order. Enumeration stops when the visitor
    /// returns `false`; the stopping visit is counted.
    pub fn find_callback(
        &self,
        query: &[u8],
        mut visit: impl FnMut(u32, usize) -> bool,
    ) -> usize {
        let Some(level0) = self.levels.first() else {
            return 0;
        };
        let mut count = 0usize;
        let mut node = 0u32;
        let mut pos = 0usize;
        loop {
            if level0.is_terminal(node) {
                count += 1;
                if !visit(level0.terminal_id(node), pos) {
                    return count;
                }
            }
            if pos == query.len() {
                return count;
            }
            let Some(child) = level0.search_child(node, query[pos], self.label_sorted()) else {
                return count;
            };
            if level0.is_link(child) {
                match self.match_link_edge(0, child, query, pos) {
                    TailMatch::Matched(next) => pos = next,
                    _ => return count,
                }
            } else {
                pos += 1;
            }
            node = child;
        }
    }

    /// Id and length of the shortest key that is a prefix of `query`.
    pub fn find_first(&self, query: &[u8]) -> Option<Match> {
        let mut hit = None;
        self.find_callback(query, |id, len| {
            hit = Some(Match { id, len });
            false
        });
        hit
    }

    /// Id and length of the longest key that is a prefix of `query`.
    pub fn find_last(&self, query: &[u8]) -> Option<Match> {
        let mut hit = None;
        self.find_callback(query, |id, len| {
            hit = Some(Match { id, len });
            true
        });
        hit
    }

    /// Append the ids (and lengths, when asked) of every key that is a
    /// prefix of `query`. Earlier contents of the output vectors are
    /// preserved; the return value counts only this call's additions.
    pub fn find(
        &self,
        query: &[u8],
        ids: &mut Vec<u32>,
        mut lengths: Option<&mut Vec<usize>>,
    ) -> usize {
        self.find_callback(query, |id, len| {
            ids.push(id);
            if let Some(lengths) = lengths.as_deref_mut() {
                lengths.push(len);
            }
            true
        })
    }

    // ------------------------------------------------------------------
    // Predictive search
    // ------------------------------------------------------------------

    /// Node whose subtree holds exactly the keys starting with `prefix`.
    /// When the prefix ends inside a link edge the edge's head node is
    /// the subtree root; all keys through it share the full edge string.
    fn locate_prefix(&self, prefix: &[u8]) -> Option<u32> {
        let level0 = self.levels.first()?;
        let mut node = 0u32;
        let mut pos = 0usize;
        while pos < prefix.len() {
            let child = level0.search_child(node, prefix[pos], self.label_sorted())?;
            if level0.is_link(child) {
                match self.match_link_edge(0, child, prefix, pos) {
                    TailMatch::Matched(next) => pos = next,
                    TailMatch::Exhausted => return Some(child),
                    TailMatch::Failed => return None,
                }
            } else {
                pos += 1;
            }
            node = child;
        }
        Some(node)
    }

    /// Number of keys that start with `prefix`.
    pub fn predict(&self, prefix: &[u8]) -> usize {
        let Some(root) = self.locate_prefix(prefix) else {
            return 0;
        };
        let level0 = &self.levels[0];
        let mut queue = VecDeque::from([root]);
        let mut count = 0;
        while let Some(v) = queue.pop_front() {
            if level0.is_terminal(v) {
                count += 1;
            }
            queue.extend(level0.children(v));
        }
        count
    }

    /// Append ids of keys starting with `prefix` in ascending id order,
    /// stopping after `max` when given. Returns the number appended.
    pub fn predict_breadth_first(
        &self,
        prefix: &[u8],
        ids: &mut Vec<u32>,
        max: Option<usize>,
    ) -> usize {
        if max == Some(0) {
            return 0;
        }
        let Some(root) = self.locate_prefix(prefix) else {
            return 0;
        };
        let level0 = &self.levels[0];
        let mut queue = VecDeque::from([root]);
        let mut count = 0;
        while let Some(v) = queue.pop_front() {
            if level0.is_terminal(v) {
                ids.push(level0.terminal_id(v));
                count += 1;
                if max.is_some_and(|m| count >= m) {
                    return count;
                }
            }
            queue.extend(level0.children(v));
        }
        count
    }

    /// Append ids (and materialised keys, when asked) of keys starting
    /// with `prefix`, visiting the subtree depth-first in stored sibling
    /// order. Returns the number appended.
    pub fn predict_depth_first(
        &self,
        prefix: &[u8],
        ids: &mut Vec<u32>,
        mut keys: Option<&mut Vec<Vec<u8>>>,
        max: Option<usize>,
    ) -> usize {
        if max == Some(0) {
            return 0;
        }
        let mut count = 0;
        self.predict_callback(prefix, |id, key| {
            ids.push(id);
            if let Some(keys) = keys.as_deref_mut() {
                keys.push(key.to_vec());
            }
            count += 1;
            !max.is_some_and(|m| count >= m)
        });
        count
    }

    /// Depth-first predictive enumeration through a visitor. The visitor
    /// receives the id and the full key bytes and may stop enumeration by
    /// returning `false`; the stopping visit is counted.
    pub fn predict_callback(
        &self,
        prefix: &[u8],
        mut visit: impl FnMut(u32, &[u8]) -> bool,
    ) -> usize {
        let Some(root) = self.locate_prefix(prefix) else {
            return 0;
        };
        let level0 = &self.levels[0];
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(v) = stack.pop() {
            if level0.is_terminal(v) {
                let id = level0.terminal_id(v);
                let key = self.key_bytes(v);
                count += 1;
                if !visit(id, &key) {
                    return count;
                }
            }
            // Reversed push so the first sibling pops first.
            let children = level0.children(v);
            stack.extend(children.rev());
        }
        count
    }
}
