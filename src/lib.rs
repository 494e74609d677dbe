//! Static string dictionaries on recursive, nested LOUDS tries.
//!
//! `talpa` turns a multiset of byte strings into a compact, read-only
//! dictionary supporting exact lookup, reverse lookup by id, common-prefix
//! search, and predictive search. The representation is a stack of
//! succinct trie levels: each level is a LOUDS bit sequence with label and
//! flag arrays, multi-byte edge runs are recursively extracted into the
//! next level (reversed, so shared suffixes become shared prefixes), and
//! whatever remains when the level budget runs out lands in a tail store.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌─────────────┐    ┌──────────────┐
//! │ keyset.rs │───▶│trie/builder │───▶│ trie (levels │
//! │ (Keyset)  │    │ (recursive  │    │  + tails)    │
//! └───────────┘    │  refinement)│    └──────┬───────┘
//!                  └─────────────┘           │
//!        ┌──────────────┬─────────────┬──────┴──────┐
//!        ▼              ▼             ▼             ▼
//!   ┌─────────┐   ┌──────────┐  ┌───────────┐ ┌──────────┐
//!   │bitvec.rs│   │ louds.rs │  │trie/search│ │ trie/io  │
//!   │rank/sel │   │ 1 level  │  │ queries   │ │ fmt+mmap │
//!   └─────────┘   └──────────┘  └───────────┘ └──────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use talpa::{BuildOptions, Keyset, Trie};
//!
//! let mut keyset = Keyset::new();
//! keyset.push(b"apple");
//! keyset.push(b"app");
//! keyset.push(b"banana");
//!
//! let mut trie = Trie::new();
//! let key_ids = trie.build(&keyset, BuildOptions::default()).unwrap();
//!
//! // Exact and reverse lookup round-trip.
//! assert_eq!(trie.lookup(b"banana"), Some(key_ids[2]));
//! assert_eq!(trie.restore(key_ids[2]).unwrap(), b"banana");
//!
//! // Common prefixes of a query, shortest first.
//! let mut ids = Vec::new();
//! assert_eq!(trie.find(b"applesauce", &mut ids, None), 2);
//!
//! // Keys extending a prefix.
//! assert_eq!(trie.predict(b"app"), 2);
//! ```
//!
//! Dictionaries serialise to a versioned little-endian format with a
//! CRC32 footer (`save`/`open`, `write_to`/`read_from`) and can be
//! memory-mapped (`Trie::mmap`) to use label and tail bytes in place.
//! A frozen dictionary is `Send + Sync`; queries take `&self`.

mod bitvec;
mod error;
mod keyset;
mod louds;
mod store;
mod tail;
mod trie;
mod types;

pub use error::{Error, Result};
pub use keyset::Keyset;
pub use trie::{Match, Trie};
pub use types::{
    BuildOptions, LevelStats, NodeOrder, Stats, TailMode, TrieKind, BINARY_TAIL,
    DEFAULT_NUM_TRIES, LABEL_ORDER, MAX_NUM_TRIES, NOT_FOUND, PATRICIA_TRIE, PREFIX_TRIE,
    TEXT_TAIL, WEIGHT_ORDER, WITHOUT_TAIL,
};

// Format constants, exported for tools that sniff files.
pub use trie::io_constants::{FOOTER_MAGIC, MAGIC, VERSION};
