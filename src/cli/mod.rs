// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the talpa command-line interface.
//!
//! Six subcommands: `build` turns TSV key files into a dictionary,
//! `lookup` / `reverse-lookup` / `common-prefix` / `predict` query one,
//! and `benchmark` samples query latency until a confidence interval
//! stabilises. Every query command can `--mmap` the dictionary instead of
//! reading it into memory.

pub mod display;

use clap::{Parser, Subcommand};

/// Only the levels with a t-critical table entry are accepted, so the
/// reported percentage always matches the interval actually computed.
fn parse_confidence(s: &str) -> Result<u8, String> {
    match s {
        "90" => Ok(90),
        "95" => Ok(95),
        "99" => Ok(99),
        _ => Err(format!("confidence must be 90, 95, or 99, got {}", s)),
    }
}

#[derive(Parser)]
#[command(
    name = "talpa",
    about = "Static string dictionaries on nested LOUDS tries",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a dictionary from TSV key files (key, optional weight)
    Build {
        /// Input files; stdin when empty. Lines are raw bytes; a trailing
        /// tab-separated number becomes the key's weight.
        files: Vec<String>,

        /// Write the dictionary to FILE (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Limit the number of nested tries
        #[arg(short, long, default_value_t = talpa::DEFAULT_NUM_TRIES)]
        num_tries: usize,

        /// Store terminal suffixes as text tails (default)
        #[arg(short, long)]
        text_tail: bool,

        /// Store terminal suffixes as binary tails
        #[arg(short, long, conflicts_with = "text_tail")]
        binary_tail: bool,

        /// No tail store; expand everything into trie levels
        #[arg(long, conflicts_with_all = ["text_tail", "binary_tail"])]
        without_tail: bool,

        /// Arrange siblings in weight order (default)
        #[arg(short, long)]
        weight_order: bool,

        /// Arrange siblings in label order
        #[arg(short, long, conflicts_with = "weight_order")]
        label_order: bool,

        /// One byte per edge instead of patricia compression
        #[arg(long)]
        prefix_trie: bool,
    },

    /// Look up exact keys and print their ids
    Lookup {
        /// Dictionary file
        dict: String,

        /// Map the dictionary instead of reading it
        #[arg(long)]
        mmap: bool,

        /// Keys to look up; stdin when empty
        keys: Vec<String>,
    },

    /// Restore keys by id
    ReverseLookup {
        /// Dictionary file
        dict: String,

        #[arg(long)]
        mmap: bool,

        /// Ids to restore; stdin when empty
        ids: Vec<String>,
    },

    /// Print every key that is a prefix of each query
    CommonPrefix {
        /// Dictionary file
        dict: String,

        #[arg(long)]
        mmap: bool,

        /// Queries; stdin when empty
        queries: Vec<String>,
    },

    /// Print every key extending each prefix
    Predict {
        /// Dictionary file
        dict: String,

        #[arg(long)]
        mmap: bool,

        /// Prefixes; stdin when empty
        prefixes: Vec<String>,

        /// Stop after this many results per prefix
        #[arg(short, long)]
        max: Option<usize>,

        /// Enumerate depth-first (stored sibling order) instead of by id
        #[arg(long)]
        depth_first: bool,
    },

    /// Measure query latency until statistically stable
    Benchmark {
        /// Dictionary file
        dict: String,

        #[arg(long)]
        mmap: bool,

        /// Queries to sample; keys restored from the dictionary when empty
        queries: Vec<String>,

        /// Target confidence level (90, 95, or 99)
        #[arg(long, default_value = "95", value_parser = parse_confidence)]
        confidence: u8,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}
