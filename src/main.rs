// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Talpa CLI: build and query dictionaries.
//!
//! ```bash
//! # Build a dictionary from TSV keys (key<TAB>weight, weight optional)
//! talpa build keys.tsv -o keys.talpa
//!
//! # Query it
//! talpa lookup keys.talpa apple app
//! talpa common-prefix keys.talpa applesauce
//! talpa predict keys.talpa app --max 10
//!
//! # Benchmark with a memory-mapped dictionary
//! talpa benchmark keys.talpa --mmap --confidence 99
//! ```
//!
//! Exit codes: 0 ok; 10 stdin read failure; 11 input/dictionary open
//! failure; 12 query parse failure; 20 build failure; 30 output file
//! failure; 31 stdout failure.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use talpa::{BuildOptions, Keyset, NodeOrder, TailMode, Trie, TrieKind};

mod cli;
use cli::display::{format_size, printable_key, timing_us};
use cli::{Cli, Commands};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Build {
            files,
            output,
            num_tries,
            text_tail: _,
            binary_tail,
            without_tail,
            weight_order: _,
            label_order,
            prefix_trie,
        } => {
            let tail = if without_tail {
                TailMode::None
            } else if binary_tail {
                TailMode::Binary
            } else {
                TailMode::Text
            };
            let options = BuildOptions::new()
                .num_tries(num_tries)
                .trie(if prefix_trie {
                    TrieKind::Prefix
                } else {
                    TrieKind::Patricia
                })
                .tail(tail)
                .order(if label_order {
                    NodeOrder::Label
                } else {
                    NodeOrder::Weight
                });
            run_build(&files, output.as_deref(), options)
        }
        Commands::Lookup { dict, mmap, keys } => {
            with_dict(&dict, mmap, |trie| run_lookup(trie, &keys))
        }
        Commands::ReverseLookup { dict, mmap, ids } => {
            with_dict(&dict, mmap, |trie| run_reverse_lookup(trie, &ids))
        }
        Commands::CommonPrefix {
            dict,
            mmap,
            queries,
        } => with_dict(&dict, mmap, |trie| run_common_prefix(trie, &queries)),
        Commands::Predict {
            dict,
            mmap,
            prefixes,
            max,
            depth_first,
        } => with_dict(&dict, mmap, |trie| {
            run_predict(trie, &prefixes, max, depth_first)
        }),
        Commands::Benchmark {
            dict,
            mmap,
            queries,
            confidence,
            json,
        } => with_dict(&dict, mmap, |trie| {
            run_benchmark(trie, &queries, confidence, json)
        }),
    };
    ExitCode::from(code)
}

/// Load a dictionary and run a query command against it.
fn with_dict(path: &str, mmap: bool, run: impl FnOnce(&Trie) -> u8) -> u8 {
    let trie = if mmap { Trie::mmap(path) } else { Trie::open(path) };
    match trie {
        Ok(trie) => run(&trie),
        Err(e) => {
            eprintln!("error: failed to load dictionary {}: {}", path, e);
            11
        }
    }
}

// ============================================================================
// BUILD
// ============================================================================

/// Read TSV keys: the line is the key; a trailing tab-separated number
/// becomes its weight, otherwise the whole line (tab included) is key
/// bytes.
fn read_keys<R: BufRead>(input: R, keyset: &mut Keyset, progress: &ProgressBar) -> io::Result<()> {
    let mut reader = input;
    let mut line: Vec<u8> = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        let mut key: &[u8] = &line;
        let mut weight = 1.0f32;
        if let Some(tab) = line.iter().rposition(|&b| b == b'\t') {
            if let Ok(text) = std::str::from_utf8(&line[tab + 1..]) {
                if let Ok(parsed) = text.parse::<f32>() {
                    weight = parsed;
                    key = &line[..tab];
                }
            }
        }
        keyset.push_weighted(key, weight);
        progress.inc(1);
    }
}

fn run_build(files: &[String], output: Option<&str>, options: BuildOptions) -> u8 {
    let progress = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner:.cyan} {pos} keys read")
            .expect("static template"),
    );

    let mut keyset = Keyset::new();
    if files.is_empty() {
        if let Err(e) = read_keys(io::stdin().lock(), &mut keyset, &progress) {
            eprintln!("error: failed to read keys from stdin: {}", e);
            return 10;
        }
    } else {
        for path in files {
            let file = match File::open(path) {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("error: failed to open {}: {}", path, e);
                    return 11;
                }
            };
            if let Err(e) = read_keys(BufReader::new(file), &mut keyset, &progress) {
                eprintln!("error: failed to read keys from {}: {}", path, e);
                return 12;
            }
        }
    }
    progress.finish_and_clear();

    let start = Instant::now();
    let mut trie = Trie::new();
    if let Err(e) = trie.build(&keyset, options) {
        eprintln!("error: failed to build dictionary: {}", e);
        return 20;
    }
    eprintln!("#keys: {}", trie.num_keys());
    eprintln!("#tries: {}", trie.num_tries());
    eprintln!("#nodes: {}", trie.num_nodes());
    eprintln!(
        "size: {} ({} ms)",
        format_size(trie.io_size()),
        start.elapsed().as_millis()
    );

    match output {
        Some(path) => {
            if let Err(e) = trie.save(path) {
                eprintln!("error: failed to write dictionary to {}: {}", path, e);
                return 30;
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            if let Err(e) = trie.write_to(&mut handle).and_then(|_| Ok(handle.flush()?)) {
                eprintln!("error: failed to write dictionary to stdout: {}", e);
                return 31;
            }
        }
    }
    0
}

// ============================================================================
// QUERIES
// ============================================================================

/// Queries come from the command line or, when absent, stdin lines.
fn gather_queries(args: &[String]) -> io::Result<Vec<Vec<u8>>> {
    if !args.is_empty() {
        return Ok(args.iter().map(|s| s.clone().into_bytes()).collect());
    }
    let mut queries = Vec::new();
    for line in io::stdin().lock().split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        queries.push(line);
    }
    Ok(queries)
}

fn run_lookup(trie: &Trie, keys: &[String]) -> u8 {
    let queries = match gather_queries(keys) {
        Ok(queries) => queries,
        Err(e) => {
            eprintln!("error: failed to read queries: {}", e);
            return 10;
        }
    };
    for key in &queries {
        match trie.lookup(key) {
            Some(id) => println!("{}\t{}", id, printable_key(key)),
            None => println!("NOT_FOUND\t{}", printable_key(key)),
        }
    }
    0
}

fn run_reverse_lookup(trie: &Trie, ids: &[String]) -> u8 {
    let raw = match gather_queries(ids) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("error: failed to read ids: {}", e);
            return 10;
        }
    };
    for text in &raw {
        let id: u32 = match std::str::from_utf8(text).ok().and_then(|s| s.parse().ok()) {
            Some(id) => id,
            None => {
                eprintln!("error: not a key id: {}", printable_key(text));
                return 12;
            }
        };
        match trie.restore(id) {
            Ok(key) => println!("{}\t{}", id, printable_key(&key)),
            Err(e) => {
                eprintln!("error: {}", e);
                return 12;
            }
        }
    }
    0
}

fn run_common_prefix(trie: &Trie, queries: &[String]) -> u8 {
    let queries = match gather_queries(queries) {
        Ok(queries) => queries,
        Err(e) => {
            eprintln!("error: failed to read queries: {}", e);
            return 10;
        }
    };
    for query in &queries {
        let mut ids = Vec::new();
        let mut lengths = Vec::new();
        let count = trie.find(query, &mut ids, Some(&mut lengths));
        println!("{} found\t{}", count, printable_key(query));
        for (id, len) in ids.iter().zip(&lengths) {
            println!("{}\t{}", id, printable_key(&query[..*len]));
        }
    }
    0
}

fn run_predict(trie: &Trie, prefixes: &[String], max: Option<usize>, depth_first: bool) -> u8 {
    let prefixes = match gather_queries(prefixes) {
        Ok(prefixes) => prefixes,
        Err(e) => {
            eprintln!("error: failed to read prefixes: {}", e);
            return 10;
        }
    };
    for prefix in &prefixes {
        let mut ids = Vec::new();
        let mut keys = Vec::new();
        let count = if depth_first {
            trie.predict_depth_first(prefix, &mut ids, Some(&mut keys), max)
        } else {
            let count = trie.predict_breadth_first(prefix, &mut ids, max);
            keys = ids
                .iter()
                .map(|&id| trie.restore(id).expect("enumerated ids are valid"))
                .collect();
            count
        };
        println!("{} found\t{}", count, printable_key(prefix));
        for (id, key) in ids.iter().zip(&keys) {
            println!("{}\t{}", id, printable_key(key));
        }
    }
    0
}

// ============================================================================
// BENCHMARK
// ============================================================================

const MIN_SAMPLES: usize = 30;
const MAX_SAMPLES: usize = 1000;

/// Statistics for a sample of timing measurements.
#[derive(Serialize)]
struct BenchStats {
    mean_us: f64,
    std_dev_us: f64,
    ci_lower_us: f64,
    ci_upper_us: f64,
    samples: usize,
}

impl BenchStats {
    fn from_samples(samples: &[f64], confidence: u8) -> Self {
        let n = samples.len();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1).max(1) as f64;
        let std_dev = variance.sqrt();
        let std_error = std_dev / (n as f64).sqrt();

        // t-distribution critical values, large-n approximation. The CLI
        // parser only admits levels with a table entry.
        let t_critical = match confidence {
            90 => 1.645,
            99 => 2.576,
            _ => 1.96, // 95
        };
        let margin = t_critical * std_error;
        BenchStats {
            mean_us: mean,
            std_dev_us: std_dev,
            ci_lower_us: mean - margin,
            ci_upper_us: mean + margin,
            samples: n,
        }
    }

    /// Interval within 10% of the mean counts as stable.
    fn is_stable(&self) -> bool {
        self.mean_us == 0.0
            || (self.ci_upper_us - self.ci_lower_us) / self.mean_us < 0.10
    }
}

#[derive(Serialize)]
struct BenchReport {
    num_keys: u32,
    num_tries: usize,
    num_nodes: usize,
    io_size: usize,
    queries: usize,
    confidence: u8,
    lookup: BenchStats,
    common_prefix: BenchStats,
    predict: BenchStats,
}

fn run_benchmark(trie: &Trie, queries: &[String], confidence: u8, json: bool) -> u8 {
    let mut queries: Vec<Vec<u8>> = queries.iter().map(|s| s.clone().into_bytes()).collect();
    if queries.is_empty() {
        // Sample the dictionary's own keys.
        let take = (trie.num_keys() as usize).min(1000);
        queries = (0..take as u32)
            .map(|id| trie.restore(id).expect("id below num_keys"))
            .collect();
    }
    if queries.is_empty() {
        eprintln!("error: nothing to benchmark (empty dictionary, no queries)");
        return 12;
    }

    let sample = |op: &dyn Fn(&[u8])| -> Vec<f64> {
        // Warm caches and the branch predictor before timing.
        for query in queries.iter().take(50) {
            op(query);
        }
        let mut samples = Vec::with_capacity(MAX_SAMPLES);
        loop {
            let start = Instant::now();
            for query in &queries {
                op(query);
            }
            let elapsed = start.elapsed().as_secs_f64() * 1_000_000.0 / queries.len() as f64;
            samples.push(elapsed);
            if samples.len() >= MIN_SAMPLES {
                let stats = BenchStats::from_samples(&samples, confidence);
                if stats.is_stable() || samples.len() >= MAX_SAMPLES {
                    return samples;
                }
            }
        }
    };

    let lookup_samples = sample(&|q| {
        std::hint::black_box(trie.lookup(q));
    });
    let find_samples = sample(&|q| {
        let mut ids = Vec::new();
        std::hint::black_box(trie.find(q, &mut ids, None));
    });
    let predict_samples = sample(&|q| {
        let mut ids = Vec::new();
        std::hint::black_box(trie.predict_breadth_first(q, &mut ids, Some(10)));
    });

    let report = BenchReport {
        num_keys: trie.num_keys(),
        num_tries: trie.num_tries(),
        num_nodes: trie.num_nodes(),
        io_size: trie.io_size(),
        queries: queries.len(),
        confidence,
        lookup: BenchStats::from_samples(&lookup_samples, confidence),
        common_prefix: BenchStats::from_samples(&find_samples, confidence),
        predict: BenchStats::from_samples(&predict_samples, confidence),
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("error: failed to serialise report: {}", e);
                return 31;
            }
        }
        return 0;
    }

    println!(
        "dictionary: {} keys, {} tries, {} nodes, {}",
        report.num_keys,
        report.num_tries,
        report.num_nodes,
        format_size(report.io_size)
    );
    println!(
        "queries: {} ({}% confidence intervals, µs/query)",
        report.queries, confidence
    );
    for (name, stats) in [
        ("lookup", &report.lookup),
        ("common-prefix", &report.common_prefix),
        ("predict", &report.predict),
    ] {
        println!(
            "  {:<14} {} ± {:>7.3}  [{:>8.3}, {:>8.3}]  ({} samples)",
            name,
            timing_us(stats.mean_us),
            stats.std_dev_us,
            stats.ci_lower_us,
            stats.ci_upper_us,
            stats.samples
        );
    }
    0
}
