//! CAS Contention Profiling Binary
//!
//! Hammers a `ConcurrentBucketMap` from many threads over a small key space
//! and reports how many speculative nodes lost their edge race, how deep the
//! tree grew, and per-operation latency outliers. When tracing is enabled,
//! lost races from the map and slow ops from this binary are written to a
//! JSON log.
//!
//! Run with:
//! ```bash
//! # Without tracing (fast, just stats)
//! cargo run --release --features mimalloc --bin cas_contention
//!
//! # Smaller key space, more threads
//! BUCKETREE_THREADS=32 BUCKETREE_KEYS=64 cargo run --release --bin cas_contention
//!
//! # With tracing (writes to logs/cas_contention.json)
//! RUST_LOG=bucketree=trace,cas_contention=warn cargo run --release --features "mimalloc,tracing" --bin cas_contention
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use bucketree::{AllocSnapshot, ConcurrentBucketMap, MapConfig};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(feature = "tracing")]
type TracingGuard = tracing_appender::non_blocking::WorkerGuard;

#[cfg(not(feature = "tracing"))]
type TracingGuard = ();

// =============================================================================
// Tracing Initialization (JSON to file)
// =============================================================================

#[cfg(feature = "tracing")]
fn init_json_tracing() -> TracingGuard {
    use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = "logs";
    let filter_str = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "bucketree=debug,cas_contention=warn".to_string());

    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::never(log_dir, "cas_contention.json");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_thread_ids(true)
        .with_target(true)
        .with_ansi(false)
        .json()
        .with_filter(EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("warn")));

    let _ = tracing_subscriber::registry().with(file_layer).try_init();

    println!("Tracing enabled: logs/cas_contention.json (filter: {filter_str})");

    guard
}

#[cfg(not(feature = "tracing"))]
fn init_json_tracing() -> TracingGuard {
    println!("Tracing disabled (compile with --features tracing)");
}

// =============================================================================
// Configuration
// =============================================================================

struct RunConfig {
    threads: usize,
    keys: u64,
    ops_per_thread: usize,
}

fn env_or(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl RunConfig {
    fn from_env() -> Self {
        Self {
            threads: env_or("BUCKETREE_THREADS", 16),
            keys: env_or("BUCKETREE_KEYS", 1_024) as u64,
            ops_per_thread: env_or("BUCKETREE_OPS", 200_000),
        }
    }
}

// =============================================================================
// Operation Stats
// =============================================================================

/// Per-thread operation timing statistics.
#[derive(Default)]
struct ThreadOpStats {
    max_op_ns: u64,

    /// Ops slower than 1ms
    slow_ops_1ms: u64,

    /// Ops slower than 10ms
    slow_ops_10ms: u64,
}

impl ThreadOpStats {
    const fn record_op(&mut self, op_ns: u64) {
        if op_ns > self.max_op_ns {
            self.max_op_ns = op_ns;
        }
        if op_ns > 1_000_000 {
            self.slow_ops_1ms += 1;
        }
        if op_ns > 10_000_000 {
            self.slow_ops_10ms += 1;
        }
    }

    const fn merge(&mut self, other: &Self) {
        if other.max_op_ns > self.max_op_ns {
            self.max_op_ns = other.max_op_ns;
        }
        self.slow_ops_1ms += other.slow_ops_1ms;
        self.slow_ops_10ms += other.slow_ops_10ms;
    }
}

struct RunResult {
    elapsed: Duration,
    ops: ThreadOpStats,
    alloc: AllocSnapshot,
    height: usize,
    values: usize,
}

// =============================================================================
// Runner
// =============================================================================

const fn key_for(thread: usize, i: usize, keys: u64) -> u64 {
    ((i as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ (thread as u64)) % keys
}

fn run(config: &RunConfig, map_config: MapConfig) -> RunResult {
    let map: Arc<ConcurrentBucketMap<u64, u32>> =
        Arc::new(ConcurrentBucketMap::with_config(map_config));
    let start_line = Arc::new(Barrier::new(config.threads));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let map = Arc::clone(&map);
            let start_line = Arc::clone(&start_line);
            let ops = config.ops_per_thread;
            let keys = config.keys;

            thread::spawn(move || {
                let mut stats = ThreadOpStats::default();
                start_line.wait();

                for i in 0..ops {
                    let key = key_for(t, i, keys);

                    let op_start = Instant::now();
                    map.find_or_allocate(key).push_front(t as u32);
                    let op_elapsed = op_start.elapsed().as_nanos() as u64;

                    stats.record_op(op_elapsed);

                    if op_elapsed > 10_000_000 {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            thread = t,
                            op_index = i,
                            key,
                            elapsed_ms = op_elapsed as f64 / 1_000_000.0,
                            "SLOW_OP"
                        );

                        #[cfg(not(feature = "tracing"))]
                        eprintln!(
                            "[T{t:02}] SLOW_OP: i={i} key={key} took {:.2}ms",
                            op_elapsed as f64 / 1_000_000.0
                        );
                    }
                }

                stats
            })
        })
        .collect();

    let mut merged = ThreadOpStats::default();
    for h in handles {
        merged.merge(&h.join().unwrap());
    }

    let elapsed = start.elapsed();

    let mut values = 0;
    map.walk_in_order(|_, bucket| values += bucket.len());

    RunResult {
        elapsed,
        ops: merged,
        alloc: map.stats(),
        height: map.height(),
        values,
    }
}

fn print_result(label: &str, config: &RunConfig, result: &RunResult) {
    let total_ops = config.threads * config.ops_per_thread;
    let ops_per_sec = total_ops as f64 / result.elapsed.as_secs_f64();
    let alloc = result.alloc;

    println!("\n{}", "=".repeat(72));
    println!(
        "{label}: {} threads x {} ops over {} keys",
        config.threads, config.ops_per_thread, config.keys
    );
    println!("{}", "=".repeat(72));

    println!("\n--- Timing ---");
    println!("Elapsed:     {:?}", result.elapsed);
    println!("Throughput:  {ops_per_sec:.0} ops/sec");
    println!("Max op:      {:.3} ms", result.ops.max_op_ns as f64 / 1_000_000.0);
    println!("Slow >1ms:   {}", result.ops.slow_ops_1ms);
    println!("Slow >10ms:  {}", result.ops.slow_ops_10ms);

    println!("\n--- Tree ---");
    println!("Nodes:       {}", alloc.linked);
    println!("Height:      {}", result.height);
    println!("Max depth:   {}", alloc.max_depth);

    println!("\n--- Edge CAS ---");
    println!("Allocated:   {}", alloc.allocated);
    println!("Discarded:   {}", alloc.discarded);
    if alloc.allocated > 0 {
        println!(
            "Lost races:  {:.2}%",
            alloc.discarded as f64 * 100.0 / alloc.allocated as f64
        );
    }

    if result.values != total_ops || alloc.in_flight() != 0 {
        println!(
            "\n!!! Inconsistent result: values={} expected={total_ops} in_flight={}",
            result.values,
            alloc.in_flight()
        );
    }
}

// =============================================================================
// Main
// =============================================================================

fn main() {
    let _guard = init_json_tracing();
    let config = RunConfig::from_env();

    println!("CAS Contention Profiling");
    println!("========================");

    for (label, map_config) in [
        ("cache on", MapConfig::new()),
        ("cache off", MapConfig::new().with_last_found_cache(false)),
    ] {
        let result = run(&config, map_config);
        print_result(label, &config, &result);
    }
}
