//! Comparison benchmarks: `ConcurrentBucketMap` vs locked and sharded maps.
//!
//! **Key Differences:**
//! - `RwLock<BTreeMap<K, Vec<T>>>`: ordered, one lock, bucket pushes need the write lock
//! - `DashMap<K, Vec<T>>`: hash-based, sharded locks
//! - `ConcurrentBucketMap<K, T>`: ordered, lock-free, unbalanced
//!
//! The workload is the intended one: many threads look up a small, hot set
//! of keys and push a value into each bucket they find.
//!
//! Run with: `cargo bench --bench comparison`
//! With mimalloc: `cargo bench --bench comparison --features mimalloc`

#![expect(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use bucketree::ConcurrentBucketMap;
use dashmap::DashMap;
use divan::Bencher;
use parking_lot::RwLock;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() {
    divan::main();
}

const HOT_KEYS: u64 = 256;
const OPS_PER_THREAD: u64 = 10_000;

const fn key_for(thread: u64, i: u64) -> u64 {
    (i.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ thread) % HOT_KEYS
}

/// Run `op(thread, i)` `OPS_PER_THREAD` times on each of `threads` threads.
fn run_threads<M, F>(map: &Arc<M>, threads: usize, op: F)
where
    M: Send + Sync + 'static,
    F: Fn(&M, u64, u64) + Send + Sync + Copy + 'static,
{
    let handles: Vec<_> = (0..threads as u64)
        .map(|t| {
            let map = Arc::clone(map);
            thread::spawn(move || {
                for i in 0..OPS_PER_THREAD {
                    op(&map, t, i);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}

#[divan::bench_group(name = "01_hot_keys_push")]
mod hot_keys_push {
    use super::{
        Arc, BTreeMap, Bencher, ConcurrentBucketMap, DashMap, RwLock, key_for, run_threads,
    };

    #[divan::bench(args = [1, 2, 4, 8, 16])]
    fn bucketree(bencher: Bencher, threads: usize) {
        bencher.bench_local(|| {
            let map: Arc<ConcurrentBucketMap<u64, u64>> = Arc::new(ConcurrentBucketMap::new());
            run_threads(&map, threads, |map, t, i| {
                map.find_or_allocate(key_for(t, i)).push_front(i);
            });
            map
        });
    }

    #[divan::bench(args = [1, 2, 4, 8, 16])]
    fn rwlock_btreemap(bencher: Bencher, threads: usize) {
        bencher.bench_local(|| {
            let map: Arc<RwLock<BTreeMap<u64, Vec<u64>>>> = Arc::new(RwLock::new(BTreeMap::new()));
            run_threads(&map, threads, |map, t, i| {
                map.write().entry(key_for(t, i)).or_default().push(i);
            });
            map
        });
    }

    #[divan::bench(args = [1, 2, 4, 8, 16])]
    fn dashmap(bencher: Bencher, threads: usize) {
        bencher.bench_local(|| {
            let map: Arc<DashMap<u64, Vec<u64>>> = Arc::new(DashMap::new());
            run_threads(&map, threads, |map, t, i| {
                map.entry(key_for(t, i)).or_default().push(i);
            });
            map
        });
    }
}

#[divan::bench_group(name = "02_hot_keys_read")]
mod hot_keys_read {
    use super::{
        Arc, BTreeMap, Bencher, ConcurrentBucketMap, DashMap, HOT_KEYS, RwLock, key_for,
        run_threads,
    };

    #[divan::bench(args = [1, 2, 4, 8, 16])]
    fn bucketree(bencher: Bencher, threads: usize) {
        let map: Arc<ConcurrentBucketMap<u64, u64>> = Arc::new(ConcurrentBucketMap::new());
        for k in 0..HOT_KEYS {
            map.find_or_allocate(k).push_front(k);
        }

        bencher.bench_local(|| {
            run_threads(&map, threads, |map, t, i| {
                divan::black_box(map.find_or_allocate(key_for(t, i)).front());
            });
        });
    }

    #[divan::bench(args = [1, 2, 4, 8, 16])]
    fn rwlock_btreemap(bencher: Bencher, threads: usize) {
        let map: Arc<RwLock<BTreeMap<u64, Vec<u64>>>> = Arc::new(RwLock::new(
            (0..HOT_KEYS).map(|k| (k, vec![k])).collect(),
        ));

        bencher.bench_local(|| {
            run_threads(&map, threads, |map, t, i| {
                divan::black_box(map.read().get(&key_for(t, i)).and_then(|v| v.last().copied()));
            });
        });
    }

    #[divan::bench(args = [1, 2, 4, 8, 16])]
    fn dashmap(bencher: Bencher, threads: usize) {
        let map: Arc<DashMap<u64, Vec<u64>>> =
            Arc::new((0..HOT_KEYS).map(|k| (k, vec![k])).collect());

        bencher.bench_local(|| {
            run_threads(&map, threads, |map, t, i| {
                divan::black_box(map.get(&key_for(t, i)).and_then(|v| v.last().copied()));
            });
        });
    }
}
