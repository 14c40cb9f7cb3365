//! # `bucketree`
//!
//! Lock-free, insert-only building blocks for process-wide metadata caches.
//!
//! - [`ConcurrentAppendList<T>`]: a singly linked list with concurrent
//!   `push_front` and concurrent snapshot iteration.
//! - [`ConcurrentBucketMap<K, T>`]: an unbalanced binary search tree mapping
//!   each key to its own [`ConcurrentAppendList<T>`] bucket, with a
//!   single-slot cache of the last node found.
//!
//! Both structures may be used from any number of threads at once. Neither
//! blocks, takes a lock, or removes anything while shared.
//!
//! | Operation | Progress | Allocates |
//! |-----------|----------|-----------|
//! | `push_front` | lock-free (CAS on head) | one node |
//! | `iter` | wait-free per step | no |
//! | `find_or_allocate` hit | lock-free descent | no |
//! | `find_or_allocate` miss | lock-free (CAS on edge) | one node, freed again if the CAS loses |
//!
//! ## Memory Model
//!
//! Nodes are published with a release CAS after full initialization and
//! every shared pointer is loaded with acquire ordering before use (see
//! [`ordering`]). Published nodes are never freed until the owning structure
//! is cleared or dropped, both of which need `&mut self`, so there is no
//! use-after-free and no ABA.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use bucketree::ConcurrentBucketMap;
//!
//! let map: Arc<ConcurrentBucketMap<&str, u64>> = Arc::new(ConcurrentBucketMap::new());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|t| {
//!         let map = Arc::clone(&map);
//!         thread::spawn(move || map.find_or_allocate("types").push_front(t))
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(map.find_or_allocate("types").len(), 4);
//! assert_eq!(map.len(), 1);
//! ```
//!
//! ## Limitations
//!
//! - No removal and no rebalancing: keys inserted in sorted order build a
//!   chain, and lookups become linear in the number of keys.
//! - Keys must have a strict total order (`K: Ord`). A broken `Ord` impl is
//!   memory-safe but may create duplicate buckets;
//!   [`ConcurrentBucketMap::verify_order`] detects it.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod alloc;
pub mod error;
pub mod list;
pub mod map;
pub mod ordering;
mod sync;
mod tracing_helpers;

pub use alloc::AllocSnapshot;
pub use error::StructureError;
pub use list::{ConcurrentAppendList, Iter};
pub use map::{ConcurrentBucketMap, MapConfig};
