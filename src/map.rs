//! Filepath: src/map.rs
//! `ConcurrentBucketMap` - a lock-free, insert-only key to bucket map.
//!
//! The map is an unbalanced binary search tree. Each node owns one key and
//! a [`ConcurrentAppendList`] bucket. Lookups that miss allocate the node
//! and race to install it into the null edge they reached; exactly one CAS
//! wins each edge, and losers free their speculative node and continue the
//! descent through the winner.
//!
//! # Protocol
//!
//! ```text
//! find_or_allocate(key):
//!   1. cache hit? (acquire load, key compare) -> bucket
//!   2. edge = root
//!   3. node = edge (acquire load)
//!      null     -> CAS edge: null -> fresh   (release / acquire)
//!                    won:  remember(fresh), return fresh.bucket
//!                    lost: free fresh, goto 3 (edge now holds the winner)
//!      key ==   -> remember(node), return node.bucket
//!      key <    -> edge = node.left,  goto 3
//!      key >    -> edge = node.right, goto 3
//! ```
//!
//! The tree is never rebalanced. Inserting keys in sorted order produces a
//! chain; every walk in this crate is iterative so depth never grows the
//! stack.

use std::cmp::Ordering as CmpOrdering;
use std::fmt as StdFmt;
use std::marker::PhantomData;
use std::ptr as StdPtr;

use crate::alloc::{AllocSnapshot, AllocStats, into_node_ptr, reclaim_node};
use crate::list::ConcurrentAppendList;
use crate::ordering::{EXCLUSIVE, OBSERVE, PUBLISH};
use crate::sync::AtomicPtr;
use crate::tracing_helpers::{debug_log, trace_log};

mod cache;
mod diagnostics;

#[cfg(all(test, not(any(loom, shuttle))))]
mod test_hooks;



use cache::LastFound;

// ============================================================================
//  MapConfig
// ============================================================================

/// Runtime options for a [`ConcurrentBucketMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapConfig {
    /// Consult and update the single-slot last-found cache.
    ///
    /// Helps workloads that look up the same key repeatedly. Disable it for
    /// workloads with no temporal locality to avoid the shared store on
    /// every lookup.
    pub last_found_cache: bool,
}

impl MapConfig {
    /// Default configuration: cache enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_found_cache: true,
        }
    }

    /// Enable or disable the last-found cache.
    #[must_use]
    pub const fn with_last_found_cache(mut self, enabled: bool) -> Self {
        self.last_found_cache = enabled;
        self
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
//  TreeNode
// ============================================================================

/// One key and its bucket. The key never changes; each child edge goes from
/// null to a node at most once.
pub(crate) struct TreeNode<K, T> {
    pub(crate) key: K,
    pub(crate) bucket: ConcurrentAppendList<T>,
    pub(crate) left: AtomicPtr<TreeNode<K, T>>,
    pub(crate) right: AtomicPtr<TreeNode<K, T>>,
}

impl<K, T> TreeNode<K, T> {
    fn new(key: K) -> Self {
        Self {
            key,
            bucket: ConcurrentAppendList::new(),
            left: AtomicPtr::new(StdPtr::null_mut()),
            right: AtomicPtr::new(StdPtr::null_mut()),
        }
    }

    #[inline]
    pub(crate) fn left(&self) -> Option<&Self> {
        // SAFETY: Child edges only ever hold nodes of the same map, which
        // live at least as long as their parent.
        unsafe { load_node(&self.left) }
    }

    #[inline]
    pub(crate) fn right(&self) -> Option<&Self> {
        // SAFETY: As for `left`.
        unsafe { load_node(&self.right) }
    }
}

/// Acquire-load an edge and turn it into a reference.
///
/// # Safety
///
/// The edge must belong to a map that outlives `'a` and holds only nodes
/// created by `into_node_ptr` and published with [`PUBLISH`] ordering.
#[inline]
unsafe fn load_node<'a, K, T>(edge: &'a AtomicPtr<TreeNode<K, T>>) -> Option<&'a TreeNode<K, T>> {
    let ptr: *mut TreeNode<K, T> = edge.load(OBSERVE);

    // SAFETY: The acquire load pairs with the release CAS that published the
    // node, so its key and bucket are initialized. Caller guarantees it lives
    // for 'a.
    unsafe { ptr.as_ref() }
}

// ============================================================================
//  ConcurrentBucketMap
// ============================================================================

/// A lock-free, insert-only map from `K` to a [`ConcurrentAppendList<T>`]
/// bucket.
///
/// `K: Ord` must be a strict total order consistent with `Eq`. The map
/// never removes or rebalances nodes.
///
/// # Example
///
/// ```
/// use bucketree::ConcurrentBucketMap;
///
/// let map: ConcurrentBucketMap<&str, u32> = ConcurrentBucketMap::new();
/// map.find_or_allocate("a").push_front(1);
/// map.find_or_allocate("b").push_front(2);
/// map.find_or_allocate("a").push_front(3);
///
/// let a: Vec<_> = map.find_or_allocate("a").iter().copied().collect();
/// assert_eq!(a, [3, 1]);
/// assert_eq!(map.len(), 2);
/// ```
pub struct ConcurrentBucketMap<K, T> {
    /// Fixed entry edge of the tree. The first key ever inserted becomes the
    /// root node and is never replaced.
    root: AtomicPtr<TreeNode<K, T>>,

    cache: LastFound<K, T>,

    config: MapConfig,

    stats: AllocStats,

    #[cfg(all(test, not(any(loom, shuttle))))]
    hooks: test_hooks::Hooks,

    _owns: PhantomData<Box<TreeNode<K, T>>>,
}

// SAFETY: The map owns its nodes; moving it moves every key and value.
// Keys and values are shared across threads once inserted, so both bounds
// require Sync as well.
unsafe impl<K: Send + Sync, T: Send + Sync> Send for ConcurrentBucketMap<K, T> {}

// SAFETY: Through `&self` threads move keys and values in and read shared
// references to them. Every node is published with release ordering and
// read with acquire ordering; published nodes are never mutated except
// through their atomics.
unsafe impl<K: Send + Sync, T: Send + Sync> Sync for ConcurrentBucketMap<K, T> {}

impl<K, T> ConcurrentBucketMap<K, T> {
    /// Create an empty map with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    /// Create an empty map.
    #[must_use]
    pub fn with_config(config: MapConfig) -> Self {
        Self {
            root: AtomicPtr::new(StdPtr::null_mut()),
            cache: LastFound::new(),
            config,
            stats: AllocStats::new(),
            #[cfg(all(test, not(any(loom, shuttle))))]
            hooks: test_hooks::Hooks::default(),
            _owns: PhantomData,
        }
    }

    /// The configuration this map was created with.
    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Number of keys (linked tree nodes).
    #[must_use]
    pub fn len(&self) -> usize {
        self.stats.linked()
    }

    /// Returns `true` if no key has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.load(OBSERVE).is_null()
    }

    /// Snapshot of node allocation counters.
    #[must_use]
    pub fn stats(&self) -> AllocSnapshot {
        self.stats.snapshot()
    }

    #[inline]
    pub(crate) fn root_node(&self) -> Option<&TreeNode<K, T>> {
        // SAFETY: The root edge belongs to self.
        unsafe { load_node(&self.root) }
    }
}

impl<K: Ord, T> ConcurrentBucketMap<K, T> {
    /// Return the bucket for `key`, creating it if this is the first lookup.
    ///
    /// Every call for equal keys, from any thread, returns a reference to the
    /// same bucket. The reference is valid for as long as the map is
    /// borrowed. Aborts the process if a node cannot be allocated.
    pub fn find_or_allocate(&self, key: K) -> &ConcurrentAppendList<T> {
        if self.config.last_found_cache {
            if let Some(node) = self.cache.lookup(&key) {
                return &node.bucket;
            }
        }

        let node: &TreeNode<K, T> = self.descend(key);

        if self.config.last_found_cache {
            self.cache.remember(node);
        }

        &node.bucket
    }

    /// Walk from the root to the node for `key`, linking it if absent.
    fn descend(&self, mut key: K) -> &TreeNode<K, T> {
        let mut edge: &AtomicPtr<TreeNode<K, T>> = &self.root;
        let mut depth: usize = 0;

        loop {
            // SAFETY: edge is the root or a child edge of a node of self.
            let Some(node) = (unsafe { load_node(edge) }) else {
                match self.try_link(edge, key, depth) {
                    Ok(linked) => return linked,

                    // The edge now holds the winner; look at it again.
                    Err(returned) => {
                        key = returned;
                        continue;
                    }
                }
            };

            edge = match node.key.cmp(&key) {
                CmpOrdering::Equal => return node,
                CmpOrdering::Greater => &node.left,
                CmpOrdering::Less => &node.right,
            };
            depth += 1;
        }
    }

    /// Allocate a node for `key` and try to install it into the null `edge`.
    ///
    /// Returns the key back if another thread filled the edge first.
    fn try_link<'a>(
        &'a self,
        edge: &'a AtomicPtr<TreeNode<K, T>>,
        key: K,
        depth: usize,
    ) -> Result<&'a TreeNode<K, T>, K> {
        let fresh: *mut TreeNode<K, T> = into_node_ptr(TreeNode::new(key));
        self.stats.record_allocated();

        #[cfg(all(test, not(any(loom, shuttle))))]
        self.hooks.before_edge_publish();

        match edge.compare_exchange(StdPtr::null_mut(), fresh, PUBLISH, OBSERVE) {
            Ok(_) => {
                self.stats.record_linked(depth);
                debug_log!(depth, "linked new tree node");

                // SAFETY: fresh is now owned by the tree and lives until the
                // map is dropped, which cannot happen while self is borrowed.
                Ok(unsafe { &*fresh })
            }

            Err(_) => {
                // SAFETY: The CAS failed, so fresh was never published.
                let TreeNode { key, .. } = unsafe { reclaim_node(fresh) };
                self.stats.record_discarded();
                trace_log!(depth, "lost edge race, descending into winner");

                Err(key)
            }
        }
    }
}

impl<K, T> Default for ConcurrentBucketMap<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Drop for ConcurrentBucketMap<K, T> {
    fn drop(&mut self) {
        self.cache.forget();

        let mut pending: Vec<*mut TreeNode<K, T>> = Vec::new();
        let root: *mut TreeNode<K, T> = self.root.swap(StdPtr::null_mut(), EXCLUSIVE);
        if !root.is_null() {
            pending.push(root);
        }

        let mut freed: usize = 0;
        while let Some(ptr) = pending.pop() {
            // SAFETY: &mut self means no other thread can reach any node, and
            // every node was created by into_node_ptr and is reachable from
            // exactly one edge, so it is reclaimed exactly once.
            let node: TreeNode<K, T> = unsafe { reclaim_node(ptr) };

            for child in [node.left.load(EXCLUSIVE), node.right.load(EXCLUSIVE)] {
                if !child.is_null() {
                    pending.push(child);
                }
            }

            freed += 1;
        }

        if freed > 0 {
            trace_log!(freed, "bucket map dropped");
        }
    }
}

impl<K, T> StdFmt::Debug for ConcurrentBucketMap<K, T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("ConcurrentBucketMap")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  Tests
// ============================================================================
