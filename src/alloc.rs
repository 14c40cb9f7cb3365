//! Node allocation for the list and tree.
//!
//! Nodes are boxed and handed out as raw pointers with stable heap
//! addresses. A node that has been published is never freed until its owner
//! is torn down with exclusive access, so an address is never reused while
//! any thread can still reach it. That rules out both use-after-free and ABA
//! on every edge without an epoch or hazard-pointer scheme.
//!
//! The only early free is a speculative node whose publishing CAS lost:
//! such a node was never visible to another thread.

use std::fmt as StdFmt;

use crate::ordering::COUNTER;
use crate::sync::AtomicUsize;

/// Move `node` to the heap and return a stable pointer with valid provenance.
///
/// Allocation failure aborts through `std::alloc::handle_alloc_error`.
#[inline]
pub(crate) fn into_node_ptr<N>(node: N) -> *mut N {
    Box::into_raw(Box::new(node))
}

/// Take back ownership of a node created by [`into_node_ptr`].
///
/// # Safety
///
/// - `ptr` must come from [`into_node_ptr`] and must not have been reclaimed.
/// - No other thread may hold or be able to obtain a reference to the node:
///   it was never published, or the owner is being torn down via `&mut self`.
#[inline]
pub(crate) unsafe fn reclaim_node<N>(ptr: *mut N) -> N {
    // SAFETY: Caller guarantees ptr is a live, unshared Box allocation.
    *unsafe { Box::from_raw(ptr) }
}

// ============================================================================
//  Allocation Statistics
// ============================================================================

/// Live counters of tree node allocations.
///
/// All counters are relaxed and only touched on the slow path, never on a
/// cache hit or a plain descent.
pub(crate) struct AllocStats {
    /// Speculative nodes created for a null edge.
    allocated: AtomicUsize,

    /// Nodes whose publishing CAS succeeded.
    linked: AtomicUsize,

    /// Speculative nodes freed after losing their CAS.
    discarded: AtomicUsize,

    /// Deepest edge a node was linked at (root is depth 0).
    max_depth: AtomicUsize,
}

impl AllocStats {
    pub(crate) fn new() -> Self {
        Self {
            allocated: AtomicUsize::new(0),
            linked: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            max_depth: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_allocated(&self) {
        self.allocated.fetch_add(1, COUNTER);
    }

    #[inline]
    pub(crate) fn record_linked(&self, depth: usize) {
        self.linked.fetch_add(1, COUNTER);
        self.max_depth.fetch_max(depth, COUNTER);
    }

    #[inline]
    pub(crate) fn record_discarded(&self) {
        self.discarded.fetch_add(1, COUNTER);
    }

    #[inline]
    pub(crate) fn linked(&self) -> usize {
        self.linked.load(COUNTER)
    }

    pub(crate) fn snapshot(&self) -> AllocSnapshot {
        AllocSnapshot {
            allocated: self.allocated.load(COUNTER),
            linked: self.linked.load(COUNTER),
            discarded: self.discarded.load(COUNTER),
            max_depth: self.max_depth.load(COUNTER),
        }
    }
}

/// Point-in-time copy of a map's node allocation counters.
///
/// Once all writers have finished, `allocated == linked + discarded`.
/// Under concurrency a snapshot may be taken between the allocation of a
/// speculative node and its CAS, so the equality can briefly not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocSnapshot {
    /// Tree nodes created for a null edge, whether or not they were linked.
    pub allocated: usize,

    /// Tree nodes that won their edge and are reachable from the root.
    pub linked: usize,

    /// Speculative tree nodes freed after another thread won their edge.
    pub discarded: usize,

    /// Deepest position any node was linked at; the root is depth 0.
    /// A value close to `linked` means the tree has degenerated into a chain.
    pub max_depth: usize,
}

impl AllocSnapshot {
    /// Speculative nodes neither linked nor discarded yet.
    #[must_use]
    pub const fn in_flight(&self) -> usize {
        self.allocated.saturating_sub(self.linked + self.discarded)
    }
}

impl StdFmt::Display for AllocSnapshot {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        write!(
            f,
            "allocated={} linked={} discarded={} max_depth={}",
            self.allocated, self.linked, self.discarded, self.max_depth
        )
    }
}

// ============================================================================
//  Tests
// ============================================================================
