//! Single-slot "last found" cache.
//!
//! Holds a pointer to the node most recently returned by
//! `find_or_allocate`. Any thread may overwrite it at any time; a reader that
//! loses a race just sees a different node, fails the key compare, and falls
//! back to a full descent. The slot only ever holds null or a node of the
//! owning map, so it can be stale but never dangling.

use std::ptr as StdPtr;

use crate::ordering::{CACHE_STORE, EXCLUSIVE, OBSERVE};
use crate::sync::AtomicPtr;

use super::TreeNode;

pub(super) struct LastFound<K, T> {
    slot: AtomicPtr<TreeNode<K, T>>,
}

impl<K, T> LastFound<K, T> {
    pub(super) fn new() -> Self {
        Self {
            slot: AtomicPtr::new(StdPtr::null_mut()),
        }
    }

    /// The cached node, if it holds `key`.
    #[inline]
    pub(super) fn lookup(&self, key: &K) -> Option<&TreeNode<K, T>>
    where
        K: Eq,
    {
        let ptr: *mut TreeNode<K, T> = self.slot.load(OBSERVE);

        // SAFETY: The slot holds null or a node of the map that owns this
        // cache, published before it was remembered; the acquire load pairs
        // with the release store in `remember`. The node outlives &self.
        let node: &TreeNode<K, T> = unsafe { ptr.as_ref() }?;

        (node.key == *key).then_some(node)
    }

    /// Make `node` the cached entry. `node` must belong to the owning map.
    #[inline]
    pub(super) fn remember(&self, node: &TreeNode<K, T>) {
        self.slot
            .store(StdPtr::from_ref(node).cast_mut(), CACHE_STORE);
    }

    /// Empty the slot before the owning map frees its nodes.
    pub(super) fn forget(&mut self) {
        self.slot.store(StdPtr::null_mut(), EXCLUSIVE);
    }
}
