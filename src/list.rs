//! Filepath: src/list.rs
//! `ConcurrentAppendList` - a lock-free, insert-only singly linked list.
//!
//! Any number of threads may call [`ConcurrentAppendList::push_front`] and
//! iterate at the same time. Nodes are never removed while the list is
//! shared; [`ConcurrentAppendList::clear`] and `Drop` take `&mut self`, so
//! the borrow checker guarantees no push or iterator is in flight when
//! memory is released.
//!
//! # Protocol
//!
//! ```text
//! push_front(v):
//!   1. node = box { value: v, next: head (relaxed guess) }
//!   2. CAS head: node.next -> node   (release on success)
//!   3. on failure: node.next = observed head, goto 2
//!
//! iter():
//!   cursor = head (acquire); follow next until null
//! ```
//!
//! Every failed CAS means another push succeeded, so the loop is lock-free.
//!
//! The failure path may read the head relaxed: every push is an RMW on the
//! head, so a reader that acquires a node also synchronizes with the
//! release of every node behind it.

use std::fmt as StdFmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr as StdPtr;

use crate::alloc::{into_node_ptr, reclaim_node};
use crate::ordering::{COUNTER, EXCLUSIVE, GUESS, OBSERVE, PUBLISH};
use crate::sync::{AtomicPtr, AtomicUsize};
use crate::tracing_helpers::trace_log;



// ============================================================================
//  ListNode
// ============================================================================

/// One element of a [`ConcurrentAppendList`].
///
/// `next` is written only while the node is still private to the pushing
/// thread. After the publishing CAS neither field changes again.
pub(crate) struct ListNode<T> {
    value: T,
    next: *mut ListNode<T>,
}

// ============================================================================
//  ConcurrentAppendList
// ============================================================================

/// A lock-free, insert-only list supporting concurrent `push_front` and
/// concurrent snapshot traversal.
///
/// The list is a multiset: pushing an equal value twice stores it twice.
/// "Front" means most recently linked; for racing pushes that is the order in
/// which their CASes serialized, not necessarily call order.
///
/// # Example
///
/// ```
/// use bucketree::ConcurrentAppendList;
///
/// let list = ConcurrentAppendList::new();
/// list.push_front(1);
/// list.push_front(2);
/// list.push_front(3);
///
/// let seen: Vec<_> = list.iter().copied().collect();
/// assert_eq!(seen, [3, 2, 1]);
/// ```
pub struct ConcurrentAppendList<T> {
    head: AtomicPtr<ListNode<T>>,

    /// Number of successfully linked nodes.
    len: AtomicUsize,

    _owns: PhantomData<Box<ListNode<T>>>,
}

// SAFETY: The list owns its nodes; moving it to another thread moves the
// `T` values with it.
unsafe impl<T: Send> Send for ConcurrentAppendList<T> {}

// SAFETY: Through `&self` other threads can move a `T` in (`push_front`,
// requires `T: Send`) and read `&T` (`iter`, requires `T: Sync`). Nodes are
// published with release and read with acquire ordering.
unsafe impl<T: Send + Sync> Sync for ConcurrentAppendList<T> {}

impl<T> ConcurrentAppendList<T> {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: AtomicPtr::new(StdPtr::null_mut()),
            len: AtomicUsize::new(0),
            _owns: PhantomData,
        }
    }

    /// Link `value` in as the new head.
    ///
    /// Always succeeds; aborts the process if the node cannot be allocated.
    pub fn push_front(&self, value: T) {
        let node: *mut ListNode<T> = into_node_ptr(ListNode {
            value,
            next: self.head.load(GUESS),
        });

        let mut retries: usize = 0;

        loop {
            // SAFETY: node is still private to this thread.
            let expected: *mut ListNode<T> = unsafe { (*node).next };

            match self
                .head
                .compare_exchange_weak(expected, node, PUBLISH, GUESS)
            {
                Ok(_) => break,

                Err(actual) => {
                    // SAFETY: node is still private to this thread.
                    unsafe { (*node).next = actual };
                    retries += 1;
                }
            }
        }

        self.len.fetch_add(1, COUNTER);

        if retries > 0 {
            trace_log!(retries, "push_front linked after head contention");
        }
    }

    /// Iterate over a snapshot that starts at the current head.
    ///
    /// Values pushed after this call are not visited. The iterator stays
    /// valid for as long as the list is borrowed.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            cursor: self.head.load(OBSERVE),
            _list: PhantomData,
        }
    }

    /// The most recently linked value, if any.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.iter().next()
    }

    /// Number of linked values.
    ///
    /// Concurrent pushes may already be reachable from the head while not
    /// yet counted, so this is a lower bound under contention.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(COUNTER)
    }

    /// Returns `true` if no value is reachable from the head.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.load(OBSERVE).is_null()
    }

    /// Free every node and reset the list to empty.
    ///
    /// Takes `&mut self`: no push or iterator can be in flight.
    pub fn clear(&mut self) {
        let mut cursor: *mut ListNode<T> = self.head.swap(StdPtr::null_mut(), EXCLUSIVE);
        let mut freed: usize = 0;

        while !cursor.is_null() {
            // SAFETY: &mut self means no other thread can reach this node,
            // and every node in the chain was created by into_node_ptr.
            let node: ListNode<T> = unsafe { reclaim_node(cursor) };
            cursor = node.next;
            freed += 1;
        }

        self.len.store(0, EXCLUSIVE);

        if freed > 0 {
            trace_log!(freed, "append list cleared");
        }
    }
}

impl<T> Default for ConcurrentAppendList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ConcurrentAppendList<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Extend<T> for ConcurrentAppendList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_front(value);
        }
    }
}

impl<T> FromIterator<T> for ConcurrentAppendList<T> {
    /// Pushes each item in turn, so the list iterates in reverse input order.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        list.extend(iter);
        list
    }
}

impl<'a, T> IntoIterator for &'a ConcurrentAppendList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: StdFmt::Debug> StdFmt::Debug for ConcurrentAppendList<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

// ============================================================================
//  Iter
// ============================================================================

/// Forward iterator over a [`ConcurrentAppendList`] snapshot.
///
/// Created by [`ConcurrentAppendList::iter`].
pub struct Iter<'a, T> {
    cursor: *const ListNode<T>,
    _list: PhantomData<&'a ConcurrentAppendList<T>>,
}

// SAFETY: The iterator only hands out `&T`, like `&ConcurrentAppendList<T>`.
unsafe impl<T: Send + Sync> Send for Iter<'_, T> {}

// SAFETY: Same as Send; the cursor is never shared mutably.
unsafe impl<T: Send + Sync> Sync for Iter<'_, T> {}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_null() {
            return None;
        }

        // SAFETY: cursor was read from the head with acquire ordering, or
        // from the `next` of a node already observed this way. Published
        // nodes are immutable and outlive the borrow of the list.
        let node: &'a ListNode<T> = unsafe { &*self.cursor };
        self.cursor = node.next;
        Some(&node.value)
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            _list: PhantomData,
        }
    }
}

// ============================================================================
//  Tests
// ============================================================================
