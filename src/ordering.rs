//! Standard memory orderings for publishing and observing nodes.
//!
//! Every node is fully initialized before it becomes reachable, and every
//! pointer that may have been written by another thread is loaded with
//! acquire ordering before it is dereferenced. These constants name the two
//! halves of that pairing so each access point states its intent.

use std::sync::atomic::Ordering;

/// Ordering for a successful CAS that installs a node into a list head or
/// tree edge. Pairs with [`OBSERVE`].
pub const PUBLISH: Ordering = Ordering::Release;

/// Ordering for loading a head, edge or cache pointer that will be
/// dereferenced. Also used as CAS failure ordering, since the loser descends
/// into the winner's node.
pub const OBSERVE: Ordering = Ordering::Acquire;

/// Ordering for the first guess of a list head in `push_front`.
/// The CAS validates the guess, so no synchronization is needed here.
pub const GUESS: Ordering = Ordering::Relaxed;

/// Ordering for storing into the last-found cache. Pairs with [`OBSERVE`].
pub const CACHE_STORE: Ordering = Ordering::Release;

/// Ordering for statistics counters. They carry no data dependencies.
pub const COUNTER: Ordering = Ordering::Relaxed;

/// Ordering for loads made while holding `&mut self`.
/// Exclusive access already synchronizes with every earlier writer.
pub const EXCLUSIVE: Ordering = Ordering::Relaxed;
