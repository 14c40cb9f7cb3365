//! Errors reported by structural verification.
//!
//! Normal operation has no error path: allocation failure aborts, and every
//! other operation always succeeds. These errors only come out of
//! [`ConcurrentBucketMap::verify_order`](crate::ConcurrentBucketMap::verify_order),
//! which exists to catch a key type whose `Ord` impl is not a total order.

use std::fmt as StdFmt;

/// A violation of the search-tree ordering found by an in-order walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureError {
    /// The key at this in-order position compares less than its predecessor.
    OutOfOrder {
        /// Zero-based in-order position of the offending node.
        position: usize,
    },

    /// The key at this in-order position compares equal to its predecessor,
    /// so two buckets exist for one key.
    DuplicateKey {
        /// Zero-based in-order position of the second node.
        position: usize,
    },
}

impl StdFmt::Display for StructureError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::OutOfOrder { position } => {
                write!(f, "key at in-order position {position} is less than its predecessor")
            }

            Self::DuplicateKey { position } => {
                write!(f, "key at in-order position {position} duplicates its predecessor")
            }
        }
    }
}

impl std::error::Error for StructureError {}
