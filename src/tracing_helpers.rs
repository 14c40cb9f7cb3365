//! Logging macros over `tracing`, compiled out without the `tracing` feature.
//!
//! Events emitted by this crate:
//!
//! | Target | Level | Message | Fields |
//! |---|---|---|---|
//! | `bucketree::map` | debug | `linked new tree node` | `depth` |
//! | `bucketree::map` | trace | `lost edge race, descending into winner` | `depth` |
//! | `bucketree::map` | trace | `bucket map dropped` | `freed` |
//! | `bucketree::list` | trace | `push_front linked after head contention` | `retries` |
//! | `bucketree::list` | trace | `append list cleared` | `freed` |
//!
//! ```bash
//! # Lost races and tree growth during the stress tests
//! RUST_LOG=bucketree::map=trace cargo test --features tracing --test stress_tests
//! ```
//!
//! Arguments are dropped unevaluated without the feature, so never pass an
//! expression with side effects.

#![allow(unused_macros, unused_imports)]

/// Trace level: per-operation contention and teardown events.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug level: tree growth events.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use trace_log;
