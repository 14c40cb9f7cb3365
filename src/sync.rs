//! Atomic types used by the concurrent structures.
//!
//! Under `--cfg loom` these resolve to loom's instrumented atomics and under
//! `--cfg shuttle` to shuttle's, so the models in `list::loom_tests`,
//! `map::loom_tests` and `map::shuttle_tests` preempt at every atomic access
//! of the real publish/observe code paths.
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --release --lib loom_tests
//! RUSTFLAGS="--cfg shuttle" cargo test --release --lib shuttle_tests
//! ```
//!
//! Instrumented atomics only work inside a model run, so under either cfg
//! the plain unit tests and the integration tests compile to nothing.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicUsize};

#[cfg(all(shuttle, not(loom)))]
pub(crate) use shuttle::sync::atomic::{AtomicPtr, AtomicUsize};

#[cfg(not(any(loom, shuttle)))]
pub(crate) use std::sync::atomic::{AtomicPtr, AtomicUsize};
