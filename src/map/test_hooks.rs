//! Test hooks for deterministic race testing.
//!
//! These hooks allow tests to pause a thread at a specific point in the
//! edge publish protocol to force a particular interleaving.
//!
//! # Usage
//!
//! ```rust,ignore
//! let barrier = Arc::new(Barrier::new(2));
//! let b = Arc::clone(&barrier);
//!
//! // Pause after the speculative node is allocated, before its CAS.
//! map.hooks.set_before_edge_publish(Box::new(move || {
//!     b.wait(); // let the other thread run
//!     b.wait(); // wait until it has linked the same edge
//! }));
//! ```
//!
//! Hooks live on each map instance rather than in a static, so tests that
//! run in parallel do not fire each other's hooks. The hook is cloned out of
//! the mutex before it runs; a hook may block without blocking other
//! threads that reach the same point.

use std::sync::{Arc, Mutex};

/// Hook type: a boxed closure that takes no arguments.
pub type TestHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct Hooks {
    /// Called after a speculative tree node is allocated and before the CAS
    /// that tries to publish it.
    before_edge_publish: Mutex<Option<Arc<TestHook>>>,
}

impl Hooks {
    /// Set the hook called before an edge publish CAS.
    ///
    /// # Panics
    /// Panics if the hook was already set and not cleared.
    pub fn set_before_edge_publish(&self, hook: TestHook) {
        let mut guard = self.before_edge_publish.lock().unwrap();
        assert!(
            guard.is_none(),
            "before_edge_publish hook already set; call clear_before_edge_publish first"
        );
        *guard = Some(Arc::new(hook));
    }

    /// Clear the before-edge-publish hook.
    pub fn clear_before_edge_publish(&self) {
        *self.before_edge_publish.lock().unwrap() = None;
    }

    /// Run the before-edge-publish hook, if set.
    pub fn before_edge_publish(&self) {
        let hook: Option<Arc<TestHook>> = self.before_edge_publish.lock().unwrap().clone();
        if let Some(hook) = hook {
            (**hook)();
        }
    }
}
