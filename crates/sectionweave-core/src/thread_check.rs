//! Thread affinity verification for the UI-affinity thread.
//!
//! Composition state (registries, mappings, composite providers) and update
//! delivery belong to a single thread, the one that created them. Off-thread
//! structural mutation is a contract violation; these helpers detect it.
//!
//! # Usage
//!
//! ```
//! use sectionweave_core::thread_check::ThreadAffinity;
//!
//! struct Registry {
//!     affinity: ThreadAffinity,
//! }
//!
//! impl Registry {
//!     fn mutate(&self) {
//!         self.affinity.check("Registry::mutate");
//!         // ... safe to mutate ...
//!     }
//! }
//!
//! let registry = Registry { affinity: ThreadAffinity::current() };
//! registry.mutate();
//! ```
//!
//! # Check Levels
//!
//! - [`ThreadAffinity::check`] panics on a violation when checks are enabled
//!   (the default in debug builds) and otherwise logs an error.
//! - [`ThreadAffinity::assert_same_thread`] always panics on a violation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::ThreadId;

use crate::logging::targets;

/// Flag to enable/disable panicking thread checks globally.
static THREAD_CHECKS_ENABLED: AtomicBool = AtomicBool::new(cfg!(debug_assertions));

/// Enable or disable panicking thread checks.
///
/// By default, checks panic in debug builds and only log in release builds.
pub fn set_thread_checks_enabled(enabled: bool) {
    THREAD_CHECKS_ENABLED.store(enabled, Ordering::SeqCst);
}

/// Check if panicking thread checks are currently enabled.
#[inline]
pub fn are_thread_checks_enabled() -> bool {
    THREAD_CHECKS_ENABLED.load(Ordering::Relaxed)
}

/// Records the thread an object belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    thread_id: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Create a new thread affinity tracker for the current thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }

    /// Get the thread ID this affinity is bound to.
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Check if the current thread matches this affinity.
    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Verify that `operation` runs on the owning thread.
    ///
    /// Returns `true` when on the owning thread. On a violation this panics if
    /// thread checks are enabled, and logs and returns `false` otherwise.
    pub fn check(&self, operation: &str) -> bool {
        if self.is_same_thread() {
            return true;
        }
        if are_thread_checks_enabled() {
            self.panic_wrong_thread(operation);
        }
        tracing::error!(
            target: targets::THREAD,
            operation,
            owner = ?self.thread_id,
            current = ?std::thread::current().id(),
            "operation performed off its owning thread"
        );
        false
    }

    /// Assert that we are on the owning thread, regardless of the global flag.
    ///
    /// # Panics
    ///
    /// Panics with a descriptive message if called from a different thread.
    pub fn assert_same_thread(&self, operation: &str) {
        if !self.is_same_thread() {
            self.panic_wrong_thread(operation);
        }
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self, operation: &str) -> ! {
        let current = std::thread::current();
        let current_name = current.name().unwrap_or("<unnamed>");
        let current_id = current.id();

        panic!(
            "\n\
            ══════════════════════════════════════════════════════════════════════\n\
            THREAD AFFINITY VIOLATION\n\
            ══════════════════════════════════════════════════════════════════════\n\
            \n\
            {operation}\n\
            \n\
            Owning thread: {:?}\n\
            Current thread: \"{current_name}\" (ID: {current_id:?})\n\
            \n\
            Composition changes, content loading and update delivery must run\n\
            on the UI-affinity thread. Background work should report through a\n\
            ContentLoadingCoordinator, whose completion is dispatched back to\n\
            the owning thread.\n\
            \n\
            ══════════════════════════════════════════════════════════════════════",
            self.thread_id
        )
    }
}
