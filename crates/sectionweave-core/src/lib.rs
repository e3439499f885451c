//! Core plumbing for sectionweave.
//!
//! This crate provides the thread and notification primitives the composition
//! layer is built on:
//!
//! - **Signal/Slot System**: Type-safe observer connections without ownership
//! - **Dispatch**: Posting closures onto the UI-affinity thread
//! - **Thread Affinity**: Detecting off-thread mutation of UI-owned state
//! - **Logging**: `tracing` targets for filtering by subsystem
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use sectionweave_core::{Dispatcher, Signal};
//!
//! let dispatcher = Dispatcher::new();
//! let loaded = Arc::new(Signal::<usize>::new());
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let seen_clone = seen.clone();
//! loaded.connect(move |rows| seen_clone.lock().push(*rows));
//!
//! // A worker finishes and hands the result back to the owning thread.
//! let handle = dispatcher.handle();
//! let signal = loaded.clone();
//! std::thread::spawn(move || {
//!     handle.post(move || signal.emit(12)).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! dispatcher.run_pending();
//! assert_eq!(*seen.lock(), vec![12]);
//! ```

pub mod dispatch;
mod error;
pub mod logging;
pub mod signal;
pub mod thread_check;

pub use dispatch::{DispatchHandle, Dispatcher, DispatcherConfig, InvocationId, QueuedInvocation};
pub use error::{DispatchError, DispatchResult};
pub use signal::{ConnectionId, Signal};
pub use thread_check::{ThreadAffinity, are_thread_checks_enabled, set_thread_checks_enabled};
