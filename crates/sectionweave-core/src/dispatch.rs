//! Delivery of work onto the UI-affinity thread.
//!
//! A [`Dispatcher`] is owned by the UI-affinity thread and drains a queue of
//! [`QueuedInvocation`]s. Any thread holding a [`DispatchHandle`] can post a
//! closure to it; the closure runs the next time the owning thread calls
//! [`Dispatcher::run_pending`].
//!
//! Invocations run in posting order, and an invocation posted from the owning
//! thread never runs synchronously inside the call that posted it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use sectionweave_core::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! let handle = dispatcher.handle();
//! let hits = Arc::new(AtomicUsize::new(0));
//!
//! let worker_hits = hits.clone();
//! std::thread::spawn(move || {
//!     handle.post(move || { worker_hits.fetch_add(1, Ordering::SeqCst); }).unwrap();
//! })
//! .join()
//! .unwrap();
//!
//! assert_eq!(dispatcher.run_pending(), 1);
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender, TrySendError};

use crate::error::DispatchError;
use crate::logging::targets;
use crate::thread_check::ThreadAffinity;

static NEXT_INVOCATION_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a posted invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId(u64);

impl InvocationId {
    /// Get the raw u64 value of this invocation ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// A type-erased closure waiting to run on the dispatch thread.
pub struct QueuedInvocation {
    id: InvocationId,
    invoke: Box<dyn FnOnce() + Send>,
}

impl QueuedInvocation {
    /// Wrap a closure, assigning it a fresh ID.
    pub fn new<F>(invoke: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: InvocationId(NEXT_INVOCATION_ID.fetch_add(1, Ordering::Relaxed)),
            invoke: Box::new(invoke),
        }
    }

    /// The ID assigned when the invocation was created.
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Run the invocation.
    pub fn execute(self) {
        tracing::trace!(target: targets::DISPATCH, id = self.id.0, "executing invocation");
        (self.invoke)();
    }
}

impl std::fmt::Debug for QueuedInvocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedInvocation").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Configuration for a [`Dispatcher`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum number of queued invocations, or `None` for an unbounded queue.
    ///
    /// With a bound, posting from a foreign thread blocks while the queue is
    /// full, and posting from the dispatch thread itself fails with
    /// [`DispatchError::QueueFull`].
    pub capacity: Option<usize>,
}

impl DispatcherConfig {
    /// Unbounded queue.
    pub fn unbounded() -> Self {
        Self { capacity: None }
    }

    /// Queue holding at most `capacity` invocations.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
        }
    }
}

/// The receiving end of the dispatch queue, bound to the thread that created it.
pub struct Dispatcher {
    sender: Sender<QueuedInvocation>,
    receiver: Receiver<QueuedInvocation>,
    affinity: ThreadAffinity,
    config: DispatcherConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create an unbounded dispatcher owned by the current thread.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create a dispatcher owned by the current thread.
    pub fn with_config(config: DispatcherConfig) -> Self {
        let (sender, receiver) = match config.capacity {
            Some(capacity) => crossbeam_channel::bounded(capacity),
            None => crossbeam_channel::unbounded(),
        };
        tracing::debug!(target: targets::DISPATCH, capacity = ?config.capacity, "dispatcher created");
        Self {
            sender,
            receiver,
            affinity: ThreadAffinity::current(),
            config,
        }
    }

    /// A handle other threads can use to post work here.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            sender: self.sender.clone(),
            affinity: self.affinity,
        }
    }

    /// The thread this dispatcher delivers on.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// The configuration this dispatcher was created with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Number of invocations waiting to run.
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if nothing is waiting to run.
    pub fn is_idle(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Run the invocations that were queued when this call started.
    ///
    /// Invocations posted while draining wait for the next call. Returns the
    /// number of invocations executed.
    #[tracing::instrument(skip_all, target = "sectionweave_core::dispatch", level = "trace")]
    pub fn run_pending(&self) -> usize {
        self.affinity.assert_same_thread("Dispatcher::run_pending");
        let budget = self.receiver.len();
        let mut executed = 0;
        while executed < budget {
            match self.receiver.try_recv() {
                Ok(invocation) => {
                    invocation.execute();
                    executed += 1;
                }
                Err(_) => break,
            }
        }
        executed
    }

    /// Keep draining until the queue stays empty.
    ///
    /// Returns the total number of invocations executed.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let executed = self.run_pending();
            if executed == 0 {
                return total;
            }
            total += executed;
        }
    }

    /// Wait up to `timeout` for one invocation and run it.
    ///
    /// Returns `true` if an invocation was executed.
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        self.affinity.assert_same_thread("Dispatcher::run_next_timeout");
        match self.receiver.recv_timeout(timeout) {
            Ok(invocation) => {
                invocation.execute();
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pending", &self.receiver.len())
            .field("affinity", &self.affinity)
            .field("config", &self.config)
            .finish()
    }
}

/// A cloneable, thread-safe handle for posting work to a [`Dispatcher`].
#[derive(Clone)]
pub struct DispatchHandle {
    sender: Sender<QueuedInvocation>,
    affinity: ThreadAffinity,
}

impl DispatchHandle {
    /// Queue `f` to run on the dispatch thread.
    ///
    /// Never runs `f` synchronously, even when called on the dispatch thread.
    pub fn post<F>(&self, f: F) -> Result<InvocationId, DispatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        let invocation = QueuedInvocation::new(f);
        let id = invocation.id();

        if self.affinity.is_same_thread() {
            // Blocking here would deadlock the only thread that drains the queue.
            self.sender.try_send(invocation).map_err(|err| match err {
                TrySendError::Full(_) => DispatchError::QueueFull,
                TrySendError::Disconnected(_) => DispatchError::Disconnected,
            })?;
        } else {
            self.sender
                .send(invocation)
                .map_err(|SendError(_)| DispatchError::Disconnected)?;
        }

        tracing::trace!(target: targets::DISPATCH, id = id.0, "invocation posted");
        Ok(id)
    }

    /// Returns `true` if the caller is on the dispatch thread.
    pub fn is_dispatch_thread(&self) -> bool {
        self.affinity.is_same_thread()
    }

    /// The thread invocations are delivered on.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }
}

impl std::fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("affinity", &self.affinity)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(DispatchHandle: Send, Sync, Clone);
static_assertions::assert_impl_all!(QueuedInvocation: Send);
