//! The provider interface and the state every provider carries.
//!
//! A provider owns a contiguous run of sections and knows nothing about where
//! that run sits in a larger list. It reports structural changes by emitting
//! [`Update`]s in its own coordinates through the signals on its
//! [`ProviderBase`]; whoever composes it listens to those signals.
//!
//! Loading and object lookup are optional capabilities, exposed through
//! [`SectionProvider::content_loading`] and [`SectionProvider::object_lookup`]
//! and resolved once when a provider is registered.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sectionweave_core::logging::targets;
use sectionweave_core::{Signal, ThreadAffinity};

use crate::cell::CellData;
use crate::error::{CompositionError, LoadingError};
use crate::index::IndexPath;
use crate::loading::ContentLoadingState;
use crate::update::{BatchUpdate, Update};

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a provider, stable for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

impl ProviderId {
    /// Allocate a fresh, never reused ID.
    pub fn next() -> Self {
        Self(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Signals emitted by every provider.
pub struct ProviderSignals {
    /// A structural change, in the provider's local coordinates.
    pub update: Signal<Update>,

    /// The provider started loading content.
    pub will_load_content: Signal<()>,

    /// The provider finished loading content.
    /// Args: the loading error, if the load failed.
    pub did_load_content: Signal<Option<LoadingError>>,
}

impl ProviderSignals {
    fn new() -> Self {
        Self {
            update: Signal::new(),
            will_load_content: Signal::new(),
            did_load_content: Signal::new(),
        }
    }
}

impl fmt::Debug for ProviderSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSignals")
            .field("update", &self.update.connection_count())
            .field("will_load_content", &self.will_load_content.connection_count())
            .field("did_load_content", &self.did_load_content.connection_count())
            .finish()
    }
}

/// State shared by all providers: identity, signals, the postponed-update
/// batch and the owning composition.
///
/// Providers embed one and return it from [`SectionProvider::base`].
pub struct ProviderBase {
    id: ProviderId,
    affinity: ThreadAffinity,
    signals: ProviderSignals,
    pending: Mutex<Option<BatchUpdate>>,
    owner: Mutex<Option<ProviderId>>,
}

impl Default for ProviderBase {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderBase {
    /// Creates a base bound to the current thread.
    pub fn new() -> Self {
        Self {
            id: ProviderId::next(),
            affinity: ThreadAffinity::current(),
            signals: ProviderSignals::new(),
            pending: Mutex::new(None),
            owner: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// The UI-affinity thread this provider was created on.
    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    pub fn signals(&self) -> &ProviderSignals {
        &self.signals
    }

    /// Append an update to the postponed batch.
    pub fn enqueue_update(&self, update: Update) {
        let mut pending = self.pending.lock();
        let batch = pending.get_or_insert_with(BatchUpdate::new);
        batch.push(update);
        tracing::trace!(target: targets::UPDATE, provider = %self.id, queued = batch.len(), "update postponed");
    }

    /// Take the postponed batch, leaving nothing pending.
    pub fn take_pending_update(&self) -> Option<Update> {
        self.pending.lock().take().map(Update::Batch)
    }

    pub fn has_pending_update(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Number of postponed updates.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().as_ref().map_or(0, BatchUpdate::len)
    }

    /// The composition currently holding this provider.
    pub fn owner(&self) -> Option<ProviderId> {
        *self.owner.lock()
    }

    pub(crate) fn claim(&self, owner: ProviderId) -> Result<(), CompositionError> {
        let mut current = self.owner.lock();
        match *current {
            Some(existing) if existing == owner => Err(CompositionError::AlreadyRegistered(self.id)),
            Some(existing) => Err(CompositionError::OwnedElsewhere {
                provider: self.id,
                owner: existing,
            }),
            None => {
                *current = Some(owner);
                Ok(())
            }
        }
    }

    pub(crate) fn release(&self, owner: ProviderId) {
        let mut current = self.owner.lock();
        if *current == Some(owner) {
            *current = None;
        }
    }
}

impl fmt::Debug for ProviderBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderBase")
            .field("id", &self.id)
            .field("signals", &self.signals)
            .field("pending", &self.pending_len())
            .field("owner", &self.owner())
            .finish()
    }
}

/// Which optional capabilities a provider supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub content_loading: bool,
    pub object_lookup: bool,
}

/// A source of sections and rows for one region of a list.
///
/// Coordinates passed to a provider are always its own local coordinates.
///
/// # Implementing
///
/// ```
/// use sectionweave::{CellData, IndexPath, ProviderBase, SectionProvider};
///
/// struct Weekdays {
///     base: ProviderBase,
/// }
///
/// impl SectionProvider for Weekdays {
///     fn base(&self) -> &ProviderBase {
///         &self.base
///     }
///
///     fn section_count(&self) -> usize {
///         1
///     }
///
///     fn row_count(&self, _section: usize) -> usize {
///         7
///     }
///
///     fn cell(&self, index_path: IndexPath) -> CellData {
///         CellData::Int(index_path.row as i64)
///     }
/// }
///
/// let days = Weekdays { base: ProviderBase::new() };
/// assert_eq!(days.row_count(0), 7);
/// ```
pub trait SectionProvider: Send + Sync {
    /// The embedded base state.
    fn base(&self) -> &ProviderBase;

    /// Current number of sections.
    fn section_count(&self) -> usize;

    /// Number of rows in a local section. Out of range sections have none.
    fn row_count(&self, section: usize) -> usize;

    /// Content of the cell at a local index path.
    ///
    /// Returns `CellData::None` for positions that do not exist.
    fn cell(&self, index_path: IndexPath) -> CellData;

    // -------------------------------------------------------------------------
    // Optional capabilities
    // -------------------------------------------------------------------------

    /// The content-loading capability, if supported.
    fn content_loading(&self) -> Option<&dyn ContentLoading> {
        None
    }

    /// The object-lookup capability, if supported.
    fn object_lookup(&self) -> Option<&dyn ObjectLookup> {
        None
    }

    /// Release whatever can be rebuilt later.
    fn did_receive_memory_warning(&self) {}

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            content_loading: self.content_loading().is_some(),
            object_lookup: self.object_lookup().is_some(),
        }
    }

    // -------------------------------------------------------------------------
    // Update delivery
    // -------------------------------------------------------------------------

    /// Whether updates should be held back instead of delivered now.
    ///
    /// The default holds updates while the provider is loading content.
    fn should_postpone_update(&self) -> bool {
        self.content_loading()
            .is_some_and(|loading| loading.loading_state().is_loading())
    }

    /// Deliver an update to observers, or postpone it.
    ///
    /// Updates already postponed are delivered first, in one batch together
    /// with this one, so observers always see updates in notification order.
    fn notify_update(&self, update: Update) {
        let base = self.base();
        if !base.affinity().check("SectionProvider::notify_update") {
            return;
        }

        if self.should_postpone_update() {
            base.enqueue_update(update);
            return;
        }

        if base.has_pending_update() {
            base.enqueue_update(update);
            self.perform_pending_update();
            return;
        }

        tracing::trace!(target: targets::UPDATE, provider = %base.id(), update = %update.describe(), "delivering update");
        base.signals().update.emit(update);
    }

    /// Deliver the postponed batch, if any.
    fn perform_pending_update(&self) {
        let base = self.base();
        if let Some(batch) = base.take_pending_update() {
            tracing::debug!(target: targets::UPDATE, provider = %base.id(), "delivering postponed updates");
            base.signals().update.emit(batch);
        }
    }
}

/// Providers that load their content asynchronously.
pub trait ContentLoading: Send + Sync {
    /// Current state of the load lifecycle.
    ///
    /// Stays `Loading` from `load_content` until its outcome is delivered on
    /// the dispatcher thread.
    fn loading_state(&self) -> ContentLoadingState;

    /// The error of the last failed load.
    fn loading_error(&self) -> Option<LoadingError>;

    /// Start loading. Must be called on the UI-affinity thread.
    fn load_content(&self);
}

/// Providers that can translate between index paths and the objects shown
/// there.
pub trait ObjectLookup: Send + Sync {
    fn object_at(&self, index_path: IndexPath) -> Option<CellData>;

    fn index_paths_for(&self, object: &CellData) -> Vec<IndexPath>;
}
