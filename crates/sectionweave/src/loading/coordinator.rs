//! Single-use completion tokens for asynchronous loads.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use sectionweave_core::DispatchHandle;
use sectionweave_core::logging::targets;

use super::state::ContentLoadingState;
use crate::error::LoadingError;

/// Follow-up work run on the UI-affinity thread once a load has finished.
pub type LoadingUpdate = Box<dyn FnOnce() + Send>;

/// What a load attempt reported.
pub enum LoadingOutcome {
    /// The result was superseded and must have no effect.
    Ignored,
    /// Content was loaded, with optional follow-up work.
    Loaded(Option<LoadingUpdate>),
    /// The load finished with nothing to show.
    NoContent,
    /// The load failed.
    Failed(LoadingError),
}

impl LoadingOutcome {
    /// The terminal state this outcome leads to, if any.
    pub fn state(&self) -> Option<ContentLoadingState> {
        match self {
            Self::Ignored => None,
            Self::Loaded(_) => Some(ContentLoadingState::Loaded),
            Self::NoContent => Some(ContentLoadingState::NoContent),
            Self::Failed(_) => Some(ContentLoadingState::Error),
        }
    }
}

impl std::fmt::Debug for LoadingOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignored => write!(f, "Ignored"),
            Self::Loaded(update) => write!(f, "Loaded(update: {})", update.is_some()),
            Self::NoContent => write!(f, "NoContent"),
            Self::Failed(err) => write!(f, "Failed({err})"),
        }
    }
}

type Completion = Box<dyn FnOnce(LoadingOutcome) + Send>;

struct CoordinatorInner {
    generation: u64,
    live_generation: Arc<AtomicU64>,
    completion: Mutex<Option<Completion>>,
    dispatch: DispatchHandle,
}

/// Handed to load work; reports the outcome of exactly one load attempt.
///
/// Any thread may hold a coordinator and call its completion methods. Only
/// the first call is honored, and its outcome is always delivered on the
/// dispatcher's thread, never inline.
///
/// A coordinator stops being [current](Self::is_current) as soon as a newer
/// load starts. Load work must check `is_current()` and call
/// [`ignore`](Self::ignore) rather than report a stale result.
#[derive(Clone)]
pub struct ContentLoadingCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl ContentLoadingCoordinator {
    /// A standalone coordinator that stays current until it completes.
    pub fn new<F>(dispatch: DispatchHandle, completion: F) -> Self
    where
        F: FnOnce(LoadingOutcome) + Send + 'static,
    {
        Self::with_generation(dispatch, 0, Arc::new(AtomicU64::new(0)), completion)
    }

    /// A coordinator for load attempt `generation`, current for as long as
    /// `live_generation` holds that value.
    pub(crate) fn with_generation<F>(
        dispatch: DispatchHandle,
        generation: u64,
        live_generation: Arc<AtomicU64>,
        completion: F,
    ) -> Self
    where
        F: FnOnce(LoadingOutcome) + Send + 'static,
    {
        Self {
            inner: Arc::new(CoordinatorInner {
                generation,
                live_generation,
                completion: Mutex::new(Some(Box::new(completion))),
                dispatch,
            }),
        }
    }

    /// Whether this is still the newest load attempt.
    pub fn is_current(&self) -> bool {
        self.inner.live_generation.load(Ordering::SeqCst) == self.inner.generation
    }

    /// Whether a completion method has already been called.
    pub fn is_completed(&self) -> bool {
        self.inner.completion.lock().is_none()
    }

    /// The load attempt this coordinator belongs to.
    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    /// Report that the result is superseded. No state change follows.
    pub fn ignore(&self) -> bool {
        self.finish(LoadingOutcome::Ignored)
    }

    /// Report success.
    pub fn done(&self) -> bool {
        self.finish(LoadingOutcome::Loaded(None))
    }

    /// Report success and run `update` on the UI-affinity thread after the
    /// transition to `Loaded`.
    pub fn done_with_update<F>(&self, update: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.finish(LoadingOutcome::Loaded(Some(Box::new(update))))
    }

    /// Report that loading succeeded but produced nothing to show.
    pub fn done_with_no_content(&self) -> bool {
        self.finish(LoadingOutcome::NoContent)
    }

    /// Report failure.
    pub fn done_with_error(&self, error: LoadingError) -> bool {
        self.finish(LoadingOutcome::Failed(error))
    }

    /// Returns `true` if this call was the one honored.
    fn finish(&self, outcome: LoadingOutcome) -> bool {
        let Some(completion) = self.inner.completion.lock().take() else {
            tracing::warn!(
                target: targets::LOADING,
                generation = self.inner.generation,
                ?outcome,
                "coordinator already completed, ignoring"
            );
            return false;
        };

        tracing::debug!(target: targets::LOADING, generation = self.inner.generation, ?outcome, "load attempt completed");

        if let Err(err) = self.inner.dispatch.post(move || completion(outcome)) {
            tracing::error!(
                target: targets::LOADING,
                generation = self.inner.generation,
                %err,
                "could not deliver load completion"
            );
        }
        true
    }
}

impl std::fmt::Debug for ContentLoadingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentLoadingCoordinator")
            .field("generation", &self.inner.generation)
            .field("current", &self.is_current())
            .field("completed", &self.is_completed())
            .finish()
    }
}

static_assertions::assert_impl_all!(ContentLoadingCoordinator: Send, Sync, Clone);
