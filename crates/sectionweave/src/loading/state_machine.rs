//! The per-provider content loading state machine.

use parking_lot::{ReentrantMutex, RwLock};
use sectionweave_core::Signal;
use sectionweave_core::logging::targets;

use super::state::ContentLoadingState;
use crate::error::TransitionError;

/// Tracks one provider's loading lifecycle and rejects illegal transitions.
///
/// Transitions are serialized; reading the state is safe from any thread,
/// including from inside the transition signals.
pub struct ContentLoadingStateMachine {
    state: RwLock<ContentLoadingState>,
    transition_guard: ReentrantMutex<()>,

    /// Emitted before an accepted transition mutates the state.
    /// Args: the state being entered.
    pub will_transition: Signal<ContentLoadingState>,

    /// Emitted after an accepted transition.
    /// Args: the state that was left.
    pub did_transition: Signal<ContentLoadingState>,
}

impl Default for ContentLoadingStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentLoadingStateMachine {
    /// Creates a machine in the `Initial` state.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ContentLoadingState::Initial),
            transition_guard: ReentrantMutex::new(()),
            will_transition: Signal::new(),
            did_transition: Signal::new(),
        }
    }

    pub fn current_state(&self) -> ContentLoadingState {
        *self.state.read()
    }

    /// Move to `to`.
    ///
    /// Returns `Ok(false)` when already in `to`, `Ok(true)` when the
    /// transition happened, and an error for any edge outside the graph. A
    /// rejected transition leaves the state untouched and emits nothing.
    pub fn transition_to(&self, to: ContentLoadingState) -> Result<bool, TransitionError> {
        let _guard = self.transition_guard.lock();
        let from = self.current_state();

        if from == to {
            return Ok(false);
        }

        if !from.can_transition_to(to) {
            tracing::error!(target: targets::LOADING, %from, %to, "illegal content loading transition");
            return Err(TransitionError::IllegalStateTransition { from, to });
        }

        self.will_transition.emit(to);
        *self.state.write() = to;
        tracing::debug!(target: targets::LOADING, %from, %to, "content loading transition");
        self.did_transition.emit(from);

        Ok(true)
    }
}

impl std::fmt::Debug for ContentLoadingStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentLoadingStateMachine")
            .field("state", &self.current_state())
            .finish()
    }
}

static_assertions::assert_impl_all!(ContentLoadingStateMachine: Send, Sync);
