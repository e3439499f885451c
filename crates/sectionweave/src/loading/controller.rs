//! Drives one provider's loads through the state machine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sectionweave_core::logging::targets;
use sectionweave_core::{DispatchHandle, ThreadAffinity};

use super::coordinator::{ContentLoadingCoordinator, LoadingOutcome, LoadingUpdate};
use super::state::ContentLoadingState;
use super::state_machine::ContentLoadingStateMachine;
use crate::error::LoadingError;

/// Receives the controller's lifecycle notifications on the UI-affinity thread.
pub trait ContentLoadingDelegate: Send + Sync {
    /// The controller entered `Loading`.
    fn will_begin_loading(&self, controller: &ContentLoadingController);

    /// A load finished and the terminal state is in place.
    ///
    /// `update` is the follow-up work passed to
    /// [`ContentLoadingCoordinator::done_with_update`]; the delegate decides
    /// when to run it.
    fn did_finish_loading(&self, controller: &ContentLoadingController, update: Option<LoadingUpdate>);
}

/// Owns a provider's loading state and its current coordinator.
pub struct ContentLoadingController {
    state_machine: ContentLoadingStateMachine,
    error: RwLock<Option<LoadingError>>,
    generation: Arc<AtomicU64>,
    dispatch: DispatchHandle,
    affinity: ThreadAffinity,
    delegate: RwLock<Option<Weak<dyn ContentLoadingDelegate>>>,
    self_ref: Weak<ContentLoadingController>,
}

impl ContentLoadingController {
    /// Creates a controller whose completions are delivered through `dispatch`.
    ///
    /// The controller is bound to the current thread.
    pub fn new(dispatch: DispatchHandle) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            state_machine: ContentLoadingStateMachine::new(),
            error: RwLock::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            dispatch,
            affinity: ThreadAffinity::current(),
            delegate: RwLock::new(None),
            self_ref: self_ref.clone(),
        })
    }

    pub fn set_delegate(&self, delegate: Weak<dyn ContentLoadingDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    pub fn loading_state(&self) -> ContentLoadingState {
        self.state_machine.current_state()
    }

    pub fn loading_error(&self) -> Option<LoadingError> {
        self.error.read().clone()
    }

    /// The underlying state machine, for observing transitions.
    pub fn state_machine(&self) -> &ContentLoadingStateMachine {
        &self.state_machine
    }

    /// The generation of the newest load attempt. Zero before the first load.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a load attempt and hand its coordinator to `loader`.
    ///
    /// Any earlier coordinator stops being current. Must be called on the
    /// UI-affinity thread.
    pub fn load_content<F>(&self, loader: F)
    where
        F: FnOnce(ContentLoadingCoordinator),
    {
        if !self.affinity.check("ContentLoadingController::load_content") {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(ContentLoadingState::Loading);
        tracing::debug!(target: targets::LOADING, generation, "load started");

        if let Some(delegate) = self.delegate() {
            delegate.will_begin_loading(self);
        }

        let controller = self.self_ref.clone();
        let coordinator = ContentLoadingCoordinator::with_generation(
            self.dispatch.clone(),
            generation,
            self.generation.clone(),
            move |outcome| {
                if let Some(controller) = controller.upgrade() {
                    controller.end_loading(generation, outcome);
                }
            },
        );

        loader(coordinator);
    }

    fn end_loading(&self, generation: u64, outcome: LoadingOutcome) {
        self.affinity.check("ContentLoadingController::end_loading");

        let (state, error, update) = match outcome {
            LoadingOutcome::Ignored => return,
            LoadingOutcome::Loaded(update) => (ContentLoadingState::Loaded, None, update),
            LoadingOutcome::NoContent => (ContentLoadingState::NoContent, None, None),
            LoadingOutcome::Failed(error) => (ContentLoadingState::Error, Some(error), None),
        };

        let live = self.current_generation();
        if generation != live {
            tracing::warn!(
                target: targets::LOADING,
                generation,
                live,
                "stale load result delivered without ignore(), suppressing"
            );
            return;
        }

        *self.error.write() = error;
        self.transition(state);

        if let Some(delegate) = self.delegate() {
            delegate.did_finish_loading(self, update);
        }
    }

    fn transition(&self, to: ContentLoadingState) {
        if let Err(err) = self.state_machine.transition_to(to) {
            debug_assert!(false, "{err}");
        }
    }

    fn delegate(&self) -> Option<Arc<dyn ContentLoadingDelegate>> {
        self.delegate.read().as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for ContentLoadingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentLoadingController")
            .field("state", &self.loading_state())
            .field("generation", &self.current_generation())
            .field("error", &self.loading_error())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use sectionweave_core::Dispatcher;

    #[derive(Default)]
    struct Delegate {
        log: Mutex<Vec<String>>,
    }

    impl ContentLoadingDelegate for Delegate {
        fn will_begin_loading(&self, controller: &ContentLoadingController) {
            self.log.lock().push(format!("will begin ({})", controller.loading_state()));
        }

        fn did_finish_loading(&self, controller: &ContentLoadingController, update: Option<LoadingUpdate>) {
            self.log.lock().push(format!("did finish ({})", controller.loading_state()));
            if let Some(update) = update {
                update();
            }
        }
    }

    fn setup() -> (Dispatcher, Arc<ContentLoadingController>, Arc<Delegate>) {
        let dispatcher = Dispatcher::new();
        let controller = ContentLoadingController::new(dispatcher.handle());
        let delegate = Arc::new(Delegate::default());
        let weak = Arc::downgrade(&delegate);
        controller.set_delegate(weak);
        (dispatcher, controller, delegate)
    }

    #[test]
    fn test_load_then_done() {
        let (dispatcher, controller, delegate) = setup();

        controller.load_content(|coordinator| {
            assert!(coordinator.is_current());
            coordinator.done();
        });
        assert_eq!(controller.loading_state(), ContentLoadingState::Loading);

        dispatcher.run_pending();
        assert_eq!(controller.loading_state(), ContentLoadingState::Loaded);
        assert_eq!(*delegate.log.lock(), vec!["will begin (loading)", "did finish (loaded)"]);
    }

    #[test]
    fn test_error_is_recorded() {
        let (dispatcher, controller, _delegate) = setup();

        controller.load_content(|coordinator| {
            coordinator.done_with_error(LoadingError::failed("timeout"));
        });
        dispatcher.run_pending();

        assert_eq!(controller.loading_state(), ContentLoadingState::Error);
        assert_eq!(controller.loading_error(), Some(LoadingError::failed("timeout")));
    }

    #[test]
    fn test_new_load_supersedes_previous_coordinator() {
        let (dispatcher, controller, delegate) = setup();
        let first = Arc::new(Mutex::new(None));

        let first_clone = first.clone();
        controller.load_content(move |coordinator| *first_clone.lock() = Some(coordinator));
        controller.load_content(|_| {});

        let first = first.lock().take().unwrap();
        assert!(!first.is_current());

        // Careless caller reports anyway; the result must not land.
        first.done_with_error(LoadingError::failed("stale"));
        dispatcher.run_pending();

        assert_eq!(controller.loading_state(), ContentLoadingState::Loading);
        assert_eq!(controller.loading_error(), None);
        assert_eq!(*delegate.log.lock(), vec!["will begin (loading)", "will begin (loading)"]);
    }

    #[test]
    fn test_ignore_produces_no_transition() {
        let (dispatcher, controller, delegate) = setup();

        controller.load_content(|coordinator| {
            coordinator.ignore();
        });
        dispatcher.run_pending();

        assert_eq!(controller.loading_state(), ContentLoadingState::Loading);
        assert_eq!(delegate.log.lock().len(), 1);
    }

    #[test]
    fn test_update_runs_after_transition() {
        let (dispatcher, controller, _delegate) = setup();
        let seen = Arc::new(Mutex::new(None));

        let seen_clone = seen.clone();
        let weak = Arc::downgrade(&controller);
        controller.load_content(move |coordinator| {
            coordinator.done_with_update(move || {
                *seen_clone.lock() = weak.upgrade().map(|c| c.loading_state());
            });
        });
        dispatcher.run_pending();

        assert_eq!(*seen.lock(), Some(ContentLoadingState::Loaded));
    }

    #[test]
    fn test_reload_from_terminal_state() {
        let (dispatcher, controller, _delegate) = setup();

        controller.load_content(|coordinator| {
            coordinator.done_with_no_content();
        });
        dispatcher.run_pending();
        assert_eq!(controller.loading_state(), ContentLoadingState::NoContent);

        controller.load_content(|coordinator| {
            coordinator.done();
        });
        assert_eq!(controller.loading_state(), ContentLoadingState::Loading);
        dispatcher.run_pending();
        assert_eq!(controller.loading_state(), ContentLoadingState::Loaded);
        assert_eq!(controller.current_generation(), 2);
    }
}
