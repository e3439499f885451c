//! Content loading: state, state machine, coordinator and controller.
//!
//! A provider that loads asynchronously owns a [`ContentLoadingController`].
//! Each call to [`ContentLoadingController::load_content`] starts a new load
//! attempt and hands the load work a [`ContentLoadingCoordinator`]. The work
//! may run anywhere; it reports back through the coordinator, and the
//! resulting state change happens on the UI-affinity thread.
//!
//! ```
//! use sectionweave::loading::{ContentLoadingController, ContentLoadingState};
//! use sectionweave_core::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! let controller = ContentLoadingController::new(dispatcher.handle());
//!
//! controller.load_content(|coordinator| {
//!     std::thread::spawn(move || {
//!         if coordinator.is_current() {
//!             coordinator.done();
//!         } else {
//!             coordinator.ignore();
//!         }
//!     });
//! });
//! assert_eq!(controller.loading_state(), ContentLoadingState::Loading);
//!
//! while controller.loading_state().is_loading() {
//!     dispatcher.run_next_timeout(std::time::Duration::from_millis(50));
//! }
//! assert_eq!(controller.loading_state(), ContentLoadingState::Loaded);
//! ```

mod controller;
mod coordinator;
mod state;
mod state_machine;

pub use controller::{ContentLoadingController, ContentLoadingDelegate};
pub use coordinator::{ContentLoadingCoordinator, LoadingOutcome, LoadingUpdate};
pub use state::ContentLoadingState;
pub use state_machine::ContentLoadingStateMachine;
