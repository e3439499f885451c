//! Tests for content loading: coordinators, state machines and aggregation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sectionweave::{
    CompositeProvider, ContentLoading, ContentLoadingCoordinator, ContentLoadingState,
    ContentLoadingStateMachine, Dispatcher, IndexPath, ListProvider, LoadingError, LoadingOutcome,
    SectionProvider, Update,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A provider whose loads complete only when the test says so.
fn held_provider(
    dispatcher: &Dispatcher,
    sections: Vec<Vec<i64>>,
) -> (Arc<ListProvider<i64>>, Arc<Mutex<Vec<ContentLoadingCoordinator>>>) {
    let provider = ListProvider::with_sections(dispatcher.handle(), sections);
    let held = Arc::new(Mutex::new(Vec::new()));
    let held_clone = held.clone();
    provider.set_loader(move |coordinator| held_clone.lock().push(coordinator));
    (provider, held)
}

fn run_until(dispatcher: &Dispatcher, mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for dispatcher");
        dispatcher.run_next_timeout(Duration::from_millis(20));
    }
}

#[test]
fn test_coordinator_delivers_once_and_never_inline() {
    let dispatcher = Dispatcher::new();
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let outcomes_clone = outcomes.clone();
    let coordinator = ContentLoadingCoordinator::new(dispatcher.handle(), move |outcome| {
        outcomes_clone.lock().push(outcome.state());
    });

    assert!(coordinator.done());
    assert!(!coordinator.done_with_error(LoadingError::failed("late")));
    assert!(!coordinator.clone().done_with_no_content());
    assert!(coordinator.is_completed());
    assert!(outcomes.lock().is_empty());

    dispatcher.run_until_idle();
    assert_eq!(*outcomes.lock(), vec![Some(ContentLoadingState::Loaded)]);
}

#[test]
fn test_state_machine_counts_only_legal_transitions() {
    let machine = ContentLoadingStateMachine::new();
    assert!(machine.transition_to(ContentLoadingState::Loaded).is_err());
    assert_eq!(machine.current_state(), ContentLoadingState::Initial);

    let will = Arc::new(AtomicUsize::new(0));
    let did = Arc::new(AtomicUsize::new(0));
    let will_clone = will.clone();
    let did_clone = did.clone();
    machine.will_transition.connect(move |_| {
        will_clone.fetch_add(1, Ordering::SeqCst);
    });
    machine.did_transition.connect(move |_| {
        did_clone.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(machine.transition_to(ContentLoadingState::Loading), Ok(true));
    assert_eq!(machine.transition_to(ContentLoadingState::Loading), Ok(false));
    assert!(machine.transition_to(ContentLoadingState::Initial).is_err());
    assert_eq!(machine.transition_to(ContentLoadingState::Error), Ok(true));
    assert!(machine.transition_to(ContentLoadingState::Loaded).is_err());
    assert_eq!(machine.transition_to(ContentLoadingState::Loading), Ok(true));

    assert_eq!(will.load(Ordering::SeqCst), 3);
    assert_eq!(did.load(Ordering::SeqCst), 3);
    assert_eq!(machine.current_state(), ContentLoadingState::Loading);
}

#[test]
fn test_aggregate_priority() {
    use ContentLoadingState::*;
    assert_eq!(ContentLoadingState::aggregate([Loaded, Loading, Initial]), Loading);
    assert_eq!(ContentLoadingState::aggregate([Loaded, Error, Initial]), Error);
    assert_eq!(ContentLoadingState::aggregate([NoContent, Loaded]), Loaded);
    assert_eq!(ContentLoadingState::aggregate([Initial, Initial, Initial]), Initial);
    assert_eq!(ContentLoadingState::aggregate(std::iter::empty()), Initial);
}

#[test]
fn test_composite_state_follows_children() {
    init_tracing();
    let dispatcher = Dispatcher::new();
    let (a, held_a) = held_provider(&dispatcher, vec![vec![1]]);
    let (b, held_b) = held_provider(&dispatcher, vec![vec![2]]);
    let composite = CompositeProvider::new();
    composite.add(a.clone());
    composite.add(b.clone());

    let finished = Arc::new(Mutex::new(Vec::new()));
    let finished_clone = finished.clone();
    composite
        .base()
        .signals()
        .did_load_content
        .connect(move |error| finished_clone.lock().push(error.clone()));

    composite.load_content();
    assert_eq!(composite.loading_state(), ContentLoadingState::Loading);

    held_a.lock()[0].done();
    dispatcher.run_pending();
    assert_eq!(a.loading_state(), ContentLoadingState::Loaded);
    assert_eq!(composite.loading_state(), ContentLoadingState::Loading);
    assert!(finished.lock().is_empty());

    held_b.lock()[0].done_with_error(LoadingError::failed("offline"));
    dispatcher.run_pending();
    assert_eq!(composite.loading_state(), ContentLoadingState::Error);
    assert_eq!(composite.loading_error(), Some(LoadingError::failed("offline")));
    assert_eq!(*finished.lock(), vec![Some(LoadingError::failed("offline"))]);
}

#[test]
fn test_updates_held_while_loading_arrive_as_one_ordered_batch() {
    let dispatcher = Dispatcher::new();
    let (slow, held) = held_provider(&dispatcher, vec![vec![]]);
    let fast = ListProvider::with_sections(dispatcher.handle(), vec![vec![0_i64]]);
    let composite = CompositeProvider::new();
    composite.add(slow.clone());
    composite.add(fast.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    composite
        .base()
        .signals()
        .update
        .connect(move |update| seen_clone.lock().push(update.clone()));
    let started = Arc::new(AtomicUsize::new(0));
    let started_clone = started.clone();
    composite.base().signals().will_load_content.connect(move |_| {
        started_clone.fetch_add(1, Ordering::SeqCst);
    });

    composite.load_content();
    for value in 1..=10 {
        fast.push_row(0, value);
    }
    assert!(seen.lock().is_empty());
    assert_eq!(composite.base().pending_len(), 10);

    held.lock()[0].done();
    dispatcher.run_pending();

    let expected = Update::batch((1..=10).map(|row| Update::insert_rows([IndexPath::new(1, row)])));
    assert_eq!(*seen.lock(), vec![expected]);
    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(composite.loading_state(), ContentLoadingState::Loaded);
}

#[test]
fn test_load_completed_from_worker_thread() {
    let dispatcher = Dispatcher::new();
    let provider = ListProvider::<i64>::new(dispatcher.handle());
    let composite = CompositeProvider::new();
    composite.add(provider.clone());

    let weak = Arc::downgrade(&provider);
    provider.set_loader(move |coordinator| {
        let weak = weak.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            let rows: Vec<i64> = (0..3).collect();
            coordinator.done_with_update(move || {
                if let Some(provider) = weak.upgrade() {
                    provider.append_section(rows);
                }
            });
        });
    });

    composite.load_content();
    run_until(&dispatcher, || composite.loading_state().is_loaded());

    assert_eq!(provider.loading_state(), ContentLoadingState::Loaded);
    assert_eq!(composite.section_count(), 1);
    assert_eq!(composite.row_count(0), 3);
}

#[test]
fn test_superseded_load_has_no_effect() {
    let dispatcher = Dispatcher::new();
    let (provider, held) = held_provider(&dispatcher, vec![]);

    provider.load_content();
    provider.load_content();
    let (first, second) = {
        let held = held.lock();
        (held[0].clone(), held[1].clone())
    };
    assert!(!first.is_current());
    assert!(second.is_current());

    // A stale completion that skipped the currency check.
    first.done_with_error(LoadingError::failed("stale"));
    dispatcher.run_pending();
    assert_eq!(provider.loading_state(), ContentLoadingState::Loading);
    assert_eq!(provider.loading_error(), None);

    second.done_with_no_content();
    dispatcher.run_pending();
    assert_eq!(provider.loading_state(), ContentLoadingState::NoContent);
}

#[test]
fn test_ignored_coordinator_delivers_ignored() {
    let dispatcher = Dispatcher::new();
    let outcome = Arc::new(Mutex::new(None));
    let outcome_clone = outcome.clone();
    let coordinator = ContentLoadingCoordinator::new(dispatcher.handle(), move |o: LoadingOutcome| {
        *outcome_clone.lock() = Some(format!("{o:?}"));
    });

    assert!(coordinator.ignore());
    assert!(!coordinator.done());
    dispatcher.run_pending();
    assert_eq!(outcome.lock().as_deref(), Some("Ignored"));
}

#[test]
fn test_removing_only_loading_child_flushes_held_updates() {
    let dispatcher = Dispatcher::new();
    let (slow, _held) = held_provider(&dispatcher, vec![]);
    let fast = ListProvider::with_sections(dispatcher.handle(), vec![vec![0_i64]]);
    let composite = CompositeProvider::new();
    composite.add(slow.clone());
    composite.add(fast.clone());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    composite
        .base()
        .signals()
        .update
        .connect(move |update| seen_clone.lock().push(update.clone()));
    let finished = Arc::new(Mutex::new(Vec::new()));
    let finished_clone = finished.clone();
    composite
        .base()
        .signals()
        .did_load_content
        .connect(move |error| finished_clone.lock().push(error.clone()));

    composite.load_content();
    fast.push_row(0, 1);
    assert_eq!(composite.base().pending_len(), 1);

    assert!(composite.remove(slow.as_ref()));
    dispatcher.run_until_idle();

    assert_eq!(composite.loading_state(), ContentLoadingState::Initial);
    assert_eq!(composite.base().pending_len(), 0);
    assert_eq!(
        *seen.lock(),
        vec![Update::batch([Update::insert_rows([IndexPath::new(0, 1)])])]
    );
    assert_eq!(*finished.lock(), vec![None]);
}
