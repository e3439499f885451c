//! Tests for composing providers: mappings, forwarding and lookups.

use std::sync::Arc;

use parking_lot::Mutex;
use sectionweave::{
    CellData, CompositeConfig, CompositeProvider, ContentLoading, Dispatcher, IndexPath,
    ListProvider, ObjectLookup, SectionProvider, SectionSet, Update,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn record(provider: &dyn SectionProvider) -> Arc<Mutex<Vec<Update>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    provider
        .base()
        .signals()
        .update
        .connect(move |update| seen_clone.lock().push(update.clone()));
    seen
}

/// A: two sections of 1 and 2 rows. B: two sections of 3 and 4 rows.
fn scenario(dispatcher: &Dispatcher) -> (Arc<ListProvider<i64>>, Arc<ListProvider<i64>>) {
    let a = ListProvider::with_sections(dispatcher.handle(), vec![vec![1], vec![2, 3]]);
    let b = ListProvider::with_sections(
        dispatcher.handle(),
        vec![vec![10, 11, 12], vec![20, 21, 22, 23]],
    );
    (a, b)
}

#[test]
fn test_two_children_resolve_to_local_coordinates() {
    init_tracing();
    let dispatcher = Dispatcher::new();
    let (a, b) = scenario(&dispatcher);
    let composite = CompositeProvider::new();
    assert!(composite.add(a.clone()));
    assert!(composite.add(b.clone()));

    assert_eq!(composite.section_count(), 4);
    assert_eq!(
        (0..4).map(|s| composite.row_count(s)).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );

    let (owner, local) = composite.resolve(IndexPath::new(2, 0)).unwrap();
    assert_eq!(owner.base().id(), b.base().id());
    assert_eq!(local, IndexPath::new(0, 0));
    assert_eq!(composite.cell(IndexPath::new(3, 2)), CellData::Int(22));
    assert!(composite.resolve(IndexPath::new(4, 0)).is_none());
}

#[test]
fn test_removing_first_child_shifts_the_rest() {
    let dispatcher = Dispatcher::new();
    let (a, b) = scenario(&dispatcher);
    let composite = CompositeProvider::new();
    composite.add(a.clone());
    composite.add(b.clone());
    let seen = record(composite.as_ref());

    assert!(composite.remove(a.as_ref()));
    assert_eq!(composite.section_count(), 2);
    assert_eq!(composite.sections_for(b.as_ref()), SectionSet::from([0, 1]));
    assert_eq!(*seen.lock(), vec![Update::delete_sections([0, 1])]);
    assert!(!composite.contains(a.as_ref()));
    assert_eq!(a.base().owner(), None);
}

#[test]
fn test_blocks_stay_contiguous_as_counts_change() {
    let dispatcher = Dispatcher::new();
    let composite = CompositeProvider::new();
    let children: Vec<_> = (0..3)
        .map(|_| ListProvider::with_sections(dispatcher.handle(), vec![vec![0_i64]]))
        .collect();
    for child in &children {
        composite.add(child.clone());
    }

    children[0].append_section(vec![]);
    children[1].remove_section(0);
    children[2].append_section(vec![]);
    children[2].append_section(vec![]);

    let blocks: Vec<SectionSet> = children
        .iter()
        .map(|child| composite.sections_for(child.as_ref()))
        .collect();
    assert_eq!(
        blocks,
        vec![
            SectionSet::from([0, 1]),
            SectionSet::new(),
            SectionSet::from([2, 3, 4]),
        ]
    );
    assert_eq!(composite.section_count(), 5);

    // Every global section maps back to exactly one child.
    for global in 0..5 {
        let owners = blocks.iter().filter(|block| block.contains(global)).count();
        assert_eq!(owners, 1, "section {global}");
    }
}

#[test]
fn test_add_remove_round_trip() {
    let dispatcher = Dispatcher::new();
    let (a, b) = scenario(&dispatcher);
    let composite = CompositeProvider::new();
    composite.add(a.clone());
    let seen = record(composite.as_ref());

    assert!(composite.add(b.clone()));
    assert!(composite.remove(b.as_ref()));

    assert_eq!(composite.section_count(), 2);
    assert_eq!(composite.children().len(), 1);
    assert_eq!(
        *seen.lock(),
        vec![Update::insert_sections([2, 3]), Update::delete_sections([2, 3])]
    );
    assert_eq!(b.base().signals().update.connection_count(), 0);
}

#[test]
fn test_double_registration_rejected() {
    let dispatcher = Dispatcher::new();
    let (a, _) = scenario(&dispatcher);
    let first = CompositeProvider::new();
    let second = CompositeProvider::new();

    assert!(first.add(a.clone()));
    assert!(!first.add(a.clone()));
    assert!(!second.add(a.clone()));
    assert_eq!(first.section_count(), 2);
    assert_eq!(second.section_count(), 0);

    first.remove(a.as_ref());
    assert!(second.add(a.clone()));
}

#[test]
fn test_child_updates_are_forwarded_in_global_coordinates() {
    let dispatcher = Dispatcher::new();
    let (a, b) = scenario(&dispatcher);
    let composite = CompositeProvider::new();
    composite.add(a.clone());
    composite.add(b.clone());
    let seen = record(composite.as_ref());

    b.insert_row(IndexPath::new(1, 0), 19);
    a.append_section(vec![4]);
    b.remove_section(0);
    b.replace_row(IndexPath::new(0, 4), 30);

    assert_eq!(
        *seen.lock(),
        vec![
            Update::insert_rows([IndexPath::new(3, 0)]),
            Update::insert_sections([2]),
            Update::delete_sections([3]),
            Update::reload_rows([IndexPath::new(3, 4)]),
        ]
    );
    assert_eq!(composite.section_count(), 4);
    assert_eq!(composite.cell(IndexPath::new(3, 4)), CellData::Int(30));
}

#[test]
fn test_nested_composites_remap_twice() {
    let dispatcher = Dispatcher::new();
    let (a, b) = scenario(&dispatcher);
    let c = ListProvider::with_sections(dispatcher.handle(), vec![vec![7_i64]]);

    let inner = CompositeProvider::with_config(CompositeConfig::new().with_name("inner"));
    inner.add(a.clone());
    inner.add(b.clone());
    let outer = CompositeProvider::with_config(CompositeConfig::new().with_name("outer"));
    outer.add(c.clone());
    outer.add(inner.clone());
    let seen = record(outer.as_ref());

    assert_eq!(outer.section_count(), 5);
    assert_eq!(outer.cell(IndexPath::new(4, 3)), CellData::Int(23));

    b.push_row(0, 13);
    assert_eq!(*seen.lock(), vec![Update::insert_rows([IndexPath::new(3, 3)])]);

    assert!(!outer.add(inner.clone()));
    assert!(!outer.add(outer.clone()));
}

#[test]
fn test_object_lookup_across_children() {
    let dispatcher = Dispatcher::new();
    let a = ListProvider::with_sections(dispatcher.handle(), vec![vec!["x", "y"]]);
    let b = ListProvider::with_sections(dispatcher.handle(), vec![vec!["y"], vec!["z"]]);
    let composite = CompositeProvider::new();
    composite.add(a.clone());
    composite.add(b.clone());

    assert_eq!(composite.object_at(IndexPath::new(2, 0)), Some(CellData::from("z")));
    assert_eq!(composite.object_at(IndexPath::new(3, 0)), None);
    assert_eq!(
        composite.index_paths_for(&CellData::from("y")),
        vec![IndexPath::new(0, 1), IndexPath::new(1, 0)]
    );
}

#[test]
fn test_dropping_composite_releases_children() {
    let dispatcher = Dispatcher::new();
    let (a, _) = scenario(&dispatcher);
    {
        let composite = CompositeProvider::new();
        composite.add(a.clone());
    }
    assert_eq!(a.base().owner(), None);
    assert_eq!(a.base().signals().update.connection_count(), 0);

    let other = CompositeProvider::new();
    assert!(other.add(a.clone()));
}

#[test]
fn test_lookups_follow_counts_changed_during_load() {
    let dispatcher = Dispatcher::new();
    let a = ListProvider::with_sections(dispatcher.handle(), vec![vec![1_i64]]);
    let b = ListProvider::with_sections(dispatcher.handle(), vec![vec![100_i64]]);
    let held = Arc::new(Mutex::new(Vec::new()));
    let held_clone = held.clone();
    a.set_loader(move |coordinator| held_clone.lock().push(coordinator));

    let composite = CompositeProvider::new();
    composite.add(a.clone());
    composite.add(b.clone());
    let seen = record(composite.as_ref());

    a.load_content();
    // Postponed by `a` itself, so the composite is never told.
    a.append_section(vec![2]);
    assert!(seen.lock().is_empty());

    assert_eq!(composite.cell(IndexPath::new(1, 0)), CellData::Int(2));
    assert_eq!(composite.object_at(IndexPath::new(1, 0)), Some(CellData::Int(2)));
    let (owner, local) = composite.resolve(IndexPath::new(1, 0)).unwrap();
    assert_eq!(owner.base().id(), a.base().id());
    assert_eq!(local, IndexPath::new(1, 0));
    assert_eq!(composite.cell(IndexPath::new(2, 0)), CellData::Int(100));
}
