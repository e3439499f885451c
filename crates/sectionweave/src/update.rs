//! Structural change descriptors.
//!
//! An [`Update`] says what changed in a provider, in the provider's own
//! coordinates. Composite providers rewrite the coordinates on the way up;
//! whoever finally renders the list applies it with [`Update::perform`].
//!
//! Updates never compute diffs. The provider that mutated its data states
//! the change explicitly:
//!
//! ```
//! use sectionweave::{IndexPath, RowAnimation, Update};
//!
//! let update = Update::insert_rows([IndexPath::new(0, 3)]).with_animation(RowAnimation::Fade);
//! assert!(update.is_animated());
//! assert!(update.is_valid());
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::index::{IndexPath, SectionSet};

/// The kind of structural change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Delete,
    Reload,
    Move,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Delete => write!(f, "delete"),
            Self::Reload => write!(f, "reload"),
            Self::Move => write!(f, "move"),
        }
    }
}

/// Animation hint passed through to the rendering surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RowAnimation {
    /// No animation.
    #[default]
    None,
    Fade,
    Right,
    Left,
    Top,
    Bottom,
    Middle,
    /// Let the surface pick.
    Automatic,
}

impl RowAnimation {
    /// Returns `true` for anything other than [`RowAnimation::None`].
    pub fn is_animated(self) -> bool {
        self != Self::None
    }
}

/// A change to a set of rows.
///
/// `index_paths` are the positions before the change, `new_index_paths` the
/// positions after it. Inserts carry only new paths, deletes and reloads only
/// old paths, moves carry one of each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowsUpdate {
    pub kind: ChangeKind,
    pub animation: RowAnimation,
    pub index_paths: Option<Vec<IndexPath>>,
    pub new_index_paths: Option<Vec<IndexPath>>,
}

impl RowsUpdate {
    /// Whether the fields this kind of change needs are present and non-empty.
    pub fn is_valid(&self) -> bool {
        let old = non_empty(self.index_paths.as_deref());
        let new = non_empty(self.new_index_paths.as_deref());
        match self.kind {
            ChangeKind::Insert => new,
            ChangeKind::Delete | ChangeKind::Reload => old,
            ChangeKind::Move => old && new,
        }
    }
}

/// A change to a set of sections, laid out like [`RowsUpdate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionsUpdate {
    pub kind: ChangeKind,
    pub animation: RowAnimation,
    pub sections: Option<SectionSet>,
    pub new_sections: Option<SectionSet>,
}

impl SectionsUpdate {
    /// Whether the fields this kind of change needs are present and non-empty.
    pub fn is_valid(&self) -> bool {
        let old = self.sections.as_ref().is_some_and(|s| !s.is_empty());
        let new = self.new_sections.as_ref().is_some_and(|s| !s.is_empty());
        match self.kind {
            ChangeKind::Insert => new,
            ChangeKind::Delete | ChangeKind::Reload => old,
            ChangeKind::Move => old && new,
        }
    }
}

fn non_empty(paths: Option<&[IndexPath]>) -> bool {
    paths.is_some_and(|p| !p.is_empty())
}

/// A one-shot side effect carried as an update.
///
/// Clones share the closure; whichever clone runs first consumes it.
#[derive(Clone)]
pub struct Action(Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>);

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Arc::new(Mutex::new(Some(Box::new(f)))))
    }

    /// Run the closure if no clone has run it yet.
    ///
    /// Returns `true` if this call ran it.
    pub fn run(&self) -> bool {
        let f = self.0.lock().take();
        match f {
            Some(f) => {
                f();
                true
            }
            None => false,
        }
    }

    /// Returns `true` once the closure has run.
    pub fn is_consumed(&self) -> bool {
        self.0.lock().is_none()
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Action {}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

/// An ordered list of updates applied together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchUpdate {
    updates: Vec<Update>,
    animated: bool,
}

impl BatchUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an update, keeping the animated flag current.
    pub fn push(&mut self, update: Update) {
        self.animated |= update.is_animated();
        self.updates.push(update);
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    pub fn into_updates(self) -> Vec<Update> {
        self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// `true` if any member is animated.
    pub fn is_animated(&self) -> bool {
        self.animated
    }
}

impl FromIterator<Update> for BatchUpdate {
    fn from_iter<I: IntoIterator<Item = Update>>(iter: I) -> Self {
        let mut batch = BatchUpdate::new();
        for update in iter {
            batch.push(update);
        }
        batch
    }
}

/// A structural change, an arbitrary action, or a batch of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update {
    /// Rows were inserted, deleted, reloaded or moved.
    Rows(RowsUpdate),
    /// Sections were inserted, deleted, reloaded or moved.
    Sections(SectionsUpdate),
    /// Everything may have changed. Coordinates are irrelevant.
    ReloadData,
    /// Scroll the surface back to its first row.
    ScrollToTop { animated: bool },
    /// Run a side effect when the update is performed.
    Action(Action),
    /// Several updates applied in order.
    Batch(BatchUpdate),
}

impl Update {
    pub fn insert_rows(index_paths: impl IntoIterator<Item = IndexPath>) -> Self {
        Self::rows(ChangeKind::Insert, None, Some(index_paths.into_iter().collect()))
    }

    pub fn delete_rows(index_paths: impl IntoIterator<Item = IndexPath>) -> Self {
        Self::rows(ChangeKind::Delete, Some(index_paths.into_iter().collect()), None)
    }

    pub fn reload_rows(index_paths: impl IntoIterator<Item = IndexPath>) -> Self {
        Self::rows(ChangeKind::Reload, Some(index_paths.into_iter().collect()), None)
    }

    pub fn move_row(from: IndexPath, to: IndexPath) -> Self {
        Self::rows(ChangeKind::Move, Some(vec![from]), Some(vec![to]))
    }

    pub fn insert_sections(sections: impl Into<SectionSet>) -> Self {
        Self::sections(ChangeKind::Insert, None, Some(sections.into()))
    }

    pub fn delete_sections(sections: impl Into<SectionSet>) -> Self {
        Self::sections(ChangeKind::Delete, Some(sections.into()), None)
    }

    pub fn reload_sections(sections: impl Into<SectionSet>) -> Self {
        Self::sections(ChangeKind::Reload, Some(sections.into()), None)
    }

    pub fn move_section(from: usize, to: usize) -> Self {
        Self::sections(
            ChangeKind::Move,
            Some(SectionSet::single(from)),
            Some(SectionSet::single(to)),
        )
    }

    pub fn reload_data() -> Self {
        Self::ReloadData
    }

    pub fn scroll_to_top(animated: bool) -> Self {
        Self::ScrollToTop { animated }
    }

    pub fn action<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::Action(Action::new(f))
    }

    pub fn batch(updates: impl IntoIterator<Item = Update>) -> Self {
        Self::Batch(updates.into_iter().collect())
    }

    fn rows(
        kind: ChangeKind,
        index_paths: Option<Vec<IndexPath>>,
        new_index_paths: Option<Vec<IndexPath>>,
    ) -> Self {
        Self::Rows(RowsUpdate {
            kind,
            animation: RowAnimation::None,
            index_paths,
            new_index_paths,
        })
    }

    fn sections(
        kind: ChangeKind,
        sections: Option<SectionSet>,
        new_sections: Option<SectionSet>,
    ) -> Self {
        Self::Sections(SectionsUpdate {
            kind,
            animation: RowAnimation::None,
            sections,
            new_sections,
        })
    }

    /// Set the animation of a rows or sections update. Other variants are
    /// returned unchanged.
    pub fn with_animation(mut self, animation: RowAnimation) -> Self {
        match &mut self {
            Self::Rows(rows) => rows.animation = animation,
            Self::Sections(sections) => sections.animation = animation,
            _ => {}
        }
        self
    }

    /// Whether performing this update should be animated.
    pub fn is_animated(&self) -> bool {
        match self {
            Self::Rows(rows) => rows.animation.is_animated(),
            Self::Sections(sections) => sections.animation.is_animated(),
            Self::ScrollToTop { animated } => *animated,
            Self::Batch(batch) => batch.is_animated(),
            Self::ReloadData | Self::Action(_) => false,
        }
    }

    /// Whether the update carries the coordinates its kind requires.
    ///
    /// Batches are valid when every member is.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Rows(rows) => rows.is_valid(),
            Self::Sections(sections) => sections.is_valid(),
            Self::Batch(batch) => batch.updates().iter().all(Update::is_valid),
            Self::ReloadData | Self::ScrollToTop { .. } | Self::Action(_) => true,
        }
    }

    /// Short variant name for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Rows(rows) => format!("{} rows", rows.kind),
            Self::Sections(sections) => format!("{} sections", sections.kind),
            Self::ReloadData => "reload data".to_string(),
            Self::ScrollToTop { .. } => "scroll to top".to_string(),
            Self::Action(_) => "action".to_string(),
            Self::Batch(batch) => format!("batch of {}", batch.len()),
        }
    }

    /// Apply this update to a rendering surface.
    ///
    /// Animated batches are bracketed with
    /// [`begin_updates`](UpdateTarget::begin_updates) and
    /// [`end_updates`](UpdateTarget::end_updates).
    pub fn perform(&self, target: &mut dyn UpdateTarget) {
        match self {
            Self::Rows(rows) => perform_rows(rows, target),
            Self::Sections(sections) => perform_sections(sections, target),
            Self::ReloadData => target.reload_data(),
            Self::ScrollToTop { animated } => target.scroll_to_top(*animated),
            Self::Action(action) => {
                action.run();
            }
            Self::Batch(batch) => {
                if batch.is_animated() {
                    target.begin_updates();
                }
                for update in batch.updates() {
                    update.perform(target);
                }
                if batch.is_animated() {
                    target.end_updates();
                }
            }
        }
    }
}

fn perform_rows(rows: &RowsUpdate, target: &mut dyn UpdateTarget) {
    match rows.kind {
        ChangeKind::Insert => {
            if let Some(paths) = &rows.new_index_paths {
                target.insert_rows(paths, rows.animation);
            }
        }
        ChangeKind::Delete => {
            if let Some(paths) = &rows.index_paths {
                target.delete_rows(paths, rows.animation);
            }
        }
        ChangeKind::Reload => {
            if let Some(paths) = &rows.index_paths {
                target.reload_rows(paths, rows.animation);
            }
        }
        ChangeKind::Move => {
            let from = rows.index_paths.as_ref().and_then(|p| p.first());
            let to = rows.new_index_paths.as_ref().and_then(|p| p.first());
            if let (Some(from), Some(to)) = (from, to) {
                target.move_row(*from, *to);
            }
        }
    }
}

fn perform_sections(sections: &SectionsUpdate, target: &mut dyn UpdateTarget) {
    match sections.kind {
        ChangeKind::Insert => {
            if let Some(set) = &sections.new_sections {
                target.insert_sections(set, sections.animation);
            }
        }
        ChangeKind::Delete => {
            if let Some(set) = &sections.sections {
                target.delete_sections(set, sections.animation);
            }
        }
        ChangeKind::Reload => {
            if let Some(set) = &sections.sections {
                target.reload_sections(set, sections.animation);
            }
        }
        ChangeKind::Move => {
            let from = sections.sections.as_ref().and_then(SectionSet::first);
            let to = sections.new_sections.as_ref().and_then(SectionSet::first);
            if let (Some(from), Some(to)) = (from, to) {
                target.move_section(from, to);
            }
        }
    }
}

/// The rendering surface an update is finally applied to.
///
/// All coordinates are global. Surfaces that do not scroll or batch can rely
/// on the no-op defaults.
pub trait UpdateTarget {
    fn insert_rows(&mut self, index_paths: &[IndexPath], animation: RowAnimation);
    fn delete_rows(&mut self, index_paths: &[IndexPath], animation: RowAnimation);
    fn reload_rows(&mut self, index_paths: &[IndexPath], animation: RowAnimation);
    fn move_row(&mut self, from: IndexPath, to: IndexPath);

    fn insert_sections(&mut self, sections: &SectionSet, animation: RowAnimation);
    fn delete_sections(&mut self, sections: &SectionSet, animation: RowAnimation);
    fn reload_sections(&mut self, sections: &SectionSet, animation: RowAnimation);
    fn move_section(&mut self, from: usize, to: usize);

    fn reload_data(&mut self);

    fn scroll_to_top(&mut self, _animated: bool) {}

    /// Start of an animated transaction.
    fn begin_updates(&mut self) {}

    /// End of an animated transaction.
    fn end_updates(&mut self) {}
}

static_assertions::assert_impl_all!(Update: Send, Sync, Clone);
