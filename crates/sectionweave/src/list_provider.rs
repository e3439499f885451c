//! An in-memory provider of sectioned items.
//!
//! `ListProvider<T>` keeps its items as a list of sections and reports every
//! mutation as an [`Update`]. It can load its content asynchronously through
//! a loader closure, which receives a [`ContentLoadingCoordinator`] for each
//! load attempt.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sectionweave::{ContentLoading, ListProvider, SectionProvider};
//! use sectionweave_core::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! let fruit = ListProvider::<&'static str>::new(dispatcher.handle());
//!
//! let weak = Arc::downgrade(&fruit);
//! fruit.set_loader(move |coordinator| {
//!     let weak = weak.clone();
//!     coordinator.done_with_update(move || {
//!         if let Some(fruit) = weak.upgrade() {
//!             fruit.append_section(vec!["apple", "pear"]);
//!         }
//!     });
//! });
//!
//! fruit.load_content();
//! dispatcher.run_pending();
//! assert_eq!(fruit.section_count(), 1);
//! assert_eq!(fruit.row_count(0), 2);
//! ```

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sectionweave_core::DispatchHandle;
use sectionweave_core::logging::targets;

use crate::cell::CellData;
use crate::error::LoadingError;
use crate::index::{IndexPath, SectionSet};
use crate::loading::{
    ContentLoadingController, ContentLoadingCoordinator, ContentLoadingDelegate, ContentLoadingState,
    LoadingUpdate,
};
use crate::provider::{ContentLoading, ObjectLookup, ProviderBase, SectionProvider};
use crate::update::Update;

type Loader = Arc<dyn Fn(ContentLoadingCoordinator) + Send + Sync>;

/// A provider backed by `Vec<Vec<T>>`.
pub struct ListProvider<T> {
    base: ProviderBase,
    sections: RwLock<Vec<Vec<T>>>,
    controller: Arc<ContentLoadingController>,
    loader: RwLock<Option<Loader>>,
}

impl<T> ListProvider<T>
where
    T: Clone + Into<CellData> + Send + Sync + 'static,
{
    /// Creates an empty provider whose load completions go through `dispatch`.
    pub fn new(dispatch: DispatchHandle) -> Arc<Self> {
        Self::with_sections(dispatch, Vec::new())
    }

    /// Creates a provider with initial content.
    pub fn with_sections(dispatch: DispatchHandle, sections: Vec<Vec<T>>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let controller = ContentLoadingController::new(dispatch);
            let delegate: Weak<dyn ContentLoadingDelegate> = weak.clone();
            controller.set_delegate(delegate);
            Self {
                base: ProviderBase::new(),
                sections: RwLock::new(sections),
                controller,
                loader: RwLock::new(None),
            }
        })
    }

    /// Set the work run on each [`load_content`](ContentLoading::load_content).
    pub fn set_loader<F>(&self, loader: F)
    where
        F: Fn(ContentLoadingCoordinator) + Send + Sync + 'static,
    {
        *self.loader.write() = Some(Arc::new(loader));
    }

    pub fn controller(&self) -> &Arc<ContentLoadingController> {
        &self.controller
    }

    /// A copy of all sections.
    pub fn sections(&self) -> Vec<Vec<T>> {
        self.sections.read().clone()
    }

    pub fn item(&self, index_path: IndexPath) -> Option<T> {
        self.sections
            .read()
            .get(index_path.section)
            .and_then(|rows| rows.get(index_path.row))
            .cloned()
    }

    /// Replace everything. Notifies a data reload.
    pub fn set_sections(&self, sections: Vec<Vec<T>>) {
        *self.sections.write() = sections;
        self.notify_update(Update::reload_data());
    }

    /// Append a section and return its index.
    pub fn append_section(&self, items: Vec<T>) -> usize {
        let section = {
            let mut sections = self.sections.write();
            sections.push(items);
            sections.len() - 1
        };
        self.notify_update(Update::insert_sections(SectionSet::single(section)));
        section
    }

    /// Insert a section at `section`. Returns `false` if out of range.
    pub fn insert_section(&self, section: usize, items: Vec<T>) -> bool {
        {
            let mut sections = self.sections.write();
            if section > sections.len() {
                return false;
            }
            sections.insert(section, items);
        }
        self.notify_update(Update::insert_sections(SectionSet::single(section)));
        true
    }

    pub fn remove_section(&self, section: usize) -> Option<Vec<T>> {
        let removed = {
            let mut sections = self.sections.write();
            if section >= sections.len() {
                return None;
            }
            sections.remove(section)
        };
        self.notify_update(Update::delete_sections(SectionSet::single(section)));
        Some(removed)
    }

    /// Insert a row. Returns `false` if the position does not exist.
    pub fn insert_row(&self, index_path: IndexPath, item: T) -> bool {
        {
            let mut sections = self.sections.write();
            let Some(rows) = sections.get_mut(index_path.section) else {
                return false;
            };
            if index_path.row > rows.len() {
                return false;
            }
            rows.insert(index_path.row, item);
        }
        self.notify_update(Update::insert_rows([index_path]));
        true
    }

    /// Append a row to a section and return its index path.
    pub fn push_row(&self, section: usize, item: T) -> Option<IndexPath> {
        let index_path = {
            let mut sections = self.sections.write();
            let rows = sections.get_mut(section)?;
            rows.push(item);
            IndexPath::new(section, rows.len() - 1)
        };
        self.notify_update(Update::insert_rows([index_path]));
        Some(index_path)
    }

    pub fn remove_row(&self, index_path: IndexPath) -> Option<T> {
        let removed = {
            let mut sections = self.sections.write();
            let rows = sections.get_mut(index_path.section)?;
            if index_path.row >= rows.len() {
                return None;
            }
            rows.remove(index_path.row)
        };
        self.notify_update(Update::delete_rows([index_path]));
        Some(removed)
    }

    /// Replace a row in place and return the old item. Notifies a reload.
    pub fn replace_row(&self, index_path: IndexPath, item: T) -> Option<T> {
        let old = {
            let mut sections = self.sections.write();
            let slot = sections
                .get_mut(index_path.section)?
                .get_mut(index_path.row)?;
            std::mem::replace(slot, item)
        };
        self.notify_update(Update::reload_rows([index_path]));
        Some(old)
    }

    /// Move a row, possibly across sections.
    pub fn move_row(&self, from: IndexPath, to: IndexPath) -> bool {
        {
            let mut sections = self.sections.write();
            let valid_from = sections
                .get(from.section)
                .is_some_and(|rows| from.row < rows.len());
            if !valid_from {
                return false;
            }
            let item = sections[from.section].remove(from.row);
            let valid_to = sections
                .get(to.section)
                .is_some_and(|rows| to.row <= rows.len());
            if !valid_to {
                sections[from.section].insert(from.row, item);
                return false;
            }
            sections[to.section].insert(to.row, item);
        }
        self.notify_update(Update::move_row(from, to));
        true
    }
}

impl<T> SectionProvider for ListProvider<T>
where
    T: Clone + Into<CellData> + Send + Sync + 'static,
{
    fn base(&self) -> &ProviderBase {
        &self.base
    }

    fn section_count(&self) -> usize {
        self.sections.read().len()
    }

    fn row_count(&self, section: usize) -> usize {
        self.sections.read().get(section).map_or(0, Vec::len)
    }

    fn cell(&self, index_path: IndexPath) -> CellData {
        self.item(index_path).map(Into::into).unwrap_or_default()
    }

    fn content_loading(&self) -> Option<&dyn ContentLoading> {
        Some(self)
    }

    fn object_lookup(&self) -> Option<&dyn ObjectLookup> {
        Some(self)
    }
}

impl<T> ContentLoading for ListProvider<T>
where
    T: Clone + Into<CellData> + Send + Sync + 'static,
{
    fn loading_state(&self) -> ContentLoadingState {
        self.controller.loading_state()
    }

    fn loading_error(&self) -> Option<LoadingError> {
        self.controller.loading_error()
    }

    fn load_content(&self) {
        let loader = self.loader.read().clone();
        match loader {
            Some(loader) => self.controller.load_content(|coordinator| loader(coordinator)),
            None => tracing::trace!(target: targets::LOADING, provider = %self.base.id(), "no loader set"),
        }
    }
}

impl<T> ObjectLookup for ListProvider<T>
where
    T: Clone + Into<CellData> + Send + Sync + 'static,
{
    fn object_at(&self, index_path: IndexPath) -> Option<CellData> {
        self.item(index_path).map(Into::into)
    }

    fn index_paths_for(&self, object: &CellData) -> Vec<IndexPath> {
        let sections = self.sections.read();
        let mut found = Vec::new();
        for (section, rows) in sections.iter().enumerate() {
            for (row, item) in rows.iter().enumerate() {
                let cell: CellData = item.clone().into();
                if cell == *object {
                    found.push(IndexPath::new(section, row));
                }
            }
        }
        found
    }
}

impl<T> ContentLoadingDelegate for ListProvider<T>
where
    T: Clone + Into<CellData> + Send + Sync + 'static,
{
    fn will_begin_loading(&self, _controller: &ContentLoadingController) {
        self.base.signals().will_load_content.emit(());
    }

    fn did_finish_loading(&self, controller: &ContentLoadingController, update: Option<LoadingUpdate>) {
        self.perform_pending_update();
        if let Some(update) = update {
            update();
        }
        self.base
            .signals()
            .did_load_content
            .emit(controller.loading_error());
    }
}

impl<T> std::fmt::Debug for ListProvider<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListProvider")
            .field("id", &self.base.id())
            .field("sections", &self.sections.read().len())
            .field("state", &self.controller.loading_state())
            .finish()
    }
}
