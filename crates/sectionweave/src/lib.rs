//! Sectionweave - compose independent sectioned data providers into one
//! virtual list.
//!
//! A [`CompositeProvider`] presents the sections of its children back to
//! back. It translates every coordinate between its global space and each
//! child's local space, forwards child updates after remapping them, and
//! aggregates the children's content-loading state into one.
//!
//! # Example
//!
//! ```
//! use sectionweave::prelude::*;
//!
//! let dispatcher = Dispatcher::new();
//! let fruit = ListProvider::with_sections(dispatcher.handle(), vec![vec!["apple"], vec!["fig", "kiwi"]]);
//! let veg = ListProvider::with_sections(dispatcher.handle(), vec![vec!["leek"]]);
//!
//! let list = CompositeProvider::new();
//! list.add(fruit.clone());
//! list.add(veg.clone());
//!
//! assert_eq!(list.section_count(), 3);
//! assert_eq!(list.row_count(1), 2);
//! assert_eq!(list.cell(IndexPath::new(2, 0)).as_string(), Some("leek"));
//! ```

pub use sectionweave_core::*;

mod cell;
mod composite;
mod composition;
mod error;
mod index;
mod list_provider;
pub mod loading;
mod mapping;
pub mod prelude;
mod provider;
mod update;

pub use cell::CellData;
pub use composite::{CompositeConfig, CompositeProvider, remap};
pub use composition::Composition;
pub use error::{CompositionError, LoadingError, Result, TransitionError};
pub use index::{IndexPath, SectionSet};
pub use list_provider::ListProvider;
pub use loading::{
    ContentLoadingController, ContentLoadingCoordinator, ContentLoadingDelegate, ContentLoadingState,
    ContentLoadingStateMachine, LoadingOutcome, LoadingUpdate,
};
pub use mapping::SectionMapping;
pub use provider::{
    ContentLoading, ObjectLookup, ProviderBase, ProviderCapabilities, ProviderId, ProviderSignals,
    SectionProvider,
};
pub use update::{
    Action, BatchUpdate, ChangeKind, RowAnimation, RowsUpdate, SectionsUpdate, Update, UpdateTarget,
};
