//! Commonly used types, for glob importing:
//!
//! ```
//! use sectionweave::prelude::*;
//! ```

// ============================================================================
// Providers
// ============================================================================

pub use crate::{
    CompositeConfig, CompositeProvider, ContentLoading, ListProvider, ObjectLookup, ProviderBase,
    SectionProvider,
};

// ============================================================================
// Coordinates and content
// ============================================================================

pub use crate::{CellData, IndexPath, SectionSet};

// ============================================================================
// Updates
// ============================================================================

pub use crate::{RowAnimation, Update, UpdateTarget};

// ============================================================================
// Loading
// ============================================================================

pub use crate::{ContentLoadingCoordinator, ContentLoadingState, LoadingError};

// ============================================================================
// Runtime
// ============================================================================

pub use crate::{DispatchHandle, Dispatcher, Signal};
