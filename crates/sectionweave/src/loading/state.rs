//! Content loading states and their aggregation.

/// Where a provider is in its content loading lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentLoadingState {
    /// Nothing has been loaded yet.
    Initial,
    /// A load is in progress.
    Loading,
    /// The last load finished with content.
    Loaded,
    /// The last load finished without content.
    NoContent,
    /// The last load failed.
    Error,
}

impl Default for ContentLoadingState {
    fn default() -> Self {
        Self::Initial
    }
}

impl std::fmt::Display for ContentLoadingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::NoContent => write!(f, "noContent"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl ContentLoadingState {
    /// Every state, in declaration order.
    pub const ALL: [ContentLoadingState; 5] = [
        Self::Initial,
        Self::Loading,
        Self::Loaded,
        Self::NoContent,
        Self::Error,
    ];

    /// Returns `true` while a load is in progress.
    pub fn is_loading(self) -> bool {
        self == Self::Loading
    }

    /// Returns `true` for the terminal states: loaded, no content, error.
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded | Self::NoContent | Self::Error)
    }

    /// Whether `self -> to` is an edge of the state graph.
    ///
    /// Terminal states re-enter only through `Loading`. Self-transitions are
    /// not edges; callers treat them as no-ops before consulting the graph.
    pub fn can_transition_to(self, to: ContentLoadingState) -> bool {
        use ContentLoadingState::*;
        matches!(
            (self, to),
            (Initial, Loading)
                | (Loading, Loaded)
                | (Loading, NoContent)
                | (Loading, Error)
                | (Loaded, Loading)
                | (NoContent, Loading)
                | (Error, Loading)
        )
    }

    fn priority(self) -> u8 {
        match self {
            Self::Loading => 4,
            Self::Error => 3,
            Self::Loaded => 2,
            Self::NoContent => 1,
            Self::Initial => 0,
        }
    }

    /// Combine child states into a composite state.
    ///
    /// Priority is `loading > error > loaded > noContent > initial`. An empty
    /// set of children aggregates to `Initial`.
    pub fn aggregate<I>(states: I) -> ContentLoadingState
    where
        I: IntoIterator<Item = ContentLoadingState>,
    {
        states
            .into_iter()
            .max_by_key(|state| state.priority())
            .unwrap_or_default()
    }
}
