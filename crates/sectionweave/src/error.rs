//! Error types for the composition layer.

use std::sync::Arc;

use crate::loading::ContentLoadingState;
use crate::provider::ProviderId;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, CompositionError>;

/// Registration failures reported by a [`Composition`](crate::Composition).
///
/// The registry is unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    /// The provider is already registered in this composition.
    #[error("provider {0} is already registered")]
    AlreadyRegistered(ProviderId),

    /// The provider is not registered in this composition.
    #[error("provider {0} is not registered")]
    NotRegistered(ProviderId),

    /// The provider is registered in a different composition.
    #[error("provider {provider} is already owned by composition {owner}")]
    OwnedElsewhere { provider: ProviderId, owner: ProviderId },

    /// A composite cannot contain itself.
    #[error("provider {0} cannot be added to itself")]
    SelfComposition(ProviderId),
}

/// Rejected content-loading state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The requested transition is not an edge of the state graph.
    #[error("illegal content loading transition from {from} to {to}")]
    IllegalStateTransition {
        from: ContentLoadingState,
        to: ContentLoadingState,
    },
}

/// A content-loading failure, carried by the `error` state.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadingError {
    /// Loading failed with a message.
    #[error("content loading failed: {message}")]
    Failed { message: String },

    /// Loading failed with an underlying error.
    #[error(transparent)]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl LoadingError {
    /// Create a failure from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Wrap an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Arc::new(error))
    }
}

/// Two loading errors are equal when they render the same message.
impl PartialEq for LoadingError {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = ProviderId::next();
        let err = CompositionError::NotRegistered(id);
        assert_eq!(err.to_string(), format!("provider {id} is not registered"));

        let err = TransitionError::IllegalStateTransition {
            from: ContentLoadingState::Initial,
            to: ContentLoadingState::Loaded,
        };
        assert_eq!(
            err.to_string(),
            "illegal content loading transition from initial to loaded"
        );
    }

    #[test]
    fn test_loading_error_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "feed timed out");
        let err = LoadingError::other(io);
        assert_eq!(err.to_string(), "feed timed out");
        assert_eq!(err.clone(), err);
        assert_ne!(err, LoadingError::failed("feed timed out"));
    }
}
