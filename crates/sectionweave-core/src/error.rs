//! Error types for sectionweave-core.

use thiserror::Error;

/// Failure to hand work to a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A bounded queue is full and the caller is the thread that drains it.
    #[error("dispatch queue is full")]
    QueueFull,
    /// The dispatcher has been dropped.
    #[error("dispatcher has been dropped")]
    Disconnected,
}

/// A specialized Result type for dispatch operations.
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
