//! Hub error types

use thiserror::Error;

/// Error returned when an event cannot be handed to the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub worker has stopped, or no strong handle is left
    #[error("hub is closed")]
    Closed,

    /// The event intake is full; a capacity problem, not a peer failure
    #[error("hub intake is full")]
    IntakeFull,
}
