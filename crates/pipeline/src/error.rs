use common::ListingId;
use thiserror::Error;

/// Errors that can occur while ingesting events.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An error from the event layer outside the malformed-skip path.
    #[error("event error: {0}")]
    Event(#[from] events::EventError),

    /// A fatal reducer error (ordering violation).
    #[error("materialize error: {0}")]
    Materialize(#[from] materializer::MaterializeError),

    /// An error from the market store.
    #[error("store error: {0}")]
    Store(#[from] store::StoreError),

    /// The listing was poisoned by an earlier ordering violation; its
    /// events are rejected until an operator intervenes.
    #[error("listing {0} is poisoned by an earlier ordering violation")]
    Poisoned(ListingId),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
