use common::ListingId;
use thiserror::Error;

/// Errors that can occur when interacting with the market store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrency conflict occurred when upserting a listing. The
    /// expected `updated_at_block` did not match the stored value
    /// (`None` means "no record").
    #[error(
        "concurrency conflict for listing {listing_id}: expected block {expected:?}, found {actual:?}"
    )]
    ConcurrencyConflict {
        listing_id: ListingId,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    /// A serialization/deserialization error occurred.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
