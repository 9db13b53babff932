use common::ListingId;
use thiserror::Error;

/// Fatal errors from the reducer.
///
/// Skippable conditions (terminal-state violations, malformed payloads,
/// duplicates) are not errors here; they are handled as skip outcomes or at
/// the pipeline boundary. The only fatal condition is an upstream
/// ordering-guarantee failure, which must not be silently absorbed because
/// reordering could corrupt financial totals.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// An event arrived for a block earlier than the listing's last applied
    /// block. Fatal for that listing's pipeline.
    #[error(
        "out-of-order event for listing {listing_id}: block {event_block} precedes last applied block {last_applied_block}"
    )]
    OutOfOrderEvent {
        listing_id: ListingId,
        event_block: u64,
        last_applied_block: u64,
    },

    /// An event kind that requires a listing reference arrived without one.
    #[error("event {event_type} carries no listing reference")]
    MissingListingReference { event_type: &'static str },
}

/// Result type for reducer operations.
pub type Result<T> = std::result::Result<T, MaterializeError>;
