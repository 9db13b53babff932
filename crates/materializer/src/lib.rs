//! Listing materialization core.
//!
//! This crate provides the pure reducer at the heart of the engine:
//! - [`Listing`] — the central aggregate, built up across partial creation
//!   sub-events with documented sentinel defaults
//! - [`ListingStatus`] — the monotonic lifecycle state machine
//! - Ledger record types appended exclusively by the reducer
//! - [`Materializer`] — `(current state, event) -> (new state, child writes)`,
//!   with no hidden mutable state and no suspension points

pub mod error;
pub mod listing;
pub mod records;
pub mod reducer;
pub mod status;

pub use error::{MaterializeError, Result};
pub use listing::Listing;
pub use records::{
    BidRecord, ChildWrite, EscrowRecord, OfferRecord, OfferStatus, OfferStatusUpdate,
    PurchaseRecord,
};
pub use reducer::{Applied, Materializer, SkipReason};
pub use status::ListingStatus;
