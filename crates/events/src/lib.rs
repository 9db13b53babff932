//! Typed marketplace event-log model.
//!
//! This crate defines the canonical event records emitted by the marketplace
//! contract and the seam through which they are delivered:
//! - [`MarketplaceEvent`] — one variant per event kind, with typed payloads
//! - [`EventEnvelope`] — an event plus its chain metadata (transaction hash,
//!   log index, block number, block timestamp)
//! - [`EventSource`] — an ordered, at-least-once stream of envelopes

pub mod envelope;
pub mod error;
pub mod event;
pub mod source;

pub use envelope::{EventEnvelope, EventEnvelopeBuilder};
pub use error::{EventError, Result};
pub use event::{
    BidPlacedData, EscrowDisbursedData, FeeDetailsData, ListingCancelledData, ListingCreatedData,
    ListingFinalizedData, ListingModifiedData, ListingPurchasedData, ListingType,
    MarketplaceEvent, OfferAcceptedData, OfferPlacedData, OfferRescindedData, TokenDetailsData,
    TokenSpec,
};
pub use source::{EventSource, EventStream, InMemoryEventSource};
