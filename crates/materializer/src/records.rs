//! Append-only ledger record types.
//!
//! These records are written exclusively by the reducer and never mutated
//! afterwards, with one exception: an offer's status moves from Pending to
//! Rescinded or Accepted.

use chrono::{DateTime, Utc};
use common::{Address, ListingId, TxKey};
use serde::{Deserialize, Serialize};

/// A bid applied to an auction listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    /// Identity of the emitting event; unique across redeliveries.
    pub id: TxKey,

    /// Listing the bid targets.
    pub listing_id: ListingId,

    /// Bidding account.
    pub bidder: Address,

    /// Bid amount.
    pub amount: u128,

    /// Referrer credited for the bid, if any.
    pub referrer: Option<Address>,

    /// Block timestamp of the bid.
    pub timestamp: DateTime<Utc>,

    /// Block number of the bid.
    pub block_number: u64,
}

/// Status of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OfferStatus {
    /// Offer is outstanding.
    #[default]
    Pending,

    /// Offer was withdrawn by the offerer.
    Rescinded,

    /// Offer was accepted by the seller.
    Accepted,
}

impl OfferStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "Pending",
            OfferStatus::Rescinded => "Rescinded",
            OfferStatus::Accepted => "Accepted",
        }
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An offer made on a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRecord {
    /// Identity of the emitting event.
    pub id: TxKey,

    /// Listing the offer targets.
    pub listing_id: ListingId,

    /// Offering account.
    pub offerer: Address,

    /// Offer amount.
    pub amount: u128,

    /// Referrer credited for the offer, if any.
    pub referrer: Option<Address>,

    /// Current status; the only mutable field on any ledger record.
    pub status: OfferStatus,

    /// Block timestamp of the offer.
    pub timestamp: DateTime<Utc>,

    /// Block number of the offer.
    pub block_number: u64,
}

/// A completed sale attributed to a listing.
///
/// Created by direct purchases, accepted offers, or synthesized when an
/// auction with a standing bid finalizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Identity of the emitting event. A finalize-synthesized purchase
    /// carries the finalize event's key.
    pub id: TxKey,

    /// Listing the purchase is attributed to.
    pub listing_id: ListingId,

    /// Buying account.
    pub buyer: Address,

    /// For direct purchases: sale units bought (each delivering
    /// `total_per_sale` items). For accepted offers and finalize-synthesized
    /// purchases: the item count, `total_per_sale`.
    pub count: u32,

    /// Total amount paid.
    pub amount: u128,

    /// Referrer credited for the purchase, if any.
    pub referrer: Option<Address>,

    /// Block timestamp of the purchase.
    pub timestamp: DateTime<Utc>,

    /// Block number of the purchase.
    pub block_number: u64,
}

/// A fee or proceeds disbursement. Not listing-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Identity of the emitting event.
    pub id: TxKey,

    /// Account receiving the disbursement.
    pub receiver: Address,

    /// Currency of the disbursement; the zero address means the native coin.
    pub currency: Address,

    /// Amount disbursed.
    pub amount: u128,

    /// Block timestamp of the disbursement.
    pub timestamp: DateTime<Utc>,

    /// Block number of the disbursement.
    pub block_number: u64,
}

/// A status flip for the most recent pending offer from an offerer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferStatusUpdate {
    /// Listing whose offer is updated.
    pub listing_id: ListingId,

    /// Offerer whose most recent pending offer is targeted.
    pub offerer: Address,

    /// New status.
    pub status: OfferStatus,
}

/// A write to one of the append-only ledgers, produced by the reducer
/// alongside the updated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildWrite {
    /// Append a bid record.
    Bid(BidRecord),

    /// Append an offer record.
    Offer(OfferRecord),

    /// Flip the status of an existing offer record.
    OfferStatus(OfferStatusUpdate),

    /// Append a purchase record.
    Purchase(PurchaseRecord),

    /// Append an escrow record.
    Escrow(EscrowRecord),
}
