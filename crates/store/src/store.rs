use async_trait::async_trait;
use common::{Address, ListingId, TxKey};
use materializer::{
    BidRecord, ChildWrite, EscrowRecord, Listing, OfferRecord, OfferStatus, PurchaseRecord,
};

use crate::Result;

/// One event's durable effects: the listing upsert (if the event touched a
/// listing), the ledger writes, and the idempotency mark.
#[derive(Debug, Clone)]
pub struct EventCommit {
    /// The updated listing and its concurrency guard, if any.
    pub listing: Option<(Listing, UpsertOptions)>,

    /// Ledger writes produced by the reducer for this event.
    pub writes: Vec<ChildWrite>,

    /// The event's idempotency key, marked applied on success.
    pub tx_key: TxKey,
}

/// Options for upserting a listing.
///
/// The expectation is an optimistic concurrency check keyed on the stored
/// listing's `updated_at_block`: two workers racing on the same listing
/// cannot interleave partial updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpsertOptions {
    /// Expected stored `updated_at_block` (`Some(None)` means "no record
    /// yet"). If the outer Option is None, no check is performed.
    pub expected_block: Option<Option<u64>>,
}

impl UpsertOptions {
    /// Creates options with no concurrency check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting no stored record for this listing.
    pub fn expect_absent() -> Self {
        Self {
            expected_block: Some(None),
        }
    }

    /// Creates options expecting the stored record to be at the given
    /// `updated_at_block`.
    pub fn expect_block(block: u64) -> Self {
        Self {
            expected_block: Some(Some(block)),
        }
    }
}

/// Core trait for materialized-state stores.
///
/// The listing table supports get-by-id and compare-and-swap upsert; the
/// four ledgers are append-only (offer status flips excepted) and are
/// written exclusively by the materialization pipeline. All implementations
/// must be thread-safe (Send + Sync).
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Retrieves a listing by id.
    async fn get_listing(&self, listing_id: ListingId) -> Result<Option<Listing>>;

    /// Inserts or replaces a listing.
    ///
    /// If `options.expected_block` is set, fails with
    /// [`crate::StoreError::ConcurrencyConflict`] when the stored
    /// `updated_at_block` (or absence of a record) does not match.
    async fn upsert_listing(&self, listing: Listing, options: UpsertOptions) -> Result<()>;

    /// Appends a bid record.
    async fn append_bid(&self, bid: BidRecord) -> Result<()>;

    /// Appends an offer record.
    async fn append_offer(&self, offer: OfferRecord) -> Result<()>;

    /// Appends a purchase record.
    async fn append_purchase(&self, purchase: PurchaseRecord) -> Result<()>;

    /// Appends an escrow record.
    async fn append_escrow(&self, escrow: EscrowRecord) -> Result<()>;

    /// Flips the status of the most recent PENDING offer from `offerer` on
    /// `listing_id`. Returns false if no such offer exists; a miss is the
    /// caller's to log, not an error.
    async fn update_offer_status(
        &self,
        listing_id: ListingId,
        offerer: Address,
        status: OfferStatus,
    ) -> Result<bool>;

    /// Returns true if the event with this key has already been applied.
    async fn is_applied(&self, tx_key: TxKey) -> Result<bool>;

    /// Records that the event with this key has been applied.
    async fn mark_applied(&self, tx_key: TxKey) -> Result<()>;

    /// Persists one event's effects as a single unit: listing upsert,
    /// ledger writes, and the idempotency mark commit or fail together.
    /// A redelivery arriving after a failed commit must observe none of the
    /// event's effects, or `total_sold` and the ledgers would double-count.
    async fn commit_event(&self, commit: EventCommit) -> Result<()>;

    /// Retrieves all bids for a listing, in chain order.
    async fn bids_for_listing(&self, listing_id: ListingId) -> Result<Vec<BidRecord>>;

    /// Retrieves all offers for a listing, in chain order.
    async fn offers_for_listing(&self, listing_id: ListingId) -> Result<Vec<OfferRecord>>;

    /// Retrieves all purchases for a listing, in chain order.
    async fn purchases_for_listing(&self, listing_id: ListingId) -> Result<Vec<PurchaseRecord>>;

    /// Retrieves all bids placed by an account, in chain order.
    async fn bids_by_bidder(&self, bidder: Address) -> Result<Vec<BidRecord>>;

    /// Retrieves all offers placed by an account, in chain order.
    async fn offers_by_offerer(&self, offerer: Address) -> Result<Vec<OfferRecord>>;

    /// Retrieves all purchases made by an account, in chain order.
    async fn purchases_by_buyer(&self, buyer: Address) -> Result<Vec<PurchaseRecord>>;

    /// Retrieves all escrow disbursements to a receiver, in chain order.
    async fn escrows_for_receiver(&self, receiver: Address) -> Result<Vec<EscrowRecord>>;

    /// Retrieves all listings created by a seller.
    async fn listings_by_seller(&self, seller: Address) -> Result<Vec<Listing>>;
}

