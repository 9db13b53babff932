//! Listing aggregate.

use chrono::{DateTime, Utc};
use common::{Address, ListingId};
use events::{
    FeeDetailsData, ListingCreatedData, ListingModifiedData, ListingType, TokenDetailsData,
    TokenSpec,
};
use serde::{Deserialize, Serialize};

use crate::status::ListingStatus;

/// The central aggregate: one record per listing.
///
/// A listing is born on whichever event references it first and is refined
/// across up to three creation sub-events (core terms, token details, fee
/// details) in the same transaction. Until a field group has been applied
/// its fields hold explicit sentinels, never an absent value, so every read
/// is total:
///
/// - addresses: [`Address::ZERO`]
/// - amounts, ids, times, basis points: `0`
/// - flags: `false`
/// - [`ListingType`] / [`TokenSpec`]: `Unspecified`
/// - timestamps: the unix epoch
///
/// The live bid/offer pointers are genuinely nullable (a listing may never
/// receive a bid) and use `Option` rather than a sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Immutable, globally unique listing identifier.
    pub listing_id: ListingId,

    /// Marketplace contract that emitted this listing's events.
    pub marketplace: Address,

    /// Account that created the listing.
    pub seller: Address,

    /// Contract of the listed token.
    pub token_address: Address,

    /// Token id within the contract.
    pub token_id: u128,

    /// Token standard.
    pub token_spec: TokenSpec,

    /// True if the token is minted on sale rather than pre-existing.
    pub lazy: bool,

    /// Sale mechanism.
    pub listing_type: ListingType,

    /// Starting price (auction) or unit price (fixed/dynamic).
    pub initial_amount: u128,

    /// Number of sale units available.
    pub total_available: u32,

    /// Items delivered per sale unit sold.
    pub total_per_sale: u32,

    /// Items sold so far: the sum of `count × total_per_sale` over direct
    /// purchases plus `total_per_sale` per accepted offer or finalized
    /// auction. Derived; maintained only by the reducer.
    pub total_sold: u64,

    /// Sale start, as a unix timestamp.
    pub start_time: u64,

    /// Sale end, as a unix timestamp.
    pub end_time: u64,

    /// Anti-snipe auto-extend window in seconds.
    pub extension_interval: u32,

    /// Minimum bid increment in basis points.
    pub min_increment_bps: u16,

    /// Settlement currency; the zero address means the native coin.
    pub currency: Address,

    /// Optional gating contract; the zero address means no gating.
    pub identity_verifier: Address,

    /// Marketplace fee in basis points.
    pub marketplace_bps: u16,

    /// Referrer fee in basis points.
    pub referrer_bps: u16,

    /// Delivery fee in basis points.
    pub deliver_bps: u16,

    /// Fixed delivery fee.
    pub deliver_fixed: u128,

    /// Lifecycle state. Monotonic: Active, then at most one transition to a
    /// terminal state.
    pub status: ListingStatus,

    /// True once at least one bid has been applied.
    pub has_bid: bool,

    /// True once the listing has been finalized (settled or offer-accepted).
    pub finalized: bool,

    /// Most recently applied bidder, by chain order.
    pub current_bidder: Option<Address>,

    /// Amount of the most recently applied bid.
    pub current_bid_amount: Option<u128>,

    /// Most recently applied offerer, by chain order.
    pub current_offerer: Option<Address>,

    /// Amount of the most recently applied offer.
    pub current_offer_amount: Option<u128>,

    /// Block timestamp of the event that birthed this record.
    pub created_at: DateTime<Utc>,

    /// Block number of the event that birthed this record.
    pub created_at_block: u64,

    /// Block timestamp of the most recently applied event.
    pub updated_at: DateTime<Utc>,

    /// Block number of the most recently applied event. Also the optimistic
    /// concurrency token for store upserts.
    pub updated_at_block: u64,
}

impl Listing {
    /// Creates an all-sentinel listing for the given id.
    ///
    /// Used both for the first creation sub-event and for events that
    /// reference a listing with no prior creation event (not an error;
    /// ordering across event groups is not assumed).
    pub fn sentinel(listing_id: ListingId) -> Self {
        Self {
            listing_id,
            marketplace: Address::ZERO,
            seller: Address::ZERO,
            token_address: Address::ZERO,
            token_id: 0,
            token_spec: TokenSpec::Unspecified,
            lazy: false,
            listing_type: ListingType::Unspecified,
            initial_amount: 0,
            total_available: 0,
            total_per_sale: 0,
            total_sold: 0,
            start_time: 0,
            end_time: 0,
            extension_interval: 0,
            min_increment_bps: 0,
            currency: Address::ZERO,
            identity_verifier: Address::ZERO,
            marketplace_bps: 0,
            referrer_bps: 0,
            deliver_bps: 0,
            deliver_fixed: 0,
            status: ListingStatus::Active,
            has_bid: false,
            finalized: false,
            current_bidder: None,
            current_bid_amount: None,
            current_offerer: None,
            current_offer_amount: None,
            created_at: DateTime::UNIX_EPOCH,
            created_at_block: 0,
            updated_at: DateTime::UNIX_EPOCH,
            updated_at_block: 0,
        }
    }

    /// Overwrites the core-terms field group. All other groups keep their
    /// current (possibly sentinel) values. Idempotent for the same payload.
    pub fn merge_core_terms(&mut self, data: &ListingCreatedData) {
        self.seller = data.seller;
        self.listing_type = data.listing_type;
        self.initial_amount = data.initial_amount;
        self.total_available = data.total_available;
        self.total_per_sale = data.total_per_sale;
        self.start_time = data.start_time;
        self.end_time = data.end_time;
        self.extension_interval = data.extension_interval;
        self.min_increment_bps = data.min_increment_bps;
        self.currency = data.currency;
        self.identity_verifier = data.identity_verifier;
        self.marketplace_bps = data.marketplace_bps;
        self.referrer_bps = data.referrer_bps;
    }

    /// Overwrites the token-details field group only.
    pub fn merge_token_details(&mut self, data: &TokenDetailsData) {
        self.token_address = data.token_address;
        self.token_id = data.token_id;
        self.token_spec = data.token_spec;
        self.lazy = data.lazy;
    }

    /// Overwrites the delivery-fee field group only.
    pub fn merge_fee_details(&mut self, data: &FeeDetailsData) {
        self.deliver_bps = data.deliver_bps;
        self.deliver_fixed = data.deliver_fixed;
    }

    /// Applies a modification to price and schedule.
    pub fn merge_modify(&mut self, data: &ListingModifiedData) {
        self.initial_amount = data.initial_amount;
        self.start_time = data.start_time;
        self.end_time = data.end_time;
    }

    /// Records birth metadata from the event that materialized this record.
    pub fn record_birth(
        &mut self,
        marketplace: Address,
        block_number: u64,
        timestamp: DateTime<Utc>,
    ) {
        self.marketplace = marketplace;
        self.created_at = timestamp;
        self.created_at_block = block_number;
    }

    /// Advances the audit fields after an applied event.
    pub fn touch(&mut self, block_number: u64, timestamp: DateTime<Utc>) {
        self.updated_at = timestamp;
        self.updated_at_block = block_number;
    }

    /// Returns true if the listing is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
