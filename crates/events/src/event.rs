//! Marketplace contract events.

use common::{Address, ListingId};
use serde::{Deserialize, Serialize};

/// How a listing sells its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ListingType {
    /// Sentinel: the creation event carrying the type has not arrived yet.
    #[default]
    Unspecified,

    /// Single-lot English auction.
    IndividualAuction,

    /// Buy-now at a fixed price.
    FixedPrice,

    /// Price determined by a pricing curve on the contract.
    DynamicPrice,

    /// No ask; only offers can be made and accepted.
    OffersOnly,
}

impl ListingType {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::Unspecified => "Unspecified",
            ListingType::IndividualAuction => "IndividualAuction",
            ListingType::FixedPrice => "FixedPrice",
            ListingType::DynamicPrice => "DynamicPrice",
            ListingType::OffersOnly => "OffersOnly",
        }
    }
}

impl std::fmt::Display for ListingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Token standard of the listed asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TokenSpec {
    /// Sentinel: token details have not arrived yet.
    #[default]
    Unspecified,

    /// Unique token, one owner per id.
    Erc721,

    /// Semi-fungible token, balance per id.
    Erc1155,
}

impl TokenSpec {
    /// Returns the spec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSpec::Unspecified => "Unspecified",
            TokenSpec::Erc721 => "Erc721",
            TokenSpec::Erc1155 => "Erc1155",
        }
    }
}

impl std::fmt::Display for TokenSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Events emitted by the marketplace contract.
///
/// A single logical listing is constructed across up to three creation
/// sub-events in the same transaction: [`MarketplaceEvent::ListingCreated`]
/// (core terms), [`MarketplaceEvent::TokenDetails`], and
/// [`MarketplaceEvent::FeeDetails`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MarketplaceEvent {
    /// Core listing terms were recorded.
    ListingCreated(ListingCreatedData),

    /// Token details for a listing were recorded.
    TokenDetails(TokenDetailsData),

    /// Delivery fee terms for a listing were recorded.
    FeeDetails(FeeDetailsData),

    /// Price or schedule of an active listing was changed.
    ListingModified(ListingModifiedData),

    /// Listing was cancelled by the seller or an admin.
    ListingCancelled(ListingCancelledData),

    /// A bid was placed on an auction listing.
    BidPlaced(BidPlacedData),

    /// An offer was placed on a listing.
    OfferPlaced(OfferPlacedData),

    /// A previously placed offer was withdrawn.
    OfferRescinded(OfferRescindedData),

    /// The seller accepted an outstanding offer.
    OfferAccepted(OfferAcceptedData),

    /// One or more sale units were bought directly.
    ListingPurchased(ListingPurchasedData),

    /// An auction was settled.
    ListingFinalized(ListingFinalizedData),

    /// Escrowed fees or proceeds were disbursed to a receiver.
    EscrowDisbursed(EscrowDisbursedData),
}

impl MarketplaceEvent {
    /// Returns the event kind as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketplaceEvent::ListingCreated(_) => "ListingCreated",
            MarketplaceEvent::TokenDetails(_) => "TokenDetails",
            MarketplaceEvent::FeeDetails(_) => "FeeDetails",
            MarketplaceEvent::ListingModified(_) => "ListingModified",
            MarketplaceEvent::ListingCancelled(_) => "ListingCancelled",
            MarketplaceEvent::BidPlaced(_) => "BidPlaced",
            MarketplaceEvent::OfferPlaced(_) => "OfferPlaced",
            MarketplaceEvent::OfferRescinded(_) => "OfferRescinded",
            MarketplaceEvent::OfferAccepted(_) => "OfferAccepted",
            MarketplaceEvent::ListingPurchased(_) => "ListingPurchased",
            MarketplaceEvent::ListingFinalized(_) => "ListingFinalized",
            MarketplaceEvent::EscrowDisbursed(_) => "EscrowDisbursed",
        }
    }

    /// Returns the listing this event targets, if any.
    ///
    /// [`MarketplaceEvent::EscrowDisbursed`] is the only kind without a
    /// listing reference; it is recorded independent of listing lifecycle.
    pub fn listing_id(&self) -> Option<ListingId> {
        match self {
            MarketplaceEvent::ListingCreated(d) => Some(d.listing_id),
            MarketplaceEvent::TokenDetails(d) => Some(d.listing_id),
            MarketplaceEvent::FeeDetails(d) => Some(d.listing_id),
            MarketplaceEvent::ListingModified(d) => Some(d.listing_id),
            MarketplaceEvent::ListingCancelled(d) => Some(d.listing_id),
            MarketplaceEvent::BidPlaced(d) => Some(d.listing_id),
            MarketplaceEvent::OfferPlaced(d) => Some(d.listing_id),
            MarketplaceEvent::OfferRescinded(d) => Some(d.listing_id),
            MarketplaceEvent::OfferAccepted(d) => Some(d.listing_id),
            MarketplaceEvent::ListingPurchased(d) => Some(d.listing_id),
            MarketplaceEvent::ListingFinalized(d) => Some(d.listing_id),
            MarketplaceEvent::EscrowDisbursed(_) => None,
        }
    }
}

/// Data for the core-terms creation sub-event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCreatedData {
    /// The listing being created.
    pub listing_id: ListingId,

    /// Account that created the listing.
    pub seller: Address,

    /// Sale mechanism for this listing.
    pub listing_type: ListingType,

    /// Starting price (auction) or unit price (fixed/dynamic), in the
    /// listing currency's smallest unit.
    pub initial_amount: u128,

    /// Number of sale units available.
    pub total_available: u32,

    /// Items delivered per sale unit sold.
    pub total_per_sale: u32,

    /// Sale start, as a unix timestamp.
    pub start_time: u64,

    /// Sale end, as a unix timestamp.
    pub end_time: u64,

    /// Anti-snipe window: a bid inside this many seconds of the end extends
    /// the auction.
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
}

/// Data for the token-details creation sub-event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenDetailsData {
    /// The listing being refined.
    pub listing_id: ListingId,

    /// Contract of the listed token.
    pub token_address: Address,

    /// Token id within the contract.
    pub token_id: u128,

    /// Token standard.
    pub token_spec: TokenSpec,

    /// True if the token is minted on sale rather than pre-existing.
    pub lazy: bool,
}

/// Data for the fee-details creation sub-event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeDetailsData {
    /// The listing being refined.
    pub listing_id: ListingId,

    /// Delivery fee in basis points.
    pub deliver_bps: u16,

    /// Fixed delivery fee in the listing currency's smallest unit.
    pub deliver_fixed: u128,
}

/// Data for a listing modification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingModifiedData {
    /// The listing being modified.
    pub listing_id: ListingId,

    /// New initial amount.
    pub initial_amount: u128,

    /// New start time.
    pub start_time: u64,

    /// New end time.
    pub end_time: u64,
}

/// Data for a listing cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCancelledData {
    /// The listing being cancelled.
    pub listing_id: ListingId,
}

/// Data for a placed bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidPlacedData {
    /// The listing receiving the bid.
    pub listing_id: ListingId,

    /// Bidding account.
    pub bidder: Address,

    /// Bid amount.
    pub amount: u128,

    /// Referrer credited for the bid, if any.
    pub referrer: Option<Address>,
}

/// Data for a placed offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferPlacedData {
    /// The listing receiving the offer.
    pub listing_id: ListingId,

    /// Offering account.
    pub offerer: Address,

    /// Offer amount.
    pub amount: u128,

    /// Referrer credited for the offer, if any.
    pub referrer: Option<Address>,
}

/// Data for a rescinded offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferRescindedData {
    /// The listing the offer targeted.
    pub listing_id: ListingId,

    /// Account withdrawing its offer.
    pub offerer: Address,
}

/// Data for an accepted offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferAcceptedData {
    /// The listing being sold.
    pub listing_id: ListingId,

    /// Account whose offer was accepted.
    pub offerer: Address,

    /// Accepted amount.
    pub amount: u128,
}

/// Data for a direct purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingPurchasedData {
    /// The listing being bought from.
    pub listing_id: ListingId,

    /// Buying account.
    pub buyer: Address,

    /// Number of sale units bought. Each unit delivers
    /// `total_per_sale` items.
    pub count: u32,

    /// Total amount paid.
    pub amount: u128,

    /// Referrer credited for the purchase, if any.
    pub referrer: Option<Address>,
}

/// Data for an auction settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingFinalizedData {
    /// The listing being settled.
    pub listing_id: ListingId,
}

/// Data for an escrow disbursement. Not listing-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowDisbursedData {
    /// Account receiving the disbursement.
    pub receiver: Address,

    /// Currency of the disbursement; the zero address means the native coin.
    pub currency: Address,

    /// Amount disbursed.
    pub amount: u128,
}
