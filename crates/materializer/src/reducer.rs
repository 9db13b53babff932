//! The listing materializer: a pure reducer over explicit state.

use events::{EventEnvelope, MarketplaceEvent};

use crate::error::{MaterializeError, Result};
use crate::listing::Listing;
use crate::records::{
    BidRecord, ChildWrite, EscrowRecord, OfferRecord, OfferStatus, OfferStatusUpdate,
    PurchaseRecord,
};
use crate::status::ListingStatus;

/// Why an event was skipped without mutating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A mutating event targeted a listing already in a terminal state.
    /// No field on a terminal listing ever changes again.
    TerminalState { status: ListingStatus },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TerminalState { status } => {
                write!(f, "listing is terminal ({status})")
            }
        }
    }
}

/// Outcome of applying one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The listing was updated; child writes accompany it.
    Listing {
        listing: Listing,
        writes: Vec<ChildWrite>,
    },

    /// The event touched no listing (escrow disbursements only).
    Detached { writes: Vec<ChildWrite> },

    /// The event was ignored; the listing is returned unchanged.
    Skipped {
        listing: Listing,
        reason: SkipReason,
    },
}

/// The pure reducer: `(current state, event) -> (new state, child writes)`.
///
/// Stateless by construction so unit tests can feed arbitrary starting
/// states directly. Must be invoked in strict per-listing chain order;
/// events for distinct listings may be applied concurrently by the caller.
/// Redelivery filtering is the caller's job — `apply` assumes every event
/// it sees is new.
#[derive(Debug, Clone, Copy, Default)]
pub struct Materializer;

impl Materializer {
    /// Creates a new materializer.
    pub fn new() -> Self {
        Self
    }

    /// Applies one decoded event to the current listing state.
    ///
    /// `current` is `None` when the store holds no record for the event's
    /// listing; a sentinel record is then materialized first, so an event
    /// referencing an unknown listing never errors.
    pub fn apply(
        &self,
        current: Option<Listing>,
        envelope: &EventEnvelope,
        event: &MarketplaceEvent,
    ) -> Result<Applied> {
        // Escrow disbursements are recorded independent of listing lifecycle.
        if let MarketplaceEvent::EscrowDisbursed(data) = event {
            return Ok(Applied::Detached {
                writes: vec![ChildWrite::Escrow(EscrowRecord {
                    id: envelope.tx_key(),
                    receiver: data.receiver,
                    currency: data.currency,
                    amount: data.amount,
                    timestamp: envelope.block_timestamp,
                    block_number: envelope.block_number,
                })],
            });
        }

        let listing_id =
            event
                .listing_id()
                .ok_or(MaterializeError::MissingListingReference {
                    event_type: event.event_type(),
                })?;

        let mut listing = match current {
            Some(listing) => listing,
            None => {
                let mut listing = Listing::sentinel(listing_id);
                listing.record_birth(
                    envelope.marketplace,
                    envelope.block_number,
                    envelope.block_timestamp,
                );
                listing
            }
        };

        // A decreasing block number means the upstream ordering guarantee
        // broke; absorbing it silently could corrupt financial totals.
        if envelope.block_number < listing.updated_at_block {
            return Err(MaterializeError::OutOfOrderEvent {
                listing_id,
                event_block: envelope.block_number,
                last_applied_block: listing.updated_at_block,
            });
        }

        // Terminal states are absorbing. Anything that is not a redelivery
        // (already filtered by the caller) is ignored wholesale.
        if listing.is_terminal() {
            let reason = SkipReason::TerminalState {
                status: listing.status,
            };
            tracing::warn!(
                listing_id = %listing_id,
                event_type = event.event_type(),
                tx_key = %envelope.tx_key(),
                %reason,
                "skipping event on terminal listing"
            );
            return Ok(Applied::Skipped { listing, reason });
        }

        let mut writes = Vec::new();

        match event {
            MarketplaceEvent::ListingCreated(data) => listing.merge_core_terms(data),
            MarketplaceEvent::TokenDetails(data) => listing.merge_token_details(data),
            MarketplaceEvent::FeeDetails(data) => listing.merge_fee_details(data),
            MarketplaceEvent::ListingModified(data) => listing.merge_modify(data),
            MarketplaceEvent::ListingCancelled(_) => {
                listing.status = ListingStatus::Cancelled;
            }
            MarketplaceEvent::BidPlaced(data) => {
                writes.push(ChildWrite::Bid(BidRecord {
                    id: envelope.tx_key(),
                    listing_id,
                    bidder: data.bidder,
                    amount: data.amount,
                    referrer: data.referrer,
                    timestamp: envelope.block_timestamp,
                    block_number: envelope.block_number,
                }));
                // Arrival order is the authority here, not amount
                // comparison; amount monotonicity is a contract guarantee.
                listing.has_bid = true;
                listing.current_bidder = Some(data.bidder);
                listing.current_bid_amount = Some(data.amount);
            }
            MarketplaceEvent::OfferPlaced(data) => {
                writes.push(ChildWrite::Offer(OfferRecord {
                    id: envelope.tx_key(),
                    listing_id,
                    offerer: data.offerer,
                    amount: data.amount,
                    referrer: data.referrer,
                    status: OfferStatus::Pending,
                    timestamp: envelope.block_timestamp,
                    block_number: envelope.block_number,
                }));
                // Single tracked-offer pointer, last applied wins.
                listing.current_offerer = Some(data.offerer);
                listing.current_offer_amount = Some(data.amount);
            }
            MarketplaceEvent::OfferRescinded(data) => {
                writes.push(ChildWrite::OfferStatus(OfferStatusUpdate {
                    listing_id,
                    offerer: data.offerer,
                    status: OfferStatus::Rescinded,
                }));
                // Clear the tracked offer only if it points at this exact
                // offerer; a different, later offer is still live.
                if listing.current_offerer == Some(data.offerer) {
                    listing.current_offerer = None;
                    listing.current_offer_amount = None;
                }
            }
            MarketplaceEvent::OfferAccepted(data) => {
                writes.push(ChildWrite::OfferStatus(OfferStatusUpdate {
                    listing_id,
                    offerer: data.offerer,
                    status: OfferStatus::Accepted,
                }));
                writes.push(ChildWrite::Purchase(PurchaseRecord {
                    id: envelope.tx_key(),
                    listing_id,
                    buyer: data.offerer,
                    count: listing.total_per_sale,
                    amount: data.amount,
                    referrer: None,
                    timestamp: envelope.block_timestamp,
                    block_number: envelope.block_number,
                }));
                listing.total_sold += u64::from(listing.total_per_sale);
                listing.status = ListingStatus::Finalized;
                listing.finalized = true;
            }
            MarketplaceEvent::ListingPurchased(data) => {
                writes.push(ChildWrite::Purchase(PurchaseRecord {
                    id: envelope.tx_key(),
                    listing_id,
                    buyer: data.buyer,
                    count: data.count,
                    amount: data.amount,
                    referrer: data.referrer,
                    timestamp: envelope.block_timestamp,
                    block_number: envelope.block_number,
                }));
                // `count` is sale units; each unit delivers `total_per_sale`
                // items. Never re-derive this from token transfer counts.
                listing.total_sold +=
                    u64::from(data.count) * u64::from(listing.total_per_sale);
            }
            MarketplaceEvent::ListingFinalized(_) => {
                listing.status = ListingStatus::Finalized;
                listing.finalized = true;
                // A naturally ending auction has no separate buy action;
                // the winning bid becomes the purchase.
                if listing.has_bid
                    && let Some(bidder) = listing.current_bidder
                    && let Some(amount) = listing.current_bid_amount
                {
                    writes.push(ChildWrite::Purchase(PurchaseRecord {
                        id: envelope.tx_key(),
                        listing_id,
                        buyer: bidder,
                        count: listing.total_per_sale,
                        amount,
                        referrer: None,
                        timestamp: envelope.block_timestamp,
                        block_number: envelope.block_number,
                    }));
                    listing.total_sold += u64::from(listing.total_per_sale);
                }
            }
            MarketplaceEvent::EscrowDisbursed(_) => unreachable!("handled above"),
        }

        listing.touch(envelope.block_number, envelope.block_timestamp);

        Ok(Applied::Listing { listing, writes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Address, ListingId, TxHash, TxKey};
    use events::{
        BidPlacedData, EscrowDisbursedData, FeeDetailsData, ListingCancelledData,
        ListingCreatedData, ListingFinalizedData, ListingModifiedData, ListingPurchasedData,
        ListingType, OfferAcceptedData, OfferPlacedData, OfferRescindedData, TokenDetailsData,
        TokenSpec,
    };

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn envelope(event: &MarketplaceEvent, block: u64, log_index: u32) -> EventEnvelope {
        EventEnvelope::builder()
            .marketplace(addr(0xFE))
            .tx_hash(TxHash::from_bytes([block as u8; 32]))
            .log_index(log_index)
            .block_number(block)
            .block_timestamp(chrono::DateTime::from_timestamp(block as i64, 0).unwrap())
            .event(event)
            .unwrap()
            .build()
    }

    fn core_terms(listing_id: u64, listing_type: ListingType, total_per_sale: u32) -> MarketplaceEvent {
        MarketplaceEvent::ListingCreated(ListingCreatedData {
            listing_id: ListingId::new(listing_id),
            seller: addr(1),
            listing_type,
            initial_amount: 100,
            total_available: 1,
            total_per_sale,
            start_time: 0,
            end_time: 1_000,
            extension_interval: 0,
            min_increment_bps: 0,
            currency: Address::ZERO,
            identity_verifier: Address::ZERO,
            marketplace_bps: 250,
            referrer_bps: 0,
        })
    }

    fn bid(listing_id: u64, bidder: Address, amount: u128) -> MarketplaceEvent {
        MarketplaceEvent::BidPlaced(BidPlacedData {
            listing_id: ListingId::new(listing_id),
            bidder,
            amount,
            referrer: None,
        })
    }

    fn offer(listing_id: u64, offerer: Address, amount: u128) -> MarketplaceEvent {
        MarketplaceEvent::OfferPlaced(OfferPlacedData {
            listing_id: ListingId::new(listing_id),
            offerer,
            amount,
            referrer: None,
        })
    }

    /// Runs a sequence of (event, block) pairs through the reducer,
    /// collecting the final listing and all child writes.
    fn run(events: &[(MarketplaceEvent, u64)]) -> (Listing, Vec<ChildWrite>) {
        let reducer = Materializer::new();
        let mut listing: Option<Listing> = None;
        let mut all_writes = Vec::new();

        for (log_index, (event, block)) in events.iter().enumerate() {
            let env = envelope(event, *block, log_index as u32);
            match reducer.apply(listing.take(), &env, event).unwrap() {
                Applied::Listing { listing: l, writes } => {
                    listing = Some(l);
                    all_writes.extend(writes);
                }
                Applied::Skipped { listing: l, .. } => listing = Some(l),
                Applied::Detached { writes } => all_writes.extend(writes),
            }
        }

        (listing.unwrap(), all_writes)
    }

    #[test]
    fn auction_win_scenario() {
        let (listing, writes) = run(&[
            (core_terms(42, ListingType::IndividualAuction, 1), 10),
            (
                MarketplaceEvent::TokenDetails(TokenDetailsData {
                    listing_id: ListingId::new(42),
                    token_address: addr(0xAA),
                    token_id: 7,
                    token_spec: TokenSpec::Erc721,
                    lazy: false,
                }),
                10,
            ),
            (
                MarketplaceEvent::FeeDetails(FeeDetailsData {
                    listing_id: ListingId::new(42),
                    deliver_bps: 250,
                    deliver_fixed: 0,
                }),
                10,
            ),
            (bid(42, addr(0xB1), 120), 11),
            (bid(42, addr(0xB2), 150), 12),
            (
                MarketplaceEvent::ListingFinalized(ListingFinalizedData {
                    listing_id: ListingId::new(42),
                }),
                13,
            ),
        ]);

        assert_eq!(listing.status, ListingStatus::Finalized);
        assert!(listing.finalized);
        assert!(listing.has_bid);
        assert_eq!(listing.current_bidder, Some(addr(0xB2)));
        assert_eq!(listing.current_bid_amount, Some(150));
        assert_eq!(listing.total_sold, 1);

        let purchases: Vec<_> = writes
            .iter()
            .filter_map(|w| match w {
                ChildWrite::Purchase(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].buyer, addr(0xB2));
        assert_eq!(purchases[0].amount, 150);
        assert_eq!(purchases[0].count, 1);
    }

    #[test]
    fn offer_acceptance_scenario() {
        let (listing, writes) = run(&[
            (core_terms(7, ListingType::OffersOnly, 2), 10),
            (offer(7, addr(0x01), 50), 11),
            (offer(7, addr(0x02), 80), 12),
            (
                MarketplaceEvent::OfferAccepted(OfferAcceptedData {
                    listing_id: ListingId::new(7),
                    offerer: addr(0x02),
                    amount: 80,
                }),
                13,
            ),
        ]);

        assert_eq!(listing.status, ListingStatus::Finalized);
        assert_eq!(listing.total_sold, 2);

        let accepted: Vec<_> = writes
            .iter()
            .filter_map(|w| match w {
                ChildWrite::OfferStatus(u) if u.status == OfferStatus::Accepted => Some(u),
                _ => None,
            })
            .collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].offerer, addr(0x02));

        let purchases: Vec<_> = writes
            .iter()
            .filter_map(|w| match w {
                ChildWrite::Purchase(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].buyer, addr(0x02));
        assert_eq!(purchases[0].amount, 80);
        assert_eq!(purchases[0].count, 2);
    }

    #[test]
    fn rescind_does_not_clobber_unrelated_tracked_offer() {
        let (listing, _) = run(&[
            (core_terms(9, ListingType::OffersOnly, 1), 10),
            (offer(9, addr(0x01), 10), 11),
            (offer(9, addr(0x02), 20), 12),
            (
                MarketplaceEvent::OfferRescinded(OfferRescindedData {
                    listing_id: ListingId::new(9),
                    offerer: addr(0x01),
                }),
                13,
            ),
        ]);

        assert_eq!(listing.current_offerer, Some(addr(0x02)));
        assert_eq!(listing.current_offer_amount, Some(20));
    }

    #[test]
    fn rescind_clears_matching_tracked_offer() {
        let (listing, writes) = run(&[
            (core_terms(9, ListingType::OffersOnly, 1), 10),
            (offer(9, addr(0x01), 10), 11),
            (
                MarketplaceEvent::OfferRescinded(OfferRescindedData {
                    listing_id: ListingId::new(9),
                    offerer: addr(0x01),
                }),
                12,
            ),
        ]);

        assert_eq!(listing.current_offerer, None);
        assert_eq!(listing.current_offer_amount, None);
        assert!(writes.iter().any(|w| matches!(
            w,
            ChildWrite::OfferStatus(u) if u.status == OfferStatus::Rescinded
        )));
    }

    #[test]
    fn cancellation_is_terminal() {
        let reducer = Materializer::new();
        let (listing, _) = run(&[
            (core_terms(3, ListingType::IndividualAuction, 1), 10),
            (
                MarketplaceEvent::ListingCancelled(ListingCancelledData {
                    listing_id: ListingId::new(3),
                }),
                11,
            ),
        ]);
        assert_eq!(listing.status, ListingStatus::Cancelled);

        // A bid arriving after cancellation is skipped wholesale: no record,
        // no pointer promotion.
        let late_bid = bid(3, addr(0xB1), 100);
        let env = envelope(&late_bid, 12, 0);
        let outcome = reducer.apply(Some(listing.clone()), &env, &late_bid).unwrap();

        match outcome {
            Applied::Skipped { listing: after, reason } => {
                assert_eq!(
                    reason,
                    SkipReason::TerminalState {
                        status: ListingStatus::Cancelled
                    }
                );
                assert_eq!(after, listing);
                assert!(!after.has_bid);
                assert!(after.current_bidder.is_none());
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn modify_skipped_on_terminal_listing() {
        let reducer = Materializer::new();
        let (listing, _) = run(&[
            (core_terms(3, ListingType::FixedPrice, 1), 10),
            (
                MarketplaceEvent::ListingCancelled(ListingCancelledData {
                    listing_id: ListingId::new(3),
                }),
                11,
            ),
        ]);

        let modify = MarketplaceEvent::ListingModified(ListingModifiedData {
            listing_id: ListingId::new(3),
            initial_amount: 999,
            start_time: 5,
            end_time: 6,
        });
        let env = envelope(&modify, 12, 0);
        let outcome = reducer.apply(Some(listing), &env, &modify).unwrap();

        match outcome {
            Applied::Skipped { listing, .. } => {
                assert_eq!(listing.initial_amount, 100);
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn unknown_listing_reference_creates_sentinel() {
        let reducer = Materializer::new();
        let event = bid(99, addr(0xB1), 40);
        let env = envelope(&event, 50, 2);

        let outcome = reducer.apply(None, &env, &event).unwrap();
        match outcome {
            Applied::Listing { listing, writes } => {
                assert_eq!(listing.listing_id, ListingId::new(99));
                assert_eq!(listing.seller, Address::ZERO);
                assert_eq!(listing.listing_type, ListingType::Unspecified);
                assert_eq!(listing.marketplace, addr(0xFE));
                assert_eq!(listing.created_at_block, 50);
                assert!(listing.has_bid);
                assert_eq!(writes.len(), 1);
            }
            other => panic!("expected applied listing, got {other:?}"),
        }
    }

    #[test]
    fn purchase_multiplies_units_by_per_sale() {
        let purchase = MarketplaceEvent::ListingPurchased(ListingPurchasedData {
            listing_id: ListingId::new(5),
            buyer: addr(0xC1),
            count: 3,
            amount: 300,
            referrer: Some(addr(0xD1)),
        });
        let (listing, writes) = run(&[
            (core_terms(5, ListingType::FixedPrice, 4), 10),
            (purchase, 11),
        ]);

        // 3 units × 4 items per unit
        assert_eq!(listing.total_sold, 12);
        assert_eq!(listing.status, ListingStatus::Active);
        assert!(writes.iter().any(|w| matches!(
            w,
            ChildWrite::Purchase(p) if p.count == 3 && p.referrer == Some(addr(0xD1))
        )));
    }

    #[test]
    fn finalize_without_bid_synthesizes_nothing() {
        let (listing, writes) = run(&[
            (core_terms(8, ListingType::IndividualAuction, 1), 10),
            (
                MarketplaceEvent::ListingFinalized(ListingFinalizedData {
                    listing_id: ListingId::new(8),
                }),
                11,
            ),
        ]);

        assert_eq!(listing.status, ListingStatus::Finalized);
        assert!(listing.finalized);
        assert_eq!(listing.total_sold, 0);
        assert!(!writes.iter().any(|w| matches!(w, ChildWrite::Purchase(_))));
    }

    #[test]
    fn escrow_event_is_detached() {
        let reducer = Materializer::new();
        let event = MarketplaceEvent::EscrowDisbursed(EscrowDisbursedData {
            receiver: addr(0xE1),
            currency: Address::ZERO,
            amount: 77,
        });
        let env = envelope(&event, 20, 1);

        let outcome = reducer.apply(None, &env, &event).unwrap();
        match outcome {
            Applied::Detached { writes } => {
                assert_eq!(writes.len(), 1);
                match &writes[0] {
                    ChildWrite::Escrow(record) => {
                        assert_eq!(record.receiver, addr(0xE1));
                        assert_eq!(record.amount, 77);
                        assert_eq!(record.id, TxKey::new(TxHash::from_bytes([20u8; 32]), 1));
                    }
                    other => panic!("expected escrow write, got {other:?}"),
                }
            }
            other => panic!("expected detached outcome, got {other:?}"),
        }
    }

    #[test]
    fn out_of_order_block_is_fatal() {
        let reducer = Materializer::new();
        let (listing, _) = run(&[(core_terms(4, ListingType::FixedPrice, 1), 100)]);

        let event = bid(4, addr(0xB1), 10);
        let env = envelope(&event, 99, 0);
        let result = reducer.apply(Some(listing), &env, &event);

        assert!(matches!(
            result,
            Err(MaterializeError::OutOfOrderEvent {
                event_block: 99,
                last_applied_block: 100,
                ..
            })
        ));
    }

    #[test]
    fn same_block_events_are_in_order() {
        // The three creation sub-events share one transaction and block.
        let (listing, _) = run(&[
            (core_terms(6, ListingType::FixedPrice, 1), 10),
            (
                MarketplaceEvent::TokenDetails(TokenDetailsData {
                    listing_id: ListingId::new(6),
                    token_address: addr(0xAA),
                    token_id: 1,
                    token_spec: TokenSpec::Erc1155,
                    lazy: true,
                }),
                10,
            ),
        ]);

        assert_eq!(listing.token_spec, TokenSpec::Erc1155);
        assert!(listing.lazy);
        assert_eq!(listing.updated_at_block, 10);
    }

    #[test]
    fn bid_pointer_follows_arrival_order_not_amount() {
        // Amount monotonicity is the contract's concern, not ours; a lower
        // later bid still wins the pointer.
        let (listing, _) = run(&[
            (core_terms(2, ListingType::IndividualAuction, 1), 10),
            (bid(2, addr(0xB1), 500), 11),
            (bid(2, addr(0xB2), 100), 12),
        ]);

        assert_eq!(listing.current_bidder, Some(addr(0xB2)));
        assert_eq!(listing.current_bid_amount, Some(100));
    }

    #[test]
    fn audit_fields_track_latest_applied_event() {
        let (listing, _) = run(&[
            (core_terms(2, ListingType::IndividualAuction, 1), 10),
            (bid(2, addr(0xB1), 500), 15),
        ]);

        assert_eq!(listing.created_at_block, 10);
        assert_eq!(listing.updated_at_block, 15);
    }
}
