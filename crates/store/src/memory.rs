use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{Address, ListingId, TxKey};
use materializer::{
    BidRecord, ChildWrite, EscrowRecord, Listing, OfferRecord, OfferStatus, PurchaseRecord,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{EventCommit, MarketStore, UpsertOptions},
};

/// In-memory market store implementation for testing.
///
/// Ledgers keep insertion order; queries return records sorted by chain
/// position (block number, then log index).
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    listings: Arc<RwLock<HashMap<ListingId, Listing>>>,
    bids: Arc<RwLock<Vec<BidRecord>>>,
    offers: Arc<RwLock<Vec<OfferRecord>>>,
    purchases: Arc<RwLock<Vec<PurchaseRecord>>>,
    escrows: Arc<RwLock<Vec<EscrowRecord>>>,
    applied: Arc<RwLock<HashSet<TxKey>>>,
}

impl InMemoryMarketStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of listing records held.
    pub async fn listing_count(&self) -> usize {
        self.listings.read().await.len()
    }

    /// Clears all listings, ledgers, and the idempotency guard.
    pub async fn clear(&self) {
        self.listings.write().await.clear();
        self.bids.write().await.clear();
        self.offers.write().await.clear();
        self.purchases.write().await.clear();
        self.escrows.write().await.clear();
        self.applied.write().await.clear();
    }
}

fn chain_order(block_number: u64, log_index: u32) -> (u64, u32) {
    (block_number, log_index)
}

/// Flips the most recent pending offer from `offerer` on `listing_id`.
/// Returns false if no such offer exists.
fn flip_most_recent_pending(
    offers: &mut [OfferRecord],
    listing_id: ListingId,
    offerer: Address,
    status: OfferStatus,
) -> bool {
    let target = offers.iter_mut().rev().find(|o| {
        o.listing_id == listing_id && o.offerer == offerer && o.status == OfferStatus::Pending
    });

    match target {
        Some(offer) => {
            offer.status = status;
            true
        }
        None => false,
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn get_listing(&self, listing_id: ListingId) -> Result<Option<Listing>> {
        Ok(self.listings.read().await.get(&listing_id).cloned())
    }

    async fn upsert_listing(&self, listing: Listing, options: UpsertOptions) -> Result<()> {
        let mut listings = self.listings.write().await;
        let actual = listings
            .get(&listing.listing_id)
            .map(|stored| stored.updated_at_block);

        if let Some(expected) = options.expected_block
            && actual != expected
        {
            return Err(StoreError::ConcurrencyConflict {
                listing_id: listing.listing_id,
                expected,
                actual,
            });
        }

        listings.insert(listing.listing_id, listing);
        Ok(())
    }

    async fn append_bid(&self, bid: BidRecord) -> Result<()> {
        self.bids.write().await.push(bid);
        Ok(())
    }

    async fn append_offer(&self, offer: OfferRecord) -> Result<()> {
        self.offers.write().await.push(offer);
        Ok(())
    }

    async fn append_purchase(&self, purchase: PurchaseRecord) -> Result<()> {
        self.purchases.write().await.push(purchase);
        Ok(())
    }

    async fn append_escrow(&self, escrow: EscrowRecord) -> Result<()> {
        self.escrows.write().await.push(escrow);
        Ok(())
    }

    async fn update_offer_status(
        &self,
        listing_id: ListingId,
        offerer: Address,
        status: OfferStatus,
    ) -> Result<bool> {
        let mut offers = self.offers.write().await;
        Ok(flip_most_recent_pending(
            &mut offers,
            listing_id,
            offerer,
            status,
        ))
    }

    async fn is_applied(&self, tx_key: TxKey) -> Result<bool> {
        Ok(self.applied.read().await.contains(&tx_key))
    }

    async fn mark_applied(&self, tx_key: TxKey) -> Result<()> {
        self.applied.write().await.insert(tx_key);
        Ok(())
    }

    async fn commit_event(&self, commit: EventCommit) -> Result<()> {
        // All locks up front, in a fixed order, so the commit is observed
        // whole or not at all. The CAS check runs before any write.
        let mut listings = self.listings.write().await;
        let mut bids = self.bids.write().await;
        let mut offers = self.offers.write().await;
        let mut purchases = self.purchases.write().await;
        let mut escrows = self.escrows.write().await;
        let mut applied = self.applied.write().await;

        if let Some((listing, options)) = &commit.listing {
            let actual = listings
                .get(&listing.listing_id)
                .map(|stored| stored.updated_at_block);

            if let Some(expected) = options.expected_block
                && actual != expected
            {
                return Err(StoreError::ConcurrencyConflict {
                    listing_id: listing.listing_id,
                    expected,
                    actual,
                });
            }
        }

        for write in commit.writes {
            match write {
                ChildWrite::Bid(bid) => bids.push(bid),
                ChildWrite::Offer(offer) => offers.push(offer),
                ChildWrite::OfferStatus(update) => {
                    let matched = flip_most_recent_pending(
                        &mut offers,
                        update.listing_id,
                        update.offerer,
                        update.status,
                    );
                    if !matched {
                        tracing::warn!(
                            listing_id = %update.listing_id,
                            offerer = %update.offerer,
                            status = %update.status,
                            "offer status update matched no pending offer"
                        );
                    }
                }
                ChildWrite::Purchase(purchase) => purchases.push(purchase),
                ChildWrite::Escrow(escrow) => escrows.push(escrow),
            }
        }

        if let Some((listing, _)) = commit.listing {
            listings.insert(listing.listing_id, listing);
        }
        applied.insert(commit.tx_key);
        Ok(())
    }

    async fn bids_for_listing(&self, listing_id: ListingId) -> Result<Vec<BidRecord>> {
        let bids = self.bids.read().await;
        let mut matched: Vec<_> = bids
            .iter()
            .filter(|b| b.listing_id == listing_id)
            .cloned()
            .collect();
        matched.sort_by_key(|b| chain_order(b.block_number, b.id.log_index));
        Ok(matched)
    }

    async fn offers_for_listing(&self, listing_id: ListingId) -> Result<Vec<OfferRecord>> {
        let offers = self.offers.read().await;
        let mut matched: Vec<_> = offers
            .iter()
            .filter(|o| o.listing_id == listing_id)
            .cloned()
            .collect();
        matched.sort_by_key(|o| chain_order(o.block_number, o.id.log_index));
        Ok(matched)
    }

    async fn purchases_for_listing(&self, listing_id: ListingId) -> Result<Vec<PurchaseRecord>> {
        let purchases = self.purchases.read().await;
        let mut matched: Vec<_> = purchases
            .iter()
            .filter(|p| p.listing_id == listing_id)
            .cloned()
            .collect();
        matched.sort_by_key(|p| chain_order(p.block_number, p.id.log_index));
        Ok(matched)
    }

    async fn bids_by_bidder(&self, bidder: Address) -> Result<Vec<BidRecord>> {
        let bids = self.bids.read().await;
        let mut matched: Vec<_> = bids.iter().filter(|b| b.bidder == bidder).cloned().collect();
        matched.sort_by_key(|b| chain_order(b.block_number, b.id.log_index));
        Ok(matched)
    }

    async fn offers_by_offerer(&self, offerer: Address) -> Result<Vec<OfferRecord>> {
        let offers = self.offers.read().await;
        let mut matched: Vec<_> = offers
            .iter()
            .filter(|o| o.offerer == offerer)
            .cloned()
            .collect();
        matched.sort_by_key(|o| chain_order(o.block_number, o.id.log_index));
        Ok(matched)
    }

    async fn purchases_by_buyer(&self, buyer: Address) -> Result<Vec<PurchaseRecord>> {
        let purchases = self.purchases.read().await;
        let mut matched: Vec<_> = purchases
            .iter()
            .filter(|p| p.buyer == buyer)
            .cloned()
            .collect();
        matched.sort_by_key(|p| chain_order(p.block_number, p.id.log_index));
        Ok(matched)
    }

    async fn escrows_for_receiver(&self, receiver: Address) -> Result<Vec<EscrowRecord>> {
        let escrows = self.escrows.read().await;
        let mut matched: Vec<_> = escrows
            .iter()
            .filter(|e| e.receiver == receiver)
            .cloned()
            .collect();
        matched.sort_by_key(|e| chain_order(e.block_number, e.id.log_index));
        Ok(matched)
    }

    async fn listings_by_seller(&self, seller: Address) -> Result<Vec<Listing>> {
        let listings = self.listings.read().await;
        let mut matched: Vec<_> = listings
            .values()
            .filter(|l| l.seller == seller)
            .cloned()
            .collect();
        matched.sort_by_key(|l| l.listing_id);
        Ok(matched)
    }
}
