//! The ingestor: one event in, one atomic state change out.

use std::collections::HashSet;
use std::sync::Arc;

use common::ListingId;
use events::{EventEnvelope, EventError, EventSource, MarketplaceEvent};
use futures_util::StreamExt;
use materializer::{Applied, MaterializeError, Materializer};
use store::{EventCommit, MarketStore, StoreError, UpsertOptions};
use tokio::sync::RwLock;

use crate::error::{PipelineError, Result};

/// Retries for the listing compare-and-swap. Under the single-writer-per-
/// listing discipline a conflict resolves on the first reload.
const MAX_CAS_ATTEMPTS: usize = 3;

/// Summary of a catch-up run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Envelopes taken from the source.
    pub events_seen: u64,

    /// Events rejected because their listing is poisoned or went out of
    /// order. These are surfaced, never silently absorbed.
    pub failures: u64,
}

/// Ingests marketplace events into a market store.
///
/// Events for distinct listings may be fed through separate ingestor tasks
/// concurrently; events for one listing must arrive in chain order through
/// a single logical writer. Redelivery is tolerated: the idempotency guard
/// makes a re-applied event a no-op.
pub struct Ingestor<S: MarketStore> {
    store: S,
    reducer: Materializer,
    poisoned: Arc<RwLock<HashSet<ListingId>>>,
}

impl<S: MarketStore> Ingestor<S> {
    /// Creates a new ingestor over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            reducer: Materializer::new(),
            poisoned: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns true if the listing has been poisoned by an ordering
    /// violation.
    pub async fn is_poisoned(&self, listing_id: ListingId) -> bool {
        self.poisoned.read().await.contains(&listing_id)
    }

    /// Processes a single envelope.
    ///
    /// Malformed payloads and duplicates are absorbed here (logged, skipped,
    /// counted). Ordering violations poison the listing and propagate so
    /// operators see them; they never affect other listings.
    #[tracing::instrument(skip(self, envelope), fields(event_type = %envelope.event_type, tx_key = %envelope.tx_key()))]
    pub async fn process_event(&self, envelope: &EventEnvelope) -> Result<()> {
        let event = match envelope.decode() {
            Ok(event) => event,
            Err(EventError::Malformed { tx_key, source }) => {
                tracing::warn!(%tx_key, error = %source, "skipping malformed event");
                metrics::counter!("materializer_events_malformed").increment(1);
                return Ok(());
            }
            Err(other) => return Err(other.into()),
        };

        let tx_key = envelope.tx_key();
        if self.store.is_applied(tx_key).await? {
            // Expected under at-least-once delivery; not an error.
            tracing::debug!(%tx_key, "duplicate event, already applied");
            metrics::counter!("materializer_events_duplicate").increment(1);
            return Ok(());
        }

        match event.listing_id() {
            None => self.apply_detached(envelope, &event).await,
            Some(listing_id) => {
                if self.is_poisoned(listing_id).await {
                    tracing::error!(%listing_id, %tx_key, "rejecting event for poisoned listing");
                    metrics::counter!("materializer_listings_rejected").increment(1);
                    return Err(PipelineError::Poisoned(listing_id));
                }
                self.apply_to_listing(listing_id, envelope, &event).await
            }
        }
    }

    /// Runs catch-up over an event source, processing every envelope.
    ///
    /// Per-listing failures (ordering violations and events for poisoned
    /// listings) are counted and do not stop the run; infrastructure errors
    /// abort it.
    #[tracing::instrument(skip(self, source))]
    pub async fn run<E: EventSource>(&self, source: &E) -> Result<RunSummary> {
        let mut stream = source.stream_events().await.map_err(PipelineError::Event)?;
        let mut summary = RunSummary::default();

        while let Some(result) = stream.next().await {
            let envelope = result.map_err(PipelineError::Event)?;
            summary.events_seen += 1;

            match self.process_event(&envelope).await {
                Ok(()) => {}
                Err(PipelineError::Poisoned(_))
                | Err(PipelineError::Materialize(MaterializeError::OutOfOrderEvent { .. })) => {
                    summary.failures += 1;
                }
                Err(other) => return Err(other),
            }
        }

        tracing::info!(
            events_seen = summary.events_seen,
            failures = summary.failures,
            "catch-up complete"
        );

        Ok(summary)
    }

    /// Applies an event with no listing reference (escrow disbursements).
    async fn apply_detached(
        &self,
        envelope: &EventEnvelope,
        event: &MarketplaceEvent,
    ) -> Result<()> {
        match self.reducer.apply(None, envelope, event)? {
            Applied::Detached { writes } => {
                self.store
                    .commit_event(EventCommit {
                        listing: None,
                        writes,
                        tx_key: envelope.tx_key(),
                    })
                    .await?;
                metrics::counter!("materializer_events_applied").increment(1);
                Ok(())
            }
            other => {
                // The reducer only returns Detached for listing-free events.
                tracing::error!(?other, "unexpected reducer outcome for detached event");
                Ok(())
            }
        }
    }

    /// Applies an event to its listing as one read-modify-write unit,
    /// guarded by a compare-and-swap on `updated_at_block`.
    async fn apply_to_listing(
        &self,
        listing_id: ListingId,
        envelope: &EventEnvelope,
        event: &MarketplaceEvent,
    ) -> Result<()> {
        let mut attempts = 0;

        loop {
            let current = self.store.get_listing(listing_id).await?;
            let guard = match &current {
                Some(listing) => UpsertOptions::expect_block(listing.updated_at_block),
                None => UpsertOptions::expect_absent(),
            };

            let outcome = match self.reducer.apply(current, envelope, event) {
                Ok(outcome) => outcome,
                Err(err @ MaterializeError::OutOfOrderEvent { .. }) => {
                    self.poisoned.write().await.insert(listing_id);
                    tracing::error!(%listing_id, error = %err, "ordering violation, poisoning listing");
                    metrics::counter!("materializer_listings_poisoned").increment(1);
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            };

            match outcome {
                Applied::Listing { listing, writes } => {
                    let commit = EventCommit {
                        listing: Some((listing, guard)),
                        writes,
                        tx_key: envelope.tx_key(),
                    };
                    match self.store.commit_event(commit).await {
                        Ok(()) => {
                            metrics::counter!("materializer_events_applied").increment(1);
                            return Ok(());
                        }
                        Err(StoreError::ConcurrencyConflict { .. })
                            if attempts + 1 < MAX_CAS_ATTEMPTS =>
                        {
                            attempts += 1;
                            tracing::warn!(
                                %listing_id,
                                attempts,
                                "commit conflict, reloading listing"
                            );
                            continue;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Applied::Skipped { reason, .. } => {
                    // Already logged by the reducer; a redelivery would skip
                    // the same way, so record it as applied.
                    tracing::debug!(%listing_id, %reason, "event skipped");
                    self.store.mark_applied(envelope.tx_key()).await?;
                    metrics::counter!("materializer_events_skipped").increment(1);
                    return Ok(());
                }
                Applied::Detached { .. } => {
                    tracing::error!(%listing_id, "unexpected detached outcome for listing event");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Address, TxHash};
    use events::{
        BidPlacedData, EventEnvelope, InMemoryEventSource, ListingCreatedData, ListingType,
    };
    use store::InMemoryMarketStore;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    fn envelope(event: &MarketplaceEvent, block: u64, log_index: u32) -> EventEnvelope {
        EventEnvelope::builder()
            .marketplace(addr(0xFE))
            .tx_hash(TxHash::from_bytes([block as u8; 32]))
            .log_index(log_index)
            .block_number(block)
            .event(event)
            .unwrap()
            .build()
    }

    fn created(listing_id: u64) -> MarketplaceEvent {
        MarketplaceEvent::ListingCreated(ListingCreatedData {
            listing_id: ListingId::new(listing_id),
            seller: addr(1),
            listing_type: ListingType::IndividualAuction,
            initial_amount: 100,
            total_available: 1,
            total_per_sale: 1,
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

    #[tokio::test]
    async fn applies_event_and_marks_key() {
        let ingestor = Ingestor::new(InMemoryMarketStore::new());
        let event = created(1);
        let env = envelope(&event, 10, 0);

        ingestor.process_event(&env).await.unwrap();

        let listing = ingestor
            .store()
            .get_listing(ListingId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.seller, addr(1));
        assert!(ingestor.store().is_applied(env.tx_key()).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_envelope_is_noop() {
        let ingestor = Ingestor::new(InMemoryMarketStore::new());
        let event = bid(1, addr(0xB1), 100);
        let env = envelope(&event, 10, 0);

        ingestor.process_event(&env).await.unwrap();
        let after_first = ingestor
            .store()
            .get_listing(ListingId::new(1))
            .await
            .unwrap();

        ingestor.process_event(&env).await.unwrap();
        let after_second = ingestor
            .store()
            .get_listing(ListingId::new(1))
            .await
            .unwrap();

        assert_eq!(after_first, after_second);
        let bids = ingestor
            .store()
            .bids_for_listing(ListingId::new(1))
            .await
            .unwrap();
        assert_eq!(bids.len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped() {
        let ingestor = Ingestor::new(InMemoryMarketStore::new());
        let env = EventEnvelope::builder()
            .marketplace(addr(0xFE))
            .tx_hash(TxHash::from_bytes([9u8; 32]))
            .log_index(0)
            .block_number(10)
            .payload_raw("BidPlaced", serde_json::json!({"nonsense": true}))
            .unwrap()
            .build();

        ingestor.process_event(&env).await.unwrap();
        // Nothing was applied, and the key stays unclaimed for a corrected
        // redelivery.
        assert!(!ingestor.store().is_applied(env.tx_key()).await.unwrap());
    }

    #[tokio::test]
    async fn out_of_order_event_poisons_listing() {
        let ingestor = Ingestor::new(InMemoryMarketStore::new());
        ingestor
            .process_event(&envelope(&created(1), 100, 0))
            .await
            .unwrap();

        let stale = envelope(&bid(1, addr(0xB1), 10), 99, 0);
        let result = ingestor.process_event(&stale).await;
        assert!(matches!(
            result,
            Err(PipelineError::Materialize(
                MaterializeError::OutOfOrderEvent { .. }
            ))
        ));
        assert!(ingestor.is_poisoned(ListingId::new(1)).await);

        // Later events for the poisoned listing are rejected...
        let next = envelope(&bid(1, addr(0xB2), 200), 101, 0);
        assert!(matches!(
            ingestor.process_event(&next).await,
            Err(PipelineError::Poisoned(_))
        ));

        // ...while other listings keep processing.
        ingestor
            .process_event(&envelope(&created(2), 101, 1))
            .await
            .unwrap();
        assert!(
            ingestor
                .store()
                .get_listing(ListingId::new(2))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn run_counts_failures_without_stopping() {
        let ingestor = Ingestor::new(InMemoryMarketStore::new());
        let source = InMemoryEventSource::new();

        source.push(envelope(&created(1), 100, 0)).await;
        // Same listing, earlier block: ordering violation.
        let stale = EventEnvelope::builder()
            .marketplace(addr(0xFE))
            .tx_hash(TxHash::from_bytes([50u8; 32]))
            .log_index(5)
            .block_number(99)
            .event(&bid(1, addr(0xB1), 10))
            .unwrap()
            .build();
        source.push(stale).await;
        source.push(envelope(&created(2), 101, 0)).await;

        let summary = ingestor.run(&source).await.unwrap();
        assert_eq!(summary.events_seen, 3);
        assert_eq!(summary.failures, 1);
        assert!(
            ingestor
                .store()
                .get_listing(ListingId::new(2))
                .await
                .unwrap()
                .is_some()
        );
    }
}
