//! Event delivery seam.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use tokio::sync::RwLock;

use crate::envelope::EventEnvelope;
use crate::error::Result;

/// A stream of event envelopes in canonical chain order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Source of marketplace event logs.
///
/// Implementations must deliver events in order per listing (block number,
/// then log index). At-least-once delivery is permitted; deduplication is
/// the consumer's responsibility.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Streams all available events in canonical chain order.
    async fn stream_events(&self) -> Result<EventStream>;
}

/// In-memory event source for testing.
///
/// Envelopes are replayed in push order: the pusher is the ordering
/// authority, exactly as the indexing host is in production. Tests can push
/// duplicates to exercise redelivery and push out of order to exercise
/// ordering-violation handling.
#[derive(Clone, Default)]
pub struct InMemoryEventSource {
    envelopes: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventSource {
    /// Creates a new empty in-memory source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an envelope to the source.
    pub async fn push(&self, envelope: EventEnvelope) {
        self.envelopes.write().await.push(envelope);
    }

    /// Appends a batch of envelopes to the source.
    pub async fn push_all(&self, envelopes: impl IntoIterator<Item = EventEnvelope>) {
        self.envelopes.write().await.extend(envelopes);
    }

    /// Returns the number of envelopes held.
    pub async fn len(&self) -> usize {
        self.envelopes.read().await.len()
    }

    /// Returns true if the source holds no envelopes.
    pub async fn is_empty(&self) -> bool {
        self.envelopes.read().await.is_empty()
    }
}

#[async_trait]
impl EventSource for InMemoryEventSource {
    async fn stream_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let envelopes = self.envelopes.read().await.clone();
        let stream = stream::iter(envelopes.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}
