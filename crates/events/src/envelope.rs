use chrono::{DateTime, Utc};
use common::{Address, TxHash, TxKey};
use serde::{Deserialize, Serialize};
use serde_json::value::{RawValue, to_raw_value};

use crate::error::{EventError, Result};
use crate::event::MarketplaceEvent;

/// One event-log record plus the chain metadata needed to order and
/// deduplicate it.
///
/// The payload is kept as raw JSON text and decoded on demand; a decode
/// failure is the malformed-event boundary and never partially mutates
/// state. Raw text (rather than a parsed `Value` tree) keeps the wide
/// integer fields intact: amounts are `u128`, which only the string parser
/// handles losslessly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The event kind (e.g. "BidPlaced"), for filtering and logging.
    pub event_type: String,

    /// The marketplace contract that emitted the log.
    pub marketplace: Address,

    /// Hash of the emitting transaction.
    pub tx_hash: TxHash,

    /// Index of the log within its block. Distinct per event within one
    /// transaction.
    pub log_index: u32,

    /// Block that contains the transaction.
    pub block_number: u64,

    /// Timestamp of the containing block.
    pub block_timestamp: DateTime<Utc>,

    /// The event payload as raw JSON.
    pub payload: Box<RawValue>,
}

impl EventEnvelope {
    /// Creates a new envelope builder.
    pub fn builder() -> EventEnvelopeBuilder {
        EventEnvelopeBuilder::default()
    }

    /// Returns the idempotency key for this event.
    pub fn tx_key(&self) -> TxKey {
        TxKey::new(self.tx_hash, self.log_index)
    }

    /// Returns the canonical ordering key: block number, then log index
    /// within the block.
    pub fn position(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }

    /// Decodes the payload into a typed event.
    pub fn decode(&self) -> Result<MarketplaceEvent> {
        serde_json::from_str(self.payload.get()).map_err(|source| EventError::Malformed {
            tx_key: self.tx_key(),
            source,
        })
    }
}

/// Builder for constructing event envelopes.
#[derive(Debug, Default)]
pub struct EventEnvelopeBuilder {
    marketplace: Option<Address>,
    tx_hash: Option<TxHash>,
    log_index: Option<u32>,
    block_number: Option<u64>,
    block_timestamp: Option<DateTime<Utc>>,
    event_type: Option<String>,
    payload: Option<Box<RawValue>>,
}

impl EventEnvelopeBuilder {
    /// Sets the emitting marketplace contract.
    pub fn marketplace(mut self, marketplace: Address) -> Self {
        self.marketplace = Some(marketplace);
        self
    }

    /// Sets the transaction hash.
    pub fn tx_hash(mut self, tx_hash: TxHash) -> Self {
        self.tx_hash = Some(tx_hash);
        self
    }

    /// Sets the log index.
    pub fn log_index(mut self, log_index: u32) -> Self {
        self.log_index = Some(log_index);
        self
    }

    /// Sets the block number.
    pub fn block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    /// Sets the block timestamp.
    pub fn block_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.block_timestamp = Some(timestamp);
        self
    }

    /// Sets the payload from a typed event, recording its event type.
    pub fn event(mut self, event: &MarketplaceEvent) -> Result<Self> {
        self.event_type = Some(event.event_type().to_string());
        self.payload = Some(to_raw_value(event)?);
        Ok(self)
    }

    /// Sets the payload from arbitrary JSON with an explicit event type, as
    /// an untrusted host delivery would.
    pub fn payload_raw(
        mut self,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<Self> {
        self.event_type = Some(event_type.into());
        self.payload = Some(to_raw_value(&payload)?);
        Ok(self)
    }

    /// Builds the envelope.
    ///
    /// # Panics
    ///
    /// Panics if required fields (marketplace, tx_hash, log_index,
    /// block_number, payload) are not set.
    pub fn build(self) -> EventEnvelope {
        EventEnvelope {
            event_type: self.event_type.expect("event_type is required"),
            marketplace: self.marketplace.expect("marketplace is required"),
            tx_hash: self.tx_hash.expect("tx_hash is required"),
            log_index: self.log_index.expect("log_index is required"),
            block_number: self.block_number.expect("block_number is required"),
            block_timestamp: self.block_timestamp.unwrap_or_else(Utc::now),
            payload: self.payload.expect("payload is required"),
        }
    }

    /// Tries to build the envelope, returning None if required fields are
    /// missing.
    pub fn try_build(self) -> Option<EventEnvelope> {
        Some(EventEnvelope {
            event_type: self.event_type?,
            marketplace: self.marketplace?,
            tx_hash: self.tx_hash?,
            log_index: self.log_index?,
            block_number: self.block_number?,
            block_timestamp: self.block_timestamp.unwrap_or_else(Utc::now),
            payload: self.payload?,
        })
    }
}
