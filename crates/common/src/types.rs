use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a listing, assigned by the marketplace contract.
///
/// Listing ids are globally unique and never reassigned. Wrapping the raw
/// integer prevents mixing listing ids up with other chain-derived numbers
/// (token ids, block numbers).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ListingId(u64);

impl ListingId {
    /// Creates a listing ID from its raw contract value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw listing ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ListingId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ListingId> for u64 {
    fn from(id: ListingId) -> Self {
        id.0
    }
}

/// Error returned when parsing an address or transaction hash from hex.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// The input was not valid hexadecimal.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded byte length did not match the expected width.
    #[error("wrong length: expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// A 20-byte account or contract address.
///
/// `Address::ZERO` is the documented sentinel for "not yet known": listing
/// fields that have not been populated by their creation sub-event hold the
/// zero address rather than an absent value, so reads are always total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address, used as the "not yet known" sentinel and as the
    /// currency marker for native-coin listings.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Creates an address from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parses an address from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| AddressParseError::InvalidHex(s.to_string()))?;
        let len = bytes.len();
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| AddressParseError::WrongLength {
                expected: 20,
                actual: len,
            })?;
        Ok(Self(bytes))
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero-address sentinel.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte transaction hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Creates a transaction hash from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses a transaction hash from a hex string, with or without a `0x`
    /// prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| AddressParseError::InvalidHex(s.to_string()))?;
        let len = bytes.len();
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressParseError::WrongLength {
                expected: 32,
                actual: len,
            })?;
        Ok(Self(bytes))
    }

    /// Returns the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// The idempotency key for one event: transaction hash plus log index.
///
/// Events within the same transaction share a hash but carry distinct log
/// indices, so this pair uniquely identifies a single emitted log across
/// redeliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxKey {
    /// Hash of the transaction that emitted the event.
    pub tx_hash: TxHash,

    /// Index of the log within its block.
    pub log_index: u32,
}

impl TxKey {
    /// Creates a new transaction key.
    pub fn new(tx_hash: TxHash, log_index: u32) -> Self {
        Self { tx_hash, log_index }
    }
}

impl std::fmt::Display for TxKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.tx_hash, self.log_index)
    }
}
