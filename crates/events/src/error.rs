use thiserror::Error;

/// Errors that can occur in the event layer.
#[derive(Debug, Error)]
pub enum EventError {
    /// An envelope payload failed typed decoding. Policy: the event is
    /// logged and skipped; it never partially mutates state.
    #[error("malformed event payload at {tx_key}: {source}")]
    Malformed {
        tx_key: common::TxKey,
        #[source]
        source: serde_json::Error,
    },

    /// A serialization error outside the decode path.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for event operations.
pub type Result<T> = std::result::Result<T, EventError>;
