//! Listing lifecycle state machine.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a listing.
///
/// State transitions:
/// ```text
/// Active ──┬──► Cancelled   [terminal]
///          └──► Finalized   [terminal]
/// ```
///
/// Both terminal states are absorbing: no field on a terminal listing ever
/// changes again. There is no transition out of Cancelled or Finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ListingStatus {
    /// Listing is live and can be modified, bid on, offered on, or bought.
    #[default]
    Active,

    /// Listing was cancelled before completing (terminal state).
    Cancelled,

    /// Listing sold or settled (terminal state).
    Finalized,
}

impl ListingStatus {
    /// Returns true if mutating events may still be applied.
    pub fn can_mutate(&self) -> bool {
        matches!(self, ListingStatus::Active)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ListingStatus::Cancelled | ListingStatus::Finalized)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "Active",
            ListingStatus::Cancelled => "Cancelled",
            ListingStatus::Finalized => "Finalized",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
