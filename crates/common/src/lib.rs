pub mod types;

pub use types::{Address, AddressParseError, ListingId, TxHash, TxKey};
