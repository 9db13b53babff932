//! Persistence seam for materialized marketplace state.
//!
//! The engine requires only a key-value interface supporting get-by-id and
//! upsert; this crate defines that interface ([`MarketStore`]) plus an
//! in-memory implementation used in tests and as the reference for the
//! concurrency semantics: each upsert is a compare-and-swap keyed on the
//! listing's `updated_at_block`, and one event's effects (listing, ledger
//! writes, idempotency mark) commit as a single unit.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryMarketStore;
pub use store::{EventCommit, MarketStore, UpsertOptions};
