//! Event ingestion pipeline.
//!
//! Wires the delivery seam, the pure reducer, and the store together:
//! decode → duplicate check → load → reduce → persist, one atomic unit per
//! event. Errors stay local to the event being applied; an ordering
//! violation poisons only its own listing.

pub mod error;
pub mod ingest;

pub use error::{PipelineError, Result};
pub use ingest::{Ingestor, RunSummary};
