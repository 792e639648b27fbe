//! dynaload-http — HTTP store client and resilient batch writer.
//!
//! - [`HttpTableStore`] — `TableStore` over the backend's JSON-over-HTTP API
//! - [`BatchWriter`] — chunked batch writes with unprocessed-item retry
//! - [`ensure_table`] — idempotent create-if-absent provisioning

pub mod client;
pub mod provision;
pub mod writer;

pub use client::{HttpStoreConfig, HttpTableStore};
pub use provision::ensure_table;
pub use writer::{BatchWriter, BatchWriterConfig, WriteSummary};
