//! dynaload-core — foundation traits and types for DynaLoad.
//!
//! # Overview
//!
//! DynaLoad bulk-loads JSON records into a DynamoDB-compatible table through
//! the backend's batch-write contract. The core crate defines:
//!
//! - [`TableStore`] — the central async trait every store backend implements
//! - [`AttrValue`] / [`WriteRequest`] — the tagged-union wire types
//! - [`codec`] module — generic value ↔ attribute encoding
//! - [`StoreError`] — structured error type
//! - [`RetryPolicy`] — exponential backoff for unprocessed-item retries
//! - [`record`] module — primary-key filtering and index-key coercion

pub mod codec;
pub mod error;
pub mod record;
pub mod retry;
pub mod transport;
pub mod wire;

pub use codec::{decode_value, encode_item, encode_value, normalize_record, RecordFormat};
pub use error::StoreError;
pub use record::{prepare_records, Prepared, Record, TableKeys};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::TableStore;
pub use wire::{
    AttrValue, BatchWriteInput, BatchWriteOutput, PutRequest, RequestItems, TableSpec,
    TableStatus, WireItem, WriteRequest,
};
