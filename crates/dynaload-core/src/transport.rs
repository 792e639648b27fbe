//! The `TableStore` trait — the storage backend as a black box.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::wire::{BatchWriteOutput, RequestItems, TableSpec, TableStatus};

/// The central async trait every store backend implements.
///
/// The batch writer treats the backend purely through this surface: submit
/// a batch, read back the unprocessed subset, resubmit.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn TableStore>`.
#[async_trait]
pub trait TableStore: Send + Sync + 'static {
    /// Submit one batch of write requests. A successful call may still
    /// leave a subset unprocessed — that is the caller's to retry.
    async fn batch_write(&self, items: RequestItems) -> Result<BatchWriteOutput, StoreError>;

    /// Current status of a table, or `None` if it does not exist.
    async fn table_status(&self, table: &str) -> Result<Option<TableStatus>, StoreError>;

    /// Create a table per the given spec. Not idempotent on its own —
    /// callers check [`Self::table_status`] first.
    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError>;

    /// The backend's identifier (endpoint URL).
    fn endpoint(&self) -> &str;
}
