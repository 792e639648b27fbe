//! Idempotent table provisioning: create if absent, then wait for ACTIVE.

use std::time::Duration;

use dynaload_core::error::StoreError;
use dynaload_core::transport::TableStore;
use dynaload_core::wire::{TableSpec, TableStatus};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLLS: u32 = 90;

/// Ensure the table exists and is ACTIVE. Safe to call repeatedly.
pub async fn ensure_table(store: &dyn TableStore, spec: &TableSpec) -> Result<(), StoreError> {
    ensure_table_with(store, spec, POLL_INTERVAL, MAX_POLLS).await
}

/// [`ensure_table`] with an explicit poll interval and attempt cap.
pub async fn ensure_table_with(
    store: &dyn TableStore,
    spec: &TableSpec,
    poll_interval: Duration,
    max_polls: u32,
) -> Result<(), StoreError> {
    match store.table_status(&spec.table).await? {
        Some(TableStatus::Active) => {
            tracing::info!(table = %spec.table, "table exists");
            return Ok(());
        }
        Some(status) => {
            tracing::info!(table = %spec.table, ?status, "table exists, waiting for ACTIVE");
        }
        None => {
            tracing::info!(table = %spec.table, "creating table");
            store.create_table(spec).await?;
        }
    }

    for _ in 0..max_polls {
        if let Some(TableStatus::Active) = store.table_status(&spec.table).await? {
            tracing::info!(table = %spec.table, "table created and active");
            return Ok(());
        }
        tokio::time::sleep(poll_interval).await;
    }

    Err(StoreError::Other(format!(
        "table {} not ACTIVE after {max_polls} polls",
        spec.table
    )))
}
