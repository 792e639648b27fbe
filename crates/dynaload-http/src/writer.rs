//! Chunked batch writes with bounded unprocessed-item retry.
//!
//! Chunks are processed strictly in order, one outstanding call at a time.
//! A successful call that returns unprocessed items triggers an exponential
//! backoff sleep and a resubmission of only that subset; a failed call is
//! fatal to the whole run. Writes are idempotent overwrites by partition
//! key, so rerunning a crashed load converges.

use std::collections::HashMap;
use std::sync::Arc;

use dynaload_core::codec::encode_item;
use dynaload_core::error::StoreError;
use dynaload_core::record::Record;
use dynaload_core::retry::{RetryConfig, RetryPolicy};
use dynaload_core::transport::TableStore;
use dynaload_core::wire::{RequestItems, WriteRequest};

/// The backend caps a single batch-write call at this many requests.
pub const MAX_CHUNK_SIZE: usize = 25;

/// Configuration for [`BatchWriter`].
#[derive(Debug, Clone)]
pub struct BatchWriterConfig {
    /// Records per batch-write call, clamped to `1..=25`.
    pub chunk_size: usize,
    pub retry: RetryConfig,
}

impl Default for BatchWriterConfig {
    fn default() -> Self {
        Self {
            chunk_size: MAX_CHUNK_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

/// Outcome of a [`BatchWriter::write`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records the backend acknowledged.
    pub written: usize,
    /// Records still unprocessed when the retry budget ran out.
    pub dropped: usize,
    /// Batch chunks submitted.
    pub chunks: usize,
}

/// Writes an arbitrary-length record list through the batch contract.
pub struct BatchWriter {
    store: Arc<dyn TableStore>,
    table: String,
    chunk_size: usize,
    retry: RetryPolicy,
}

impl BatchWriter {
    pub fn new(
        store: Arc<dyn TableStore>,
        table: impl Into<String>,
        config: BatchWriterConfig,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            chunk_size: config.chunk_size.clamp(1, MAX_CHUNK_SIZE),
            retry: RetryPolicy::new(config.retry),
        }
    }

    /// Write all records, chunk by chunk.
    ///
    /// Returns a summary rather than erroring on exhausted retries: records
    /// left unprocessed after the final attempt of a chunk are counted in
    /// [`WriteSummary::dropped`] and the run moves on. Only a failed store
    /// call aborts the run.
    pub async fn write(&self, records: &[Record]) -> Result<WriteSummary, StoreError> {
        let mut summary = WriteSummary::default();
        if records.is_empty() {
            return Ok(summary);
        }
        let total_chunks = records.len().div_ceil(self.chunk_size);

        for (index, chunk) in records.chunks(self.chunk_size).enumerate() {
            let requests: Vec<WriteRequest> = chunk
                .iter()
                .map(|record| WriteRequest::put(encode_item(record)))
                .collect();
            let mut request_items: RequestItems =
                HashMap::from([(self.table.clone(), requests)]);

            let mut attempt = 0u32;
            let mut remaining;
            loop {
                attempt += 1;
                let out = self.store.batch_write(request_items).await?;
                remaining = out.unprocessed_count();
                if remaining == 0 {
                    break;
                }
                match self.retry.delay_after(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            unprocessed = remaining,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "unprocessed items, backing off before retry"
                        );
                        tokio::time::sleep(delay).await;
                        request_items = out.unprocessed_items;
                    }
                    None => {
                        tracing::warn!(
                            dropped = remaining,
                            attempts = attempt,
                            "retry budget exhausted, dropping remaining items"
                        );
                        break;
                    }
                }
            }

            summary.written += chunk.len() - remaining;
            summary.dropped += remaining;
            summary.chunks += 1;
            tracing::info!(
                chunk = index + 1,
                total = total_chunks,
                items = chunk.len(),
                "wrote batch"
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use dynaload_core::record::{prepare_records, TableKeys};
    use dynaload_core::wire::{AttrValue, BatchWriteOutput, TableSpec, TableStatus};

    enum Reply {
        /// Everything applied.
        Done,
        /// Everything comes back unprocessed.
        Echo,
        /// A specific subset comes back unprocessed.
        Unprocessed(RequestItems),
        /// The call itself fails.
        Fail(&'static str),
    }

    struct MockStore {
        calls: Mutex<Vec<RequestItems>>,
        script: Mutex<VecDeque<Reply>>,
    }

    impl MockStore {
        fn scripted(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                script: Mutex::new(replies.into()),
            })
        }

        fn succeeding() -> Arc<Self> {
            Self::scripted(Vec::new())
        }

        fn calls(&self) -> Vec<RequestItems> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TableStore for MockStore {
        async fn batch_write(&self, items: RequestItems) -> Result<BatchWriteOutput, StoreError> {
            self.calls.lock().unwrap().push(items.clone());
            // script exhausted → everything applied
            match self.script.lock().unwrap().pop_front().unwrap_or(Reply::Done) {
                Reply::Done => Ok(BatchWriteOutput::default()),
                Reply::Echo => Ok(BatchWriteOutput {
                    unprocessed_items: items,
                }),
                Reply::Unprocessed(subset) => Ok(BatchWriteOutput {
                    unprocessed_items: subset,
                }),
                Reply::Fail(msg) => Err(StoreError::Http(msg.into())),
            }
        }

        async fn table_status(&self, _table: &str) -> Result<Option<TableStatus>, StoreError> {
            Ok(Some(TableStatus::Active))
        }

        async fn create_table(&self, _spec: &TableSpec) -> Result<(), StoreError> {
            Ok(())
        }

        fn endpoint(&self) -> &str {
            "mock://store"
        }
    }

    fn record(name: &str) -> Record {
        json!({ "summarize_job_name": name })
            .as_object()
            .unwrap()
            .clone()
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    fn writer(store: Arc<MockStore>, chunk_size: usize, max_attempts: u32) -> BatchWriter {
        BatchWriter::new(
            store,
            "jobs",
            BatchWriterConfig {
                chunk_size,
                retry: fast_retry(max_attempts),
            },
        )
    }

    fn submitted_names(items: &RequestItems) -> Vec<String> {
        items["jobs"]
            .iter()
            .map(|req| {
                req.put_request.item["summarize_job_name"]
                    .as_s()
                    .unwrap()
                    .to_owned()
            })
            .collect()
    }

    #[tokio::test]
    async fn chunks_cover_the_input_in_order() {
        let store = MockStore::succeeding();
        let records: Vec<Record> = (0..53).map(|i| record(&format!("job-{i}"))).collect();

        let summary = writer(store.clone(), 10, 5).write(&records).await.unwrap();

        let calls = store.calls();
        assert_eq!(calls.len(), 6); // ceil(53 / 10)
        assert!(calls.iter().all(|c| c["jobs"].len() <= 10));
        assert_eq!(calls[5]["jobs"].len(), 3);

        let replayed: Vec<String> = calls.iter().flat_map(|c| submitted_names(c)).collect();
        let original: Vec<String> = (0..53).map(|i| format!("job-{i}")).collect();
        assert_eq!(replayed, original);

        assert_eq!(
            summary,
            WriteSummary {
                written: 53,
                dropped: 0,
                chunks: 6
            }
        );
    }

    #[tokio::test]
    async fn retry_stops_after_the_attempt_budget() {
        let store = MockStore::scripted(vec![
            Reply::Echo,
            Reply::Echo,
            Reply::Echo,
            Reply::Echo,
            Reply::Echo,
        ]);
        let records: Vec<Record> = (0..3).map(|i| record(&format!("job-{i}"))).collect();

        let summary = writer(store.clone(), 25, 3).write(&records).await.unwrap();

        // exactly max_attempts submissions, then the chunk is given up on
        assert_eq!(store.calls().len(), 3);
        assert_eq!(
            summary,
            WriteSummary {
                written: 0,
                dropped: 3,
                chunks: 1
            }
        );
    }

    #[tokio::test]
    async fn only_the_unprocessed_subset_is_resubmitted() {
        let leftover = record("job-1");
        let subset: RequestItems = HashMap::from([(
            "jobs".to_owned(),
            vec![WriteRequest::put(encode_item(&leftover))],
        )]);
        let store = MockStore::scripted(vec![Reply::Unprocessed(subset), Reply::Done]);
        let records = vec![record("job-0"), record("job-1")];

        let summary = writer(store.clone(), 25, 5).write(&records).await.unwrap();

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(submitted_names(&calls[0]), ["job-0", "job-1"]);
        assert_eq!(submitted_names(&calls[1]), ["job-1"]);
        assert_eq!(
            summary,
            WriteSummary {
                written: 2,
                dropped: 0,
                chunks: 1
            }
        );
    }

    #[tokio::test]
    async fn failed_chunks_do_not_stop_later_chunks() {
        // first chunk exhausts its budget, second chunk succeeds
        let store = MockStore::scripted(vec![Reply::Echo, Reply::Echo, Reply::Done]);
        let records: Vec<Record> = (0..4).map(|i| record(&format!("job-{i}"))).collect();

        let summary = writer(store.clone(), 2, 2).write(&records).await.unwrap();

        assert_eq!(store.calls().len(), 3);
        assert_eq!(
            summary,
            WriteSummary {
                written: 2,
                dropped: 2,
                chunks: 2
            }
        );
    }

    #[tokio::test]
    async fn transport_errors_abort_the_run() {
        let store = MockStore::scripted(vec![Reply::Fail("connection refused")]);
        let records = vec![record("job-0")];

        let err = writer(store.clone(), 25, 5).write(&records).await.unwrap_err();
        assert!(matches!(err, StoreError::Http(_)));
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn empty_input_submits_nothing() {
        let store = MockStore::succeeding();
        let summary = writer(store.clone(), 25, 5).write(&[]).await.unwrap();
        assert!(store.calls().is_empty());
        assert_eq!(summary, WriteSummary::default());
    }

    #[tokio::test]
    async fn chunk_size_is_clamped_to_the_backend_limit() {
        let store = MockStore::succeeding();
        let records: Vec<Record> = (0..26).map(|i| record(&format!("job-{i}"))).collect();

        writer(store.clone(), 100, 5).write(&records).await.unwrap();

        let calls = store.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0]["jobs"].len(), 25);
        assert_eq!(calls[1]["jobs"].len(), 1);
    }

    #[tokio::test]
    async fn prepared_records_write_with_coerced_index_attribute() {
        let store = MockStore::succeeding();
        let input: Vec<Record> = [
            json!({ "summarize_job_name": "job-1", "patient_id": 42 }),
            json!({ "summarize_job_name": "job-2" }),
        ]
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();

        let prepared = prepare_records(
            input,
            &TableKeys {
                partition_key: "summarize_job_name".into(),
                index_key: Some("patient_id".into()),
            },
        );
        let summary = writer(store.clone(), 25, 5)
            .write(&prepared.records)
            .await
            .unwrap();
        assert_eq!(summary.written, 2);

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        let items = &calls[0]["jobs"];
        assert_eq!(items.len(), 2);
        // index attribute was coerced to a string before encoding
        assert_eq!(
            items[0].put_request.item["patient_id"],
            AttrValue::S("42".into())
        );
        assert_eq!(
            items[0].put_request.item["summarize_job_name"],
            AttrValue::S("job-1".into())
        );
        assert_eq!(
            items[1].put_request.item["summarize_job_name"],
            AttrValue::S("job-2".into())
        );
    }
}
