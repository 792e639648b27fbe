//! HTTP table store backed by `reqwest`.
//!
//! Speaks the backend's JSON-over-HTTP protocol: every operation is a POST
//! of an `application/x-amz-json-1.0` body with an
//! `X-Amz-Target: DynamoDB_20120810.<Op>` header. Credential and signature
//! acquisition is a collaborator outside this crate — the client sends a
//! static region-derived authorization header, which DynamoDB-compatible
//! endpoints such as DynamoDB Local and LocalStack accept.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use dynaload_core::error::StoreError;
use dynaload_core::transport::TableStore;
use dynaload_core::wire::{BatchWriteInput, BatchWriteOutput, RequestItems, TableSpec, TableStatus};

const TARGET_PREFIX: &str = "DynamoDB_20120810";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// Configuration for `HttpTableStore`.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub region: String,
    pub request_timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            region: "us-west-2".into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// `TableStore` implementation over HTTP.
pub struct HttpTableStore {
    endpoint: String,
    http: reqwest::Client,
    auth_header: String,
}

impl HttpTableStore {
    /// Create a new store client for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>, config: HttpStoreConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            http,
            auth_header: static_auth_header(&config.region),
        })
    }

    /// Create with default configuration.
    pub fn default_for(endpoint: impl Into<String>) -> Result<Self, StoreError> {
        Self::new(endpoint, HttpStoreConfig::default())
    }

    async fn post_target(&self, op: &str, body: &Value) -> Result<Value, StoreError> {
        let payload = serde_json::to_vec(body)?;
        let resp = self
            .http
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{op}"))
            .header("Content-Type", CONTENT_TYPE)
            .header("Authorization", &self.auth_header)
            .body(payload)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(op, status = status.as_u16(), "store call failed");
            return Err(parse_api_error(status.as_u16(), &text));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl TableStore for HttpTableStore {
    async fn batch_write(&self, items: RequestItems) -> Result<BatchWriteOutput, StoreError> {
        let body = serde_json::to_value(BatchWriteInput {
            request_items: items,
        })?;
        let resp = self.post_target("BatchWriteItem", &body).await?;
        Ok(serde_json::from_value(resp)?)
    }

    async fn table_status(&self, table: &str) -> Result<Option<TableStatus>, StoreError> {
        let body = serde_json::json!({ "TableName": table });
        match self.post_target("DescribeTable", &body).await {
            Ok(resp) => {
                let status = resp
                    .pointer("/Table/TableStatus")
                    .and_then(Value::as_str)
                    .unwrap_or("UNKNOWN");
                Ok(Some(TableStatus::parse(status)))
            }
            Err(e) if e.is_resource_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_table(&self, spec: &TableSpec) -> Result<(), StoreError> {
        let body = create_table_body(spec);
        self.post_target("CreateTable", &body).await?;
        Ok(())
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Build the `CreateTable` body: string partition key, on-demand billing,
/// and an ALL-projection secondary index when an index attribute is set.
fn create_table_body(spec: &TableSpec) -> Value {
    let mut attribute_definitions = vec![serde_json::json!({
        "AttributeName": spec.partition_key,
        "AttributeType": "S",
    })];
    let mut body = serde_json::json!({
        "TableName": spec.table,
        "KeySchema": [
            { "AttributeName": spec.partition_key, "KeyType": "HASH" }
        ],
        "BillingMode": "PAY_PER_REQUEST",
    });

    if let Some(index_attr) = &spec.index_attr {
        attribute_definitions.push(serde_json::json!({
            "AttributeName": index_attr,
            "AttributeType": "S",
        }));
        body["GlobalSecondaryIndexes"] = serde_json::json!([
            {
                "IndexName": spec.index_name(),
                "KeySchema": [
                    { "AttributeName": index_attr, "KeyType": "HASH" }
                ],
                "Projection": { "ProjectionType": "ALL" },
            }
        ]);
    }
    body["AttributeDefinitions"] = Value::Array(attribute_definitions);
    body
}

/// Parse the backend's error envelope (`{"__type": "...#Code", ...}`) into
/// a structured error; anything else stays an HTTP error with the raw body.
fn parse_api_error(status: u16, body: &str) -> StoreError {
    if let Ok(envelope) = serde_json::from_str::<Value>(body) {
        if let Some(type_field) = envelope.get("__type").and_then(Value::as_str) {
            let code = type_field.rsplit('#').next().unwrap_or(type_field);
            let message = envelope
                .get("message")
                .or_else(|| envelope.get("Message"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            return StoreError::Api {
                code: code.to_owned(),
                message: message.to_owned(),
            };
        }
    }
    StoreError::Http(format!("HTTP {status}: {body}"))
}

fn static_auth_header(region: &str) -> String {
    format!(
        "AWS4-HMAC-SHA256 Credential=dynaload/00000000/{region}/dynamodb/aws4_request, \
         SignedHeaders=content-type;host;x-amz-target, Signature=0"
    )
}
