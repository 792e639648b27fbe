//! Batch-write wire types.
//!
//! The backend encodes every attribute as a single-key tag wrapper
//! (`{"S": "x"}`, `{"N": "42"}`, ...). Serde's external enum tagging
//! produces exactly that shape, so a node can never carry two tags.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Attribute tags recognized by the wire format.
pub const WIRE_TAGS: [&str; 6] = ["S", "N", "BOOL", "L", "M", "NULL"];

/// A single attribute value in the backend's tagged-union encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// UTF-8 string.
    #[serde(rename = "S")]
    S(String),
    /// Number, carried as its decimal text.
    #[serde(rename = "N")]
    N(String),
    /// Boolean.
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// Null marker. The payload is always `true` on encode.
    #[serde(rename = "NULL")]
    Null(bool),
    /// Ordered list.
    #[serde(rename = "L")]
    L(Vec<AttrValue>),
    /// String-keyed map.
    #[serde(rename = "M")]
    M(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Returns the inner string if this is an `S` value.
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the decimal text if this is an `N` value.
    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttrValue::N(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns `true` if this is the null marker.
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null(_))
    }
}

/// One encoded record: attribute name → tagged value.
pub type WireItem = BTreeMap<String, AttrValue>;

/// The `Put` half of a batch-write request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    pub item: WireItem,
}

/// A single write request within a batch. Insert/overwrite only — the
/// batch contract's delete side is out of scope here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteRequest {
    pub put_request: PutRequest,
}

impl WriteRequest {
    pub fn put(item: WireItem) -> Self {
        Self {
            put_request: PutRequest { item },
        }
    }
}

/// Requests keyed by table name — the shape of both the batch-write input
/// and the unprocessed subset the backend hands back.
pub type RequestItems = HashMap<String, Vec<WriteRequest>>;

/// Body of a `BatchWriteItem` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchWriteInput {
    #[serde(rename = "RequestItems")]
    pub request_items: RequestItems,
}

/// Response of a `BatchWriteItem` call. Anything the backend could not
/// durably apply comes back under `UnprocessedItems`, keyed like the input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchWriteOutput {
    #[serde(rename = "UnprocessedItems", default)]
    pub unprocessed_items: RequestItems,
}

impl BatchWriteOutput {
    /// Total number of write requests left unprocessed, across all tables.
    pub fn unprocessed_count(&self) -> usize {
        self.unprocessed_items.values().map(Vec::len).sum()
    }
}

/// Shape of the table to provision: string partition key plus an optional
/// string-typed secondary index attribute (projected ALL).
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub table: String,
    pub partition_key: String,
    pub index_attr: Option<String>,
}

impl TableSpec {
    /// Index name derived from the index attribute (`<attr>-index`).
    pub fn index_name(&self) -> Option<String> {
        self.index_attr.as_ref().map(|a| format!("{a}-index"))
    }
}

/// Lifecycle status of a table, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Other(String),
}

impl TableStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "CREATING" => Self::Creating,
            "ACTIVE" => Self::Active,
            other => Self::Other(other.to_owned()),
        }
    }
}
