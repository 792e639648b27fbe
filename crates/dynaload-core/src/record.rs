//! Record filtering and key coercion performed ahead of the batch writer.

use serde_json::{Map, Value};

/// One row: attribute name → plain value.
pub type Record = Map<String, Value>;

/// Key attributes of the target table.
#[derive(Debug, Clone)]
pub struct TableKeys {
    /// Required string attribute uniquely identifying a record.
    pub partition_key: String,
    /// Optional secondary-index attribute. The index is string-typed, so a
    /// present value is coerced to a string before write.
    pub index_key: Option<String>,
}

/// Result of [`prepare_records`].
#[derive(Debug)]
pub struct Prepared {
    pub records: Vec<Record>,
    /// Records dropped for missing the partition-key attribute.
    pub skipped: usize,
}

/// Drop records missing the partition key (presence check only — no further
/// schema validation) and coerce a present index attribute to a string.
pub fn prepare_records(records: Vec<Record>, keys: &TableKeys) -> Prepared {
    let before = records.len();
    let mut kept: Vec<Record> = records
        .into_iter()
        .filter(|r| r.contains_key(&keys.partition_key))
        .collect();
    let skipped = before - kept.len();

    if let Some(index_key) = &keys.index_key {
        for record in &mut kept {
            if let Some(value) = record.get_mut(index_key) {
                if !value.is_string() {
                    *value = Value::String(display_text(value));
                }
            }
        }
    }

    Prepared {
        records: kept,
        skipped,
    }
}

/// Textual form used for index coercion: scalars print bare, composites as
/// compact JSON.
fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
