//! Generic value ↔ attribute encoding.
//!
//! Two directions with different shapes of input:
//!
//! - **encode**: a plain [`serde_json::Value`] tree becomes a typed
//!   [`AttrValue`] tree. Total — every JSON value has an encoding.
//! - **decode/normalize**: input records may arrive already wire-tagged
//!   (exported straight from the backend) or already plain. The typed path
//!   ([`decode_value`]) unwraps an [`AttrValue`]; the untyped path
//!   ([`normalize_record`]) works on raw JSON and resolves the ambiguity
//!   per record, either from an explicit [`RecordFormat`] or by sniffing.

use serde_json::{Map, Value};

use crate::record::Record;
use crate::wire::{AttrValue, WireItem, WIRE_TAGS};

/// Encode a plain value into the tagged wire form. Never fails.
///
/// Booleans are matched ahead of numbers: a `BOOL` must never be emitted
/// as an `N`.
pub fn encode_value(value: &Value) -> AttrValue {
    match value {
        Value::Null => AttrValue::Null(true),
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => AttrValue::N(n.to_string()),
        Value::String(s) => AttrValue::S(s.clone()),
        Value::Array(elems) => AttrValue::L(elems.iter().map(encode_value).collect()),
        Value::Object(map) => AttrValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect(),
        ),
    }
}

/// Encode a whole record into a wire item.
pub fn encode_item(record: &Record) -> WireItem {
    record
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Decode a typed attribute back into a plain value. Never fails: number
/// text that parses as neither integer nor float comes back as a string.
pub fn decode_value(attr: &AttrValue) -> Value {
    match attr {
        AttrValue::S(s) => Value::String(s.clone()),
        AttrValue::N(text) => parse_number_text(text),
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Null(_) => Value::Null,
        AttrValue::L(elems) => Value::Array(elems.iter().map(decode_value).collect()),
        AttrValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect(),
        ),
    }
}

/// `N` payloads are decimal text. An optional leading minus followed only
/// by digits parses as an integer, anything else as a float; unparseable
/// text falls back to the raw string.
fn parse_number_text(text: &str) -> Value {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let integral = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
    if integral {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Number(n.into());
        }
        // out of i64 range: fall through to the float parse
    }
    match text.parse::<f64>() {
        Ok(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_owned())),
        Err(_) => Value::String(text.to_owned()),
    }
}

/// How an input record is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordFormat {
    /// Already plain — returned unchanged.
    Plain,
    /// Wire-tagged — every attribute is unwrapped.
    Wire,
    /// Sniff per record: if any top-level attribute is a single-key object
    /// whose sole key is a recognized tag, the record is treated as
    /// wire-tagged. Inherited ambiguity: a plain record whose values all
    /// happen to be tag-shaped objects is misclassified as wire data.
    #[default]
    Auto,
}

impl RecordFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plain" => Some(Self::Plain),
            "wire" => Some(Self::Wire),
            "auto" => Some(Self::Auto),
            _ => None,
        }
    }
}

/// Returns `true` if any top-level attribute looks like a tag wrapper.
pub fn looks_wire_tagged(record: &Record) -> bool {
    record.values().any(|v| {
        v.as_object()
            .map(|obj| obj.len() == 1 && obj.keys().all(|k| WIRE_TAGS.contains(&k.as_str())))
            .unwrap_or(false)
    })
}

/// Normalize one record to plain values.
pub fn normalize_record(record: Record, format: RecordFormat) -> Record {
    let wire = match format {
        RecordFormat::Plain => false,
        RecordFormat::Wire => true,
        RecordFormat::Auto => looks_wire_tagged(&record),
    };
    if !wire {
        return record;
    }
    record
        .into_iter()
        .map(|(k, v)| (k, unwrap_attr(&v)))
        .collect()
}

/// Unwrap one untyped wire node. A recognized single-key wrapper unwraps
/// recursively; an unrecognized tag or malformed wrapper passes through
/// unchanged rather than erroring.
fn unwrap_attr(value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };
    if obj.len() != 1 {
        return value.clone();
    }
    let Some((tag, inner)) = obj.iter().next() else {
        return value.clone();
    };
    match (tag.as_str(), inner) {
        ("S", Value::String(_)) => inner.clone(),
        ("N", Value::String(text)) => parse_number_text(text),
        ("BOOL", Value::Bool(_)) => inner.clone(),
        ("NULL", _) => Value::Null,
        ("L", Value::Array(elems)) => Value::Array(elems.iter().map(unwrap_attr).collect()),
        ("M", Value::Object(map)) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), unwrap_attr(v)))
                .collect::<Map<String, Value>>(),
        ),
        _ => value.clone(),
    }
}
