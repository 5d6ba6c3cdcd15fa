//! JSON <-> Firestore typed value codec
//!
//! Firestore's REST API wraps every value in a single-key object naming its
//! type (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Integers
//! travel as decimal strings.

use serde_json::{json, Map, Value};

use super::{Document, StoreError};

/// Encode a plain JSON value as a Firestore value
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode a document body as a Firestore `fields` object
pub fn encode_fields(doc: &Document) -> Value {
    let fields: Map<String, Value> = doc
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(fields)
}

/// Decode a Firestore value into plain JSON
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let (kind, inner) = value
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| StoreError::Codec(format!("not a typed value: {}", value)))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(Value::from)
                .ok_or_else(|| StoreError::Codec(format!("bad integerValue: {}", inner)))
        }
        "doubleValue" => Ok(inner.clone()),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner.get("fields").cloned().unwrap_or_else(|| json!({}));
            Ok(Value::Object(decode_fields(&fields)?))
        }
        other => Err(StoreError::Codec(format!("unsupported value type: {}", other))),
    }
}

/// Decode a Firestore `fields` object into a document body
pub fn decode_fields(fields: &Value) -> Result<Document, StoreError> {
    let Some(map) = fields.as_object() else {
        return Err(StoreError::Codec("fields is not an object".to_string()));
    };
    map.iter()
        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
        .collect()
}

/// Quote a field path segment when it is not a simple identifier
pub fn field_path_segment(name: &str) -> String {
    let mut chars = name.chars();
    let simple = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Field paths touched by a deep merge: one path per leaf
///
/// Nested maps contribute their leaves (`a.b`); empty maps, arrays and
/// scalars are leaves themselves.
pub fn merge_field_paths(doc: &Document) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(doc, "", &mut paths);
    paths
}

fn collect_paths(doc: &Document, prefix: &str, out: &mut Vec<String>) {
    for (name, value) in doc {
        let path = if prefix.is_empty() {
            field_path_segment(name)
        } else {
            format!("{}.{}", prefix, field_path_segment(name))
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => collect_paths(nested, &path, out),
            _ => out.push(path),
        }
    }
}

/// Field paths touched by a top-level replace
pub fn replace_field_paths(doc: &Document) -> Vec<String> {
    doc.keys().map(|k| field_path_segment(k)).collect()
}
