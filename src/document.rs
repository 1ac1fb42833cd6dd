//! Pure document helpers: canonical serialization for change detection and
//! the shallow merge used by `patch`.
//!
//! Both functions are independent of the transport so that the two client
//! variants share identical semantics.

use serde_json::Value;

/// Serialize a document to a canonical string: object keys are emitted in
/// sorted order at every nesting level, so two structurally equal documents
/// always produce equal strings regardless of how they were built or
/// received. Used by the watch loop as the change-detection key.
pub fn canonical_form(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Keys are plain strings; serde_json handles escaping
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Shallow merge `updates` over `current`, with `updates` winning on key
/// collisions. Nested objects are replaced wholesale, not merged; this
/// mirrors the service's PATCH semantics.
///
/// If either side is not a JSON object, `updates` replaces `current`.
pub fn merge_documents(current: &Value, updates: &Value) -> Value {
    match (current, updates) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => updates.clone(),
    }
}
