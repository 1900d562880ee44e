//! Content-addressed identifiers for log entries.
//!
//! An entry id is a UUIDv5 under a fixed namespace:
//!
//! ```text
//! UUIDv5(LOGDUP_NAMESPACE, text_bytes || 0x00 || canonical_json(metadata))
//! ```
//!
//! `canonical_json` serializes objects with keys in sorted order and no
//! insignificant whitespace, so two metadata maps that differ only in key
//! order produce the same id. The raw (un-normalized) text is hashed: the id
//! names the exact entry, while similarity works on the normalized form.
//!
//! ```rust
//! use canonical::content_id;
//! use serde_json::json;
//!
//! let a = content_id("disk full", &json!({"pod_name": "a", "level": "warn"}));
//! let b = content_id("disk full", &json!({"level": "warn", "pod_name": "a"}));
//! assert_eq!(a, b);
//! assert_eq!(a.len(), 36);
//! ```

use serde_json::Value;
use uuid::Uuid;

/// Namespace for entry ids. Changing it re-keys every stored entry.
pub const LOGDUP_NAMESPACE: Uuid = Uuid::from_u128(0x6c6f_6764_7570_4e53_8a1e_2f0c_d3b4_9e57);

/// Deterministic id for a `(text, metadata)` pair.
pub fn content_id(text: &str, metadata: &Value) -> String {
    content_uuid(text, metadata).to_string()
}

/// Same as [`content_id`] but returns the [`Uuid`] itself.
pub fn content_uuid(text: &str, metadata: &Value) -> Uuid {
    let meta = canonical_json(metadata);
    let mut material = Vec::with_capacity(text.len() + 1 + meta.len());
    material.extend_from_slice(text.as_bytes());
    material.push(0);
    material.extend_from_slice(meta.as_bytes());
    Uuid::new_v5(&LOGDUP_NAMESPACE, &material)
}

/// Compact JSON with object keys sorted recursively.
pub fn canonical_json(value: &Value) -> String {
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
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
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
        scalar => out.push_str(&scalar.to_string()),
    }
}
