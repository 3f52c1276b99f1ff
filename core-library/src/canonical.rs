//! Canonical serialization for structural equality
//!
//! Aggregates compare and hash by their content, not by identity. Two entity
//! graphs are considered the same when their dumps render to the same
//! canonical text:
//!
//! - mapping keys are written in sorted order at every depth
//! - list elements keep their original order
//! - scalars use their JSON text form
//!
//! The digest is SHA-256 based, so hashes are stable across processes.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Render `value` as canonical JSON text.
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

/// 64-bit digest of a canonical form.
pub fn canonical_hash(canonical: &str) -> u64 {
    let digest = Sha256::digest(canonical.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn test_keys_are_sorted_at_every_depth() {
        let value = json!({
            "zeta": 1,
            "alpha": { "y": true, "b": null },
        });

        assert_eq!(
            canonical_json(&value),
            r#"{"alpha":{"b":null,"y":true},"zeta":1}"#
        );
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut first = Map::new();
        first.insert("title".into(), json!("Roygbiv"));
        first.insert("length".into(), json!(151.0));

        let mut second = Map::new();
        second.insert("length".into(), json!(151.0));
        second.insert("title".into(), json!("Roygbiv"));

        let first = canonical_json(&Value::Object(first));
        let second = canonical_json(&Value::Object(second));

        assert_eq!(first, second);
        assert_eq!(canonical_hash(&first), canonical_hash(&second));
    }

    #[test]
    fn test_list_order_is_preserved() {
        let forward = canonical_json(&json!(["rock", "ambient"]));
        let reversed = canonical_json(&json!(["ambient", "rock"]));

        assert_eq!(forward, r#"["rock","ambient"]"#);
        assert_ne!(forward, reversed);
        assert_ne!(canonical_hash(&forward), canonical_hash(&reversed));
    }

    #[test]
    fn test_keys_are_escaped() {
        let value = json!({ "quo\"te": "a\nb" });
        assert_eq!(canonical_json(&value), r#"{"quo\"te":"a\nb"}"#);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let text = canonical_json(&json!({ "name": "Aphex Twin", "aliases": ["AFX"] }));
        assert_eq!(canonical_hash(&text), canonical_hash(&text.clone()));
    }
}
