//! Hashing System - SHA-256 over canonical JSON
//!
//! Every identity in the pipeline (spec, geometry, program) is a short
//! prefix of a SHA-256 digest over sorted-key JSON, so two artifacts carry
//! the same hash exactly when they serialize to the same content.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

/// Length of the short fingerprints stamped into panels and sheets.
pub const SHORT_HASH_LEN: usize = 16;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    to_string(&sort_value(&v))
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Full-length content hash of any serializable value.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(value)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

/// 16-character fingerprint used for spec, geometry and program hashes.
pub fn short_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut full = content_hash(value)?;
    full.truncate(SHORT_HASH_LEN);
    Ok(full)
}

/// Hash of one run's identity: which spec, which geometry, which seed.
/// run_hash = sha256(spec_hash + geometry_hash + base_seed + engine_version)
pub fn compute_run_hash(
    spec_hash: &str,
    geometry_hash: &str,
    base_seed: u64,
    engine_version: &str,
) -> String {
    let combined = format!("{}:{}:{}:{}", spec_hash, geometry_hash, base_seed, engine_version);
    sha256_hex(combined.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorted() {
        let obj = json!({"z": 1, "a": 2, "m": 3});
        let canonical = canonical_json(&obj).unwrap();
        assert_eq!(canonical, r#"{"a":2,"m":3,"z":1}"#);
    }

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        assert_eq!(sha256_hex(data), sha256_hex(data));
        assert_eq!(sha256_hex(data).len(), 64);
    }

    #[test]
    fn test_short_hash_is_key_order_independent() {
        let a = json!({"width": 12.0, "depth": 8.0});
        let b = json!({"depth": 8.0, "width": 12.0});
        let ha = short_hash(&a).unwrap();
        assert_eq!(ha, short_hash(&b).unwrap());
        assert_eq!(ha.len(), SHORT_HASH_LEN);
    }

    #[test]
    fn test_short_hash_changes_with_content() {
        let a = short_hash(&json!({"width": 12.0})).unwrap();
        let b = short_hash(&json!({"width": 25.0})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_run_hash_stable() {
        let h1 = compute_run_hash("aaaa", "bbbb", 42, "1.0.0");
        let h2 = compute_run_hash("aaaa", "bbbb", 42, "1.0.0");
        assert_eq!(h1, h2);
        assert_ne!(h1, compute_run_hash("aaaa", "bbbb", 43, "1.0.0"));
    }
}
