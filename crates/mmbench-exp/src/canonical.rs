use mmbench_core::errors::{BenchError, ErrorInfo};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Serializes `value` to JSON with object keys in sorted order.
///
/// Going through [`serde_json::Value`] sorts every map, so equal payloads
/// always produce identical bytes.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, BenchError> {
    let value = serde_json::to_value(value).map_err(|err| {
        BenchError::Serde(
            ErrorInfo::new("json-encode", "failed to encode value").with_hint(err.to_string()),
        )
    })?;
    serde_json::to_vec_pretty(&value).map_err(|err| {
        BenchError::Serde(
            ErrorInfo::new("json-write", "failed to write canonical json")
                .with_hint(err.to_string()),
        )
    })
}

/// Lowercase hex SHA-256 of the canonical JSON form of `value`.
pub fn canonical_digest<T: Serialize>(value: &T) -> Result<String, BenchError> {
    let digest = Sha256::digest(to_canonical_json_bytes(value)?);
    Ok(format!("{digest:x}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn digest_ignores_map_insertion_order() {
        let a: HashMap<&str, u32> = [("sizes", 4), ("repetitions", 10)].into_iter().collect();
        let b: HashMap<&str, u32> = [("repetitions", 10), ("sizes", 4)].into_iter().collect();
        let digest = canonical_digest(&a).expect("digest");
        assert_eq!(digest, canonical_digest(&b).expect("digest"));
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn canonical_bytes_sort_keys() {
        let map: HashMap<&str, u32> = [("z", 1), ("a", 2)].into_iter().collect();
        let bytes = to_canonical_json_bytes(&map).expect("bytes");
        let text = String::from_utf8(bytes).expect("utf8");
        assert!(text.find("\"a\"") < text.find("\"z\""));
    }
}
