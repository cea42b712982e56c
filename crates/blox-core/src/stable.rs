use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct StableJsonOptions {
    pub ignore_object_keys: BTreeSet<String>,
}

/// Canonical JSON bytes: object keys sorted, ignored keys dropped at every depth.
pub fn stable_json_bytes(value: &Value, options: &StableJsonOptions) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&canonicalize(value, options))
}

pub fn stable_hash_hex(value: &Value, options: &StableJsonOptions) -> serde_json::Result<String> {
    let digest = Sha256::digest(stable_json_bytes(value, options)?);
    Ok(format!("{digest:x}"))
}

pub fn stable_hash_of<T: Serialize>(value: &T) -> serde_json::Result<String> {
    stable_hash_hex(&serde_json::to_value(value)?, &StableJsonOptions::default())
}

fn canonicalize(value: &Value, options: &StableJsonOptions) -> Value {
    match value {
        Value::Object(object) => {
            let mut keys = object
                .keys()
                .filter(|key| !options.ignore_object_keys.contains(*key))
                .collect::<Vec<_>>();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), canonicalize(&object[key], options));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| canonicalize(item, options)).collect()),
        _ => value.clone(),
    }
}

#[cfg(test)]
#[path = "stable_test.rs"]
mod tests;
