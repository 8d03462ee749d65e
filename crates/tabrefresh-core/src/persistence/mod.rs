//! Persistence adapter: durable key-value storage for per-tab state.

pub mod errors;
pub mod file;
pub mod keys;
pub mod store;

pub use errors::StoreError;
pub use file::JsonFileStore;
pub use store::{KeyValueStore, MemoryStore};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Read and decode a typed value.
pub fn load<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StoreError::Deserialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Encode and write a typed value.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_typed_roundtrip() {
        let store = MemoryStore::new();
        save(&store, "refresh_count_1", &5u64).unwrap();
        let value: Option<u64> = load(&store, "refresh_count_1").unwrap();
        assert_eq!(value, Some(5));
    }

    #[test]
    fn test_load_wrong_shape_is_error() {
        let store = MemoryStore::new();
        store.set("refresh_count_1", json!("five")).unwrap();
        let result: Result<Option<u64>, _> = load(&store, "refresh_count_1");
        assert!(matches!(result, Err(StoreError::Deserialization { .. })));
    }
}
