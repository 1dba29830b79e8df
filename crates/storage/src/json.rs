//! JSON helpers over a `KeyValueStore`.
//!
//! Reads are tolerant: a backend failure or a value that does not parse is
//! logged and reported as absent. Writes propagate errors.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::repository::{KeyValueStore, StorageError};

/// Decode the value under `key`, or `None` when absent, unreadable or corrupt.
pub async fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!(key, "storage read failed, treating as absent: {err}");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, "corrupt JSON in storage, treating as absent: {err}");
            None
        }
    }
}

/// Like `load_json`, falling back to `T::default()`.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(
    store: &dyn KeyValueStore,
    key: &str,
) -> T {
    load_json(store, key).await.unwrap_or_default()
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if encoding fails, or the backend's
/// error if the write fails.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw =
        serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    store.set(key, &raw).await
}
