//! Key-value persistence boundary.
//!
//! The tracker keeps three independent collections: cached orders, review
//! decisions, and payout records. Each is stored under its own key as a JSON
//! document through the [`KeyValueStore`] trait, so the storage engine can be
//! swapped without touching the business logic. Writes are last-write-wins.

use crate::errors::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;

/// SeaORM-backed store
pub mod database;
/// In-memory store
pub mod memory;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

/// A string-keyed store of string values.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    /// Deletes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Reads and deserializes the JSON document stored under `key`.
pub async fn load_json<S, T>(store: &S, key: &str) -> Result<Option<T>>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serializes `value` as JSON and stores it under `key`.
pub async fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore,
    T: Serialize + Sync,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, raw).await
}
