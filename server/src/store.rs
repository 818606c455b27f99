//! Document persistence for metric records.
//!
//! Each metric type writes to its own collection; a push is an independent
//! document insert with no dedup key, so repeated pushes accumulate.

use async_trait::async_trait;
use common::{Result, TelemetryError};
use log::info;
use parking_lot::RwLock;
use redis::Client as RedisClient;
use serde_json::Value;
use std::collections::HashMap;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Appends one document to the named collection.
    async fn insert(&self, collection: &str, document: &Value) -> Result<()>;

    /// Returns every document in the collection, newest first.
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Value>>;

    async fn count(&self, collection: &str) -> Result<usize>;

    /// Storage backend liveness probe.
    async fn ping(&self) -> Result<()>;
}

/// Redis-backed store. Collections are lists keyed by the metric type name,
/// with documents stored as JSON strings.
pub struct RedisStore {
    redis_client: RedisClient,
}

impl RedisStore {
    pub fn new(redis_client: RedisClient) -> Self {
        Self { redis_client }
    }

    fn collection_key(collection: &str) -> String {
        format!("metrics:{}", collection)
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn insert(&self, collection: &str, document: &Value) -> Result<()> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let key = Self::collection_key(collection);
        redis::cmd("LPUSH")
            .arg(&key)
            .arg(document.to_string())
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        info!("Stored document in collection {}", collection);
        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Value>> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(Self::collection_key(collection))
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        raw.iter()
            .map(|entry| {
                serde_json::from_str(entry)
                    .map_err(|e| TelemetryError::SerializationError(e.to_string()))
            })
            .collect()
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let length: i64 = redis::cmd("LLEN")
            .arg(Self::collection_key(collection))
            .query_async(&mut conn)
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        Ok(length as usize)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(TelemetryError::StorageError(
                "Unexpected Redis response".to_string(),
            ))
        }
    }
}

/// In-memory store used by the test suites.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, document: &Value) -> Result<()> {
        let mut collections = self.collections.write();
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(0, document.clone());
        Ok(())
    }

    async fn fetch_all(&self, collection: &str) -> Result<Vec<Value>> {
        let collections = self.collections.read();
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read();
        Ok(collections.get(collection).map(Vec::len).unwrap_or(0))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
