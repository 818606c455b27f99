//! Registered-device directory.
//!
//! Successful (or duplicate) registrations are recorded so that operators
//! can list which devices have been through the flow. Redis keeps the set of
//! registered UUIDs plus one record per device.

use async_trait::async_trait;
use chrono::Utc;
use common::{Result, TelemetryError};
use log::info;
use parking_lot::RwLock;
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub uuid: String,
    pub public_key: String,
    pub registered_at: chrono::DateTime<Utc>,
}

#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn record_device(&self, uuid: &str, public_key: &str) -> Result<()>;
    async fn all_devices(&self) -> Result<Vec<DeviceRecord>>;
}

pub struct RedisDeviceDirectory {
    redis_client: RedisClient,
}

impl RedisDeviceDirectory {
    pub fn new(redis_client: RedisClient) -> Self {
        Self { redis_client }
    }
}

#[async_trait]
impl DeviceDirectory for RedisDeviceDirectory {
    async fn record_device(&self, uuid: &str, public_key: &str) -> Result<()> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let record = DeviceRecord {
            uuid: uuid.to_string(),
            public_key: public_key.to_string(),
            registered_at: Utc::now(),
        };
        let data = serde_json::to_string(&record)
            .map_err(|e| TelemetryError::SerializationError(e.to_string()))?;

        redis::cmd("SET")
            .arg(format!("device:{}", uuid))
            .arg(data)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        redis::cmd("SADD")
            .arg("registered_devices")
            .arg(uuid)
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        info!("Recorded registered device {}", uuid);
        Ok(())
    }

    async fn all_devices(&self) -> Result<Vec<DeviceRecord>> {
        let mut conn = self
            .redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let uuids: Vec<String> = redis::cmd("SMEMBERS")
            .arg("registered_devices")
            .query_async(&mut conn)
            .await
            .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

        let mut devices = Vec::new();
        for uuid in uuids {
            let data: Option<String> = redis::cmd("GET")
                .arg(format!("device:{}", uuid))
                .query_async(&mut conn)
                .await
                .map_err(|e| TelemetryError::StorageError(e.to_string()))?;

            if let Some(data) = data {
                let record: DeviceRecord = serde_json::from_str(&data)
                    .map_err(|e| TelemetryError::SerializationError(e.to_string()))?;
                devices.push(record);
            }
        }

        Ok(devices)
    }
}

/// In-memory directory used by the test suites.
#[derive(Default)]
pub struct MemoryDeviceDirectory {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl MemoryDeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceDirectory for MemoryDeviceDirectory {
    async fn record_device(&self, uuid: &str, public_key: &str) -> Result<()> {
        self.devices.write().insert(
            uuid.to_string(),
            DeviceRecord {
                uuid: uuid.to_string(),
                public_key: public_key.to_string(),
                registered_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn all_devices(&self) -> Result<Vec<DeviceRecord>> {
        Ok(self.devices.read().values().cloned().collect())
    }
}
