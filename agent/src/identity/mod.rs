//! Device identity: the persisted UUID and the hardware-bound key pair.

pub mod hardware_key;

pub use hardware_key::HardwareKeyManager;

use common::Result;
use log::{error, info};
use std::fs;
use std::path::Path;
use std::sync::RwLock;
use uuid::Uuid;

const UUID_FILE: &str = "uuid";

/// Sentinel returned when the persisted UUID cannot be read back.
pub const UNKNOWN_UUID: &str = "UNKNOWN_UUID";

/// Generates, persists, and serves the device UUID. The identifier is
/// created once on first launch and immutable afterwards; `set_uuid` only
/// replaces the in-memory value.
pub struct IdentityManager {
    uuid: RwLock<String>,
}

impl IdentityManager {
    pub fn new(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(UUID_FILE);

        let uuid = if path.exists() {
            match fs::read_to_string(&path) {
                Ok(persisted) => persisted.trim().to_string(),
                Err(e) => {
                    error!("Failed to read persisted UUID: {}", e);
                    UNKNOWN_UUID.to_string()
                }
            }
        } else {
            let uuid = Uuid::new_v4().to_string().to_lowercase();
            fs::write(&path, &uuid)?;
            info!("Generated new device UUID {}", uuid);
            uuid
        };

        Ok(Self {
            uuid: RwLock::new(uuid),
        })
    }

    /// Stable lowercase device identifier.
    pub fn uuid(&self) -> String {
        self.uuid
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .to_lowercase()
    }

    /// Replaces the in-memory UUID only; the persisted value stays as-is.
    pub fn set_uuid(&self, uuid: impl Into<String>) {
        let mut guard = self.uuid.write().unwrap_or_else(|e| e.into_inner());
        *guard = uuid.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn uuid_is_generated_once_and_persisted() {
        let dir = tempdir().unwrap();

        let first = IdentityManager::new(dir.path()).unwrap().uuid();
        let second = IdentityManager::new(dir.path()).unwrap().uuid();

        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn uuid_is_reported_lowercase() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(UUID_FILE),
            "276F45E0-AE4B-4BFA-B650-4A2B5C51BD1A",
        )
        .unwrap();

        let identity = IdentityManager::new(dir.path()).unwrap();
        assert_eq!(identity.uuid(), "276f45e0-ae4b-4bfa-b650-4a2b5c51bd1a");
    }

    #[test]
    fn unreadable_uuid_falls_back_to_sentinel() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(UUID_FILE), [0xff, 0xfe, 0xfd]).unwrap();

        let identity = IdentityManager::new(dir.path()).unwrap();
        assert_eq!(identity.uuid(), UNKNOWN_UUID.to_lowercase());
    }

    #[test]
    fn set_uuid_does_not_repersist() {
        let dir = tempdir().unwrap();
        let identity = IdentityManager::new(dir.path()).unwrap();
        let original = identity.uuid();

        identity.set_uuid("overridden-uuid");
        assert_eq!(identity.uuid(), "overridden-uuid");

        // A fresh manager still loads the originally persisted value.
        let reloaded = IdentityManager::new(dir.path()).unwrap();
        assert_eq!(reloaded.uuid(), original);
    }
}
