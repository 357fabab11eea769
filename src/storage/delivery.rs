//! Delivery zone table storage.

use std::path::PathBuf;
use async_trait::async_trait;
use crate::domain::aggregates::DeliveryZoneConfig;
use super::{read_optional, write_atomic, StorageError};

#[async_trait]
pub trait DeliveryConfigStore: Send + Sync {
    async fn get_delivery_config(&self) -> Result<DeliveryZoneConfig, StorageError>;
    async fn save_delivery_config(&self, config: &DeliveryZoneConfig) -> Result<(), StorageError>;
}

/// `delivery.json` store. A missing file is seeded with the default table;
/// an unreadable one is served as the default table without being rewritten.
#[derive(Clone, Debug)]
pub struct JsonFileDeliveryStore {
    path: PathBuf,
}

impl JsonFileDeliveryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

#[async_trait]
impl DeliveryConfigStore for JsonFileDeliveryStore {
    async fn get_delivery_config(&self) -> Result<DeliveryZoneConfig, StorageError> {
        let Some(raw) = read_optional(&self.path).await? else {
            let defaults = DeliveryZoneConfig::default();
            self.save_delivery_config(&defaults).await?;
            tracing::info!(path = %self.path.display(), "seeded default delivery zones");
            return Ok(defaults);
        };
        match serde_json::from_slice(&raw) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "malformed delivery zones, using defaults");
                Ok(DeliveryZoneConfig::default())
            }
        }
    }

    async fn save_delivery_config(&self, config: &DeliveryZoneConfig) -> Result<(), StorageError> {
        write_atomic(&self.path, serde_json::to_vec_pretty(config)?).await
    }
}
