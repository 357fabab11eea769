//! Collaborator ports and their JSON-file adapters.
//!
//! Every adapter reads and writes whole files; concurrent writers from
//! different processes race and the last write wins.

pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod orders;

use std::path::Path;
use thiserror::Error;

pub use cart::{CartStorage, JsonFileCartStorage, MemoryCartStorage};
pub use catalog::{JsonFileProductCatalog, ProductCatalog};
pub use delivery::{DeliveryConfigStore, JsonFileDeliveryStore};
pub use orders::{JsonFileOrderStore, OrderGateway, OrderGatewayError};

#[cfg(test)]
pub use orders::MockOrderGateway;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid profile id: {0:?}")]
    InvalidProfile(String),
}

/// Writes `bytes` next to `path` and renames over it so readers never see a
/// half-written file.
pub(crate) async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Reads `path`, treating a missing file as `None`.
pub(crate) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
