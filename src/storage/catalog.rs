//! Read-only product catalog.

use std::path::PathBuf;
use async_trait::async_trait;
use crate::domain::aggregates::{Product, ProductFilter};
use super::{read_optional, StorageError};

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StorageError>;
    async fn get_product(&self, id: &str) -> Result<Option<Product>, StorageError>;
}

/// Catalog backed by the admin panel's `products.json`.
#[derive(Clone, Debug)]
pub struct JsonFileProductCatalog {
    path: PathBuf,
}

impl JsonFileProductCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    async fn load(&self) -> Result<Vec<Product>, StorageError> {
        match read_optional(&self.path).await? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(vec![]),
        }
    }
}

#[async_trait]
impl ProductCatalog for JsonFileProductCatalog {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, StorageError> {
        Ok(filter.apply(self.load().await?))
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, StorageError> {
        Ok(self.load().await?.into_iter().find(|p| p.id == id))
    }
}
