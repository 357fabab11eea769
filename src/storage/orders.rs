//! Order collaborator.

use std::path::PathBuf;
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderDraft};
use crate::domain::value_objects::normalize_phone;
use super::{read_optional, write_atomic, StorageError};

#[derive(Debug, Error)]
pub enum OrderGatewayError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Records the order. Any error means nothing was recorded.
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, OrderGatewayError>;

    /// Orders newest first, optionally restricted to a customer phone number
    /// (compared after normalization).
    async fn list_orders(&self, phone: Option<String>) -> Result<Vec<Order>, OrderGatewayError>;
}

/// Appends orders to `orders.json`.
#[derive(Debug)]
pub struct JsonFileOrderStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into(), write_lock: Mutex::new(()) } }

    async fn load(&self) -> Result<Vec<Order>, StorageError> {
        let Some(raw) = read_optional(&self.path).await? else { return Ok(vec![]) };
        match serde_json::from_slice(&raw) {
            Ok(orders) => Ok(orders),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "failed to parse orders file");
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl OrderGateway for JsonFileOrderStore {
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, OrderGatewayError> {
        if draft.products.is_empty() {
            return Err(OrderGatewayError::Rejected("order has no products".into()));
        }
        let _guard = self.write_lock.lock().await;
        let mut orders = self.load().await?;
        let order = Order { id: Uuid::now_v7().to_string(), created_at: Utc::now(), updated_at: None, draft };
        orders.push(order.clone());
        let bytes = serde_json::to_vec_pretty(&orders).map_err(StorageError::from)?;
        write_atomic(&self.path, bytes).await?;
        tracing::info!(order_id = %order.id, total = %order.total(), "order recorded");
        Ok(order)
    }

    async fn list_orders(&self, phone: Option<String>) -> Result<Vec<Order>, OrderGatewayError> {
        let mut orders = self.load().await?;
        if let Some(phone) = phone {
            let target = normalize_phone(&phone);
            orders.retain(|o| normalize_phone(&o.draft.customer.phone) == target);
        }
        // Stable sort over the reversed file keeps later appends first on equal timestamps.
        orders.reverse();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
