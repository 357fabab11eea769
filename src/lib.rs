//! Storefront checkout core
//!
//! Cart, pricing and checkout for a single-currency clothing storefront.
//!
//! ## Features
//! - Variant-aware shopping cart persisted per shopper profile
//! - Discounted unit prices and delivery cost lookup by city
//! - Bulk-order rule (percentage off plus free delivery above a threshold)
//! - Checkout that clears the cart only once the order is recorded
//! - Delivery zone administration and order lookup by phone

pub mod api;
pub mod cart_store;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod pricing;
pub mod storage;

use thiserror::Error;

pub use cart_store::CartStore;
pub use checkout::{Checkout, CheckoutError, CheckoutSource, CheckoutState};
pub use config::{Config, ConfigError};
pub use storage::{OrderGatewayError, StorageError};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Delivery area not found")]
    DeliveryAreaNotFound,

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Orders(#[from] OrderGatewayError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Order submission task failed: {0}")]
    Submission(tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
