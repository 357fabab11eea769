//! Domain events
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Cart(CartEvent),
    Checkout(CheckoutEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum CartEvent {
    ItemAdded { product_id: String, quantity: u32 },
    QuantityChanged { product_id: String, quantity: u32 },
    ItemRemoved { product_id: String },
    Cleared,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutEvent {
    OrderPlaced { order_id: String, total: Money, delivery_waived: bool },
    OrderRejected { reason: String },
}

impl DomainEvent {
    /// Emits the event on the `storefront::events` tracing target.
    pub fn trace(&self) {
        match self {
            DomainEvent::Cart(CartEvent::ItemAdded { product_id, quantity }) =>
                tracing::debug!(target: "storefront::events", %product_id, quantity, "cart item added"),
            DomainEvent::Cart(CartEvent::QuantityChanged { product_id, quantity }) =>
                tracing::debug!(target: "storefront::events", %product_id, quantity, "cart quantity changed"),
            DomainEvent::Cart(CartEvent::ItemRemoved { product_id }) =>
                tracing::debug!(target: "storefront::events", %product_id, "cart item removed"),
            DomainEvent::Cart(CartEvent::Cleared) =>
                tracing::debug!(target: "storefront::events", "cart cleared"),
            DomainEvent::Checkout(CheckoutEvent::OrderPlaced { order_id, total, delivery_waived }) =>
                tracing::info!(target: "storefront::events", %order_id, %total, delivery_waived, "order placed"),
            DomainEvent::Checkout(CheckoutEvent::OrderRejected { reason }) =>
                tracing::warn!(target: "storefront::events", %reason, "order rejected"),
        }
    }
}
