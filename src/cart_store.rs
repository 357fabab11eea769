//! Cart store: the shopper's cart bound to its durable storage.
//!
//! All cart reads and writes go through a [`CartStore`]. It loads once when
//! created and writes the full state back after every change.

use crate::domain::aggregates::{Cart, CartEntry, CartLineItem, CartState};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{LineKey, Money};
use crate::storage::CartStorage;

#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    cart: Cart,
    storage: S,
    events: Vec<DomainEvent>,
}

impl<S: CartStorage> CartStore<S> {
    /// Seeds the cart from `storage`. Missing or unreadable data yields an
    /// empty cart.
    pub fn load(storage: S) -> Self {
        let cart = match storage.read_cart() {
            Ok(Some(state)) => Cart::from_state(state),
            Ok(None) => Cart::new(),
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable cart");
                Cart::new()
            }
        };
        Self { cart, storage, events: vec![] }
    }

    pub fn items(&self) -> &[CartLineItem] { self.cart.items() }
    pub fn is_empty(&self) -> bool { self.cart.is_empty() }
    pub fn total_items(&self) -> u64 { self.cart.total_items() }
    pub fn total_price(&self) -> Money { self.cart.total_price() }
    pub fn state(&self) -> CartState { self.cart.to_state() }
    pub fn storage(&self) -> &S { &self.storage }

    pub fn add_item(&mut self, entry: CartEntry) {
        self.cart.add_item(entry);
        self.persist();
    }

    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) {
        if self.cart.update_quantity(product_id, quantity) { self.persist(); }
    }

    pub fn update_quantity_variant(&mut self, product_id: &str, quantity: i64, size: Option<&str>, color: Option<&str>) {
        if self.cart.update_quantity_variant(LineKey::new(product_id, size, color), quantity) { self.persist(); }
    }

    pub fn remove_item(&mut self, product_id: &str) {
        if self.cart.remove_item(product_id) { self.persist(); }
    }

    pub fn remove_item_variant(&mut self, product_id: &str, size: Option<&str>, color: Option<&str>) {
        if self.cart.remove_item_variant(LineKey::new(product_id, size, color)) { self.persist(); }
    }

    /// Removes the units of a completed purchase, keeping anything added since.
    pub fn remove_purchased(&mut self, purchased: &[CartLineItem]) {
        if self.cart.remove_purchased(purchased) { self.persist(); }
    }

    pub fn clear(&mut self) {
        self.cart.clear();
        self.persist();
    }

    /// Events raised since the last call, in order.
    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn persist(&mut self) {
        self.events.extend(self.cart.take_events());
        if let Err(e) = self.storage.write_cart(&self.cart.to_state()) {
            tracing::warn!(error = %e, "failed to persist cart");
        }
    }
}
