//! Cart Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::events::{CartEvent, DomainEvent};
use crate::domain::value_objects::{LineKey, Money};

/// One row in the cart.
///
/// `name`, `image` and `unit_price` are a snapshot taken when the line was
/// first added and are never refreshed from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CartLineItem {
    pub fn key(&self) -> LineKey<'_> {
        LineKey::new(&self.product_id, self.size.as_deref(), self.color.as_deref())
    }

    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

/// What the caller hands to [`Cart::add_item`]; `unit_price` is already
/// discount-adjusted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl CartEntry {
    pub fn key(&self) -> LineKey<'_> {
        LineKey::new(&self.product_id, self.size.as_deref(), self.color.as_deref())
    }

    /// A single line of `quantity` units, used by the direct-buy path.
    pub fn into_line(self, quantity: u32) -> CartLineItem {
        CartLineItem {
            product_id: self.product_id, name: self.name, image: self.image,
            unit_price: self.unit_price, quantity, size: self.size, color: self.color,
        }
    }
}

/// Persisted shape of a cart.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CartState {
    #[serde(default)]
    pub items: Vec<CartLineItem>,
}

/// Upper bound on the quantity of a single line; larger requests are clamped.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<CartLineItem>,
    events: Vec<DomainEvent>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    /// Rebuilds a cart from persisted state, dropping lines whose quantity
    /// violates the `>= 1` invariant and clamping oversized ones.
    pub fn from_state(state: CartState) -> Self {
        let items = state
            .items
            .into_iter()
            .filter(|i| i.quantity > 0)
            .map(|mut i| {
                i.quantity = i.quantity.min(MAX_LINE_QUANTITY);
                i
            })
            .collect();
        Self { items, events: vec![] }
    }

    pub fn to_state(&self) -> CartState { CartState { items: self.items.clone() } }

    pub fn items(&self) -> &[CartLineItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn line_count(&self) -> usize { self.items.len() }

    pub fn total_items(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity)).sum() }
    pub fn total_price(&self) -> Money { self.items.iter().map(CartLineItem::line_total).sum() }

    pub fn find(&self, key: LineKey<'_>) -> Option<&CartLineItem> {
        self.items.iter().find(|i| i.key() == key)
    }

    /// Adds one unit. An existing line with the same identity is incremented,
    /// otherwise a new line is appended.
    pub fn add_item(&mut self, entry: CartEntry) {
        let quantity = match self.position(entry.key()) {
            Some(idx) => {
                let line = &mut self.items[idx];
                line.quantity = (line.quantity + 1).min(MAX_LINE_QUANTITY);
                line.quantity
            }
            None => {
                self.items.push(entry.clone().into_line(1));
                1
            }
        };
        self.raise_event(DomainEvent::Cart(CartEvent::ItemAdded { product_id: entry.product_id, quantity }));
    }

    /// Sets the quantity of the first line for `product_id`, whatever its variant.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> bool {
        match self.items.iter().position(|i| i.product_id == product_id) {
            Some(idx) => { self.set_quantity_at(idx, quantity); true }
            None => false,
        }
    }

    pub fn update_quantity_variant(&mut self, key: LineKey<'_>, quantity: i64) -> bool {
        match self.position(key) {
            Some(idx) => { self.set_quantity_at(idx, quantity); true }
            None => false,
        }
    }

    pub fn remove_item(&mut self, product_id: &str) -> bool {
        match self.items.iter().position(|i| i.product_id == product_id) {
            Some(idx) => { self.remove_at(idx); true }
            None => false,
        }
    }

    pub fn remove_item_variant(&mut self, key: LineKey<'_>) -> bool {
        match self.position(key) {
            Some(idx) => { self.remove_at(idx); true }
            None => false,
        }
    }

    /// Takes `purchased` out of the cart. Each matching line loses the
    /// purchased quantity and disappears once nothing is left; lines added
    /// after the purchase was captured stay.
    pub fn remove_purchased(&mut self, purchased: &[CartLineItem]) -> bool {
        let mut changed = false;
        for bought in purchased {
            let Some(idx) = self.position(bought.key()) else { continue };
            let remaining = self.items[idx].quantity.saturating_sub(bought.quantity);
            self.set_quantity_at(idx, i64::from(remaining));
            changed = true;
        }
        changed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.raise_event(DomainEvent::Cart(CartEvent::Cleared));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn position(&self, key: LineKey<'_>) -> Option<usize> {
        self.items.iter().position(|i| i.key() == key)
    }

    fn set_quantity_at(&mut self, idx: usize, quantity: i64) {
        if quantity <= 0 {
            self.remove_at(idx);
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX).min(MAX_LINE_QUANTITY);
        let line = &mut self.items[idx];
        line.quantity = quantity;
        let product_id = line.product_id.clone();
        self.raise_event(DomainEvent::Cart(CartEvent::QuantityChanged { product_id, quantity }));
    }

    fn remove_at(&mut self, idx: usize) {
        let removed = self.items.remove(idx);
        self.raise_event(DomainEvent::Cart(CartEvent::ItemRemoved { product_id: removed.product_id }));
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}
