//! Aggregates module
pub mod cart;
pub mod delivery;
pub mod order;
pub mod product;

pub use cart::{Cart, CartEntry, CartLineItem, CartState};
pub use delivery::{DeliveryArea, DeliveryAreaPatch, DeliveryZoneConfig, NewDeliveryArea};
pub use order::{CheckoutForm, Customer, Order, OrderDefaults, OrderDraft, OrderLine, OrderStatus, PaymentStatus, ShippingAddress};
pub use product::{Product, ProductFilter};
