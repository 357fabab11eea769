//! Checkout: turns a cart and a shipping form into one order submission.
//!
//! ```text
//! Idle ──begin──▶ Submitting ──complete(Ok)──▶ Succeeded
//!                      │
//!                      └──complete(Err)──▶ Failed ──begin──▶ Submitting
//! ```
//!
//! The submitted lines leave the cart only after the order collaborator
//! accepts the order. Lines added while the order was in flight stay, and a
//! failed attempt leaves the cart untouched.

use serde::Serialize;
use thiserror::Error;
use validator::{Validate, ValidationErrors};
use crate::cart_store::CartStore;
use crate::domain::aggregates::{CartLineItem, CheckoutForm, DeliveryZoneConfig, Order, OrderDefaults, OrderDraft};
use crate::domain::events::{CheckoutEvent, DomainEvent};
use crate::pricing::{order_total, resolve_delivery_cost, OrderTotal, PricingRules};
use crate::storage::{CartStorage, OrderGateway, OrderGatewayError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutState {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Where the purchased lines come from.
#[derive(Clone, Debug)]
pub enum CheckoutSource {
    /// The shopper's persisted cart; the submitted lines are removed on success.
    Cart,
    /// Direct buy of the given lines; the persisted cart is not touched.
    Direct(Vec<CartLineItem>),
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("A checkout is already being submitted")]
    InProgress,

    #[error("Nothing to check out")]
    EmptyCart,

    #[error("Invalid checkout details: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Order could not be placed, please try again: {0}")]
    Rejected(#[source] OrderGatewayError),

    #[error("No checkout is being submitted")]
    NotSubmitting,
}

/// Price summary for `items` shipped to `city`.
pub fn quote(items: &[CartLineItem], city: &str, zones: &DeliveryZoneConfig, rules: &PricingRules) -> OrderTotal {
    let subtotal = items.iter().map(CartLineItem::line_total).sum();
    order_total(subtotal, resolve_delivery_cost(city, zones), rules)
}

#[derive(Debug, Default)]
pub struct Checkout {
    state: CheckoutState,
    /// Cart lines captured by `begin`, taken out of the cart on success.
    purchased: Option<Vec<CartLineItem>>,
    rules: PricingRules,
    defaults: OrderDefaults,
    events: Vec<DomainEvent>,
}

impl Checkout {
    pub fn new(rules: PricingRules, defaults: OrderDefaults) -> Self {
        Self { rules, defaults, ..Default::default() }
    }

    pub fn state(&self) -> CheckoutState { self.state }
    pub fn rules(&self) -> &PricingRules { &self.rules }

    /// Runs the pre-submit guards and builds the order draft. On success the
    /// checkout is `Submitting` until [`Checkout::complete`] is called.
    pub fn begin<S: CartStorage>(
        &mut self,
        cart: &CartStore<S>,
        source: CheckoutSource,
        form: CheckoutForm,
        zones: &DeliveryZoneConfig,
    ) -> Result<OrderDraft, CheckoutError> {
        if self.state == CheckoutState::Submitting {
            return Err(CheckoutError::InProgress);
        }
        let (lines, from_cart) = match source {
            CheckoutSource::Cart => (cart.items().to_vec(), true),
            CheckoutSource::Direct(lines) => (lines, false),
        };
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let form = form.normalized();
        form.validate()?;

        let totals = quote(&lines, &form.city, zones, &self.rules);
        let draft = OrderDraft::assemble(&lines, &form, &totals, &self.defaults);
        tracing::debug!(lines = lines.len(), total = %totals.total, delivery_waived = totals.delivery_waived, "submitting order");

        self.state = CheckoutState::Submitting;
        self.purchased = from_cart.then_some(lines);
        Ok(draft)
    }

    /// Applies the collaborator's answer to a submission started by `begin`.
    pub fn complete<S: CartStorage>(
        &mut self,
        cart: &mut CartStore<S>,
        outcome: Result<Order, OrderGatewayError>,
    ) -> Result<Order, CheckoutError> {
        if self.state != CheckoutState::Submitting {
            return Err(CheckoutError::NotSubmitting);
        }
        let purchased = self.purchased.take();
        match outcome {
            Ok(order) => {
                if let Some(lines) = purchased {
                    cart.remove_purchased(&lines);
                }
                self.state = CheckoutState::Succeeded;
                self.events.push(DomainEvent::Checkout(CheckoutEvent::OrderPlaced {
                    order_id: order.id.clone(), total: order.total(), delivery_waived: order.draft.delivery_waived,
                }));
                Ok(order)
            }
            Err(e) => {
                self.state = CheckoutState::Failed;
                self.events.push(DomainEvent::Checkout(CheckoutEvent::OrderRejected { reason: e.to_string() }));
                Err(CheckoutError::Rejected(e))
            }
        }
    }

    /// `begin`, the collaborator call and `complete` in one step, for callers
    /// that own the cart exclusively for the whole attempt.
    pub async fn submit<S: CartStorage, G: OrderGateway + ?Sized>(
        &mut self,
        cart: &mut CartStore<S>,
        source: CheckoutSource,
        form: CheckoutForm,
        zones: &DeliveryZoneConfig,
        gateway: &G,
    ) -> Result<Order, CheckoutError> {
        let draft = self.begin(cart, source, form, zones)?;
        let outcome = gateway.create_order(draft).await;
        self.complete(cart, outcome)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
}
