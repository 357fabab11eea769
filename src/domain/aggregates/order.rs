//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::domain::aggregates::cart::CartLineItem;
use crate::domain::value_objects::Money;
use crate::pricing::OrderTotal;

/// Shipping form filled in by the shopper at checkout.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    /// Signed-in shopper; guests leave this empty.
    #[serde(default)]
    pub user_id: Option<String>,
    #[validate(custom = "not_blank")]
    pub name: String,
    #[validate(custom = "not_blank")]
    pub phone: String,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "not_blank")]
    pub address: String,
    #[validate(custom = "not_blank")]
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

impl CheckoutForm {
    /// Drops optional fields that were submitted blank.
    pub fn normalized(mut self) -> Self {
        for field in [&mut self.user_id, &mut self.email, &mut self.postal_code, &mut self.notes] {
            if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *field = None;
            }
        }
        self
    }
}

/// Values filled in when the shopper leaves them out.
#[derive(Clone, Debug)]
pub struct OrderDefaults {
    pub country: String,
    pub email: String,
}

impl Default for OrderDefaults {
    fn default() -> Self {
        Self { country: "Bangladesh".into(), email: "unknown@email.com".into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: u32,
    #[serde(alias = "price")]
    pub unit_price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&CartLineItem> for OrderLine {
    fn from(item: &CartLineItem) -> Self {
        Self {
            product_id: item.product_id.clone(), quantity: item.quantity, unit_price: item.unit_price,
            size: item.size.clone(), color: item.color.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    OutForDelivery,
    Shipped,
    Delivered,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

/// Payload handed to the order collaborator. Built once per checkout
/// attempt and never persisted by the storefront itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub user_id: String,
    pub products: Vec<OrderLine>,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub total_amount: Money,
    pub delivery_cost: Money,
    #[serde(default)]
    pub delivery_waived: bool,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderDraft {
    /// Assembles the draft from already validated input.
    pub fn assemble(lines: &[CartLineItem], form: &CheckoutForm, totals: &OrderTotal, defaults: &OrderDefaults) -> Self {
        let user_id = form.user_id.clone().unwrap_or_else(|| format!("guest-{}", Utc::now().timestamp_millis()));
        Self {
            user_id,
            products: lines.iter().map(OrderLine::from).collect(),
            customer: Customer {
                name: form.name.trim().to_string(),
                phone: form.phone.trim().to_string(),
                email: form.email.clone().unwrap_or_else(|| defaults.email.clone()),
            },
            shipping_address: ShippingAddress {
                street: form.address.trim().to_string(),
                city: form.city.trim().to_string(),
                state: String::new(),
                postal_code: form.postal_code.clone().unwrap_or_default(),
                country: defaults.country.clone(),
            },
            total_amount: totals.total,
            delivery_cost: totals.delivery_cost,
            delivery_waived: totals.delivery_waived,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            notes: form.notes.clone(),
        }
    }
}

/// Order as recorded by the order collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub draft: OrderDraft,
}

impl Order {
    pub fn total(&self) -> Money { self.draft.total_amount }
    pub fn status(&self) -> OrderStatus { self.draft.status }
}
