//! Pricing engine: discounted unit prices, delivery cost lookup and the
//! bulk-order rule applied at checkout.
//!
//! Everything here is a pure function of its inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::DeliveryZoneConfig;
use crate::domain::value_objects::{DiscountPercentage, Money};

/// `base * (1 - discount / 100)`; no discount returns `base` unchanged.
pub fn discounted_price(base: Money, discount: Option<DiscountPercentage>) -> Money {
    match discount {
        Some(d) if !d.is_zero() => Money::new(base.amount() * (Decimal::ONE - d.value() / Decimal::ONE_HUNDRED)),
        _ => base,
    }
}

/// Cost of the first active area matching `city`, or the table's default
/// cost. Matching is a case-insensitive substring test in either direction,
/// so both `"dhak"` and `"dhaka city"` select an area named `"Dhaka"`.
/// Surrounding whitespace in `city` is ignored; a blank city always gets the
/// default cost.
pub fn resolve_delivery_cost(city: &str, config: &DeliveryZoneConfig) -> Money {
    let needle = city.trim().to_lowercase();
    if needle.is_empty() {
        return config.default_cost;
    }
    config
        .active_areas()
        .find(|area| {
            let name = area.name.to_lowercase();
            !name.is_empty() && (name.contains(&needle) || needle.contains(&name))
        })
        .map(|area| area.cost)
        .unwrap_or(config.default_cost)
}

/// Store-wide bulk order rule.
///
/// Once the subtotal reaches `bulk_threshold`, the order gets
/// `bulk_discount_percent` off and delivery is not charged. Both effects are
/// one rule and always switch together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRules {
    pub bulk_threshold: Money,
    pub bulk_discount_percent: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self { bulk_threshold: Money::from_major(3000), bulk_discount_percent: Decimal::new(20, 0) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotal {
    pub subtotal: Money,
    /// Delivery cost quoted for the city, whether or not it was charged.
    pub delivery_cost: Money,
    pub discount: Money,
    pub total: Money,
    pub delivery_waived: bool,
    pub bulk_discount_applied: bool,
}

pub fn order_total(subtotal: Money, delivery_cost: Money, rules: &PricingRules) -> OrderTotal {
    if subtotal >= rules.bulk_threshold {
        let discount = subtotal.percent(rules.bulk_discount_percent);
        OrderTotal {
            subtotal, delivery_cost, discount,
            total: subtotal - discount,
            delivery_waived: true,
            bulk_discount_applied: true,
        }
    } else {
        OrderTotal {
            subtotal, delivery_cost,
            discount: Money::ZERO,
            total: subtotal + delivery_cost,
            delivery_waived: false,
            bulk_discount_applied: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::DeliveryArea;

    fn zones() -> DeliveryZoneConfig {
        let area = |id: &str, name: &str, cost: i64, is_active: bool| DeliveryArea {
            id: id.into(), name: name.into(), cost: Money::from_major(cost), is_active,
        };
        DeliveryZoneConfig {
            areas: vec![area("1", "Dhaka", 50, true), area("2", "Chittagong", 80, true), area("3", "Khulna", 70, false)],
            default_cost: Money::from_major(120),
            updated_at: None,
        }
    }

    #[test]
    fn test_discounted_price() {
        let base = Money::from_major(1000);
        assert_eq!(discounted_price(base, None), base);
        assert_eq!(discounted_price(base, Some(DiscountPercentage::default())), base);
        assert_eq!(discounted_price(base, Some(DiscountPercentage::new(Decimal::new(15, 0)))), Money::from_major(850));
        assert_eq!(discounted_price(Money::from_major(999), Some(DiscountPercentage::new(Decimal::new(50, 0)))), Money::new(Decimal::new(4995, 1)));
    }

    #[test]
    fn test_discount_out_of_range_passes_through() {
        let price = discounted_price(Money::from_major(100), Some(DiscountPercentage::new(Decimal::new(120, 0))));
        assert_eq!(price, Money::from_major(-20));
    }

    #[test]
    fn test_delivery_substring_match_is_case_insensitive() {
        let config = zones();
        assert_eq!(resolve_delivery_cost("dhaka city", &config), Money::from_major(50));
        assert_eq!(resolve_delivery_cost("dhaka", &config), Money::from_major(50));
        assert_eq!(resolve_delivery_cost("DHA", &config), Money::from_major(50));
        assert_eq!(resolve_delivery_cost("chitta", &config), Money::from_major(80));
    }

    #[test]
    fn test_delivery_city_whitespace_is_ignored() {
        let config = zones();
        assert_eq!(resolve_delivery_cost("Dhaka ", &config), Money::from_major(50));
        assert_eq!(resolve_delivery_cost("  chittagong\n", &config), Money::from_major(80));
    }

    #[test]
    fn test_delivery_unknown_city_uses_default() {
        assert_eq!(resolve_delivery_cost("Rajshahi", &zones()), Money::from_major(120));
    }

    #[test]
    fn test_delivery_blank_city_uses_default() {
        assert_eq!(resolve_delivery_cost("  ", &zones()), Money::from_major(120));
    }

    #[test]
    fn test_delivery_inactive_area_ignored() {
        assert_eq!(resolve_delivery_cost("Khulna", &zones()), Money::from_major(120));
    }

    #[test]
    fn test_delivery_first_match_wins() {
        let mut config = zones();
        config.areas[1].name = "Dhaka North".into();
        assert_eq!(resolve_delivery_cost("dhaka", &config), Money::from_major(50));
    }

    #[test]
    fn test_below_bulk_threshold_charges_delivery() {
        let total = order_total(Money::from_major(2999), Money::from_major(60), &PricingRules::default());
        assert_eq!(total.total, Money::from_major(3059));
        assert!(!total.delivery_waived);
        assert!(!total.bulk_discount_applied);
        assert_eq!(total.discount, Money::ZERO);
    }

    #[test]
    fn test_bulk_threshold_is_inclusive() {
        let total = order_total(Money::from_major(3000), Money::from_major(60), &PricingRules::default());
        assert_eq!(total.total, Money::from_major(2400));
        assert_eq!(total.discount, Money::from_major(600));
        assert!(total.delivery_waived);
        assert!(total.bulk_discount_applied);
    }

    #[test]
    fn test_custom_rules() {
        let rules = PricingRules { bulk_threshold: Money::from_major(500), bulk_discount_percent: Decimal::new(10, 0) };
        let total = order_total(Money::from_major(500), Money::from_major(60), &rules);
        assert_eq!(total.total, Money::from_major(450));
    }
}
