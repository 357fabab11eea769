//! Delivery zones

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryArea {
    pub id: String,
    pub name: String,
    pub cost: Money,
    pub is_active: bool,
}

/// Fields an operator may change on an existing area.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAreaPatch {
    pub name: Option<String>,
    pub cost: Option<Money>,
    pub is_active: Option<bool>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeliveryArea {
    pub name: String,
    pub cost: Money,
    #[serde(default = "active")]
    pub is_active: bool,
}

fn active() -> bool { true }

/// Delivery cost table, matched against the shopper's city at checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryZoneConfig {
    #[serde(default)]
    pub areas: Vec<DeliveryArea>,
    pub default_cost: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for DeliveryZoneConfig {
    fn default() -> Self {
        Self {
            areas: vec![
                DeliveryArea { id: "thakurgaon".into(), name: "ঠাকুরগাঁও".into(), cost: Money::from_major(60), is_active: true },
                DeliveryArea { id: "dinajpur".into(), name: "দিনাজপুর".into(), cost: Money::from_major(60), is_active: true },
            ],
            default_cost: Money::from_major(120),
            updated_at: None,
        }
    }
}

impl DeliveryZoneConfig {
    pub fn active_areas(&self) -> impl Iterator<Item = &DeliveryArea> {
        self.areas.iter().filter(|a| a.is_active)
    }

    pub fn area(&self, id: &str) -> Option<&DeliveryArea> { self.areas.iter().find(|a| a.id == id) }

    pub fn set_default_cost(&mut self, cost: Money) {
        self.default_cost = cost;
        self.touch();
    }

    pub fn add_area(&mut self, area: NewDeliveryArea) -> &DeliveryArea {
        self.areas.push(DeliveryArea { id: Uuid::now_v7().to_string(), name: area.name, cost: area.cost, is_active: area.is_active });
        self.touch();
        &self.areas[self.areas.len() - 1]
    }

    /// Applies `patch` to the area with `id`; unknown ids leave the table unchanged.
    pub fn update_area(&mut self, id: &str, patch: DeliveryAreaPatch) -> bool {
        let Some(area) = self.areas.iter_mut().find(|a| a.id == id) else { return false };
        if let Some(name) = patch.name { area.name = name; }
        if let Some(cost) = patch.cost { area.cost = cost; }
        if let Some(is_active) = patch.is_active { area.is_active = is_active; }
        self.touch();
        true
    }

    pub fn delete_area(&mut self, id: &str) -> bool {
        let before = self.areas.len();
        self.areas.retain(|a| a.id != id);
        if self.areas.len() == before { return false; }
        self.touch();
        true
    }

    fn touch(&mut self) { self.updated_at = Some(Utc::now()); }
}
