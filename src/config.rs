//! Service configuration, read from the environment (and `.env` via `dotenvy`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use rust_decimal::Decimal;
use thiserror::Error;
use crate::domain::aggregates::OrderDefaults;
use crate::domain::value_objects::Money;
use crate::pricing::PricingRules;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub pricing: PricingRules,
    pub order_defaults: OrderDefaults,
    pub currency_symbol: String,
    /// Shopper sessions kept in memory before idle ones are evicted.
    pub max_sessions: usize,
    pub session_idle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8083,
            data_dir: PathBuf::from("data"),
            pricing: PricingRules::default(),
            order_defaults: OrderDefaults::default(),
            currency_symbol: "৳".into(),
            max_sessions: 1024,
            session_idle: Duration::from_secs(30 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source; unset variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let threshold = parse(&lookup, "BULK_DISCOUNT_THRESHOLD")?.map(Money::new);
        Ok(Self {
            port: parse(&lookup, "PORT")?.unwrap_or(defaults.port),
            data_dir: lookup("STOREFRONT_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            pricing: PricingRules {
                bulk_threshold: threshold.unwrap_or(defaults.pricing.bulk_threshold),
                bulk_discount_percent: parse::<Decimal>(&lookup, "BULK_DISCOUNT_PERCENT")?
                    .unwrap_or(defaults.pricing.bulk_discount_percent),
            },
            order_defaults: OrderDefaults {
                country: lookup("DEFAULT_COUNTRY").unwrap_or(defaults.order_defaults.country),
                email: lookup("FALLBACK_ORDER_EMAIL").unwrap_or(defaults.order_defaults.email),
            },
            currency_symbol: lookup("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
            max_sessions: parse(&lookup, "MAX_SESSIONS")?.unwrap_or(defaults.max_sessions),
            session_idle: parse(&lookup, "SESSION_IDLE_SECS")?.map(Duration::from_secs).unwrap_or(defaults.session_idle),
        })
    }

    pub fn carts_dir(&self) -> PathBuf { self.data_dir.join("carts") }
    pub fn products_path(&self) -> PathBuf { self.data_dir.join("products.json") }
    pub fn delivery_path(&self) -> PathBuf { self.data_dir.join("delivery.json") }
    pub fn orders_path(&self) -> PathBuf { self.data_dir.join("orders.json") }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::Invalid { name, value }),
        },
    }
}
