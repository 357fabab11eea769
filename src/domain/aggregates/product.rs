//! Catalog product, as seen by the storefront

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::aggregates::cart::CartEntry;
use crate::domain::value_objects::{DiscountPercentage, Money};
use crate::pricing::discounted_price;

pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default, alias = "image_url")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, alias = "discount_percentage")]
    pub discount_percentage: Option<DiscountPercentage>,
    #[serde(default)]
    pub sizes: Option<Vec<String>>,
    #[serde(default, alias = "is_featured")]
    pub is_featured: bool,
    #[serde(default = "in_stock", alias = "in_stock")]
    pub in_stock: bool,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
}

fn in_stock() -> bool { true }

impl Product {
    pub fn discounted_price(&self) -> Money { discounted_price(self.price, self.discount_percentage) }

    /// Amount saved per unit by the product discount.
    pub fn savings(&self) -> Money { self.price - self.discounted_price() }

    /// Cart entry priced at the discounted unit price at the time of the call.
    pub fn cart_entry(&self, size: Option<String>, color: Option<String>) -> CartEntry {
        CartEntry {
            product_id: self.id.clone(),
            name: self.name.clone(),
            unit_price: self.discounted_price(),
            image: self.image_url.clone().unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            size,
            color,
        }
    }

    fn matches(&self, filter: &ProductFilter) -> bool {
        let category = self.category.as_deref().unwrap_or_default().to_lowercase();
        if let Some(wanted) = &filter.category {
            if category != wanted.to_lowercase() { return false; }
        }
        if let Some(search) = &filter.search {
            let needle = search.to_lowercase();
            let hit = self.name.to_lowercase().contains(&needle)
                || self.description.to_lowercase().contains(&needle)
                || category.contains(&needle);
            if !hit { return false; }
        }
        !filter.featured || self.is_featured
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl ProductFilter {
    /// Filters `products` and orders them newest first; undated products sort last.
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let mut matched: Vec<Product> = products.into_iter().filter(|p| p.matches(self)).collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }
}

struct SizeChart {
    category: &'static str,
    sizes: &'static [&'static str],
    display_name: &'static str,
}

const APPAREL: &[&str] = &["XS", "S", "M", "L", "XL", "XXL"];
const OUTERWEAR: &[&str] = &["S", "M", "L", "XL", "XXL"];
const WAIST: &[&str] = &["28", "30", "32", "34", "36", "38", "40", "42"];
const SHOES_UK: &[&str] = &["6", "7", "8", "9", "10", "11", "12"];
const ONE_SIZE: &[&str] = &["One Size"];

const SIZE_CHARTS: &[SizeChart] = &[
    SizeChart { category: "T-Shirts", sizes: APPAREL, display_name: "T-Shirt Sizes" },
    SizeChart { category: "Shirts", sizes: APPAREL, display_name: "Shirt Sizes" },
    SizeChart { category: "Polo Shirts", sizes: APPAREL, display_name: "Polo Shirt Sizes" },
    SizeChart { category: "Pants", sizes: WAIST, display_name: "Pant Sizes (Waist)" },
    SizeChart { category: "Jeans", sizes: WAIST, display_name: "Jeans Sizes (Waist)" },
    SizeChart { category: "Shorts", sizes: OUTERWEAR, display_name: "Shorts Sizes" },
    SizeChart { category: "Dresses", sizes: APPAREL, display_name: "Dress Sizes" },
    SizeChart { category: "Sarees", sizes: &["Free Size"], display_name: "Saree Size" },
    SizeChart { category: "Kurtas", sizes: APPAREL, display_name: "Kurta Sizes" },
    SizeChart { category: "Jackets", sizes: OUTERWEAR, display_name: "Jacket Sizes" },
    SizeChart { category: "Coats", sizes: OUTERWEAR, display_name: "Coat Sizes" },
    SizeChart { category: "Blazers", sizes: OUTERWEAR, display_name: "Blazer Sizes" },
    SizeChart { category: "Suits", sizes: OUTERWEAR, display_name: "Suit Sizes" },
    SizeChart { category: "Shoes", sizes: SHOES_UK, display_name: "Shoe Sizes (UK)" },
    SizeChart { category: "Sneakers", sizes: SHOES_UK, display_name: "Sneaker Sizes (UK)" },
    SizeChart { category: "Boots", sizes: SHOES_UK, display_name: "Boot Sizes (UK)" },
    SizeChart { category: "Sweaters", sizes: APPAREL, display_name: "Sweater Sizes" },
    SizeChart { category: "Hoodies", sizes: APPAREL, display_name: "Hoodie Sizes" },
    SizeChart { category: "Cardigans", sizes: APPAREL, display_name: "Cardigan Sizes" },
    SizeChart { category: "Sportswear", sizes: APPAREL, display_name: "Sportswear Sizes" },
    SizeChart { category: "Bags", sizes: ONE_SIZE, display_name: "Bag Size" },
    SizeChart { category: "Accessories", sizes: ONE_SIZE, display_name: "Accessory Size" },
    SizeChart { category: "Watches", sizes: ONE_SIZE, display_name: "Watch Size" },
];

fn size_chart(category: &str) -> Option<&'static SizeChart> {
    SIZE_CHARTS.iter().find(|c| c.category.eq_ignore_ascii_case(category))
}

/// Sizes offered for a category; unknown categories get `["One Size"]`.
pub fn sizes_for_category(category: &str) -> &'static [&'static str] {
    size_chart(category).map_or(ONE_SIZE, |c| c.sizes)
}

pub fn size_label_for_category(category: &str) -> &'static str {
    size_chart(category).map_or("Size", |c| c.display_name)
}
