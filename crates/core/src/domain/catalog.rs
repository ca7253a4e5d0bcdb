use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Footwear,
    Clothing,
    Electronics,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 4] =
        [Category::Footwear, Category::Clothing, Category::Electronics, Category::Accessories];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Footwear => "Footwear",
            Self::Clothing => "Clothing",
            Self::Electronics => "Electronics",
            Self::Accessories => "Accessories",
        }
    }

    /// Three-letter prefix used when minting SKUs (`FOO1000`).
    pub fn sku_prefix(self) -> &'static str {
        match self {
            Self::Footwear => "FOO",
            Self::Clothing => "CLO",
            Self::Electronics => "ELE",
            Self::Accessories => "ACC",
        }
    }

    /// Categories that pair well with items from this one.
    pub fn complements(self) -> &'static [Category] {
        match self {
            Self::Footwear => &[Category::Accessories, Category::Clothing],
            Self::Clothing => &[Category::Accessories, Category::Footwear],
            Self::Electronics => &[Category::Accessories],
            Self::Accessories => &[],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "footwear" => Ok(Self::Footwear),
            "clothing" => Ok(Self::Clothing),
            "electronics" => Ok(Self::Electronics),
            "accessories" => Ok(Self::Accessories),
            _ => Err(DomainError::UnknownValue { kind: "category", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub category: Category,
    pub brand: String,
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub discount_percentage: Option<u32>,
    pub rating: f64,
    pub reviews_count: u32,
    pub is_featured: bool,
    pub is_available: bool,
    pub tags: Vec<String>,
    pub image_url: String,
}

/// Catalogue query used by the product listing endpoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductQuery {
    pub category: Option<Category>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: usize,
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        self.category.map_or(true, |category| product.category == category)
            && self.min_price.map_or(true, |min| product.price >= min)
            && self.max_price.map_or(true, |max| product.price <= max)
    }
}
