use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::Category;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub loyalty_points: u32,
    pub total_orders: u32,
    pub total_spent: Decimal,
    pub birthday: Option<NaiveDate>,
    pub favorite_categories: Vec<Category>,
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
}

impl CustomerProfile {
    pub fn city(&self) -> Option<&str> {
        self.address.as_ref().map(|address| address.city.as_str())
    }

    /// First name used in greetings.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// One line of a past purchase, used by collaborative recommendations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub customer_id: CustomerId,
    pub order_id: String,
    pub sku: String,
    pub product_name: String,
    pub category: Category,
    pub brand: String,
    pub quantity: u32,
    pub price: Decimal,
    pub order_date: DateTime<Utc>,
}
