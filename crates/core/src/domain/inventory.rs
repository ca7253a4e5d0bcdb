use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Warehouse,
    Store,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: LocationKind,
    pub city: Option<&'static str>,
}

pub const LOCATIONS: &[Location] = &[
    Location {
        id: "WH_CENTRAL",
        name: "Central Warehouse",
        kind: LocationKind::Warehouse,
        city: None,
    },
    Location { id: "MUM01", name: "Mumbai Central", kind: LocationKind::Store, city: Some("Mumbai") },
    Location { id: "DEL01", name: "Delhi CP", kind: LocationKind::Store, city: Some("Delhi") },
    Location {
        id: "BLR01",
        name: "Bangalore Koramangala",
        kind: LocationKind::Store,
        city: Some("Bangalore"),
    },
    Location {
        id: "HYD01",
        name: "Hyderabad Banjara",
        kind: LocationKind::Store,
        city: Some("Hyderabad"),
    },
    Location { id: "CHN01", name: "Chennai T.Nagar", kind: LocationKind::Store, city: Some("Chennai") },
];

pub fn find_location(id: &str) -> Option<&'static Location> {
    LOCATIONS.iter().find(|location| location.id == id)
}

/// Stock held for one SKU at one location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub sku: String,
    pub location_id: String,
    pub quantity: u32,
    pub reserved: u32,
}

impl StockRecord {
    pub fn available(&self) -> u32 {
        self.quantity.saturating_sub(self.reserved)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentType {
    ShipToHome,
    ClickAndCollect,
    BuyInStore,
}

impl FulfillmentType {
    pub const ALL: [FulfillmentType; 3] =
        [FulfillmentType::ShipToHome, FulfillmentType::ClickAndCollect, FulfillmentType::BuyInStore];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ShipToHome => "ship_to_home",
            Self::ClickAndCollect => "click_and_collect",
            Self::BuyInStore => "buy_in_store",
        }
    }
}

impl fmt::Display for FulfillmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "ship_to_home" => Ok(Self::ShipToHome),
            "click_and_collect" => Ok(Self::ClickAndCollect),
            "buy_in_store" => Ok(Self::BuyInStore),
            other => {
                Err(DomainError::UnknownValue { kind: "fulfillment type", value: other.to_string() })
            }
        }
    }
}
