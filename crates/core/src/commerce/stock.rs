use serde::Serialize;

use crate::domain::inventory::{find_location, FulfillmentType, LocationKind, StockRecord};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LocationStock {
    pub location_id: String,
    pub location_name: String,
    pub location_kind: LocationKind,
    pub city: Option<String>,
    pub available: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Availability {
    Unknown,
    OutOfStock,
    InStock { total_available: u32, locations: Vec<LocationStock> },
}

impl Availability {
    pub fn total_available(&self) -> u32 {
        match self {
            Self::InStock { total_available, .. } => *total_available,
            Self::Unknown | Self::OutOfStock => 0,
        }
    }

    pub fn can_fulfill(&self, quantity: u32) -> bool {
        self.total_available() >= quantity.max(1)
    }

    /// Store cities (warehouse excluded) holding stock, in location order.
    pub fn store_cities(&self) -> Vec<String> {
        match self {
            Self::InStock { locations, .. } => locations
                .iter()
                .filter(|location| location.location_kind == LocationKind::Store)
                .filter_map(|location| location.city.clone())
                .collect(),
            Self::Unknown | Self::OutOfStock => Vec::new(),
        }
    }
}

/// Sums `quantity - reserved` across every location holding the SKU.
pub fn availability(records: &[StockRecord]) -> Availability {
    if records.is_empty() {
        return Availability::Unknown;
    }

    let total_available: u32 = records.iter().map(StockRecord::available).sum();
    if total_available == 0 {
        return Availability::OutOfStock;
    }

    let locations = records
        .iter()
        .filter(|record| record.available() > 0)
        .map(|record| {
            let location = find_location(&record.location_id);
            LocationStock {
                location_id: record.location_id.clone(),
                location_name: location
                    .map(|location| location.name.to_string())
                    .unwrap_or_else(|| record.location_id.clone()),
                location_kind: location.map(|location| location.kind).unwrap_or(LocationKind::Store),
                city: location.and_then(|location| location.city).map(str::to_string),
                available: record.available(),
            }
        })
        .collect();

    Availability::InStock { total_available, locations }
}

/// Picks a store in the customer's city when one has stock, otherwise the
/// first store with stock. Warehouses never qualify.
pub fn nearest_store(records: &[StockRecord], customer_city: &str) -> Option<LocationStock> {
    let stores = match availability(records) {
        Availability::InStock { locations, .. } => locations
            .into_iter()
            .filter(|location| location.location_kind == LocationKind::Store)
            .collect::<Vec<_>>(),
        Availability::Unknown | Availability::OutOfStock => return None,
    };

    let wanted = customer_city.trim().to_lowercase();
    stores
        .iter()
        .find(|location| {
            location.city.as_deref().map(str::to_lowercase).is_some_and(|city| city == wanted)
        })
        .cloned()
        .or_else(|| stores.into_iter().next())
}

pub fn delivery_estimate_text(fulfillment_type: Option<FulfillmentType>) -> &'static str {
    match fulfillment_type {
        Some(FulfillmentType::ShipToHome) => "2-5 business days",
        Some(FulfillmentType::ClickAndCollect) => "Ready for pickup within 24 hours",
        Some(FulfillmentType::BuyInStore) => "Available immediately at store",
        None => "3-7 business days",
    }
}
