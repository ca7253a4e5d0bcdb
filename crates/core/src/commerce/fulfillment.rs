use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::inventory::FulfillmentType;
use crate::domain::order::{DeliveryEstimate, Order, OrderId, OrderStatus, ShippingPartner};

const SHIP_MIN_DAYS: u32 = 2;
const SHIP_MAX_DAYS: u32 = 5;
const PICKUP_MIN_HOURS: u32 = 4;
const PICKUP_MAX_HOURS: u32 = 24;

/// Live courier position is simulated around this depot.
const DEPOT_LATITUDE: f64 = 19.0760;
const DEPOT_LONGITUDE: f64 = 72.8777;

pub fn delivery_estimate<R: Rng + ?Sized>(
    fulfillment_type: FulfillmentType,
    now: DateTime<Utc>,
    rng: &mut R,
) -> DeliveryEstimate {
    match fulfillment_type {
        FulfillmentType::ShipToHome => {
            let days = rng.gen_range(SHIP_MIN_DAYS..=SHIP_MAX_DAYS);
            DeliveryEstimate::Shipping {
                min_days: SHIP_MIN_DAYS,
                max_days: SHIP_MAX_DAYS,
                date: (now + Duration::days(i64::from(days))).date_naive(),
            }
        }
        FulfillmentType::ClickAndCollect => DeliveryEstimate::Pickup {
            min_hours: PICKUP_MIN_HOURS,
            max_hours: PICKUP_MAX_HOURS,
            ready_by: now + Duration::hours(i64::from(PICKUP_MAX_HOURS)),
        },
        FulfillmentType::BuyInStore => DeliveryEstimate::Immediate,
    }
}

/// `ORD` + `YYYYMMDD` + six uppercase hex characters.
pub fn new_order_id(now: DateTime<Utc>) -> OrderId {
    OrderId(format!("ORD{}{}", now.format("%Y%m%d"), hex_suffix(6)))
}

pub fn tracking_number(partner: ShippingPartner) -> String {
    format!("{}{}", partner.id(), hex_suffix(10))
}

pub fn pick_shipping_partner<R: Rng + ?Sized>(rng: &mut R) -> ShippingPartner {
    ShippingPartner::ALL[rng.gen_range(0..ShippingPartner::ALL.len())]
}

fn hex_suffix(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_ascii_uppercase()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TrackingEvent {
    pub status: OrderStatus,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
    pub location: &'static str,
}

const TRACKING_STEPS: [(OrderStatus, &str, &str, i64); 4] = [
    (OrderStatus::Processing, "Order is being packed", "Warehouse", 2),
    (OrderStatus::Shipped, "Order shipped", "Shipping Hub", 24),
    (OrderStatus::OutForDelivery, "Out for delivery", "Local Delivery Hub", 48),
    (OrderStatus::Delivered, "Order delivered successfully", "Delivered", 52),
];

/// Synthesises the tracking timeline up to the order's current status.
/// Cancelled or returned orders only show the confirmation.
pub fn tracking_events(order: &Order) -> Vec<TrackingEvent> {
    let base = order.created_at;
    let mut events = vec![TrackingEvent {
        status: OrderStatus::Confirmed,
        message: "Order confirmed",
        timestamp: base,
        location: "Order Processing Center",
    }];

    let reached = TRACKING_STEPS.iter().position(|(status, ..)| *status == order.status);
    if let Some(last) = reached {
        events.extend(TRACKING_STEPS[..=last].iter().map(|&(status, message, location, hours)| {
            TrackingEvent { status, message, timestamp: base + Duration::hours(hours), location }
        }));
    }

    events
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LiveLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub eta_minutes: u32,
}

pub fn live_location<R: Rng + ?Sized>(order: &Order, rng: &mut R) -> Option<LiveLocation> {
    (order.status == OrderStatus::OutForDelivery).then(|| LiveLocation {
        latitude: DEPOT_LATITUDE + rng.gen_range(-0.01..=0.01),
        longitude: DEPOT_LONGITUDE + rng.gen_range(-0.01..=0.01),
        eta_minutes: rng.gen_range(15..=45),
    })
}
