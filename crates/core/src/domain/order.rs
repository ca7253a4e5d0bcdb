use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::inventory::FulfillmentType;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::Processing)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| DomainError::UnknownValue {
                kind: "order status",
                value: value.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShippingPartner {
    BlueDart,
    Delhivery,
    Dtdc,
}

impl ShippingPartner {
    pub const ALL: [ShippingPartner; 3] =
        [ShippingPartner::BlueDart, ShippingPartner::Delhivery, ShippingPartner::Dtdc];

    pub fn id(self) -> &'static str {
        match self {
            Self::BlueDart => "BLUEDART",
            Self::Delhivery => "DELHIVERY",
            Self::Dtdc => "DTDC",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BlueDart => "Blue Dart",
            Self::Delhivery => "Delhivery",
            Self::Dtdc => "DTDC",
        }
    }

    pub fn speed(self) -> &'static str {
        match self {
            Self::BlueDart => "express",
            Self::Delhivery | Self::Dtdc => "standard",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
}

impl TimeSlot {
    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "9 AM - 12 PM",
            Self::Afternoon => "12 PM - 4 PM",
            Self::Evening => "4 PM - 8 PM",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryEstimate {
    Shipping { min_days: u32, max_days: u32, date: NaiveDate },
    Pickup { min_hours: u32, max_hours: u32, ready_by: DateTime<Utc> },
    Immediate,
}

impl DeliveryEstimate {
    pub fn message(&self) -> String {
        match self {
            Self::Shipping { date, .. } => {
                format!("Expected delivery: {}", date.format("%d %b, %Y"))
            }
            Self::Pickup { .. } => "Ready for pickup within 24 hours".to_string(),
            Self::Immediate => "Available immediately at store".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledDelivery {
    pub date: NaiveDate,
    pub time_slot: TimeSlot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub fulfillment_type: FulfillmentType,
    pub status: OrderStatus,
    pub delivery_address: Option<DeliveryAddress>,
    pub pickup_store: Option<String>,
    pub special_instructions: Option<String>,
    pub shipping_partner: Option<ShippingPartner>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: DeliveryEstimate,
    pub status_history: Vec<StatusChange>,
    pub scheduled_delivery: Option<ScheduledDelivery>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self.status, next),
            (OrderStatus::Pending, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Processing)
                | (OrderStatus::Processing, OrderStatus::Shipped)
                | (OrderStatus::Shipped, OrderStatus::OutForDelivery)
                | (OrderStatus::OutForDelivery, OrderStatus::Delivered)
                | (OrderStatus::Delivered, OrderStatus::Returned)
        ) || (next == OrderStatus::Cancelled && self.status.is_cancellable())
    }

    pub fn transition_to(
        &mut self,
        next: OrderStatus,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidOrderTransition { from: self.status, to: next });
        }

        self.status = next;
        self.updated_at = at;
        self.status_history.push(StatusChange { status: next, timestamp: at, message: message.into() });
        Ok(())
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{DeliveryEstimate, Order, OrderId, OrderItem, OrderStatus};
    use crate::domain::customer::CustomerId;
    use crate::domain::inventory::FulfillmentType;
    use crate::errors::DomainError;

    fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId("ORD20240101ABCDEF".to_string()),
            customer_id: CustomerId("CUST1000".to_string()),
            items: vec![OrderItem {
                sku: "FOO1000".to_string(),
                name: "Nike Running Shoes".to_string(),
                quantity: 2,
                price: Decimal::new(2_499, 0),
            }],
            total_amount: Decimal::new(4_998, 0),
            fulfillment_type: FulfillmentType::BuyInStore,
            status,
            delivery_address: None,
            pickup_store: None,
            special_instructions: None,
            shipping_partner: None,
            tracking_number: None,
            estimated_delivery: DeliveryEstimate::Immediate,
            status_history: Vec::new(),
            scheduled_delivery: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn confirmed_orders_can_be_cancelled() {
        let mut order = order(OrderStatus::Confirmed);
        order
            .transition_to(OrderStatus::Cancelled, "Order cancelled", Utc::now())
            .expect("confirmed -> cancelled");
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(order.status_history.len(), 1);
    }

    #[test]
    fn shipped_orders_cannot_be_cancelled() {
        let mut order = order(OrderStatus::Shipped);
        let error = order
            .transition_to(OrderStatus::Cancelled, "nope", Utc::now())
            .expect_err("shipped -> cancelled should fail");
        assert!(matches!(error, DomainError::InvalidOrderTransition { .. }));
    }

    #[test]
    fn item_count_sums_quantities() {
        assert_eq!(order(OrderStatus::Pending).item_count(), 2);
        assert_eq!(order(OrderStatus::Pending).items[0].line_total(), Decimal::new(4_998, 0));
    }
}
