use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use shopwise_core::commerce::fulfillment::{
    delivery_estimate, live_location, new_order_id, pick_shipping_partner, tracking_events,
    tracking_number, LiveLocation, TrackingEvent,
};
use shopwise_core::domain::customer::CustomerId;
use shopwise_core::domain::inventory::FulfillmentType;
use shopwise_core::domain::order::{
    DeliveryAddress, DeliveryEstimate, Order, OrderId, OrderItem, OrderStatus, ScheduledDelivery,
    ShippingPartner, TimeSlot,
};
use shopwise_db::Storage;

use crate::tools::{object_schema, tool, ToolError, ToolRegistry};

pub const NAME: &str = "fulfillment";

pub const ROLE: &str = "You are a specialist order fulfillment and delivery assistant.
Your job is to create new orders, provide tracking updates, and handle cancellations or rescheduling.
Use your tools to manage all aspects of order fulfillment.
Be professional and provide clear, accurate status updates.";

pub struct FulfillmentTools {
    storage: Storage,
}

/// A cart line as the model sends it. Missing names and prices are filled
/// from the catalogue.
#[derive(Clone, Debug, Deserialize)]
pub struct CartLine {
    pub sku: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub price: Option<Decimal>,
}

fn one() -> u32 {
    1
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddressArgs {
    pub name: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone: String,
}

impl From<AddressArgs> for DeliveryAddress {
    fn from(args: AddressArgs) -> Self {
        Self {
            name: args.name,
            street: args.street,
            city: args.city,
            state: args.state,
            pincode: args.pincode,
            phone: args.phone,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderArgs {
    pub customer_id: String,
    pub cart_items: Vec<CartLine>,
    pub total_amount: Decimal,
    pub fulfillment_type: String,
    #[serde(default)]
    pub delivery_address: Option<AddressArgs>,
    #[serde(default)]
    pub pickup_store_id: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct OrderConfirmation {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DeliveryEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_partner: Option<ShippingPartner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub message: String,
}

impl OrderConfirmation {
    fn rejected(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), ..Self::default() }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderArgs {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderStatusReport {
    pub success: bool,
    pub order_id: String,
    pub status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<DeliveryEstimate>,
    pub last_updated: Option<DateTime<Utc>>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TrackingReport {
    pub success: bool,
    pub order_id: String,
    pub current_status: Option<OrderStatus>,
    pub tracking_events: Vec<TrackingEvent>,
    pub estimated_delivery: Option<DeliveryEstimate>,
    pub live_location: Option<LiveLocation>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelArgs {
    pub order_id: String,
    #[serde(default = "customer_request")]
    pub reason: String,
}

fn customer_request() -> String {
    "Customer request".to_string()
}

#[derive(Debug, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub order_id: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleArgs {
    pub order_id: String,
    pub preferred_date: String,
    pub time_slot: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleReport {
    pub success: bool,
    pub order_id: String,
    pub scheduled_date: Option<NaiveDate>,
    pub time_slot: Option<&'static str>,
    pub message: String,
}

impl FulfillmentTools {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn order(&self, order_id: &str) -> Result<Option<Order>, ToolError> {
        let id = OrderId(order_id.trim().to_string());
        Ok(self.storage.orders.find_by_id(&id).await?)
    }

    async fn resolve_items(&self, lines: Vec<CartLine>) -> Result<Vec<OrderItem>, ToolError> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let sku = super::inventory::normalize_sku(&line.sku);
            let (name, price) = match (line.name, line.price) {
                (Some(name), Some(price)) => (name, price),
                (name, price) => {
                    let product = self.storage.catalog.find_product(&sku).await?;
                    let Some(product) = product else {
                        return Err(ToolError::InvalidArguments {
                            tool: "create_order".to_string(),
                            message: format!("unknown product `{sku}`"),
                        });
                    };
                    (name.unwrap_or(product.name), price.unwrap_or(product.price))
                }
            };
            items.push(OrderItem { sku, name, quantity: line.quantity.max(1), price });
        }
        Ok(items)
    }

    pub async fn create_order(&self, args: CreateOrderArgs) -> Result<OrderConfirmation, ToolError> {
        let Ok(fulfillment_type) = args.fulfillment_type.parse::<FulfillmentType>() else {
            return Ok(OrderConfirmation::rejected(format!(
                "Unknown fulfillment type `{}`",
                args.fulfillment_type
            )));
        };
        if args.cart_items.is_empty() {
            return Ok(OrderConfirmation::rejected("Cannot create an order with no items."));
        }

        let pickup_store = args.pickup_store_id.filter(|store| !store.trim().is_empty());
        let delivery_address = args.delivery_address.map(DeliveryAddress::from);
        match fulfillment_type {
            FulfillmentType::ShipToHome if delivery_address.is_none() => {
                return Ok(OrderConfirmation::rejected(
                    "Delivery address is required for ship_to_home.",
                ));
            }
            FulfillmentType::ClickAndCollect if pickup_store.is_none() => {
                return Ok(OrderConfirmation::rejected(
                    "Pickup store ID is required for click_and_collect.",
                ));
            }
            _ => {}
        }

        let items = self.resolve_items(args.cart_items).await?;
        let now = Utc::now();
        let (estimated_delivery, shipping_partner) = {
            let mut rng = rand::thread_rng();
            let estimate = delivery_estimate(fulfillment_type, now, &mut rng);
            let partner = (fulfillment_type == FulfillmentType::ShipToHome)
                .then(|| pick_shipping_partner(&mut rng));
            (estimate, partner)
        };
        let tracking = shipping_partner.map(tracking_number);

        let mut order = Order {
            id: new_order_id(now),
            customer_id: CustomerId(args.customer_id.trim().to_string()),
            items,
            total_amount: args.total_amount,
            fulfillment_type,
            status: OrderStatus::Pending,
            delivery_address,
            pickup_store,
            special_instructions: args.special_instructions,
            shipping_partner,
            tracking_number: tracking.clone(),
            estimated_delivery: estimated_delivery.clone(),
            status_history: Vec::new(),
            scheduled_delivery: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };
        order
            .transition_to(OrderStatus::Confirmed, "Order confirmed", now)
            .map_err(|error| ToolError::Storage(error.to_string()))?;

        let order_id = order.id.clone();
        info!(
            event_name = "agent.fulfillment.order_created",
            order_id = %order_id,
            customer_id = %order.customer_id.as_str(),
            fulfillment_type = fulfillment_type.as_str(),
            items = order.item_count(),
            "order created"
        );
        self.storage.orders.save(order).await?;

        Ok(OrderConfirmation {
            success: true,
            message: format!("Order {order_id} has been confirmed."),
            order_id: Some(order_id),
            status: Some(OrderStatus::Confirmed),
            estimated_delivery: Some(estimated_delivery),
            shipping_partner,
            tracking_number: tracking,
        })
    }

    pub async fn order_status(&self, args: OrderArgs) -> Result<OrderStatusReport, ToolError> {
        let Some(order) = self.order(&args.order_id).await? else {
            return Ok(OrderStatusReport {
                success: false,
                order_id: args.order_id,
                status: None,
                tracking_number: None,
                estimated_delivery: None,
                last_updated: None,
                message: "Order not found.".to_string(),
            });
        };
        Ok(OrderStatusReport {
            success: true,
            message: format!("Order {} is {}. {}", order.id, order.status, order.estimated_delivery.message()),
            order_id: order.id.0,
            status: Some(order.status),
            tracking_number: order.tracking_number,
            estimated_delivery: Some(order.estimated_delivery),
            last_updated: Some(order.updated_at),
        })
    }

    pub async fn track_order(&self, args: OrderArgs) -> Result<TrackingReport, ToolError> {
        let Some(order) = self.order(&args.order_id).await? else {
            return Ok(TrackingReport {
                success: false,
                order_id: args.order_id,
                current_status: None,
                tracking_events: Vec::new(),
                estimated_delivery: None,
                live_location: None,
                message: "Order not found".to_string(),
            });
        };

        let location = live_location(&order, &mut rand::thread_rng());
        let events = tracking_events(&order);
        let mut message = format!("Order {} is {}.", order.id, order.status);
        if let Some(location) = &location {
            message.push_str(&format!(" Arriving in about {} minutes.", location.eta_minutes));
        }

        Ok(TrackingReport {
            success: true,
            order_id: order.id.0,
            current_status: Some(order.status),
            tracking_events: events,
            estimated_delivery: Some(order.estimated_delivery),
            live_location: location,
            message,
        })
    }

    pub async fn cancel_order(&self, args: CancelArgs) -> Result<ActionResult, ToolError> {
        let Some(mut order) = self.order(&args.order_id).await? else {
            return Ok(ActionResult {
                success: false,
                order_id: args.order_id,
                message: "Order not found".to_string(),
            });
        };
        if !order.status.is_cancellable() {
            return Ok(ActionResult {
                success: false,
                order_id: order.id.0,
                message: "Order cannot be cancelled at this stage. Please initiate a return instead."
                    .to_string(),
            });
        }

        let now = Utc::now();
        order
            .transition_to(
                OrderStatus::Cancelled,
                format!("Order cancelled. Reason: {}", args.reason),
                now,
            )
            .map_err(|error| ToolError::Storage(error.to_string()))?;
        order.cancellation_reason = Some(args.reason);

        let order_id = order.id.0.clone();
        info!(event_name = "agent.fulfillment.order_cancelled", order_id = %order_id, "order cancelled");
        self.storage.orders.save(order).await?;

        Ok(ActionResult {
            success: true,
            order_id,
            message: "Order cancelled successfully. Refund will be processed.".to_string(),
        })
    }

    pub async fn schedule_delivery(&self, args: ScheduleArgs) -> Result<ScheduleReport, ToolError> {
        let rejected = |order_id: String, message: &str| ScheduleReport {
            success: false,
            order_id,
            scheduled_date: None,
            time_slot: None,
            message: message.to_string(),
        };

        let Some(mut order) = self.order(&args.order_id).await? else {
            return Ok(rejected(args.order_id, "Order not found"));
        };
        let Ok(date) = NaiveDate::parse_from_str(args.preferred_date.trim(), "%Y-%m-%d") else {
            return Ok(rejected(order.id.0, "Invalid date format. Use YYYY-MM-DD"));
        };
        let now = Utc::now();
        if date < now.date_naive() {
            return Ok(rejected(order.id.0, "Delivery date must be in the future"));
        }
        let Some(time_slot) = parse_time_slot(&args.time_slot) else {
            return Ok(rejected(order.id.0, "Time slot must be morning, afternoon or evening"));
        };

        order.scheduled_delivery = Some(ScheduledDelivery { date, time_slot });
        order.updated_at = now;
        let order_id = order.id.0.clone();
        self.storage.orders.save(order).await?;

        Ok(ScheduleReport {
            success: true,
            message: format!(
                "Delivery scheduled for {}, {}",
                date.format("%Y-%m-%d"),
                time_slot.label()
            ),
            order_id,
            scheduled_date: Some(date),
            time_slot: Some(time_slot.label()),
        })
    }
}

fn parse_time_slot(value: &str) -> Option<TimeSlot> {
    match value.trim().to_ascii_lowercase().as_str() {
        "morning" => Some(TimeSlot::Morning),
        "afternoon" => Some(TimeSlot::Afternoon),
        "evening" => Some(TimeSlot::Evening),
        _ => None,
    }
}

tool! {
    CreateOrder on FulfillmentTools {
        name: "create_order",
        description: "Create a new order after payment is confirmed.",
        parameters: object_schema(
            &[
                ("customer_id", "string", "Customer ID"),
                ("cart_items", "array", "Items with sku, quantity and optionally name and price"),
                ("total_amount", "number", "Order total in INR"),
                ("fulfillment_type", "string", "ship_to_home | click_and_collect | buy_in_store"),
                ("delivery_address", "object", "name, street, city, state, pincode, phone"),
                ("pickup_store_id", "string", "Store for click_and_collect"),
                ("special_instructions", "string", "Optional delivery notes"),
            ],
            &["customer_id", "cart_items", "total_amount", "fulfillment_type"],
        ),
        call: create_order(CreateOrderArgs),
    }
}

tool! {
    OrderStatusTool on FulfillmentTools {
        name: "get_order_status",
        description: "Get the current high-level status of an order.",
        parameters: object_schema(&[("order_id", "string", "Order ID")], &["order_id"]),
        call: order_status(OrderArgs),
    }
}

tool! {
    TrackOrder on FulfillmentTools {
        name: "track_order",
        description: "Get step-by-step tracking information for an order.",
        parameters: object_schema(&[("order_id", "string", "Order ID")], &["order_id"]),
        call: track_order(OrderArgs),
    }
}

tool! {
    CancelOrder on FulfillmentTools {
        name: "cancel_order",
        description: "Cancel an order if it has not shipped yet.",
        parameters: object_schema(
            &[
                ("order_id", "string", "Order ID"),
                ("reason", "string", "Cancellation reason"),
            ],
            &["order_id"],
        ),
        call: cancel_order(CancelArgs),
    }
}

tool! {
    ScheduleDelivery on FulfillmentTools {
        name: "schedule_delivery",
        description: "Schedule delivery for a specific date and time slot.",
        parameters: object_schema(
            &[
                ("order_id", "string", "Order ID"),
                ("preferred_date", "string", "Date as YYYY-MM-DD"),
                ("time_slot", "string", "morning | afternoon | evening"),
            ],
            &["order_id", "preferred_date", "time_slot"],
        ),
        call: schedule_delivery(ScheduleArgs),
    }
}

pub fn registry(tools: Arc<FulfillmentTools>) -> ToolRegistry {
    ToolRegistry::default()
        .with(CreateOrder(tools.clone()))
        .with(OrderStatusTool(tools.clone()))
        .with(TrackOrder(tools.clone()))
        .with(CancelOrder(tools.clone()))
        .with(ScheduleDelivery(tools))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        AddressArgs, CancelArgs, CartLine, CreateOrderArgs, FulfillmentTools, OrderArgs,
        ScheduleArgs,
    };
    use shopwise_core::domain::order::{OrderId, OrderStatus};
    use shopwise_db::{DemoDataset, Storage};

    async fn seeded() -> Result<(Storage, FulfillmentTools), String> {
        let storage = Storage::in_memory();
        DemoDataset::standard(Utc::now()).load(&storage).await.map_err(|e| e.to_string())?;
        Ok((storage.clone(), FulfillmentTools::new(storage)))
    }

    fn order_args(fulfillment_type: &str, address: Option<AddressArgs>) -> CreateOrderArgs {
        CreateOrderArgs {
            customer_id: "CUST1001".to_string(),
            cart_items: vec![CartLine {
                sku: "foo1000".to_string(),
                name: None,
                quantity: 2,
                price: None,
            }],
            total_amount: Decimal::new(5_000, 0),
            fulfillment_type: fulfillment_type.to_string(),
            delivery_address: address,
            pickup_store_id: None,
            special_instructions: None,
        }
    }

    fn address() -> AddressArgs {
        AddressArgs {
            name: "Asha Rao".to_string(),
            street: "12 MG Road".to_string(),
            city: "Bengaluru".to_string(),
            state: "Karnataka".to_string(),
            pincode: "560001".to_string(),
            phone: "+91-9000000000".to_string(),
        }
    }

    #[tokio::test]
    async fn shipping_orders_need_an_address_and_get_tracking() -> Result<(), String> {
        let (storage, tools) = seeded().await?;

        let missing = tools.create_order(order_args("ship_to_home", None)).await.map_err(|e| e.to_string())?;
        assert!(!missing.success);
        assert_eq!(missing.message, "Delivery address is required for ship_to_home.");

        let pickup =
            tools.create_order(order_args("click_and_collect", None)).await.map_err(|e| e.to_string())?;
        assert_eq!(pickup.message, "Pickup store ID is required for click_and_collect.");

        let created = tools
            .create_order(order_args("ship_to_home", Some(address())))
            .await
            .map_err(|e| e.to_string())?;
        assert!(created.success);
        let partner = created.shipping_partner.ok_or("partner missing")?;
        assert!(created.tracking_number.as_deref().is_some_and(|t| t.starts_with(partner.id())));

        let order_id = created.order_id.ok_or("order id missing")?;
        let stored = storage
            .orders
            .find_by_id(&order_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("order not stored")?;
        assert_eq!(stored.status, OrderStatus::Confirmed);
        assert_eq!(stored.items[0].sku, "FOO1000");
        assert_eq!(stored.items[0].quantity, 2);
        assert_eq!(stored.status_history.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn cancellation_only_before_shipping() -> Result<(), String> {
        let (storage, tools) = seeded().await?;
        let created =
            tools.create_order(order_args("buy_in_store", None)).await.map_err(|e| e.to_string())?;
        let order_id: OrderId = created.order_id.ok_or("order id missing")?;

        let cancelled = tools
            .cancel_order(CancelArgs { order_id: order_id.0.clone(), reason: "Changed mind".to_string() })
            .await
            .map_err(|e| e.to_string())?;
        assert!(cancelled.success);

        let again = tools
            .cancel_order(CancelArgs { order_id: order_id.0.clone(), reason: "again".to_string() })
            .await
            .map_err(|e| e.to_string())?;
        assert!(!again.success);

        let stored = storage.orders.find_by_id(&order_id).await.map_err(|e| e.to_string())?;
        assert_eq!(
            stored.and_then(|order| order.cancellation_reason).as_deref(),
            Some("Changed mind")
        );
        Ok(())
    }

    #[tokio::test]
    async fn scheduling_validates_date_and_slot() -> Result<(), String> {
        let (_, tools) = seeded().await?;
        let created =
            tools.create_order(order_args("buy_in_store", None)).await.map_err(|e| e.to_string())?;
        let order_id = created.order_id.ok_or("order id missing")?.0;
        let schedule = |date: String, slot: &str| ScheduleArgs {
            order_id: order_id.clone(),
            preferred_date: date,
            time_slot: slot.to_string(),
        };

        let bad_format =
            tools.schedule_delivery(schedule("tomorrow".into(), "morning")).await.map_err(|e| e.to_string())?;
        assert_eq!(bad_format.message, "Invalid date format. Use YYYY-MM-DD");

        let yesterday = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();
        let past = tools.schedule_delivery(schedule(yesterday, "morning")).await.map_err(|e| e.to_string())?;
        assert_eq!(past.message, "Delivery date must be in the future");

        let next_week = (Utc::now() + Duration::days(7)).format("%Y-%m-%d").to_string();
        let booked = tools
            .schedule_delivery(schedule(next_week.clone(), "Evening"))
            .await
            .map_err(|e| e.to_string())?;
        assert!(booked.success);
        assert_eq!(booked.message, format!("Delivery scheduled for {next_week}, 4 PM - 8 PM"));
        Ok(())
    }

    #[tokio::test]
    async fn tracking_a_new_order_shows_confirmation_only() -> Result<(), String> {
        let (_, tools) = seeded().await?;
        let created = tools
            .create_order(order_args("ship_to_home", Some(address())))
            .await
            .map_err(|e| e.to_string())?;
        let order_id = created.order_id.ok_or("order id missing")?.0;

        let tracking =
            tools.track_order(OrderArgs { order_id: order_id.clone() }).await.map_err(|e| e.to_string())?;
        assert_eq!(tracking.tracking_events.len(), 1);
        assert!(tracking.live_location.is_none());

        let missing = tools
            .order_status(OrderArgs { order_id: "ORD00000000NOPE".to_string() })
            .await
            .map_err(|e| e.to_string())?;
        assert!(!missing.success);
        assert_eq!(serde_json::to_value(&missing).map_err(|e| e.to_string())?["message"], json!("Order not found."));
        Ok(())
    }
}
