use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use shopwise_core::commerce::fulfillment::{live_location, tracking_events, LiveLocation, TrackingEvent};
use shopwise_core::commerce::loyalty::format_inr;
use shopwise_core::domain::customer::CustomerId;
use shopwise_core::domain::order::{DeliveryEstimate, Order, OrderId, OrderStatus};
use shopwise_core::domain::support::{
    FaqEntry, FaqTopic, RefundEstimate, ReturnId, ReturnItem, ReturnReason, ReturnRequest,
    ReturnStatus, ReturnStatusChange, SupportTicket, TicketCategory, TicketId, TicketMessage,
    TicketPriority, TicketStatus, REFUND_PROCESSING_DAYS, RETURN_WINDOW_DAYS,
};
use shopwise_db::Storage;

use super::payment::prefixed_id;
use crate::tools::{object_schema, tool, ToolError, ToolRegistry};

pub const NAME: &str = "post_purchase";

pub const ROLE: &str = "You are a specialist post-purchase support assistant.
Your job is to help customers with returns, order tracking, support tickets, and general questions.

Order tracking:
1. When the customer asks to track \"my order\" WITHOUT an order ID, first call list_customer_orders.
   - With several orders, ask which one to track and list each with order ID, date, item count and status.
   - With exactly one order, show its tracking details straight away.
   - With no orders, say so politely.
2. When the customer gives an order ID, use get_order_details or track_order_detailed directly.
3. Always include status, tracking number, estimated delivery and current location.
4. Remember order IDs mentioned earlier; \"that order\" or \"my recent order\" means the last one discussed.

Be empathetic, ask clarifying questions, and always use tools before responding.";

const ORDER_LIST_LIMIT: usize = 20;

pub struct PostPurchaseTools {
    storage: Storage,
}

#[derive(Debug, Deserialize)]
pub struct ReturnArgs {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<ReturnItem>,
    pub reason: ReturnReason,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ReturnOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_id: Option<ReturnId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReturnStatus>,
    pub pickup_scheduled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_estimate: Option<RefundEstimate>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ReturnStatusArgs {
    pub return_id: String,
}

#[derive(Debug, Serialize)]
pub struct ReturnLookup {
    pub success: bool,
    pub return_request: Option<ReturnRequest>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TicketArgs {
    pub customer_id: String,
    pub category: TicketCategory,
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub priority: TicketPriority,
}

#[derive(Debug, Serialize)]
pub struct TicketReceipt {
    pub success: bool,
    pub ticket_id: TicketId,
    pub status: TicketStatus,
    pub estimated_response_time: &'static str,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct FaqArgs {
    pub question_category: FaqTopic,
}

#[derive(Debug, Serialize)]
pub struct FaqAnswer {
    pub category: FaqTopic,
    pub entries: &'static [FaqEntry],
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CustomerOrdersArgs {
    pub customer_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub items_count: usize,
    pub tracking_number: Option<String>,
    pub estimated_delivery: DeliveryEstimate,
}

#[derive(Debug, Serialize)]
pub struct CustomerOrders {
    pub success: bool,
    pub total_orders: usize,
    pub orders: Vec<OrderSummary>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderArgs {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderDetails {
    pub success: bool,
    pub order: Option<Order>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DetailedTracking {
    pub success: bool,
    pub order_id: String,
    pub current_status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
    pub shipping_partner: Option<&'static str>,
    pub tracking_events: Vec<TrackingEvent>,
    pub estimated_delivery: Option<DeliveryEstimate>,
    pub live_location: Option<LiveLocation>,
    pub message: String,
}

impl PostPurchaseTools {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn order(&self, order_id: &str) -> Result<Option<Order>, ToolError> {
        let id = OrderId(order_id.trim().to_string());
        Ok(self.storage.orders.find_by_id(&id).await?)
    }

    /// Known orders must still be inside the return window; unknown order ids
    /// are accepted for manual review.
    pub async fn initiate_return(&self, args: ReturnArgs) -> Result<ReturnOutcome, ToolError> {
        if args.items.is_empty() {
            return Ok(ReturnOutcome {
                message: "Please tell us which items you want to return.".to_string(),
                ..ReturnOutcome::default()
            });
        }

        let now = Utc::now();
        if let Some(order) = self.order(&args.order_id).await? {
            if now - order.created_at > Duration::days(RETURN_WINDOW_DAYS) {
                return Ok(ReturnOutcome {
                    message: format!(
                        "Order {} is outside the {RETURN_WINDOW_DAYS}-day return window.",
                        order.id
                    ),
                    ..ReturnOutcome::default()
                });
            }
        }

        let amount: Decimal =
            args.items.iter().map(|item| item.price * Decimal::from(item.quantity)).sum();
        let refund_estimate = RefundEstimate {
            amount,
            estimated_date: (now + Duration::days(REFUND_PROCESSING_DAYS)).date_naive(),
            business_days: REFUND_PROCESSING_DAYS,
        };

        let mut request = ReturnRequest {
            id: ReturnId(prefixed_id("RET", 10)),
            order_id: OrderId(args.order_id.trim().to_string()),
            customer_id: CustomerId(args.customer_id.trim().to_string()),
            items: args.items,
            reason: args.reason,
            comments: args.comments,
            images: args.images,
            status: ReturnStatus::Requested,
            refund_estimate: refund_estimate.clone(),
            status_history: vec![ReturnStatusChange {
                status: ReturnStatus::Requested,
                timestamp: now,
                message: "Return request submitted".to_string(),
            }],
            created_at: now,
            updated_at: now,
        };

        let pickup_scheduled = args.reason.auto_approves();
        let message = if pickup_scheduled {
            request.status = ReturnStatus::Approved;
            request.status_history.push(ReturnStatusChange {
                status: ReturnStatus::Approved,
                timestamp: now,
                message: "Return approved automatically".to_string(),
            });
            "Your return has been approved! We'll schedule a pickup within 24 hours."
        } else {
            "Your return request has been submitted and will be reviewed within 24 hours."
        };

        let return_id = request.id.clone();
        let status = request.status;
        info!(
            event_name = "agent.post_purchase.return_created",
            return_id = %return_id.0,
            order_id = %request.order_id,
            reason = args.reason.as_str(),
            status = status.as_str(),
            "return request created"
        );
        self.storage.support.save_return(request).await?;

        Ok(ReturnOutcome {
            success: true,
            return_id: Some(return_id),
            status: Some(status),
            pickup_scheduled,
            refund_estimate: Some(refund_estimate),
            message: message.to_string(),
        })
    }

    pub async fn return_status(&self, args: ReturnStatusArgs) -> Result<ReturnLookup, ToolError> {
        let id = ReturnId(args.return_id.trim().to_string());
        let request = self.storage.support.find_return(&id).await?;
        let message = match &request {
            Some(request) => format!(
                "Return {} is {}. Refund of {} expected by {}.",
                request.id.0,
                request.status.as_str(),
                format_inr(request.refund_amount()),
                request.refund_estimate.estimated_date.format("%d %b, %Y")
            ),
            None => "Return ID not found.".to_string(),
        };
        Ok(ReturnLookup { success: request.is_some(), return_request: request, message })
    }

    pub async fn create_ticket(&self, args: TicketArgs) -> Result<TicketReceipt, ToolError> {
        let now = Utc::now();
        let ticket = SupportTicket {
            id: TicketId(prefixed_id("TKT", 8)),
            customer_id: CustomerId(args.customer_id.trim().to_string()),
            category: args.category,
            subject: args.subject,
            description: args.description.clone(),
            order_id: args
                .order_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .map(OrderId),
            priority: args.priority,
            status: TicketStatus::Open,
            assigned_to: None,
            messages: vec![TicketMessage {
                from: "customer".to_string(),
                message: args.description,
                timestamp: now,
            }],
            created_at: now,
            updated_at: now,
        };

        let ticket_id = ticket.id.clone();
        let response_time = args.priority.response_time();
        info!(
            event_name = "agent.post_purchase.ticket_created",
            ticket_id = %ticket_id.0,
            category = args.category.as_str(),
            priority = args.priority.as_str(),
            "support ticket created"
        );
        self.storage.support.save_ticket(ticket).await?;

        Ok(TicketReceipt {
            success: true,
            ticket_id,
            status: TicketStatus::Open,
            estimated_response_time: response_time,
            message: format!(
                "Support ticket created. Our team will respond within {response_time}."
            ),
        })
    }

    pub async fn faq_answer(&self, args: FaqArgs) -> Result<FaqAnswer, ToolError> {
        let entries = args.question_category.entries();
        let message = entries
            .iter()
            .map(|entry| format!("**{}**\n{}", entry.question, entry.answer))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(FaqAnswer { category: args.question_category, entries, message })
    }

    pub async fn customer_orders(&self, args: CustomerOrdersArgs) -> Result<CustomerOrders, ToolError> {
        let customer_id = CustomerId(args.customer_id.trim().to_string());
        let orders: Vec<OrderSummary> = self
            .storage
            .orders
            .list_for_customer(&customer_id, ORDER_LIST_LIMIT)
            .await?
            .into_iter()
            .map(|order| OrderSummary {
                items_count: order.items.len(),
                order_id: order.id,
                status: order.status,
                total_amount: order.total_amount,
                created_at: order.created_at,
                tracking_number: order.tracking_number,
                estimated_delivery: order.estimated_delivery,
            })
            .collect();

        let message = if orders.is_empty() {
            "No orders found for this customer.".to_string()
        } else {
            format!("Found {} order(s) for this customer.", orders.len())
        };
        Ok(CustomerOrders { success: !orders.is_empty(), total_orders: orders.len(), orders, message })
    }

    pub async fn order_details(&self, args: OrderArgs) -> Result<OrderDetails, ToolError> {
        let order = self.order(&args.order_id).await?;
        let message = match &order {
            Some(order) => format!(
                "Order {} ({} item(s), {}) is {}.",
                order.id,
                order.item_count(),
                format_inr(order.total_amount),
                order.status
            ),
            None => {
                format!("Order {} not found. Please check the order ID.", args.order_id.trim())
            }
        };
        Ok(OrderDetails { success: order.is_some(), order, message })
    }

    pub async fn track_detailed(&self, args: OrderArgs) -> Result<DetailedTracking, ToolError> {
        let Some(order) = self.order(&args.order_id).await? else {
            return Ok(DetailedTracking {
                success: false,
                message: format!(
                    "Order {} not found. Please verify the order ID.",
                    args.order_id.trim()
                ),
                order_id: args.order_id,
                current_status: None,
                tracking_number: None,
                shipping_partner: None,
                tracking_events: Vec::new(),
                estimated_delivery: None,
                live_location: None,
            });
        };

        let location = live_location(&order, &mut rand::thread_rng());
        let message = match &location {
            Some(location) => format!(
                "Delivery partner is nearby! Arriving in about {} minutes.",
                location.eta_minutes
            ),
            None => format!("Order {} is {}. {}", order.id, order.status, order.estimated_delivery.message()),
        };

        Ok(DetailedTracking {
            success: true,
            tracking_events: tracking_events(&order),
            order_id: order.id.0,
            current_status: Some(order.status),
            tracking_number: order.tracking_number,
            shipping_partner: order.shipping_partner.map(|partner| partner.name()),
            estimated_delivery: Some(order.estimated_delivery),
            live_location: location,
            message,
        })
    }
}

tool! {
    InitiateReturn on PostPurchaseTools {
        name: "initiate_return",
        description: "Initiate a return request for one or more items from an order.",
        parameters: object_schema(
            &[
                ("order_id", "string", "The order the items are from"),
                ("customer_id", "string", "Customer ID"),
                ("items", "array", "Items to return, each with sku, quantity and price paid"),
                (
                    "reason",
                    "string",
                    "size_issue | quality_issue | damaged | wrong_item | description_mismatch | changed_mind | better_price | other",
                ),
                ("comments", "string", "Optional customer comments"),
                ("images", "array", "Optional image URLs"),
            ],
            &["order_id", "customer_id", "items", "reason"],
        ),
        call: initiate_return(ReturnArgs),
    }
}

tool! {
    ReturnStatusTool on PostPurchaseTools {
        name: "get_return_status",
        description: "Get the status of a return request.",
        parameters: object_schema(&[("return_id", "string", "Return ID")], &["return_id"]),
        call: return_status(ReturnStatusArgs),
    }
}

tool! {
    CreateSupportTicket on PostPurchaseTools {
        name: "create_support_ticket",
        description: "Create a customer support ticket for a complex issue.",
        parameters: object_schema(
            &[
                ("customer_id", "string", "Customer ID"),
                (
                    "category",
                    "string",
                    "order_issue | delivery_issue | payment_issue | product_question | account_issue | general_inquiry",
                ),
                ("subject", "string", "Brief subject line"),
                ("description", "string", "Detailed description of the issue"),
                ("order_id", "string", "Related order ID, if any"),
                ("priority", "string", "low | medium | high (default medium)"),
            ],
            &["customer_id", "category", "subject", "description"],
        ),
        call: create_ticket(TicketArgs),
    }
}

tool! {
    FaqAnswerTool on PostPurchaseTools {
        name: "get_faq_answer",
        description: "Get FAQ answers for general policy questions.",
        parameters: object_schema(
            &[("question_category", "string", "returns | shipping | payment | account")],
            &["question_category"],
        ),
        call: faq_answer(FaqArgs),
    }
}

tool! {
    ListCustomerOrders on PostPurchaseTools {
        name: "list_customer_orders",
        description: "List a customer's orders, newest first. Use when no order ID is given.",
        parameters: object_schema(&[("customer_id", "string", "Customer ID")], &["customer_id"]),
        call: customer_orders(CustomerOrdersArgs),
    }
}

tool! {
    OrderDetailsTool on PostPurchaseTools {
        name: "get_order_details",
        description: "Get full details of an order including items, tracking and delivery info.",
        parameters: object_schema(&[("order_id", "string", "Order ID")], &["order_id"]),
        call: order_details(OrderArgs),
    }
}

tool! {
    TrackOrderDetailed on PostPurchaseTools {
        name: "track_order_detailed",
        description: "Step-by-step tracking for an order, with live location when out for delivery.",
        parameters: object_schema(&[("order_id", "string", "Order ID")], &["order_id"]),
        call: track_detailed(OrderArgs),
    }
}

pub fn registry(tools: Arc<PostPurchaseTools>) -> ToolRegistry {
    ToolRegistry::default()
        .with(InitiateReturn(tools.clone()))
        .with(ReturnStatusTool(tools.clone()))
        .with(CreateSupportTicket(tools.clone()))
        .with(FaqAnswerTool(tools.clone()))
        .with(ListCustomerOrders(tools.clone()))
        .with(OrderDetailsTool(tools.clone()))
        .with(TrackOrderDetailed(tools))
}
