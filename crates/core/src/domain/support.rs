use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::order::OrderId;
use crate::errors::DomainError;

pub const RETURN_WINDOW_DAYS: i64 = 30;
pub const REFUND_PROCESSING_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    SizeIssue,
    QualityIssue,
    Damaged,
    WrongItem,
    DescriptionMismatch,
    ChangedMind,
    BetterPrice,
    Other,
}

impl ReturnReason {
    /// Reasons where the fault is ours and no review is needed.
    pub fn auto_approves(self) -> bool {
        matches!(self, Self::Damaged | Self::WrongItem)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SizeIssue => "size_issue",
            Self::QualityIssue => "quality_issue",
            Self::Damaged => "damaged",
            Self::WrongItem => "wrong_item",
            Self::DescriptionMismatch => "description_mismatch",
            Self::ChangedMind => "changed_mind",
            Self::BetterPrice => "better_price",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Requested,
    Approved,
    Rejected,
    Refunded,
}

impl ReturnStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Refunded => "refunded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReturnId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnItem {
    pub sku: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefundEstimate {
    pub amount: Decimal,
    pub estimated_date: NaiveDate,
    pub business_days: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnStatusChange {
    pub status: ReturnStatus,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub id: ReturnId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<ReturnItem>,
    pub reason: ReturnReason,
    pub comments: Option<String>,
    pub images: Vec<String>,
    pub status: ReturnStatus,
    pub refund_estimate: RefundEstimate,
    pub status_history: Vec<ReturnStatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnRequest {
    pub fn refund_amount(&self) -> Decimal {
        self.refund_estimate.amount
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    OrderIssue,
    DeliveryIssue,
    PaymentIssue,
    ProductQuestion,
    AccountIssue,
    GeneralInquiry,
}

impl TicketCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OrderIssue => "order_issue",
            Self::DeliveryIssue => "delivery_issue",
            Self::PaymentIssue => "payment_issue",
            Self::ProductQuestion => "product_question",
            Self::AccountIssue => "account_issue",
            Self::GeneralInquiry => "general_inquiry",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn response_time(self) -> &'static str {
        match self {
            Self::Low => "48 hours",
            Self::Medium => "24 hours",
            Self::High => "4 hours",
        }
    }
}

impl FromStr for TicketPriority {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => {
                Err(DomainError::UnknownValue { kind: "ticket priority", value: other.to_string() })
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketMessage {
    pub from: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: TicketId,
    pub customer_id: CustomerId,
    pub category: TicketCategory,
    pub subject: String,
    pub description: String,
    pub order_id: Option<OrderId>,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub assigned_to: Option<String>,
    pub messages: Vec<TicketMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaqTopic {
    Returns,
    Shipping,
    Payment,
    Account,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FaqEntry {
    pub question: &'static str,
    pub answer: &'static str,
}

impl FaqTopic {
    pub fn entries(self) -> &'static [FaqEntry] {
        match self {
            Self::Returns => &[
                FaqEntry {
                    question: "What is your return policy?",
                    answer: "We accept returns within 30 days of delivery. Items must be unused and in original packaging.",
                },
                FaqEntry {
                    question: "How long does refund take?",
                    answer: "Refunds are processed within 7 business days after we receive the returned item.",
                },
            ],
            Self::Shipping => &[
                FaqEntry {
                    question: "How long does delivery take?",
                    answer: "Standard delivery takes 2-5 business days.",
                },
                FaqEntry {
                    question: "Can I track my order?",
                    answer: "Yes! You'll receive a tracking number via SMS and email once your order ships.",
                },
            ],
            Self::Payment => &[FaqEntry {
                question: "What payment methods do you accept?",
                answer: "We accept UPI, Credit/Debit Cards, Net Banking, Wallets, and Cash on Delivery.",
            }],
            Self::Account => &[FaqEntry {
                question: "How do I earn loyalty points?",
                answer: "Earn 1 point for every ₹1 spent. Points can be redeemed for discounts on future purchases.",
            }],
        }
    }
}
