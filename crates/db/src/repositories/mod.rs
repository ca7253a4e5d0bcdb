use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopwise_core::domain::catalog::{Product, ProductQuery};
use shopwise_core::domain::conversation::StoredMessage;
use shopwise_core::domain::customer::{CustomerId, CustomerProfile, PurchaseRecord};
use shopwise_core::domain::inventory::StockRecord;
use shopwise_core::domain::loyalty::Coupon;
use shopwise_core::domain::order::{Order, OrderId};
use shopwise_core::domain::payment::{Transaction, TransactionId};
use shopwise_core::domain::support::{ReturnId, ReturnRequest, SupportTicket, TicketId};

pub mod catalog;
pub mod chat;
pub mod coupon;
pub mod customer;
pub mod memory;
pub mod order;
pub mod support;

pub use catalog::{SqlCatalogRepository, SqlInventoryRepository};
pub use chat::SqlChatHistoryRepository;
pub use coupon::SqlCouponRepository;
pub use customer::SqlCustomerRepository;
pub use memory::{
    InMemoryCatalogRepository, InMemoryChatHistoryRepository, InMemoryCouponRepository,
    InMemoryCustomerRepository, InMemoryInventoryRepository, InMemoryOrderRepository,
    InMemorySupportRepository, InMemoryTransactionRepository,
};
pub use order::{SqlOrderRepository, SqlTransactionRepository};
pub use support::SqlSupportRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

/// Catalogue queries. A `ProductQuery::limit` of zero means no limit; results
/// are in SKU order.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;
    async fn find_product(&self, sku: &str) -> Result<Option<Product>, RepositoryError>;
    async fn save_product(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Stock rows for one SKU, warehouse first then stores in location order.
    async fn stock_for_sku(&self, sku: &str) -> Result<Vec<StockRecord>, RepositoryError>;
    async fn save_stock(&self, record: StockRecord) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_profile(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, RepositoryError>;
    async fn save_profile(&self, profile: CustomerProfile) -> Result<(), RepositoryError>;
    /// Adds `delta` points (negative to redeem), floored at zero. Returns the
    /// new balance, or `None` for an unknown customer.
    async fn add_loyalty_points(
        &self,
        id: &CustomerId,
        delta: i64,
    ) -> Result<Option<u32>, RepositoryError>;
    async fn purchase_history(
        &self,
        id: &CustomerId,
    ) -> Result<Vec<PurchaseRecord>, RepositoryError>;
    async fn record_purchase(&self, record: PurchaseRecord) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Case-insensitive code lookup.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError>;
    /// Active coupons whose tier requirement is at most `max_tier_level`.
    async fn list_available(&self, max_tier_level: u8) -> Result<Vec<Coupon>, RepositoryError>;
    async fn save(&self, coupon: Coupon) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: Order) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;
    /// Newest first.
    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn save(&self, transaction: Transaction) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &TransactionId)
        -> Result<Option<Transaction>, RepositoryError>;
}

#[async_trait]
pub trait SupportRepository: Send + Sync {
    async fn save_return(&self, request: ReturnRequest) -> Result<(), RepositoryError>;
    async fn find_return(&self, id: &ReturnId) -> Result<Option<ReturnRequest>, RepositoryError>;
    async fn save_ticket(&self, ticket: SupportTicket) -> Result<(), RepositoryError>;
    async fn find_ticket(&self, id: &TicketId) -> Result<Option<SupportTicket>, RepositoryError>;
}

/// Per-session activity summary for one customer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub last_message_at: DateTime<Utc>,
    pub message_count: u32,
}

#[async_trait]
pub trait ChatHistoryRepository: Send + Sync {
    async fn save_message(&self, message: StoredMessage) -> Result<(), RepositoryError>;
    /// The most recent `limit` messages of a session, oldest first.
    async fn history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, RepositoryError>;
    /// Sessions of a customer, most recently active first.
    async fn customer_sessions(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, RepositoryError>;
}

pub(crate) fn decode_error(error: impl ToString) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

/// Fixed-width UTC timestamps so TEXT ordering matches time ordering.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value).map(|at| at.with_timezone(&Utc)).map_err(decode_error)
}

pub(crate) fn parse_decimal(value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value).map_err(decode_error)
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|e| RepositoryError::Encode(e.to_string()))
}

pub(crate) fn from_json<T: DeserializeOwned>(value: &str) -> Result<T, RepositoryError> {
    serde_json::from_str(value).map_err(decode_error)
}

/// Text form of a snake_case serde enum, e.g. `ReturnStatus::Requested` → `requested`.
pub(crate) fn enum_text<T: Serialize>(value: &T) -> Result<String, RepositoryError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(text)) => Ok(text),
        Ok(other) => Err(RepositoryError::Encode(format!("expected string enum, got {other}"))),
        Err(error) => Err(RepositoryError::Encode(error.to_string())),
    }
}

pub(crate) fn limit_arg(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shopwise_core::domain::support::ReturnStatus;

    use super::{enum_text, format_timestamp, parse_decimal, parse_timestamp};

    #[test]
    fn timestamps_are_fixed_width_and_reversible() -> Result<(), String> {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().ok_or("valid timestamp")?;
        let text = format_timestamp(at);
        assert_eq!(text, "2026-01-02T03:04:05.000000Z");
        assert_eq!(parse_timestamp(&text).map_err(|e| e.to_string())?, at);
        Ok(())
    }

    #[test]
    fn enum_text_uses_serde_names() -> Result<(), String> {
        assert_eq!(enum_text(&ReturnStatus::Requested).map_err(|e| e.to_string())?, "requested");
        Ok(())
    }

    #[test]
    fn bad_decimal_is_a_decode_error() {
        assert!(parse_decimal("12.5").is_ok());
        assert!(parse_decimal("twelve").is_err());
    }
}
