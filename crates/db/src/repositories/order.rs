use std::str::FromStr;

use sqlx::Row;

use shopwise_core::domain::customer::CustomerId;
use shopwise_core::domain::order::{Order, OrderId};
use shopwise_core::domain::payment::{PaymentMethod, PaymentStatus, Transaction, TransactionId};

use super::{
    decode_error, format_timestamp, from_json, limit_arg, parse_decimal, parse_timestamp,
    to_json, OrderRepository, RepositoryError, TransactionRepository,
};
use crate::DbPool;

/// Orders keep their nested items and history as a JSON payload; the scalar
/// columns exist for lookups and ordering.
pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, RepositoryError> {
    let payload: String = row.try_get("payload_json").map_err(decode_error)?;
    from_json(&payload)
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, status, fulfillment_type, total_amount,
                                 payload_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 fulfillment_type = excluded.fulfillment_type,
                 total_amount = excluded.total_amount,
                 payload_json = excluded.payload_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&order.id.0)
        .bind(&order.customer_id.0)
        .bind(order.status.as_str())
        .bind(order.fulfillment_type.as_str())
        .bind(order.total_amount.to_string())
        .bind(to_json(&order)?)
        .bind(format_timestamp(order.created_at))
        .bind(format_timestamp(order.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query("SELECT payload_json FROM orders WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT payload_json FROM orders
             WHERE customer_id = ?
             ORDER BY created_at DESC
             LIMIT ?",
        )
        .bind(&customer_id.0)
        .bind(limit_arg(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }
}

pub struct SqlTransactionRepository {
    pool: DbPool,
}

impl SqlTransactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction, RepositoryError> {
    let amount: String = row.try_get("amount").map_err(decode_error)?;
    let method: String = row.try_get("method").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let refund_amount: Option<String> = row.try_get("refund_amount").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;
    let updated_at: String = row.try_get("updated_at").map_err(decode_error)?;
    let completed_at: Option<String> = row.try_get("completed_at").map_err(decode_error)?;

    Ok(Transaction {
        id: TransactionId(row.try_get("id").map_err(decode_error)?),
        order_id: OrderId(row.try_get("order_id").map_err(decode_error)?),
        customer_id: CustomerId(row.try_get("customer_id").map_err(decode_error)?),
        amount: parse_decimal(&amount)?,
        method: PaymentMethod::from_str(&method).map_err(decode_error)?,
        status: PaymentStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown payment status `{status}`")))?,
        failure_reason: row.try_get("failure_reason").map_err(decode_error)?,
        refund_id: row.try_get("refund_id").map_err(decode_error)?,
        refund_amount: refund_amount.as_deref().map(parse_decimal).transpose()?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

#[async_trait::async_trait]
impl TransactionRepository for SqlTransactionRepository {
    async fn save(&self, transaction: Transaction) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO transactions (id, order_id, customer_id, amount, method, status,
                                       failure_reason, refund_id, refund_amount, created_at,
                                       updated_at, completed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 failure_reason = excluded.failure_reason,
                 refund_id = excluded.refund_id,
                 refund_amount = excluded.refund_amount,
                 updated_at = excluded.updated_at,
                 completed_at = excluded.completed_at",
        )
        .bind(&transaction.id.0)
        .bind(&transaction.order_id.0)
        .bind(&transaction.customer_id.0)
        .bind(transaction.amount.to_string())
        .bind(transaction.method.as_str())
        .bind(transaction.status.as_str())
        .bind(&transaction.failure_reason)
        .bind(&transaction.refund_id)
        .bind(transaction.refund_amount.map(|amount| amount.to_string()))
        .bind(format_timestamp(transaction.created_at))
        .bind(format_timestamp(transaction.updated_at))
        .bind(transaction.completed_at.map(format_timestamp))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, order_id, customer_id, amount, method, status, failure_reason, refund_id,
                    refund_amount, created_at, updated_at, completed_at
             FROM transactions WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_transaction).transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use shopwise_core::domain::customer::CustomerId;
    use shopwise_core::domain::inventory::FulfillmentType;
    use shopwise_core::domain::order::{
        DeliveryEstimate, Order, OrderId, OrderItem, OrderStatus,
    };
    use shopwise_core::domain::payment::{
        PaymentMethod, PaymentStatus, Transaction, TransactionId,
    };

    use super::{SqlOrderRepository, SqlTransactionRepository};
    use crate::repositories::{OrderRepository, TransactionRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> Result<DbPool, String> {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
        migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
        Ok(pool)
    }

    fn order(id: &str, customer: &str, age_hours: i64) -> Order {
        let created = Utc::now() - Duration::hours(age_hours);
        Order {
            id: OrderId(id.to_string()),
            customer_id: CustomerId(customer.to_string()),
            items: vec![OrderItem {
                sku: "FOO1000".to_string(),
                name: "Nike Running Shoes".to_string(),
                quantity: 1,
                price: Decimal::new(4_999, 0),
            }],
            total_amount: Decimal::new(4_999, 0),
            fulfillment_type: FulfillmentType::BuyInStore,
            status: OrderStatus::Confirmed,
            delivery_address: None,
            pickup_store: None,
            special_instructions: None,
            shipping_partner: None,
            tracking_number: None,
            estimated_delivery: DeliveryEstimate::Immediate,
            status_history: Vec::new(),
            scheduled_delivery: None,
            cancellation_reason: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[tokio::test]
    async fn orders_list_newest_first_with_limit() -> Result<(), String> {
        let repo = SqlOrderRepository::new(setup().await?);
        repo.save(order("ORD-OLD", "CUST1000", 48)).await.map_err(|e| e.to_string())?;
        repo.save(order("ORD-NEW", "CUST1000", 1)).await.map_err(|e| e.to_string())?;
        repo.save(order("ORD-MID", "CUST1000", 10)).await.map_err(|e| e.to_string())?;
        repo.save(order("ORD-ELSE", "CUST1001", 0)).await.map_err(|e| e.to_string())?;

        let listed = repo
            .list_for_customer(&CustomerId("CUST1000".to_string()), 2)
            .await
            .map_err(|e| e.to_string())?;
        let ids: Vec<&str> = listed.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["ORD-NEW", "ORD-MID"]);
        Ok(())
    }

    #[tokio::test]
    async fn order_status_updates_replace_payload() -> Result<(), String> {
        let repo = SqlOrderRepository::new(setup().await?);
        let mut saved = order("ORD-1", "CUST1000", 0);
        repo.save(saved.clone()).await.map_err(|e| e.to_string())?;

        saved
            .transition_to(OrderStatus::Cancelled, "Customer request", Utc::now())
            .map_err(|e| e.to_string())?;
        repo.save(saved.clone()).await.map_err(|e| e.to_string())?;

        let found = repo
            .find_by_id(&saved.id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("order should exist")?;
        assert_eq!(found.status, OrderStatus::Cancelled);
        assert_eq!(found.status_history.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn transaction_round_trip_keeps_refund_fields() -> Result<(), String> {
        let repo = SqlTransactionRepository::new(setup().await?);
        let now = Utc::now();
        let mut transaction = Transaction {
            id: TransactionId("TXN20260301ABCDEF12".to_string()),
            order_id: OrderId("ORD-1".to_string()),
            customer_id: CustomerId("CUST1000".to_string()),
            amount: Decimal::new(2_499_50, 2),
            method: PaymentMethod::Upi,
            status: PaymentStatus::Pending,
            failure_reason: None,
            refund_id: None,
            refund_amount: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        repo.save(transaction.clone()).await.map_err(|e| e.to_string())?;

        transaction.transition_to(PaymentStatus::Completed, now).map_err(|e| e.to_string())?;
        transaction.transition_to(PaymentStatus::Refunded, now).map_err(|e| e.to_string())?;
        transaction.refund_id = Some("REF1234ABCD".to_string());
        transaction.refund_amount = Some(Decimal::new(1_000, 0));
        repo.save(transaction.clone()).await.map_err(|e| e.to_string())?;

        let found = repo
            .find_by_id(&transaction.id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("transaction should exist")?;
        assert_eq!(found.status, PaymentStatus::Refunded);
        assert_eq!(found.amount, Decimal::new(2_499_50, 2));
        assert_eq!(found.refund_amount, Some(Decimal::new(1_000, 0)));
        assert!(found.completed_at.is_some());
        Ok(())
    }
}
