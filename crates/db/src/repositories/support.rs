use sqlx::Row;

use shopwise_core::domain::support::{ReturnId, ReturnRequest, SupportTicket, TicketId};

use super::{
    decode_error, enum_text, format_timestamp, from_json, to_json, RepositoryError,
    SupportRepository,
};
use crate::DbPool;

pub struct SqlSupportRepository {
    pool: DbPool,
}

impl SqlSupportRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn payload<T: serde::de::DeserializeOwned>(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<T, RepositoryError> {
    let payload: String = row.try_get("payload_json").map_err(decode_error)?;
    from_json(&payload)
}

#[async_trait::async_trait]
impl SupportRepository for SqlSupportRepository {
    async fn save_return(&self, request: ReturnRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO return_requests (id, order_id, customer_id, reason, status, payload_json,
                                          created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 status = excluded.status,
                 payload_json = excluded.payload_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&request.id.0)
        .bind(&request.order_id.0)
        .bind(&request.customer_id.0)
        .bind(request.reason.as_str())
        .bind(request.status.as_str())
        .bind(to_json(&request)?)
        .bind(format_timestamp(request.created_at))
        .bind(format_timestamp(request.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_return(&self, id: &ReturnId) -> Result<Option<ReturnRequest>, RepositoryError> {
        let row = sqlx::query("SELECT payload_json FROM return_requests WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(payload).transpose()
    }

    async fn save_ticket(&self, ticket: SupportTicket) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO support_tickets (id, customer_id, order_id, category, priority, status,
                                          payload_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 priority = excluded.priority,
                 status = excluded.status,
                 payload_json = excluded.payload_json,
                 updated_at = excluded.updated_at",
        )
        .bind(&ticket.id.0)
        .bind(&ticket.customer_id.0)
        .bind(ticket.order_id.as_ref().map(|id| id.0.clone()))
        .bind(ticket.category.as_str())
        .bind(ticket.priority.as_str())
        .bind(enum_text(&ticket.status)?)
        .bind(to_json(&ticket)?)
        .bind(format_timestamp(ticket.created_at))
        .bind(format_timestamp(ticket.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_ticket(&self, id: &TicketId) -> Result<Option<SupportTicket>, RepositoryError> {
        let row = sqlx::query("SELECT payload_json FROM support_tickets WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(payload).transpose()
    }
}
