use sqlx::Row;

use shopwise_core::domain::conversation::{ChatRole, StoredMessage};

use super::{
    decode_error, format_timestamp, from_json, limit_arg, parse_timestamp, to_json,
    ChatHistoryRepository, RepositoryError, SessionSummary,
};
use crate::DbPool;

pub struct SqlChatHistoryRepository {
    pool: DbPool,
}

impl SqlChatHistoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, RepositoryError> {
    let role: String = row.try_get("role").map_err(decode_error)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(StoredMessage {
        session_id: row.try_get("session_id").map_err(decode_error)?,
        customer_id: row.try_get("customer_id").map_err(decode_error)?,
        role: ChatRole::parse(&role)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown chat role `{role}`")))?,
        content: row.try_get("content").map_err(decode_error)?,
        metadata: from_json(&metadata_json)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl ChatHistoryRepository for SqlChatHistoryRepository {
    async fn save_message(&self, message: StoredMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_history (session_id, customer_id, role, content, metadata_json,
                                       created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&message.session_id)
        .bind(&message.customer_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(to_json(&message.metadata)?)
        .bind(format_timestamp(message.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT session_id, customer_id, role, content, metadata_json, created_at
             FROM (
                 SELECT id, session_id, customer_id, role, content, metadata_json, created_at
                 FROM chat_history
                 WHERE session_id = ?
                 ORDER BY id DESC
                 LIMIT ?
             )
             ORDER BY id ASC",
        )
        .bind(session_id)
        .bind(limit_arg(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    async fn customer_sessions(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT session_id, MAX(created_at) AS last_message_at, COUNT(*) AS message_count
             FROM chat_history
             WHERE customer_id = ?
             GROUP BY session_id
             ORDER BY last_message_at DESC
             LIMIT ?",
        )
        .bind(customer_id)
        .bind(limit_arg(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let last_message_at: String =
                    row.try_get("last_message_at").map_err(decode_error)?;
                let message_count: i64 = row.try_get("message_count").map_err(decode_error)?;
                Ok(SessionSummary {
                    session_id: row.try_get("session_id").map_err(decode_error)?,
                    last_message_at: parse_timestamp(&last_message_at)?,
                    message_count: u32::try_from(message_count).map_err(decode_error)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use shopwise_core::domain::conversation::{ChatRole, StoredMessage};

    use super::SqlChatHistoryRepository;
    use crate::repositories::ChatHistoryRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn history_returns_latest_window_in_order() -> Result<(), String> {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
        migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
        let repo = SqlChatHistoryRepository::new(pool);
        let start = Utc::now();

        for (index, (session, role, content)) in [
            ("session_a", ChatRole::User, "hi"),
            ("session_a", ChatRole::Assistant, "Hello there!"),
            ("session_a", ChatRole::User, "show me shoes"),
            ("session_b", ChatRole::User, "track my order"),
        ]
        .into_iter()
        .enumerate()
        {
            repo.save_message(StoredMessage {
                session_id: session.to_string(),
                customer_id: "CUST1000".to_string(),
                role,
                content: content.to_string(),
                metadata: json!({ "intent": "greeting", "has_products": false }),
                created_at: start + Duration::seconds(index as i64),
            })
            .await
            .map_err(|e| e.to_string())?;
        }

        let window = repo.history("session_a", 2).await.map_err(|e| e.to_string())?;
        let contents: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Hello there!", "show me shoes"]);
        assert_eq!(window[0].role, ChatRole::Assistant);
        assert_eq!(window[0].metadata["has_products"], json!(false));

        let sessions = repo.customer_sessions("CUST1000", 10).await.map_err(|e| e.to_string())?;
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "session_b");
        assert_eq!(sessions[1].message_count, 3);
        Ok(())
    }
}
