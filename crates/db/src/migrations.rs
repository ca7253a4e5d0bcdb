use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "customers",
        "products",
        "inventory",
        "coupons",
        "orders",
        "transactions",
        "return_requests",
        "support_tickets",
        "chat_history",
        "purchase_history",
        "idx_products_category",
        "idx_orders_customer_created",
        "idx_transactions_order_id",
        "idx_return_requests_order_id",
        "idx_support_tickets_customer_id",
        "idx_chat_history_session_id",
        "idx_chat_history_customer_id",
        "idx_purchase_history_customer_id",
    ];

    async fn managed_schema_signature(
        pool: &sqlx::SqlitePool,
    ) -> Result<Vec<(String, String, String)>, String> {
        let rows = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| e.to_string())?;

        let mut signature: Vec<(String, String, String)> = rows
            .into_iter()
            .filter_map(|row| {
                let name = row.get::<String, _>("name");
                MANAGED_SCHEMA_OBJECTS
                    .contains(&name.as_str())
                    .then(|| (row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
            })
            .collect();
        signature.sort();
        Ok(signature)
    }

    #[tokio::test]
    async fn migrations_create_every_store_table() -> Result<(), String> {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
        run_pending(&pool).await.map_err(|e| e.to_string())?;

        let signature = managed_schema_signature(&pool).await?;
        assert_eq!(signature.len(), MANAGED_SCHEMA_OBJECTS.len());
        Ok(())
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() -> Result<(), String> {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
        run_pending(&pool).await.map_err(|e| e.to_string())?;
        let initial = managed_schema_signature(&pool).await?;

        MIGRATOR.undo(&pool, 0).await.map_err(|e| e.to_string())?;
        assert!(
            managed_schema_signature(&pool).await?.is_empty(),
            "managed schema objects should be removed after full undo",
        );

        run_pending(&pool).await.map_err(|e| e.to_string())?;
        assert_eq!(managed_schema_signature(&pool).await?, initial);
        Ok(())
    }

    #[tokio::test]
    async fn running_twice_is_a_no_op() -> Result<(), String> {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
        run_pending(&pool).await.map_err(|e| e.to_string())?;
        run_pending(&pool).await.map_err(|e| e.to_string())?;
        Ok(())
    }
}
