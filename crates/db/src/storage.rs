use std::sync::Arc;

use crate::repositories::{
    CatalogRepository, ChatHistoryRepository, CouponRepository, CustomerRepository,
    InMemoryCatalogRepository, InMemoryChatHistoryRepository, InMemoryCouponRepository,
    InMemoryCustomerRepository, InMemoryInventoryRepository, InMemoryOrderRepository,
    InMemorySupportRepository, InMemoryTransactionRepository, InventoryRepository,
    OrderRepository, RepositoryError, SqlCatalogRepository, SqlChatHistoryRepository,
    SqlCouponRepository, SqlCustomerRepository, SqlInventoryRepository, SqlOrderRepository,
    SqlSupportRepository, SqlTransactionRepository, SupportRepository, TransactionRepository,
};
use crate::DbPool;

#[derive(Clone)]
enum Backend {
    Memory,
    Sql(DbPool),
}

/// Every repository the application needs, backed either by SQLite or by
/// process memory.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub inventory: Arc<dyn InventoryRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub support: Arc<dyn SupportRepository>,
    pub chat: Arc<dyn ChatHistoryRepository>,
    backend: Backend,
}

impl Storage {
    pub fn in_memory() -> Self {
        Self {
            catalog: Arc::new(InMemoryCatalogRepository::default()),
            inventory: Arc::new(InMemoryInventoryRepository::default()),
            customers: Arc::new(InMemoryCustomerRepository::default()),
            coupons: Arc::new(InMemoryCouponRepository::default()),
            orders: Arc::new(InMemoryOrderRepository::default()),
            transactions: Arc::new(InMemoryTransactionRepository::default()),
            support: Arc::new(InMemorySupportRepository::default()),
            chat: Arc::new(InMemoryChatHistoryRepository::default()),
            backend: Backend::Memory,
        }
    }

    pub fn sql(pool: DbPool) -> Self {
        Self {
            catalog: Arc::new(SqlCatalogRepository::new(pool.clone())),
            inventory: Arc::new(SqlInventoryRepository::new(pool.clone())),
            customers: Arc::new(SqlCustomerRepository::new(pool.clone())),
            coupons: Arc::new(SqlCouponRepository::new(pool.clone())),
            orders: Arc::new(SqlOrderRepository::new(pool.clone())),
            transactions: Arc::new(SqlTransactionRepository::new(pool.clone())),
            support: Arc::new(SqlSupportRepository::new(pool.clone())),
            chat: Arc::new(SqlChatHistoryRepository::new(pool.clone())),
            backend: Backend::Sql(pool),
        }
    }

    /// True only when backed by the SQL datastore.
    pub fn is_connected(&self) -> bool {
        matches!(self.backend, Backend::Sql(_))
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory => "memory",
            Backend::Sql(_) => "sqlite",
        }
    }

    /// Round-trips the datastore. In-memory storage is always healthy.
    pub async fn health_check(&self) -> Result<(), RepositoryError> {
        match &self.backend {
            Backend::Memory => Ok(()),
            Backend::Sql(pool) => crate::connection::ping(pool).await.map_err(Into::into),
        }
    }
}
