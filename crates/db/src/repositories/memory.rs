use std::collections::{BTreeMap, HashMap};

use tokio::sync::RwLock;

use shopwise_core::domain::catalog::{Product, ProductQuery};
use shopwise_core::domain::conversation::StoredMessage;
use shopwise_core::domain::customer::{CustomerId, CustomerProfile, PurchaseRecord};
use shopwise_core::domain::inventory::{StockRecord, LOCATIONS};
use shopwise_core::domain::loyalty::Coupon;
use shopwise_core::domain::order::{Order, OrderId};
use shopwise_core::domain::payment::{Transaction, TransactionId};
use shopwise_core::domain::support::{ReturnId, ReturnRequest, SupportTicket, TicketId};

use super::{
    CatalogRepository, ChatHistoryRepository, CouponRepository, CustomerRepository,
    InventoryRepository, OrderRepository, RepositoryError, SessionSummary, SupportRepository,
    TransactionRepository,
};

pub(crate) fn location_rank(location_id: &str) -> usize {
    LOCATIONS.iter().position(|location| location.id == location_id).unwrap_or(LOCATIONS.len())
}

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    // BTreeMap keeps SKU order for listings.
    products: RwLock<BTreeMap<String, Product>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let limit = if query.limit == 0 { usize::MAX } else { query.limit };
        Ok(products.values().filter(|product| query.matches(product)).take(limit).cloned().collect())
    }

    async fn find_product(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(sku).cloned())
    }

    async fn save_product(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.sku.clone(), product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInventoryRepository {
    stock: RwLock<HashMap<(String, String), StockRecord>>,
}

#[async_trait::async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn stock_for_sku(&self, sku: &str) -> Result<Vec<StockRecord>, RepositoryError> {
        let stock = self.stock.read().await;
        let mut records: Vec<StockRecord> =
            stock.values().filter(|record| record.sku == sku).cloned().collect();
        records.sort_by_key(|record| location_rank(&record.location_id));
        Ok(records)
    }

    async fn save_stock(&self, record: StockRecord) -> Result<(), RepositoryError> {
        let mut stock = self.stock.write().await;
        stock.insert((record.sku.clone(), record.location_id.clone()), record);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    profiles: RwLock<HashMap<String, CustomerProfile>>,
    purchases: RwLock<Vec<PurchaseRecord>>,
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_profile(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&id.0).cloned())
    }

    async fn save_profile(&self, profile: CustomerProfile) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.customer_id.0.clone(), profile);
        Ok(())
    }

    async fn add_loyalty_points(
        &self,
        id: &CustomerId,
        delta: i64,
    ) -> Result<Option<u32>, RepositoryError> {
        let mut profiles = self.profiles.write().await;
        Ok(profiles.get_mut(&id.0).map(|profile| {
            let balance = (i64::from(profile.loyalty_points) + delta).clamp(0, i64::from(u32::MAX));
            profile.loyalty_points = u32::try_from(balance).unwrap_or(u32::MAX);
            profile.loyalty_points
        }))
    }

    async fn purchase_history(
        &self,
        id: &CustomerId,
    ) -> Result<Vec<PurchaseRecord>, RepositoryError> {
        let purchases = self.purchases.read().await;
        Ok(purchases.iter().filter(|record| record.customer_id == *id).cloned().collect())
    }

    async fn record_purchase(&self, record: PurchaseRecord) -> Result<(), RepositoryError> {
        self.purchases.write().await.push(record);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCouponRepository {
    coupons: RwLock<BTreeMap<String, Coupon>>,
}

#[async_trait::async_trait]
impl CouponRepository for InMemoryCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let coupons = self.coupons.read().await;
        Ok(coupons.get(&code.trim().to_ascii_uppercase()).cloned())
    }

    async fn list_available(&self, max_tier_level: u8) -> Result<Vec<Coupon>, RepositoryError> {
        let coupons = self.coupons.read().await;
        Ok(coupons
            .values()
            .filter(|coupon| coupon.active && coupon.min_tier_required <= max_tier_level)
            .cloned()
            .collect())
    }

    async fn save(&self, coupon: Coupon) -> Result<(), RepositoryError> {
        let mut coupons = self.coupons.write().await;
        coupons.insert(coupon.code.to_ascii_uppercase(), coupon);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.0.clone(), order);
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn list_for_customer(
        &self,
        customer_id: &CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> =
            orders.values().filter(|order| order.customer_id == *customer_id).cloned().collect();
        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        matching.truncate(limit);
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    transactions: RwLock<HashMap<String, Transaction>>,
}

#[async_trait::async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn save(&self, transaction: Transaction) -> Result<(), RepositoryError> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(transaction.id.0.clone(), transaction);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &TransactionId,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(&id.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemorySupportRepository {
    returns: RwLock<HashMap<String, ReturnRequest>>,
    tickets: RwLock<HashMap<String, SupportTicket>>,
}

#[async_trait::async_trait]
impl SupportRepository for InMemorySupportRepository {
    async fn save_return(&self, request: ReturnRequest) -> Result<(), RepositoryError> {
        self.returns.write().await.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_return(&self, id: &ReturnId) -> Result<Option<ReturnRequest>, RepositoryError> {
        Ok(self.returns.read().await.get(&id.0).cloned())
    }

    async fn save_ticket(&self, ticket: SupportTicket) -> Result<(), RepositoryError> {
        self.tickets.write().await.insert(ticket.id.0.clone(), ticket);
        Ok(())
    }

    async fn find_ticket(&self, id: &TicketId) -> Result<Option<SupportTicket>, RepositoryError> {
        Ok(self.tickets.read().await.get(&id.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryChatHistoryRepository {
    messages: RwLock<Vec<StoredMessage>>,
}

#[async_trait::async_trait]
impl ChatHistoryRepository for InMemoryChatHistoryRepository {
    async fn save_message(&self, message: StoredMessage) -> Result<(), RepositoryError> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, RepositoryError> {
        let messages = self.messages.read().await;
        let session: Vec<&StoredMessage> =
            messages.iter().filter(|message| message.session_id == session_id).collect();
        let skip = session.len().saturating_sub(limit);
        Ok(session.into_iter().skip(skip).cloned().collect())
    }

    async fn customer_sessions(
        &self,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, RepositoryError> {
        let messages = self.messages.read().await;
        let mut sessions: HashMap<&str, SessionSummary> = HashMap::new();
        for message in messages.iter().filter(|message| message.customer_id == customer_id) {
            let summary =
                sessions.entry(message.session_id.as_str()).or_insert_with(|| SessionSummary {
                    session_id: message.session_id.clone(),
                    last_message_at: message.created_at,
                    message_count: 0,
                });
            summary.message_count += 1;
            summary.last_message_at = summary.last_message_at.max(message.created_at);
        }

        let mut summaries: Vec<SessionSummary> = sessions.into_values().collect();
        summaries.sort_by(|left, right| right.last_message_at.cmp(&left.last_message_at));
        summaries.truncate(limit);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use shopwise_core::domain::catalog::{Category, Product, ProductQuery};
    use shopwise_core::domain::conversation::{ChatRole, StoredMessage};
    use shopwise_core::domain::customer::{CustomerId, CustomerProfile};
    use shopwise_core::domain::inventory::StockRecord;
    use shopwise_core::domain::loyalty::{Coupon, DiscountType};

    use crate::repositories::{
        CatalogRepository, ChatHistoryRepository, CouponRepository, CustomerRepository,
        InMemoryCatalogRepository, InMemoryChatHistoryRepository, InMemoryCouponRepository,
        InMemoryCustomerRepository, InMemoryInventoryRepository, InventoryRepository,
    };

    fn product(sku: &str, category: Category, price: i64) -> Product {
        Product {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            category,
            brand: "Brand".to_string(),
            description: String::new(),
            price: Decimal::new(price, 0),
            original_price: None,
            discount_percentage: None,
            rating: 4.2,
            reviews_count: 12,
            is_featured: false,
            is_available: true,
            tags: Vec::new(),
            image_url: String::new(),
        }
    }

    fn message(session: &str, customer: &str, content: &str, offset_secs: i64) -> StoredMessage {
        StoredMessage {
            session_id: session.to_string(),
            customer_id: customer.to_string(),
            role: ChatRole::User,
            content: content.to_string(),
            metadata: json!({}),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[tokio::test]
    async fn catalog_filters_and_limits_in_sku_order() -> Result<(), String> {
        let repo = InMemoryCatalogRepository::default();
        for (sku, category, price) in [
            ("FOO1001", Category::Footwear, 3_000),
            ("FOO1000", Category::Footwear, 1_500),
            ("CLO1025", Category::Clothing, 900),
        ] {
            repo.save_product(product(sku, category, price)).await.map_err(|e| e.to_string())?;
        }

        let query = ProductQuery { category: Some(Category::Footwear), limit: 1, ..Default::default() };
        let listed = repo.list_products(&query).await.map_err(|e| e.to_string())?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sku, "FOO1000");

        let all = repo.list_products(&ProductQuery::default()).await.map_err(|e| e.to_string())?;
        assert_eq!(all.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn stock_comes_back_in_location_order() -> Result<(), String> {
        let repo = InMemoryInventoryRepository::default();
        for location in ["CHN01", "WH_CENTRAL", "MUM01"] {
            repo.save_stock(StockRecord {
                sku: "FOO1000".to_string(),
                location_id: location.to_string(),
                quantity: 5,
                reserved: 0,
            })
            .await
            .map_err(|e| e.to_string())?;
        }

        let records = repo.stock_for_sku("FOO1000").await.map_err(|e| e.to_string())?;
        let order: Vec<&str> = records.iter().map(|r| r.location_id.as_str()).collect();
        assert_eq!(order, vec!["WH_CENTRAL", "MUM01", "CHN01"]);
        Ok(())
    }

    #[tokio::test]
    async fn loyalty_points_never_go_negative() -> Result<(), String> {
        let repo = InMemoryCustomerRepository::default();
        let id = CustomerId("CUST1000".to_string());
        repo.save_profile(CustomerProfile {
            customer_id: id.clone(),
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+91 90000 00000".to_string(),
            loyalty_points: 100,
            total_orders: 1,
            total_spent: Decimal::new(1_000, 0),
            birthday: None,
            favorite_categories: Vec::new(),
            address: None,
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| e.to_string())?;

        assert_eq!(repo.add_loyalty_points(&id, 50).await.map_err(|e| e.to_string())?, Some(150));
        assert_eq!(repo.add_loyalty_points(&id, -500).await.map_err(|e| e.to_string())?, Some(0));
        let unknown = CustomerId("CUST9999".to_string());
        assert_eq!(repo.add_loyalty_points(&unknown, 5).await.map_err(|e| e.to_string())?, None);
        Ok(())
    }

    #[tokio::test]
    async fn coupon_lookup_ignores_case_and_filters_by_tier() -> Result<(), String> {
        let repo = InMemoryCouponRepository::default();
        let now = Utc::now();
        for (code, tier, active) in [("FLAT500", 0, true), ("GOLD10", 2, true), ("OLD", 0, false)] {
            repo.save(Coupon {
                code: code.to_string(),
                description: code.to_string(),
                discount_type: DiscountType::Flat,
                discount_value: Decimal::new(100, 0),
                max_discount: None,
                min_purchase: Decimal::ZERO,
                min_tier_required: tier,
                valid_from: now,
                valid_until: now + Duration::days(30),
                active,
            })
            .await
            .map_err(|e| e.to_string())?;
        }

        let found = repo.find_by_code("flat500").await.map_err(|e| e.to_string())?;
        assert_eq!(found.map(|c| c.code), Some("FLAT500".to_string()));

        let bronze = repo.list_available(0).await.map_err(|e| e.to_string())?;
        assert_eq!(bronze.len(), 1);
        let gold = repo.list_available(2).await.map_err(|e| e.to_string())?;
        assert_eq!(gold.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn chat_history_keeps_latest_messages_oldest_first() -> Result<(), String> {
        let repo = InMemoryChatHistoryRepository::default();
        for (index, content) in ["one", "two", "three"].into_iter().enumerate() {
            repo.save_message(message("s1", "CUST1000", content, index as i64))
                .await
                .map_err(|e| e.to_string())?;
        }
        repo.save_message(message("s2", "CUST1000", "other", 10)).await.map_err(|e| e.to_string())?;

        let history = repo.history("s1", 2).await.map_err(|e| e.to_string())?;
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["two", "three"]);

        let sessions = repo.customer_sessions("CUST1000", 10).await.map_err(|e| e.to_string())?;
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "s2");
        assert_eq!(sessions[1].message_count, 3);
        Ok(())
    }
}
