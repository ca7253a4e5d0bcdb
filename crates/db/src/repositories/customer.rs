use std::str::FromStr;

use chrono::NaiveDate;
use sqlx::Row;

use shopwise_core::domain::catalog::Category;
use shopwise_core::domain::customer::{CustomerId, CustomerProfile, PurchaseRecord};

use super::{
    decode_error, format_timestamp, from_json, parse_decimal, parse_timestamp, to_json,
    CustomerRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<CustomerProfile, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_error)?;
    let loyalty_points: i64 = row.try_get("loyalty_points").map_err(decode_error)?;
    let total_orders: i64 = row.try_get("total_orders").map_err(decode_error)?;
    let total_spent: String = row.try_get("total_spent").map_err(decode_error)?;
    let birthday: Option<String> = row.try_get("birthday").map_err(decode_error)?;
    let favorites_json: String = row.try_get("favorite_categories_json").map_err(decode_error)?;
    let address_json: Option<String> = row.try_get("address_json").map_err(decode_error)?;
    let created_at: String = row.try_get("created_at").map_err(decode_error)?;

    Ok(CustomerProfile {
        customer_id: CustomerId(id),
        name: row.try_get("name").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        loyalty_points: u32::try_from(loyalty_points).map_err(decode_error)?,
        total_orders: u32::try_from(total_orders).map_err(decode_error)?,
        total_spent: parse_decimal(&total_spent)?,
        birthday: birthday
            .map(|value| NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(decode_error))
            .transpose()?,
        favorite_categories: from_json(&favorites_json)?,
        address: address_json.as_deref().map(from_json).transpose()?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn row_to_purchase(row: &sqlx::sqlite::SqliteRow) -> Result<PurchaseRecord, RepositoryError> {
    let customer_id: String = row.try_get("customer_id").map_err(decode_error)?;
    let category: String = row.try_get("category").map_err(decode_error)?;
    let quantity: i64 = row.try_get("quantity").map_err(decode_error)?;
    let price: String = row.try_get("price").map_err(decode_error)?;
    let order_date: String = row.try_get("order_date").map_err(decode_error)?;

    Ok(PurchaseRecord {
        customer_id: CustomerId(customer_id),
        order_id: row.try_get("order_id").map_err(decode_error)?,
        sku: row.try_get("sku").map_err(decode_error)?,
        product_name: row.try_get("product_name").map_err(decode_error)?,
        category: Category::from_str(&category).map_err(decode_error)?,
        brand: row.try_get("brand").map_err(decode_error)?,
        quantity: u32::try_from(quantity).map_err(decode_error)?,
        price: parse_decimal(&price)?,
        order_date: parse_timestamp(&order_date)?,
    })
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_profile(
        &self,
        id: &CustomerId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, loyalty_points, total_orders, total_spent, birthday,
                    favorite_categories_json, address_json, created_at
             FROM customers WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn save_profile(&self, profile: CustomerProfile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, loyalty_points, total_orders,
                                    total_spent, birthday, favorite_categories_json,
                                    address_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 email = excluded.email,
                 phone = excluded.phone,
                 loyalty_points = excluded.loyalty_points,
                 total_orders = excluded.total_orders,
                 total_spent = excluded.total_spent,
                 birthday = excluded.birthday,
                 favorite_categories_json = excluded.favorite_categories_json,
                 address_json = excluded.address_json",
        )
        .bind(&profile.customer_id.0)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(i64::from(profile.loyalty_points))
        .bind(i64::from(profile.total_orders))
        .bind(profile.total_spent.to_string())
        .bind(profile.birthday.map(|date| date.format("%Y-%m-%d").to_string()))
        .bind(to_json(&profile.favorite_categories)?)
        .bind(profile.address.as_ref().map(to_json).transpose()?)
        .bind(format_timestamp(profile.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_loyalty_points(
        &self,
        id: &CustomerId,
        delta: i64,
    ) -> Result<Option<u32>, RepositoryError> {
        let row = sqlx::query(
            "UPDATE customers SET loyalty_points = MAX(0, loyalty_points + ?)
             WHERE id = ?
             RETURNING loyalty_points",
        )
        .bind(delta)
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            let points: i64 = row.try_get("loyalty_points").map_err(decode_error)?;
            u32::try_from(points).map_err(decode_error)
        })
        .transpose()
    }

    async fn purchase_history(
        &self,
        id: &CustomerId,
    ) -> Result<Vec<PurchaseRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT customer_id, order_id, sku, product_name, category, brand, quantity, price,
                    order_date
             FROM purchase_history WHERE customer_id = ? ORDER BY id",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_purchase).collect()
    }

    async fn record_purchase(&self, record: PurchaseRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO purchase_history (customer_id, order_id, sku, product_name, category,
                                           brand, quantity, price, order_date)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.customer_id.0)
        .bind(&record.order_id)
        .bind(&record.sku)
        .bind(&record.product_name)
        .bind(record.category.as_str())
        .bind(&record.brand)
        .bind(i64::from(record.quantity))
        .bind(record.price.to_string())
        .bind(format_timestamp(record.order_date))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
