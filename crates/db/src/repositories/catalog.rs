use std::str::FromStr;

use sqlx::Row;

use shopwise_core::domain::catalog::{Category, Product, ProductQuery};
use shopwise_core::domain::inventory::StockRecord;

use super::memory::location_rank;
use super::{
    decode_error, from_json, parse_decimal, to_json, CatalogRepository,
    InventoryRepository, RepositoryError,
};
use crate::DbPool;

const PRODUCT_COLUMNS: &str = "sku, name, category, brand, description, price, original_price,
    discount_percentage, rating, reviews_count, is_featured, is_available, tags_json, image_url";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let category: String = row.try_get("category").map_err(decode_error)?;
    let price: String = row.try_get("price").map_err(decode_error)?;
    let original_price: Option<String> = row.try_get("original_price").map_err(decode_error)?;
    let discount_percentage: Option<i64> =
        row.try_get("discount_percentage").map_err(decode_error)?;
    let reviews_count: i64 = row.try_get("reviews_count").map_err(decode_error)?;
    let tags_json: String = row.try_get("tags_json").map_err(decode_error)?;

    Ok(Product {
        sku: row.try_get("sku").map_err(decode_error)?,
        name: row.try_get("name").map_err(decode_error)?,
        category: Category::from_str(&category).map_err(decode_error)?,
        brand: row.try_get("brand").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        price: parse_decimal(&price)?,
        original_price: original_price.as_deref().map(parse_decimal).transpose()?,
        discount_percentage: discount_percentage
            .map(|pct| u32::try_from(pct).map_err(decode_error))
            .transpose()?,
        rating: row.try_get("rating").map_err(decode_error)?,
        reviews_count: u32::try_from(reviews_count).map_err(decode_error)?,
        is_featured: row.try_get("is_featured").map_err(decode_error)?,
        is_available: row.try_get("is_available").map_err(decode_error)?,
        tags: from_json(&tags_json)?,
        image_url: row.try_get("image_url").map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        // prices are TEXT, so range filters run after decoding
        let rows = match query.category {
            Some(category) => {
                sqlx::query(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products WHERE category = ? ORDER BY sku"
                ))
                .bind(category.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY sku"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let limit = if query.limit == 0 { usize::MAX } else { query.limit };
        let mut products = Vec::new();
        for row in &rows {
            let product = row_to_product(row)?;
            if query.matches(&product) {
                products.push(product);
                if products.len() >= limit {
                    break;
                }
            }
        }
        Ok(products)
    }

    async fn find_product(&self, sku: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?"))
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn save_product(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO products (sku, name, category, brand, description, price, original_price,
                                   discount_percentage, rating, reviews_count, is_featured,
                                   is_available, tags_json, image_url)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(sku) DO UPDATE SET
                 name = excluded.name,
                 category = excluded.category,
                 brand = excluded.brand,
                 description = excluded.description,
                 price = excluded.price,
                 original_price = excluded.original_price,
                 discount_percentage = excluded.discount_percentage,
                 rating = excluded.rating,
                 reviews_count = excluded.reviews_count,
                 is_featured = excluded.is_featured,
                 is_available = excluded.is_available,
                 tags_json = excluded.tags_json,
                 image_url = excluded.image_url",
        )
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(&product.brand)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(product.original_price.map(|price| price.to_string()))
        .bind(product.discount_percentage.map(i64::from))
        .bind(product.rating)
        .bind(i64::from(product.reviews_count))
        .bind(product.is_featured)
        .bind(product.is_available)
        .bind(to_json(&product.tags)?)
        .bind(&product.image_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct SqlInventoryRepository {
    pool: DbPool,
}

impl SqlInventoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_stock(row: &sqlx::sqlite::SqliteRow) -> Result<StockRecord, RepositoryError> {
    let quantity: i64 = row.try_get("quantity").map_err(decode_error)?;
    let reserved: i64 = row.try_get("reserved").map_err(decode_error)?;
    Ok(StockRecord {
        sku: row.try_get("sku").map_err(decode_error)?,
        location_id: row.try_get("location_id").map_err(decode_error)?,
        quantity: u32::try_from(quantity).map_err(decode_error)?,
        reserved: u32::try_from(reserved).map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl InventoryRepository for SqlInventoryRepository {
    async fn stock_for_sku(&self, sku: &str) -> Result<Vec<StockRecord>, RepositoryError> {
        let rows =
            sqlx::query("SELECT sku, location_id, quantity, reserved FROM inventory WHERE sku = ?")
                .bind(sku)
                .fetch_all(&self.pool)
                .await?;

        let mut records = rows.iter().map(row_to_stock).collect::<Result<Vec<_>, _>>()?;
        records.sort_by_key(|record| location_rank(&record.location_id));
        Ok(records)
    }

    async fn save_stock(&self, record: StockRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO inventory (sku, location_id, quantity, reserved)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(sku, location_id) DO UPDATE SET
                 quantity = excluded.quantity,
                 reserved = excluded.reserved",
        )
        .bind(&record.sku)
        .bind(&record.location_id)
        .bind(i64::from(record.quantity))
        .bind(i64::from(record.reserved))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
