use sqlx::Row;

use shopwise_core::domain::loyalty::{Coupon, DiscountType};

use super::{
    decode_error, format_timestamp, parse_decimal, parse_timestamp, CouponRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlCouponRepository {
    pool: DbPool,
}

impl SqlCouponRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_discount_type(value: &str) -> Result<DiscountType, RepositoryError> {
    match value {
        "percentage" => Ok(DiscountType::Percentage),
        "flat" => Ok(DiscountType::Flat),
        other => Err(RepositoryError::Decode(format!("unknown discount type `{other}`"))),
    }
}

fn row_to_coupon(row: &sqlx::sqlite::SqliteRow) -> Result<Coupon, RepositoryError> {
    let discount_type: String = row.try_get("discount_type").map_err(decode_error)?;
    let discount_value: String = row.try_get("discount_value").map_err(decode_error)?;
    let max_discount: Option<String> = row.try_get("max_discount").map_err(decode_error)?;
    let min_purchase: String = row.try_get("min_purchase").map_err(decode_error)?;
    let min_tier: i64 = row.try_get("min_tier_required").map_err(decode_error)?;
    let valid_from: String = row.try_get("valid_from").map_err(decode_error)?;
    let valid_until: String = row.try_get("valid_until").map_err(decode_error)?;

    Ok(Coupon {
        code: row.try_get("code").map_err(decode_error)?,
        description: row.try_get("description").map_err(decode_error)?,
        discount_type: parse_discount_type(&discount_type)?,
        discount_value: parse_decimal(&discount_value)?,
        max_discount: max_discount.as_deref().map(parse_decimal).transpose()?,
        min_purchase: parse_decimal(&min_purchase)?,
        min_tier_required: u8::try_from(min_tier).map_err(decode_error)?,
        valid_from: parse_timestamp(&valid_from)?,
        valid_until: parse_timestamp(&valid_until)?,
        active: row.try_get("active").map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl CouponRepository for SqlCouponRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query(
            "SELECT code, description, discount_type, discount_value, max_discount, min_purchase,
                    min_tier_required, valid_from, valid_until, active
             FROM coupons WHERE UPPER(code) = UPPER(?)",
        )
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_coupon).transpose()
    }

    async fn list_available(&self, max_tier_level: u8) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT code, description, discount_type, discount_value, max_discount, min_purchase,
                    min_tier_required, valid_from, valid_until, active
             FROM coupons
             WHERE active = 1 AND min_tier_required <= ?
             ORDER BY code",
        )
        .bind(i64::from(max_tier_level))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_coupon).collect()
    }

    async fn save(&self, coupon: Coupon) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO coupons (code, description, discount_type, discount_value, max_discount,
                                  min_purchase, min_tier_required, valid_from, valid_until, active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO UPDATE SET
                 description = excluded.description,
                 discount_type = excluded.discount_type,
                 discount_value = excluded.discount_value,
                 max_discount = excluded.max_discount,
                 min_purchase = excluded.min_purchase,
                 min_tier_required = excluded.min_tier_required,
                 valid_from = excluded.valid_from,
                 valid_until = excluded.valid_until,
                 active = excluded.active",
        )
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_value.to_string())
        .bind(coupon.max_discount.map(|cap| cap.to_string()))
        .bind(coupon.min_purchase.to_string())
        .bind(i64::from(coupon.min_tier_required))
        .bind(format_timestamp(coupon.valid_from))
        .bind(format_timestamp(coupon.valid_until))
        .bind(coupon.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use shopwise_core::domain::loyalty::{Coupon, DiscountType};

    use super::SqlCouponRepository;
    use crate::repositories::CouponRepository;
    use crate::{connect_with_settings, migrations};

    fn coupon(code: &str, tier: u8, active: bool) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: code.to_string(),
            description: format!("{code} description"),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::new(20, 0),
            max_discount: Some(Decimal::new(5_000, 0)),
            min_purchase: Decimal::new(1_000, 0),
            min_tier_required: tier,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            active,
        }
    }

    #[tokio::test]
    async fn available_coupons_respect_tier_and_active_flag() -> Result<(), String> {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|e| e.to_string())?;
        migrations::run_pending(&pool).await.map_err(|e| e.to_string())?;
        let repo = SqlCouponRepository::new(pool);

        repo.save(coupon("SAVE20", 0, true)).await.map_err(|e| e.to_string())?;
        repo.save(coupon("PLAT15", 3, true)).await.map_err(|e| e.to_string())?;
        repo.save(coupon("RETIRED", 0, false)).await.map_err(|e| e.to_string())?;

        let silver = repo.list_available(1).await.map_err(|e| e.to_string())?;
        assert_eq!(silver.iter().map(|c| c.code.as_str()).collect::<Vec<_>>(), vec!["SAVE20"]);

        let platinum = repo.list_available(3).await.map_err(|e| e.to_string())?;
        assert_eq!(platinum.len(), 2);

        let found = repo.find_by_code(" save20 ").await.map_err(|e| e.to_string())?;
        let found = found.ok_or("coupon should be found case-insensitively")?;
        assert_eq!(found.max_discount, Some(Decimal::new(5_000, 0)));
        assert_eq!(found.discount_type, DiscountType::Percentage);
        Ok(())
    }
}
