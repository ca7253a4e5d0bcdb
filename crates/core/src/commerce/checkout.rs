use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commerce::loyalty::{points_earned, round_money};
use crate::domain::loyalty::{Coupon, DiscountType, LoyaltyTier};

pub const WELCOME_CODE: &str = "WELCOME5";
const WELCOME_PCT: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckoutSummary {
    pub subtotal: Decimal,
    pub applied: AppliedCoupon,
    pub savings: Decimal,
    pub final_total: Decimal,
    pub points_earned: u32,
    pub tier: LoyaltyTier,
    /// Other coupons worth mentioning, at most two.
    pub other_coupons: Vec<Coupon>,
}

/// Chooses the applicable coupon with the largest effective discount.
/// Coupons are applicable when the cart meets their minimum purchase.
pub fn best_coupon<'a>(cart_total: Decimal, coupons: &'a [Coupon]) -> Option<&'a Coupon> {
    coupons
        .iter()
        .filter(|coupon| coupon.min_purchase <= cart_total)
        .max_by(|left, right| left.discount_on(cart_total).cmp(&right.discount_on(cart_total)))
}

/// Auto-applies the best coupon, or the welcome discount when none fits.
pub fn summarize(
    cart_total: Decimal,
    tier: LoyaltyTier,
    coupons: &[Coupon],
    now: DateTime<Utc>,
) -> CheckoutSummary {
    let current: Vec<Coupon> =
        coupons.iter().filter(|coupon| coupon.active && coupon.is_current(now)).cloned().collect();

    let (applied, savings) = match best_coupon(cart_total, &current) {
        Some(coupon) => (
            AppliedCoupon {
                code: coupon.code.clone(),
                description: coupon.description.clone(),
                discount_type: coupon.discount_type,
                discount_value: coupon.discount_value,
            },
            round_money(coupon.discount_on(cart_total)),
        ),
        None => (
            AppliedCoupon {
                code: WELCOME_CODE.to_string(),
                description: "Welcome discount".to_string(),
                discount_type: DiscountType::Percentage,
                discount_value: WELCOME_PCT,
            },
            round_money(cart_total * WELCOME_PCT / Decimal::ONE_HUNDRED),
        ),
    };

    let final_total = (cart_total - savings).max(Decimal::ZERO);
    let other_coupons = current
        .iter()
        .filter(|coupon| coupon.code != applied.code)
        .take(2)
        .cloned()
        .collect();

    CheckoutSummary {
        subtotal: cart_total,
        applied,
        savings,
        final_total,
        points_earned: points_earned(final_total, tier),
        tier,
        other_coupons,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::{best_coupon, summarize, WELCOME_CODE};
    use crate::domain::loyalty::{Coupon, DiscountType, LoyaltyTier};

    fn coupon(code: &str, kind: DiscountType, value: i64, min_purchase: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            code: code.to_string(),
            description: format!("{code} offer"),
            discount_type: kind,
            discount_value: Decimal::new(value, 0),
            max_discount: None,
            min_purchase: Decimal::new(min_purchase, 0),
            min_tier_required: 0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            active: true,
        }
    }

    #[test]
    fn best_coupon_uses_effective_discount() {
        let mut capped = coupon("SAVE20", DiscountType::Percentage, 20, 0);
        capped.max_discount = Some(Decimal::new(300, 0));
        let coupons = vec![capped, coupon("FLAT500", DiscountType::Flat, 500, 2_000)];

        let best = best_coupon(Decimal::new(4_000, 0), &coupons).map(|c| c.code.as_str());
        assert_eq!(best, Some("FLAT500"));

        let below_minimum = best_coupon(Decimal::new(1_000, 0), &coupons).map(|c| c.code.as_str());
        assert_eq!(below_minimum, Some("SAVE20"));
    }

    #[test]
    fn welcome_discount_applies_when_nothing_fits() {
        let coupons = vec![coupon("FLAT500", DiscountType::Flat, 500, 2_000)];
        let summary =
            summarize(Decimal::new(1_000, 0), LoyaltyTier::Bronze, &coupons, Utc::now());

        assert_eq!(summary.applied.code, WELCOME_CODE);
        assert_eq!(summary.savings, Decimal::new(50, 0));
        assert_eq!(summary.final_total, Decimal::new(950, 0));
        assert_eq!(summary.points_earned, 950);
        assert_eq!(summary.other_coupons.len(), 1);
    }

    #[test]
    fn expired_coupons_are_ignored() {
        let mut expired = coupon("OLD50", DiscountType::Flat, 50, 0);
        expired.valid_until = Utc::now() - Duration::hours(1);
        let summary =
            summarize(Decimal::new(2_000, 0), LoyaltyTier::Silver, &[expired], Utc::now());

        assert_eq!(summary.applied.code, WELCOME_CODE);
        assert!(summary.other_coupons.is_empty());
    }
}
