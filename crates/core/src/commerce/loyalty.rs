use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::customer::CustomerProfile;
use crate::domain::loyalty::{Coupon, LoyaltyTier};

/// Rupee value of a single loyalty point.
pub const RUPEES_PER_POINT: Decimal = Decimal::from_parts(1, 0, 0, false, 1);
pub const WINBACK_AFTER_DAYS: i64 = 60;
pub const VIP_SPEND_THRESHOLD: Decimal = Decimal::from_parts(50_000, 0, 0, false, 0);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NextTier {
    pub name: LoyaltyTier,
    pub required_points: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TierSummary {
    pub tier: LoyaltyTier,
    pub discount_percentage: Decimal,
    pub benefits: Vec<String>,
    pub next_tier: Option<NextTier>,
    pub points_to_next: Option<u32>,
}

pub fn tier_summary(points: u32) -> TierSummary {
    let tier = LoyaltyTier::for_points(points);
    let next_tier =
        tier.next().map(|next| NextTier { name: next, required_points: next.min_points() });
    let points_to_next = next_tier.as_ref().map(|next| next.required_points.saturating_sub(points));

    TierSummary {
        tier,
        discount_percentage: tier.discount_pct(),
        benefits: tier.benefits().iter().map(|benefit| benefit.to_string()).collect(),
        next_tier,
        points_to_next,
    }
}

fn points_rate(tier: LoyaltyTier) -> Decimal {
    match tier {
        LoyaltyTier::Platinum => Decimal::new(15, 1),
        _ => Decimal::ONE,
    }
}

/// Whole points earned on `amount`; fractions are dropped.
pub fn points_earned(amount: Decimal, tier: LoyaltyTier) -> u32 {
    (amount.max(Decimal::ZERO) * points_rate(tier)).trunc().to_u32().unwrap_or(u32::MAX)
}

pub fn points_value(points: u32) -> Decimal {
    Decimal::from(points) * RUPEES_PER_POINT
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CouponCheck {
    pub valid: bool,
    pub discount_amount: Decimal,
    pub message: String,
}

impl CouponCheck {
    fn rejected(message: impl Into<String>) -> Self {
        Self { valid: false, discount_amount: Decimal::ZERO, message: message.into() }
    }
}

/// Eligibility checks run in a fixed order and stop at the first failure.
pub fn validate_coupon(
    coupon: &Coupon,
    cart_total: Decimal,
    tier: LoyaltyTier,
    now: DateTime<Utc>,
) -> CouponCheck {
    if !coupon.active {
        return CouponCheck::rejected("This promo code is no longer active.");
    }
    if !coupon.is_current(now) {
        return CouponCheck::rejected("Promo code has expired or is not yet active");
    }
    if cart_total < coupon.min_purchase {
        return CouponCheck::rejected(format!(
            "Minimum purchase of {} required",
            format_inr_whole(coupon.min_purchase)
        ));
    }
    if tier.level() < coupon.min_tier_required {
        return CouponCheck::rejected("This promo code is not available for your tier");
    }

    let discount_amount = round_money(coupon.discount_on(cart_total));
    CouponCheck {
        valid: true,
        discount_amount,
        message: format!("Promo code applied! You saved {}", format_inr(discount_amount)),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FinalPricing {
    pub original_total: Decimal,
    pub tier: LoyaltyTier,
    pub tier_discount: Decimal,
    pub promo_discount: Decimal,
    pub promo_message: Option<String>,
    pub points_redeemed_value: Decimal,
    pub final_total: Decimal,
    pub savings: Decimal,
    pub points_earned: u32,
}

/// Tier discount first, then the promo on the reduced total, then points
/// capped at what remains.
pub fn final_pricing(
    cart_total: Decimal,
    tier: LoyaltyTier,
    coupon: Option<&Coupon>,
    points_to_redeem: u32,
    now: DateTime<Utc>,
) -> FinalPricing {
    let original_total = cart_total;
    let tier_discount = round_money(cart_total * tier.discount_pct() / Decimal::ONE_HUNDRED);
    let mut running = cart_total - tier_discount;

    let mut promo_discount = Decimal::ZERO;
    let mut promo_message = None;
    if let Some(coupon) = coupon {
        let check = validate_coupon(coupon, running, tier, now);
        if check.valid {
            promo_discount = check.discount_amount;
            running -= promo_discount;
        }
        promo_message = Some(check.message);
    }

    let mut points_redeemed_value = Decimal::ZERO;
    if points_to_redeem > 0 {
        points_redeemed_value = points_value(points_to_redeem).min(running.max(Decimal::ZERO));
        running -= points_redeemed_value;
    }

    let final_total = running.max(Decimal::ZERO);
    FinalPricing {
        original_total,
        tier,
        tier_discount,
        promo_discount,
        promo_message,
        points_redeemed_value,
        final_total,
        savings: original_total - final_total,
        points_earned: points_earned(final_total, tier),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferKind {
    Birthday,
    Winback,
    Vip,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Offer {
    #[serde(rename = "type")]
    pub kind: OfferKind,
    pub title: String,
    pub description: String,
    pub code: String,
}

pub fn personalized_offers(
    profile: &CustomerProfile,
    last_order_at: Option<DateTime<Utc>>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<Offer> {
    let mut offers = Vec::new();
    let tier = LoyaltyTier::for_points(profile.loyalty_points);

    if let Some(birthday) = profile.birthday {
        let gift = tier.birthday_gift();
        if birthday.month() == today.month() && gift > Decimal::ZERO {
            let prefix: String =
                profile.customer_id.as_str().chars().take(8).collect::<String>().to_uppercase();
            offers.push(Offer {
                kind: OfferKind::Birthday,
                title: "🎂 Happy Birthday!".to_string(),
                description: format!("Get {} gift voucher", format_inr_whole(gift)),
                code: format!("BDAY{prefix}"),
            });
        }
    }

    if let Some(last_order_at) = last_order_at {
        if (now - last_order_at).num_days() > WINBACK_AFTER_DAYS {
            offers.push(Offer {
                kind: OfferKind::Winback,
                title: "We Miss You! 💙".to_string(),
                description: "Get 20% off on your next purchase".to_string(),
                code: "COMEBACK20".to_string(),
            });
        }
    }

    if profile.total_spent > VIP_SPEND_THRESHOLD {
        offers.push(Offer {
            kind: OfferKind::Vip,
            title: "VIP Exclusive Offer 🌟".to_string(),
            description: "Free express shipping on all orders + 500 bonus points".to_string(),
            code: "VIPSHIP".to_string(),
        });
    }

    offers
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `₹1,234.50`
pub fn format_inr(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let sign = if negative { "-" } else { "" };
    format!("{sign}₹{}.{fraction}", group_thousands(whole))
}

/// `₹1,235`
pub fn format_inr_whole(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}₹{}", group_thousands(&rounded.abs().trunc().to_string()))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
