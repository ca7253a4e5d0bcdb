use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use shopwise_core::commerce::checkout::{summarize, CheckoutSummary};
use shopwise_core::commerce::loyalty::{
    final_pricing, format_inr, personalized_offers, points_earned, points_value, tier_summary,
    validate_coupon, CouponCheck, FinalPricing, Offer, TierSummary,
};
use shopwise_core::domain::customer::{CustomerId, CustomerProfile};
use shopwise_core::domain::loyalty::LoyaltyTier;
use shopwise_db::Storage;

use crate::tools::{object_schema, tool, ToolError, ToolRegistry};

pub const NAME: &str = "loyalty";

pub const ROLE: &str = "You are a specialist loyalty and promotions assistant.
Your job is to manage customer loyalty points, tiers, and apply discounts.
You MUST use your tools to fetch customer data from the database.
First, ALWAYS use 'get_customer_profile' or 'get_customer_tier' to get the customer's data.
Then, use that data to answer questions about pricing, discounts, or offers.
You are responsible for all pricing and discount calculations.";

pub struct LoyaltyTools {
    storage: Storage,
}

#[derive(Debug, Deserialize)]
pub struct CustomerArgs {
    pub customer_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileLookup {
    pub found: bool,
    pub profile: Option<CustomerProfile>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TierReport {
    pub customer_id: String,
    pub loyalty_points: u32,
    pub summary: Option<TierSummary>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PointsEarnedArgs {
    pub amount: Decimal,
    #[serde(default)]
    pub tier: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PointsEarnedReport {
    pub amount: Decimal,
    pub tier: LoyaltyTier,
    pub points: u32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PointsValueArgs {
    pub points: u32,
}

#[derive(Debug, Serialize)]
pub struct PointsValueReport {
    pub points: u32,
    pub value: Decimal,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PromoArgs {
    pub promo_code: String,
    pub cart_total: Decimal,
    #[serde(default)]
    pub customer_tier: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PricingArgs {
    pub cart_total: Decimal,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub points_to_redeem: u32,
}

#[derive(Debug, Serialize)]
pub struct PricingReport {
    #[serde(flatten)]
    pub pricing: FinalPricing,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OffersReport {
    pub customer_id: String,
    pub offers: Vec<Offer>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutArgs {
    pub cart_total: Decimal,
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutReport {
    #[serde(flatten)]
    pub summary: CheckoutSummary,
    pub message: String,
}

impl LoyaltyTools {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    async fn profile(&self, customer_id: &str) -> Result<Option<CustomerProfile>, ToolError> {
        let id = CustomerId(customer_id.trim().to_string());
        Ok(self.storage.customers.find_profile(&id).await?)
    }

    /// Tier for an optional customer; unknown or missing customers are Bronze.
    pub async fn tier_for(&self, customer_id: Option<&str>) -> Result<(LoyaltyTier, u32), ToolError> {
        let Some(customer_id) = customer_id.filter(|id| !id.trim().is_empty()) else {
            return Ok((LoyaltyTier::Bronze, 0));
        };
        Ok(match self.profile(customer_id).await? {
            Some(profile) => {
                (LoyaltyTier::for_points(profile.loyalty_points), profile.loyalty_points)
            }
            None => (LoyaltyTier::Bronze, 0),
        })
    }

    pub async fn customer_profile(&self, args: CustomerArgs) -> Result<ProfileLookup, ToolError> {
        let profile = self.profile(&args.customer_id).await?;
        let message = match &profile {
            Some(profile) => format!(
                "{} has {} loyalty points across {} orders",
                profile.name, profile.loyalty_points, profile.total_orders
            ),
            None => format!("No customer found with ID: {}", args.customer_id),
        };
        Ok(ProfileLookup { found: profile.is_some(), profile, message })
    }

    pub async fn customer_tier(&self, args: CustomerArgs) -> Result<TierReport, ToolError> {
        let Some(profile) = self.profile(&args.customer_id).await? else {
            return Ok(TierReport {
                message: format!("No customer found with ID: {}", args.customer_id),
                customer_id: args.customer_id,
                loyalty_points: 0,
                summary: None,
            });
        };

        let summary = tier_summary(profile.loyalty_points);
        let mut message = format!(
            "You're a {} member with {} points ({}% off every order).",
            summary.tier, profile.loyalty_points, summary.discount_percentage
        );
        if let (Some(next), Some(remaining)) = (&summary.next_tier, summary.points_to_next) {
            message.push_str(&format!(" {remaining} more points to reach {}.", next.name));
        }

        Ok(TierReport {
            customer_id: profile.customer_id.0,
            loyalty_points: profile.loyalty_points,
            summary: Some(summary),
            message,
        })
    }

    pub async fn points_earned(&self, args: PointsEarnedArgs) -> Result<PointsEarnedReport, ToolError> {
        let tier = parse_tier(args.tier.as_deref())?;
        let points = points_earned(args.amount, tier);
        Ok(PointsEarnedReport {
            amount: args.amount,
            tier,
            points,
            message: format!("You'll earn {points} points on {}", format_inr(args.amount)),
        })
    }

    pub async fn points_value(&self, args: PointsValueArgs) -> Result<PointsValueReport, ToolError> {
        let value = points_value(args.points);
        Ok(PointsValueReport {
            points: args.points,
            value,
            message: format!("{} points are worth {}", args.points, format_inr(value)),
        })
    }

    pub async fn validate_promo(&self, args: PromoArgs) -> Result<CouponCheck, ToolError> {
        let tier = parse_tier(args.customer_tier.as_deref())?;
        let Some(coupon) = self.storage.coupons.find_by_code(args.promo_code.trim()).await? else {
            return Ok(CouponCheck {
                valid: false,
                discount_amount: Decimal::ZERO,
                message: "Invalid promo code".to_string(),
            });
        };
        Ok(validate_coupon(&coupon, args.cart_total, tier, Utc::now()))
    }

    /// With a customer id, redeemed points are capped at that customer's
    /// balance.
    pub async fn final_pricing(&self, args: PricingArgs) -> Result<PricingReport, ToolError> {
        let (tier, balance) = self.tier_for(args.customer_id.as_deref()).await?;
        let points_to_redeem = if args.customer_id.is_some() {
            args.points_to_redeem.min(balance)
        } else {
            args.points_to_redeem
        };

        let code = args.promo_code.as_deref().map(str::trim).filter(|code| !code.is_empty());
        let coupon = match code {
            Some(code) => self.storage.coupons.find_by_code(code).await?,
            None => None,
        };

        let mut pricing =
            final_pricing(args.cart_total, tier, coupon.as_ref(), points_to_redeem, Utc::now());
        if code.is_some() && coupon.is_none() {
            pricing.promo_message = Some("Invalid promo code".to_string());
        }

        debug!(
            event_name = "agent.loyalty.priced",
            tier = tier.as_str(),
            original_total = %pricing.original_total,
            final_total = %pricing.final_total,
            "final pricing computed"
        );

        let message = format!(
            "Final total {} (you save {}, earn {} points)",
            format_inr(pricing.final_total),
            format_inr(pricing.savings),
            pricing.points_earned
        );
        Ok(PricingReport { pricing, message })
    }

    pub async fn personalized_offers(&self, args: CustomerArgs) -> Result<OffersReport, ToolError> {
        let Some(profile) = self.profile(&args.customer_id).await? else {
            return Ok(OffersReport {
                message: "Customer not found".to_string(),
                customer_id: args.customer_id,
                offers: Vec::new(),
            });
        };

        let last_order = self.storage.orders.list_for_customer(&profile.customer_id, 1).await?;
        let now = Utc::now();
        let offers = personalized_offers(
            &profile,
            last_order.first().map(|order| order.created_at),
            now.date_naive(),
            now,
        );
        let message = if offers.is_empty() {
            "No special offers are available for this customer right now.".to_string()
        } else {
            format!("{} offer(s) available", offers.len())
        };
        Ok(OffersReport { customer_id: profile.customer_id.0, offers, message })
    }

    /// Best coupon for the cart, falling back to the welcome discount.
    pub async fn checkout_summary(&self, args: CheckoutArgs) -> Result<CheckoutReport, ToolError> {
        let (tier, _) = self.tier_for(args.customer_id.as_deref()).await?;
        let coupons = self.storage.coupons.list_available(tier.level()).await?;
        let summary = summarize(args.cart_total, tier, &coupons, Utc::now());
        let message = format!(
            "{} applied: you save {}. Final total {}",
            summary.applied.code,
            format_inr(summary.savings),
            format_inr(summary.final_total)
        );
        Ok(CheckoutReport { summary, message })
    }
}

fn parse_tier(value: Option<&str>) -> Result<LoyaltyTier, ToolError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => value.parse().map_err(|error: shopwise_core::DomainError| {
            ToolError::InvalidArguments { tool: "loyalty".to_string(), message: error.to_string() }
        }),
        None => Ok(LoyaltyTier::Bronze),
    }
}

tool! {
    CustomerProfileTool on LoyaltyTools {
        name: "get_customer_profile",
        description: "Fetch a customer's complete profile including loyalty points and preferences.",
        parameters: object_schema(&[("customer_id", "string", "Customer ID, e.g. CUST1001")], &["customer_id"]),
        call: customer_profile(CustomerArgs),
    }
}

tool! {
    CustomerTier on LoyaltyTools {
        name: "get_customer_tier",
        description: "Determine a customer's loyalty tier, benefits and progress to the next tier.",
        parameters: object_schema(&[("customer_id", "string", "Customer ID")], &["customer_id"]),
        call: customer_tier(CustomerArgs),
    }
}

tool! {
    PointsEarned on LoyaltyTools {
        name: "calculate_points_earned",
        description: "Calculate loyalty points earned for a purchase amount and tier.",
        parameters: object_schema(
            &[
                ("amount", "number", "Purchase amount in INR"),
                ("tier", "string", "Bronze | Silver | Gold | Platinum (default Bronze)"),
            ],
            &["amount"],
        ),
        call: points_earned(PointsEarnedArgs),
    }
}

tool! {
    PointsValue on LoyaltyTools {
        name: "calculate_points_value",
        description: "Calculate the rupee value of a number of loyalty points.",
        parameters: object_schema(&[("points", "integer", "Number of points")], &["points"]),
        call: points_value(PointsValueArgs),
    }
}

tool! {
    ValidatePromoCode on LoyaltyTools {
        name: "validate_promo_code",
        description: "Validate a promotional code against a cart total and customer tier.",
        parameters: object_schema(
            &[
                ("promo_code", "string", "Promo code"),
                ("cart_total", "number", "Cart total in INR"),
                ("customer_tier", "string", "Customer tier (default Bronze)"),
            ],
            &["promo_code", "cart_total"],
        ),
        call: validate_promo(PromoArgs),
    }
}

tool! {
    FinalPricingTool on LoyaltyTools {
        name: "calculate_final_pricing",
        description: "Calculate final pricing with tier discount, promo code and redeemed points.",
        parameters: object_schema(
            &[
                ("cart_total", "number", "Cart total in INR"),
                ("customer_id", "string", "Customer ID used to look up the tier"),
                ("promo_code", "string", "Optional promo code"),
                ("points_to_redeem", "integer", "Points to redeem (default 0)"),
            ],
            &["cart_total"],
        ),
        call: final_pricing(PricingArgs),
    }
}

tool! {
    PersonalizedOffers on LoyaltyTools {
        name: "get_personalized_offers",
        description: "Generate personalized offers from a customer's profile and order history.",
        parameters: object_schema(&[("customer_id", "string", "Customer ID")], &["customer_id"]),
        call: personalized_offers(CustomerArgs),
    }
}

tool! {
    CheckoutSummaryTool on LoyaltyTools {
        name: "get_checkout_summary",
        description: "Pick the best available coupon for a cart and summarise the checkout total.",
        parameters: object_schema(
            &[
                ("cart_total", "number", "Cart total in INR"),
                ("customer_id", "string", "Customer ID used to look up the tier"),
            ],
            &["cart_total"],
        ),
        call: checkout_summary(CheckoutArgs),
    }
}

pub fn registry(tools: Arc<LoyaltyTools>) -> ToolRegistry {
    ToolRegistry::default()
        .with(CustomerProfileTool(tools.clone()))
        .with(CustomerTier(tools.clone()))
        .with(PointsEarned(tools.clone()))
        .with(PointsValue(tools.clone()))
        .with(ValidatePromoCode(tools.clone()))
        .with(FinalPricingTool(tools.clone()))
        .with(PersonalizedOffers(tools.clone()))
        .with(CheckoutSummaryTool(tools))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{
        registry, CheckoutArgs, CustomerArgs, LoyaltyTools, PricingArgs, PromoArgs,
    };
    use shopwise_core::domain::customer::{CustomerId, CustomerProfile};
    use shopwise_core::domain::loyalty::LoyaltyTier;
    use shopwise_db::{DemoDataset, Storage};

    async fn seeded(points: u32) -> Result<LoyaltyTools, String> {
        let storage = Storage::in_memory();
        DemoDataset::standard(Utc::now()).load(&storage).await.map_err(|e| e.to_string())?;
        storage
            .customers
            .save_profile(CustomerProfile {
                customer_id: CustomerId("CUST9000".to_string()),
                name: "Asha Rao".to_string(),
                email: "asha@example.com".to_string(),
                phone: "+91-9000000000".to_string(),
                loyalty_points: points,
                total_orders: 3,
                total_spent: Decimal::new(12_000, 0),
                birthday: None,
                favorite_categories: Vec::new(),
                address: None,
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| e.to_string())?;
        Ok(LoyaltyTools::new(storage))
    }

    #[tokio::test]
    async fn tier_report_shows_progress() -> Result<(), String> {
        let tools = seeded(6_000).await?;
        let report = tools
            .customer_tier(CustomerArgs { customer_id: "CUST9000".to_string() })
            .await
            .map_err(|e| e.to_string())?;

        let summary = report.summary.ok_or("tier summary missing")?;
        assert_eq!(summary.tier, LoyaltyTier::Gold);
        assert_eq!(summary.points_to_next, Some(9_000));
        assert!(report.message.contains("Gold member"));

        let unknown = tools
            .customer_tier(CustomerArgs { customer_id: "CUST0000".to_string() })
            .await
            .map_err(|e| e.to_string())?;
        assert!(unknown.summary.is_none());
        assert_eq!(unknown.message, "No customer found with ID: CUST0000");
        Ok(())
    }

    #[tokio::test]
    async fn promo_codes_are_checked_against_the_store() -> Result<(), String> {
        let tools = seeded(0).await?;
        let applied = tools
            .validate_promo(PromoArgs {
                promo_code: "flat500".to_string(),
                cart_total: Decimal::new(3_000, 0),
                customer_tier: None,
            })
            .await
            .map_err(|e| e.to_string())?;
        assert!(applied.valid);
        assert_eq!(applied.discount_amount, Decimal::new(500, 0));

        let short = tools
            .validate_promo(PromoArgs {
                promo_code: "FLAT500".to_string(),
                cart_total: Decimal::new(1_000, 0),
                customer_tier: Some("gold".to_string()),
            })
            .await
            .map_err(|e| e.to_string())?;
        assert!(!short.valid);
        assert_eq!(short.message, "Minimum purchase of ₹2,000 required");

        let invalid = tools
            .validate_promo(PromoArgs {
                promo_code: "NOPE".to_string(),
                cart_total: Decimal::new(1_000, 0),
                customer_tier: None,
            })
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(invalid.message, "Invalid promo code");
        Ok(())
    }

    #[tokio::test]
    async fn final_pricing_caps_points_at_the_balance() -> Result<(), String> {
        let tools = seeded(2_500).await?;
        let report = tools
            .final_pricing(PricingArgs {
                cart_total: Decimal::new(10_000, 0),
                customer_id: Some("CUST9000".to_string()),
                promo_code: Some("UNKNOWN".to_string()),
                points_to_redeem: 10_000,
            })
            .await
            .map_err(|e| e.to_string())?;

        let pricing = report.pricing;
        assert_eq!(pricing.tier, LoyaltyTier::Silver);
        assert_eq!(pricing.tier_discount, Decimal::new(500, 0));
        assert_eq!(pricing.promo_discount, Decimal::ZERO);
        assert_eq!(pricing.promo_message.as_deref(), Some("Invalid promo code"));
        assert_eq!(pricing.points_redeemed_value, Decimal::new(250, 0));
        assert_eq!(pricing.final_total, Decimal::new(9_250, 0));
        Ok(())
    }

    #[tokio::test]
    async fn checkout_summary_picks_the_largest_discount() -> Result<(), String> {
        let tools = seeded(0).await?;
        let report = tools
            .checkout_summary(CheckoutArgs { cart_total: Decimal::new(6_000, 0), customer_id: None })
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(report.summary.applied.code, "SAVE20");
        assert_eq!(report.summary.savings, Decimal::new(1_200, 0));
        assert_eq!(report.summary.final_total, Decimal::new(4_800, 0));
        Ok(())
    }

    #[tokio::test]
    async fn tools_accept_model_arguments() -> Result<(), String> {
        let registry = registry(Arc::new(seeded(0).await?));
        let points = registry
            .execute("calculate_points_earned", json!({ "amount": 1000, "tier": "Platinum" }))
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(points["points"], json!(1_500));

        let bad_tier = registry
            .execute("calculate_points_earned", json!({ "amount": 1000, "tier": "Diamond" }))
            .await;
        assert!(bad_tier.is_err());
        Ok(())
    }
}
