use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl LoyaltyTier {
    pub const ALL: [LoyaltyTier; 4] =
        [LoyaltyTier::Bronze, LoyaltyTier::Silver, LoyaltyTier::Gold, LoyaltyTier::Platinum];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Platinum => "Platinum",
        }
    }

    pub fn min_points(self) -> u32 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 1_000,
            Self::Gold => 5_000,
            Self::Platinum => 15_000,
        }
    }

    /// Tier-wide discount percentage applied before promo codes.
    pub fn discount_pct(self) -> Decimal {
        match self {
            Self::Bronze => Decimal::ZERO,
            Self::Silver => Decimal::new(5, 0),
            Self::Gold => Decimal::new(10, 0),
            Self::Platinum => Decimal::new(15, 0),
        }
    }

    /// Ordinal used to gate coupons (`min_tier_required`).
    pub fn level(self) -> u8 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 1,
            Self::Gold => 2,
            Self::Platinum => 3,
        }
    }

    pub fn for_points(points: u32) -> Self {
        Self::ALL.into_iter().rev().find(|tier| points >= tier.min_points()).unwrap_or(Self::Bronze)
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Platinum),
            Self::Platinum => None,
        }
    }

    pub fn benefits(self) -> &'static [&'static str] {
        match self {
            Self::Bronze => &["Earn 1 point per ₹1 spent", "Access to sales"],
            Self::Silver => &[
                "5% discount on all purchases",
                "Free shipping on orders above ₹499",
                "Early access to sales",
            ],
            Self::Gold => &[
                "10% discount on all purchases",
                "Free shipping on all orders",
                "Priority customer support",
                "Birthday gift worth ₹1000",
            ],
            Self::Platinum => &[
                "15% discount on all purchases",
                "Earn 1.5 points per ₹1 spent",
                "Free express shipping",
                "24/7 priority support",
            ],
        }
    }

    /// Birthday-month voucher value; zero means no gift.
    pub fn birthday_gift(self) -> Decimal {
        match self {
            Self::Bronze => Decimal::ZERO,
            Self::Silver => Decimal::new(500, 0),
            Self::Gold => Decimal::new(1_000, 0),
            Self::Platinum => Decimal::new(2_000, 0),
        }
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoyaltyTier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bronze" => Ok(Self::Bronze),
            "silver" => Ok(Self::Silver),
            "gold" => Ok(Self::Gold),
            "platinum" => Ok(Self::Platinum),
            _ => Err(DomainError::UnknownValue { kind: "loyalty tier", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Flat,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Flat => "flat",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_purchase: Decimal,
    pub min_tier_required: u8,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub active: bool,
}

impl Coupon {
    /// Discount this coupon would give on `amount`, ignoring eligibility.
    pub fn discount_on(&self, amount: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => {
                let raw = amount * self.discount_value / Decimal::ONE_HUNDRED;
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountType::Flat => self.discount_value.min(amount),
        }
    }

    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }
}
