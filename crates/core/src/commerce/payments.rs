use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commerce::loyalty::{format_inr_whole, round_money};
use crate::domain::payment::PaymentMethod;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodCheck {
    pub valid: bool,
    pub message: String,
}

pub fn validate_method(method: PaymentMethod, amount: Decimal) -> MethodCheck {
    if amount > method.max_amount() {
        return MethodCheck {
            valid: false,
            message: format!(
                "{} has a maximum limit of {}",
                method.display_name(),
                format_inr_whole(method.max_amount())
            ),
        };
    }

    if amount < method.min_amount() {
        return MethodCheck {
            valid: false,
            message: format!(
                "EMI is available for orders above {}",
                format_inr_whole(method.min_amount())
            ),
        };
    }

    MethodCheck { valid: true, message: "Payment method accepted".to_string() }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeeBreakdown {
    pub subtotal: Decimal,
    pub convenience_fee: Decimal,
    pub total: Decimal,
}

pub fn fee_breakdown(amount: Decimal, method: PaymentMethod) -> FeeBreakdown {
    let convenience_fee = method.convenience_fee();
    FeeBreakdown { subtotal: amount, convenience_fee, total: amount + convenience_fee }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodOption {
    pub method: PaymentMethod,
    pub name: &'static str,
    pub icon: &'static str,
    pub processing_time: &'static str,
    pub convenience_fee: Decimal,
}

pub fn available_methods(amount: Decimal) -> Vec<MethodOption> {
    PaymentMethod::ALL
        .into_iter()
        .filter(|method| validate_method(*method, amount).valid)
        .map(|method| MethodOption {
            method,
            name: method.display_name(),
            icon: method.icon(),
            processing_time: method.processing_time(),
            convenience_fee: method.convenience_fee(),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmiOption {
    pub tenure: u32,
    pub interest_rate: u32,
    pub emi_amount: Decimal,
    pub total_amount: Decimal,
}

const EMI_PLANS: [(u32, u32); 3] = [(3, 12), (6, 13), (12, 15)];

/// Standard amortised instalment: `P r (1+r)^n / ((1+r)^n - 1)` with a
/// monthly rate `r`.
pub fn emi_options(amount: Decimal) -> Vec<EmiOption> {
    let principal = amount.to_f64().unwrap_or(0.0);

    EMI_PLANS
        .iter()
        .map(|&(tenure, interest_rate)| {
            let monthly_rate = f64::from(interest_rate) / 12.0 / 100.0;
            let growth = (1.0 + monthly_rate).powi(tenure as i32);
            let emi = principal * monthly_rate * growth / (growth - 1.0);
            let emi_amount = round_money(Decimal::from_f64(emi).unwrap_or(Decimal::ZERO));
            let total_amount =
                round_money(Decimal::from_f64(emi * f64::from(tenure)).unwrap_or(Decimal::ZERO));
            EmiOption { tenure, interest_rate, emi_amount, total_amount }
        })
        .collect()
}
