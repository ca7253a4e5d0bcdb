use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use shopwise_core::commerce::payments::{
    available_methods, emi_options, fee_breakdown, validate_method, EmiOption, MethodOption,
};
use shopwise_core::domain::customer::CustomerId;
use shopwise_core::domain::order::OrderId;
use shopwise_core::domain::payment::{PaymentMethod, PaymentStatus, Transaction, TransactionId};
use shopwise_db::Storage;

use crate::tools::{object_schema, tool, ToolError, ToolRegistry};

pub const NAME: &str = "payment";

pub const ROLE: &str = "You are a specialist payment processing assistant.
Your job is to help users select a payment method, initiate, and process payments.
Use your tools to get available methods, start a transaction, and check its status.
You do NOT handle pricing or discounts, only the payment itself.
Be secure, clear, and concise.";

const DEFAULT_VPA: &str = "retailai@upi";
const PAYMENT_GATEWAY: &str = "https://payment.retailai.com/pay";
const REFUND_BUSINESS_DAYS: u32 = 5;
const DECLINE_REASON: &str = "Insufficient funds / Payment declined";

/// Decides whether a simulated payment clears.
pub trait PaymentOutcomeSource: Send + Sync {
    fn approve(&self) -> bool;
}

/// Approves with a fixed probability.
#[derive(Clone, Copy, Debug)]
pub struct RandomOutcome {
    success_rate: f64,
}

impl RandomOutcome {
    pub fn new(success_rate: f64) -> Self {
        Self { success_rate: success_rate.clamp(0.0, 1.0) }
    }
}

impl Default for RandomOutcome {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl PaymentOutcomeSource for RandomOutcome {
    fn approve(&self) -> bool {
        rand::thread_rng().gen_bool(self.success_rate)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedOutcome(pub bool);

impl PaymentOutcomeSource for FixedOutcome {
    fn approve(&self) -> bool {
        self.0
    }
}

pub struct PaymentTools {
    storage: Storage,
    outcomes: Arc<dyn PaymentOutcomeSource>,
}

#[derive(Debug, Deserialize)]
pub struct AmountArgs {
    pub amount: Decimal,
}

/// Method-specific details. Card fields are accepted but never stored or
/// echoed back.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentDetails {
    pub card_number: Option<String>,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<u32>,
    pub cvv: Option<String>,
    pub upi_vpa: Option<String>,
    pub wallet_provider: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InitiateArgs {
    pub order_id: String,
    pub customer_id: String,
    pub amount: Decimal,
    pub payment_method: String,
    #[serde(default)]
    pub payment_details: Option<PaymentDetails>,
}

#[derive(Debug, Default, Serialize)]
pub struct PaymentOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convenience_fee: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_options: Option<Vec<EmiOption>>,
    pub message: String,
}

impl PaymentOutcome {
    fn rejected(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), ..Self::default() }
    }
}

#[derive(Debug, Deserialize)]
pub struct TransactionArgs {
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionLookup {
    pub found: bool,
    pub transaction: Option<Transaction>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundArgs {
    pub transaction_id: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RefundOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<u32>,
    pub message: String,
}

impl PaymentTools {
    pub fn new(storage: Storage, outcomes: Arc<dyn PaymentOutcomeSource>) -> Self {
        Self { storage, outcomes }
    }

    pub async fn available_payment_methods(
        &self,
        args: AmountArgs,
    ) -> Result<Vec<MethodOption>, ToolError> {
        Ok(available_methods(args.amount))
    }

    pub async fn initiate_payment(&self, args: InitiateArgs) -> Result<PaymentOutcome, ToolError> {
        let Ok(method) = args.payment_method.parse::<PaymentMethod>() else {
            return Ok(PaymentOutcome::rejected("Invalid payment method"));
        };
        let check = validate_method(method, args.amount);
        if !check.valid {
            return Ok(PaymentOutcome::rejected(check.message));
        }

        let now = Utc::now();
        let fees = fee_breakdown(args.amount, method);
        let mut transaction = Transaction {
            id: TransactionId(prefixed_id("TXN", 12)),
            order_id: OrderId(args.order_id.trim().to_string()),
            customer_id: CustomerId(args.customer_id.trim().to_string()),
            amount: fees.total,
            method,
            status: PaymentStatus::Pending,
            failure_reason: None,
            refund_id: None,
            refund_amount: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let mut outcome = PaymentOutcome {
            success: true,
            transaction_id: Some(transaction.id.0.clone()),
            amount: Some(fees.total),
            convenience_fee: Some(fees.convenience_fee),
            ..PaymentOutcome::default()
        };

        match method {
            PaymentMethod::Upi => {
                let vpa = args
                    .payment_details
                    .as_ref()
                    .and_then(|details| details.upi_vpa.as_deref())
                    .unwrap_or(DEFAULT_VPA);
                outcome.upi_intent = Some(format!(
                    "upi://pay?pa={vpa}&pn=RetailAI&am={}&tn={}",
                    fees.total, transaction.order_id
                ));
                outcome.message = "Scan QR code or use UPI app to pay".to_string();
            }
            PaymentMethod::CreditCard | PaymentMethod::DebitCard => {
                outcome.payment_url = Some(format!("{PAYMENT_GATEWAY}/{}", transaction.id.0));
                outcome.message = "Redirecting to secure payment gateway...".to_string();
            }
            PaymentMethod::Cod => {
                transaction
                    .transition_to(PaymentStatus::Completed, now)
                    .map_err(|error| ToolError::Storage(error.to_string()))?;
                outcome.message =
                    "Cash on Delivery confirmed. Pay when you receive the order.".to_string();
            }
            PaymentMethod::Emi => {
                outcome.emi_options = Some(emi_options(fees.total));
                outcome.message = "Select EMI tenure to proceed".to_string();
            }
            PaymentMethod::NetBanking | PaymentMethod::Wallet => {
                outcome.payment_url = Some(format!("{PAYMENT_GATEWAY}/{}", transaction.id.0));
                outcome.message = "Redirecting to payment page...".to_string();
            }
        }

        outcome.status = Some(transaction.status);
        info!(
            event_name = "agent.payment.initiated",
            transaction_id = %transaction.id.0,
            order_id = %transaction.order_id,
            method = method.as_str(),
            status = transaction.status.as_str(),
            "payment initiated"
        );
        self.storage.transactions.save(transaction).await?;
        Ok(outcome)
    }

    /// Simulated settlement: the outcome source decides whether the payment
    /// clears.
    pub async fn process_payment(&self, args: TransactionArgs) -> Result<PaymentOutcome, ToolError> {
        let id = TransactionId(args.transaction_id.trim().to_string());
        let Some(mut transaction) = self.storage.transactions.find_by_id(&id).await? else {
            return Ok(PaymentOutcome {
                status: Some(PaymentStatus::Failed),
                ..PaymentOutcome::rejected("Transaction not found")
            });
        };

        match transaction.status {
            PaymentStatus::Completed => {
                return Ok(PaymentOutcome {
                    success: true,
                    transaction_id: Some(id.0),
                    status: Some(PaymentStatus::Completed),
                    amount: Some(transaction.amount),
                    message: "Payment already completed".to_string(),
                    ..PaymentOutcome::default()
                });
            }
            PaymentStatus::Refunded => {
                return Ok(PaymentOutcome {
                    status: Some(PaymentStatus::Refunded),
                    ..PaymentOutcome::rejected("Transaction has been refunded")
                });
            }
            PaymentStatus::Pending | PaymentStatus::Processing | PaymentStatus::Failed => {}
        }

        let now = Utc::now();
        let outcome = if self.outcomes.approve() {
            transaction
                .transition_to(PaymentStatus::Completed, now)
                .map_err(|error| ToolError::Storage(error.to_string()))?;
            transaction.failure_reason = None;
            PaymentOutcome {
                success: true,
                transaction_id: Some(id.0.clone()),
                status: Some(PaymentStatus::Completed),
                amount: Some(transaction.amount),
                message: "Payment completed successfully".to_string(),
                ..PaymentOutcome::default()
            }
        } else {
            if transaction.status != PaymentStatus::Failed {
                transaction
                    .transition_to(PaymentStatus::Failed, now)
                    .map_err(|error| ToolError::Storage(error.to_string()))?;
            }
            transaction.failure_reason = Some(DECLINE_REASON.to_string());
            transaction.updated_at = now;
            PaymentOutcome {
                status: Some(PaymentStatus::Failed),
                ..PaymentOutcome::rejected("Payment failed. Please try again.")
            }
        };

        info!(
            event_name = "agent.payment.processed",
            transaction_id = %id.0,
            status = transaction.status.as_str(),
            "payment processed"
        );
        self.storage.transactions.save(transaction).await?;
        Ok(outcome)
    }

    pub async fn transaction_status(
        &self,
        args: TransactionArgs,
    ) -> Result<TransactionLookup, ToolError> {
        let id = TransactionId(args.transaction_id.trim().to_string());
        let transaction = self.storage.transactions.find_by_id(&id).await?;
        let message = match &transaction {
            Some(transaction) => {
                format!("Transaction {} is {}", transaction.id.0, transaction.status.as_str())
            }
            None => "Transaction not found".to_string(),
        };
        Ok(TransactionLookup { found: transaction.is_some(), transaction, message })
    }

    pub async fn initiate_refund(&self, args: RefundArgs) -> Result<RefundOutcome, ToolError> {
        let id = TransactionId(args.transaction_id.trim().to_string());
        let rejected = |message: &str| RefundOutcome {
            success: false,
            message: message.to_string(),
            ..RefundOutcome::default()
        };

        let Some(mut transaction) = self.storage.transactions.find_by_id(&id).await? else {
            return Ok(rejected("Transaction not found"));
        };
        if transaction.status != PaymentStatus::Completed {
            return Ok(rejected("Only completed transactions can be refunded"));
        }

        // a zero or missing amount refunds the whole transaction
        let amount = args.amount.filter(|amount| !amount.is_zero()).unwrap_or(transaction.amount);
        if amount <= Decimal::ZERO {
            return Ok(rejected("Refund amount must be positive"));
        }
        if amount > transaction.amount {
            return Ok(rejected("Refund amount cannot exceed transaction amount"));
        }

        let refund_id = prefixed_id("REF", 12);
        transaction
            .transition_to(PaymentStatus::Refunded, Utc::now())
            .map_err(|error| ToolError::Storage(error.to_string()))?;
        transaction.refund_id = Some(refund_id.clone());
        transaction.refund_amount = Some(amount);

        info!(
            event_name = "agent.payment.refunded",
            transaction_id = %id.0,
            refund_id = %refund_id,
            reason = %args.reason,
            "refund initiated"
        );
        self.storage.transactions.save(transaction).await?;

        Ok(RefundOutcome {
            success: true,
            refund_id: Some(refund_id),
            amount: Some(amount),
            estimated_days: Some(REFUND_BUSINESS_DAYS),
            message: format!(
                "Refund initiated. Amount will be credited in {REFUND_BUSINESS_DAYS} business days."
            ),
        })
    }
}

/// `prefix` followed by `len` upper-case hex characters.
pub(crate) fn prefixed_id(prefix: &str, len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    format!("{prefix}{}", &hex[..len.min(hex.len())])
}

tool! {
    AvailablePaymentMethods on PaymentTools {
        name: "get_available_payment_methods",
        description: "Get available payment methods for the order's total amount.",
        parameters: object_schema(&[("amount", "number", "Order total in INR")], &["amount"]),
        call: available_payment_methods(AmountArgs),
    }
}

tool! {
    InitiatePayment on PaymentTools {
        name: "initiate_payment",
        description: "Initiate a payment transaction after the user has selected a method.",
        parameters: object_schema(
            &[
                ("order_id", "string", "The unique ID for the order"),
                ("customer_id", "string", "The customer's unique ID"),
                ("amount", "number", "The final amount to be paid"),
                (
                    "payment_method",
                    "string",
                    "credit_card | debit_card | upi | net_banking | wallet | cod | emi",
                ),
                ("payment_details", "object", "Optional upi_vpa, wallet_provider or card details"),
            ],
            &["order_id", "customer_id", "amount", "payment_method"],
        ),
        call: initiate_payment(InitiateArgs),
    }
}

tool! {
    ProcessPayment on PaymentTools {
        name: "process_payment",
        description: "Process a pending payment once the customer has completed the action.",
        parameters: object_schema(&[("transaction_id", "string", "Transaction ID")], &["transaction_id"]),
        call: process_payment(TransactionArgs),
    }
}

tool! {
    TransactionStatus on PaymentTools {
        name: "get_transaction_status",
        description: "Get the current status of a transaction.",
        parameters: object_schema(&[("transaction_id", "string", "Transaction ID")], &["transaction_id"]),
        call: transaction_status(TransactionArgs),
    }
}

tool! {
    InitiateRefund on PaymentTools {
        name: "initiate_refund",
        description: "Initiate a refund for a completed transaction. Omit amount for a full refund.",
        parameters: object_schema(
            &[
                ("transaction_id", "string", "The original transaction ID to refund"),
                ("amount", "number", "Amount to refund"),
                ("reason", "string", "A brief reason for the refund"),
            ],
            &["transaction_id", "reason"],
        ),
        call: initiate_refund(RefundArgs),
    }
}

pub fn registry(tools: Arc<PaymentTools>) -> ToolRegistry {
    ToolRegistry::default()
        .with(AvailablePaymentMethods(tools.clone()))
        .with(InitiatePayment(tools.clone()))
        .with(ProcessPayment(tools.clone()))
        .with(TransactionStatus(tools.clone()))
        .with(InitiateRefund(tools))
}
