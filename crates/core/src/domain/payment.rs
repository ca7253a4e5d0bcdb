use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::domain::order::OrderId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Upi,
    NetBanking,
    Wallet,
    Cod,
    Emi,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 7] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::Upi,
        PaymentMethod::NetBanking,
        PaymentMethod::Wallet,
        PaymentMethod::Cod,
        PaymentMethod::Emi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::DebitCard => "debit_card",
            Self::Upi => "upi",
            Self::NetBanking => "net_banking",
            Self::Wallet => "wallet",
            Self::Cod => "cod",
            Self::Emi => "emi",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::CreditCard => "Credit Card",
            Self::DebitCard => "Debit Card",
            Self::Upi => "UPI (PhonePe/GPay/Paytm)",
            Self::NetBanking => "Net Banking",
            Self::Wallet => "Digital Wallet",
            Self::Cod => "Cash on Delivery",
            Self::Emi => "EMI (3/6/9/12 months)",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::CreditCard | Self::DebitCard => "💳",
            Self::Upi => "📱",
            Self::NetBanking => "🏦",
            Self::Wallet => "👛",
            Self::Cod => "💵",
            Self::Emi => "🔢",
        }
    }

    pub fn processing_time(self) -> &'static str {
        match self {
            Self::NetBanking => "2-5 minutes",
            Self::Cod => "On delivery",
            _ => "Instant",
        }
    }

    pub fn max_amount(self) -> Decimal {
        match self {
            Self::CreditCard | Self::Emi => Decimal::new(500_000, 0),
            Self::DebitCard => Decimal::new(200_000, 0),
            Self::Upi => Decimal::new(100_000, 0),
            Self::NetBanking => Decimal::new(1_000_000, 0),
            Self::Wallet => Decimal::new(50_000, 0),
            Self::Cod => Decimal::new(10_000, 0),
        }
    }

    pub fn min_amount(self) -> Decimal {
        match self {
            Self::Emi => Decimal::new(3_000, 0),
            _ => Decimal::ZERO,
        }
    }

    pub fn convenience_fee(self) -> Decimal {
        match self {
            Self::Cod => Decimal::new(50, 0),
            _ => Decimal::ZERO,
        }
    }

    pub fn is_card(self) -> bool {
        matches!(self, Self::CreditCard | Self::DebitCard)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == value.trim())
            .ok_or_else(|| DomainError::UnknownValue {
                kind: "payment method",
                value: value.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub refund_id: Option<String>,
    pub refund_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self.status, next),
            (PaymentStatus::Pending, PaymentStatus::Processing)
                | (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Processing, PaymentStatus::Completed)
                | (PaymentStatus::Processing, PaymentStatus::Failed)
                | (PaymentStatus::Failed, PaymentStatus::Completed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }

    pub fn transition_to(
        &mut self,
        next: PaymentStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidPaymentTransition { from: self.status, to: next });
        }

        self.status = next;
        self.updated_at = at;
        if next == PaymentStatus::Completed {
            self.completed_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{PaymentMethod, PaymentStatus, Transaction, TransactionId};
    use crate::domain::customer::CustomerId;
    use crate::domain::order::OrderId;
    use crate::errors::DomainError;

    fn transaction(status: PaymentStatus) -> Transaction {
        let now = Utc::now();
        Transaction {
            id: TransactionId("TXN000000000001".to_string()),
            order_id: OrderId("ORD1".to_string()),
            customer_id: CustomerId("CUST1000".to_string()),
            amount: Decimal::new(1_000, 0),
            method: PaymentMethod::Upi,
            status,
            failure_reason: None,
            refund_id: None,
            refund_amount: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[test]
    fn method_parses_wire_names() {
        assert_eq!("net_banking".parse::<PaymentMethod>(), Ok(PaymentMethod::NetBanking));
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn completion_stamps_timestamp() {
        let mut txn = transaction(PaymentStatus::Pending);
        txn.transition_to(PaymentStatus::Completed, Utc::now()).expect("pending -> completed");
        assert!(txn.completed_at.is_some());
    }

    #[test]
    fn only_completed_payments_refund() {
        let mut txn = transaction(PaymentStatus::Pending);
        let error = txn
            .transition_to(PaymentStatus::Refunded, Utc::now())
            .expect_err("pending -> refunded should fail");
        assert!(matches!(error, DomainError::InvalidPaymentTransition { .. }));
    }
}
