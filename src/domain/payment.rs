use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{IdempotencyKey, OrderId, OrderOrigin, PaymentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
    Wallet,
    BankTransfer,
}

/// Where the charge originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Prescription,
    Pos,
    Online,
}

impl From<OrderOrigin> for PaymentType {
    fn from(origin: OrderOrigin) -> Self {
        match origin {
            OrderOrigin::Prescription => PaymentType::Prescription,
            OrderOrigin::Pos => PaymentType::Pos,
            OrderOrigin::Online => PaymentType::Online,
        }
    }
}

/// A recorded payment claim. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_type: PaymentType,
    pub idempotency_key: IdempotencyKey,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentCreate {
    pub order_id: OrderId,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_type: PaymentType,
    pub idempotency_key: IdempotencyKey,
}

/// Result of asking the ledger to record a payment.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentReceipt {
    Recorded(Payment),
    /// The order already had a payment; nothing new was charged.
    Replayed(Payment),
}

impl PaymentReceipt {
    pub fn payment(&self) -> &Payment {
        match self {
            PaymentReceipt::Recorded(p) | PaymentReceipt::Replayed(p) => p,
        }
    }

    pub fn into_payment(self) -> Payment {
        match self {
            PaymentReceipt::Recorded(p) | PaymentReceipt::Replayed(p) => p,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, PaymentReceipt::Replayed(_))
    }
}
