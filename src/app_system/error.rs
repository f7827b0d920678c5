//! Workflow-level error taxonomy.
//!
//! Each resource has its own error enum; [`ErrorKind`] folds them into the
//! categories a caller reacts to (show a message, send to sign-in, refresh
//! the view, offer a retry).

use thiserror::Error;

use crate::cart_service::CartError;
use crate::domain::{OrderId, PaymentId};
use crate::order_actor::OrderError;
use crate::payment_service::PaymentError;
use crate::prescription_actor::PrescriptionError;
use crate::product_actor::ProductError;
use crate::reminder_actor::ReminderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input or a rule violation; nothing changed.
    Validation,
    /// Caller is not signed in or lacks the role.
    Authentication,
    /// Referenced record is gone; refresh the view.
    NotFound,
    /// Someone else changed the record first; reload and retry.
    Conflict,
    /// Recording the payment failed; order still editable.
    Payment,
    /// Payment recorded but the order is not yet confirmed; retry completes it.
    ConfirmationInconsistency,
    /// Anything else, including actor communication failures.
    Generic,
}

pub trait Classify {
    fn kind(&self) -> ErrorKind;

    fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConfirmationInconsistency | ErrorKind::Conflict | ErrorKind::Payment)
    }
}

/// Failures of the pay-and-confirm sequence.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckoutError {
    #[error("Checkout validation error: {0}")]
    ValidationError(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order is locked: {0}")]
    Locked(String),
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("Payment failed: {0}")]
    Payment(String),
    #[error("Payment {payment_id} recorded but order {order_id} is not confirmed yet")]
    ConfirmationInconsistency { order_id: OrderId, payment_id: PaymentId },
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<OrderError> for CheckoutError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NotFound(id) => CheckoutError::NotFound(id),
            OrderError::Unauthorized(msg) => CheckoutError::Unauthorized(msg),
            OrderError::Locked(msg) => CheckoutError::Locked(msg),
            OrderError::ValidationError(msg) => CheckoutError::ValidationError(msg),
            other => CheckoutError::ActorCommunicationError(other.to_string()),
        }
    }
}

impl Classify for CheckoutError {
    fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::ValidationError(_) | CheckoutError::Locked(_) | CheckoutError::InsufficientStock(_) => {
                ErrorKind::Validation
            }
            CheckoutError::Unauthorized(_) => ErrorKind::Authentication,
            CheckoutError::NotFound(_) => ErrorKind::NotFound,
            CheckoutError::Payment(_) => ErrorKind::Payment,
            CheckoutError::ConfirmationInconsistency { .. } => ErrorKind::ConfirmationInconsistency,
            CheckoutError::ActorCommunicationError(_) => ErrorKind::Generic,
        }
    }
}

impl Classify for OrderError {
    fn kind(&self) -> ErrorKind {
        match self {
            OrderError::NotFound(_) | OrderError::ItemNotFound(_) | OrderError::InvalidProduct(_) => ErrorKind::NotFound,
            OrderError::InsufficientStock { .. }
            | OrderError::ValidationError(_)
            | OrderError::Locked(_)
            | OrderError::InvalidTransition { .. } => ErrorKind::Validation,
            OrderError::Unauthorized(_) => ErrorKind::Authentication,
            OrderError::StaleVersion { .. } => ErrorKind::Conflict,
            OrderError::ActorCommunicationError(_) => ErrorKind::Generic,
        }
    }
}

impl Classify for PrescriptionError {
    fn kind(&self) -> ErrorKind {
        match self {
            PrescriptionError::NotFound(_) => ErrorKind::NotFound,
            PrescriptionError::ValidationError(_) | PrescriptionError::InvalidTransition { .. } => ErrorKind::Validation,
            PrescriptionError::Unauthorized(_) => ErrorKind::Authentication,
            PrescriptionError::StaleVersion { .. } => ErrorKind::Conflict,
            PrescriptionError::ActorCommunicationError(_) => ErrorKind::Generic,
        }
    }
}

impl Classify for ProductError {
    fn kind(&self) -> ErrorKind {
        match self {
            ProductError::NotFound(_) => ErrorKind::NotFound,
            ProductError::InsufficientStock { .. } | ProductError::InvalidQuantity(_) | ProductError::ValidationError(_) => {
                ErrorKind::Validation
            }
            ProductError::StaleVersion { .. } => ErrorKind::Conflict,
            ProductError::ActorCommunicationError(_) => ErrorKind::Generic,
        }
    }
}

impl Classify for PaymentError {
    fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::ValidationError(_) => ErrorKind::Validation,
            PaymentError::Rejected(_) => ErrorKind::Payment,
            PaymentError::ActorCommunicationError(_) => ErrorKind::Generic,
        }
    }
}

impl Classify for ReminderError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReminderError::NotFound(_) => ErrorKind::NotFound,
            ReminderError::ValidationError(_) => ErrorKind::Validation,
            ReminderError::Timeout(_) | ReminderError::ActorCommunicationError(_) => ErrorKind::Generic,
        }
    }
}

impl Classify for CartError {
    fn kind(&self) -> ErrorKind {
        match self {
            CartError::ValidationError(_)
            | CartError::UnknownProduct(_)
            | CartError::PrescriptionRequired(_)
            | CartError::InsufficientStock { .. } => ErrorKind::Validation,
            CartError::Unauthorized(_) => ErrorKind::Authentication,
            CartError::Storage(_) | CartError::ActorCommunicationError(_) => ErrorKind::Generic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_recoverable_failures_are_retryable() {
        let inconsistent = CheckoutError::ConfirmationInconsistency { order_id: OrderId::new(), payment_id: PaymentId::new() };
        assert_eq!(inconsistent.kind(), ErrorKind::ConfirmationInconsistency);
        assert!(inconsistent.is_retryable());

        assert!(!CheckoutError::ValidationError("empty".into()).is_retryable());
        assert_eq!(CheckoutError::from(OrderError::Unauthorized("x".into())).kind(), ErrorKind::Authentication);
        assert_eq!(PrescriptionError::StaleVersion { expected: 1, actual: 2 }.kind(), ErrorKind::Conflict);
    }
}
