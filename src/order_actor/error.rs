use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::OrderStatus;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order has no line for product {0}")]
    ItemNotFound(String),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("Insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock { product: String, requested: u32, available: u32 },
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Order is locked: {0}")]
    Locked(String),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order was modified concurrently: expected version {expected}, found {actual}")]
    StaleVersion { expected: u64, actual: u64 },
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for OrderError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => OrderError::NotFound(id),
            FrameworkError::StaleVersion { expected, actual } => OrderError::StaleVersion { expected, actual },
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
