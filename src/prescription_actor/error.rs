use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::PrescriptionStatus;

/// Errors that can occur during prescription operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PrescriptionError {
    #[error("Prescription not found: {0}")]
    NotFound(String),
    #[error("Prescription validation error: {0}")]
    ValidationError(String),
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Cannot {action} a prescription that is {from}")]
    InvalidTransition { from: PrescriptionStatus, action: &'static str },
    #[error("Prescription was modified concurrently: expected version {expected}, found {actual}")]
    StaleVersion { expected: u64, actual: u64 },
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<FrameworkError> for PrescriptionError {
    fn from(e: FrameworkError) -> Self {
        match e {
            FrameworkError::NotFound(id) => PrescriptionError::NotFound(id),
            FrameworkError::StaleVersion { expected, actual } => PrescriptionError::StaleVersion { expected, actual },
            other => PrescriptionError::ActorCommunicationError(other.to_string()),
        }
    }
}
