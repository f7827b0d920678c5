use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CustomerId, PaymentMethod, PrescriptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl PrescriptionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PrescriptionStatus::Approved | PrescriptionStatus::Rejected)
    }
}

impl std::fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PrescriptionStatus::Pending => "pending",
            PrescriptionStatus::Processing => "processing",
            PrescriptionStatus::Approved => "approved",
            PrescriptionStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Answers collected from the customer's intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeFields {
    pub duration: String,
    pub frequency: String,
    pub payment_method: PaymentMethod,
    pub has_allergies: bool,
    pub allergy_details: Option<String>,
    pub substitution_allowed: bool,
    pub notes: Option<String>,
}

/// Reference to an uploaded prescription scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub file_name: String,
    pub content_type: String,
}

impl Document {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: PrescriptionId,
    pub customer_id: CustomerId,
    pub documents: Vec<Document>,
    pub intake: IntakeFields,
    pub status: PrescriptionStatus,
    pub rejection_reason: Option<String>,
    pub verified: bool,
    pub reviewed_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Everything a customer sends when submitting a prescription.
#[derive(Debug, Clone)]
pub struct PrescriptionSubmit {
    pub customer_id: CustomerId,
    pub intake: IntakeFields,
    pub documents: Vec<Document>,
    pub max_documents: usize,
}
