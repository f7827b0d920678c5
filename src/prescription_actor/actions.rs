/// Pharmacist-driven transitions of a prescription.
///
/// pending → processing → approved | rejected
#[derive(Debug, Clone)]
pub enum PrescriptionAction {
    Verify { reviewer: String },
    Approve { reviewer: String },
    Reject { reviewer: String, reason: String },
}

impl PrescriptionAction {
    pub fn name(&self) -> &'static str {
        match self {
            PrescriptionAction::Verify { .. } => "verify",
            PrescriptionAction::Approve { .. } => "approve",
            PrescriptionAction::Reject { .. } => "reject",
        }
    }
}
