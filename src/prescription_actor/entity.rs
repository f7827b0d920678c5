use chrono::Utc;

use crate::actor_framework::Entity;
use crate::domain::{Prescription, PrescriptionId, PrescriptionStatus, PrescriptionSubmit};
use super::actions::PrescriptionAction;
use super::error::PrescriptionError;

const ACCEPTED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "application/pdf"];

fn required(value: &str, field: &str) -> Result<(), PrescriptionError> {
    if value.trim().is_empty() {
        return Err(PrescriptionError::ValidationError(format!("{} is required", field)));
    }
    Ok(())
}

fn validate_submission(params: &PrescriptionSubmit) -> Result<(), PrescriptionError> {
    required(params.customer_id.as_str(), "customer")?;
    required(&params.intake.duration, "duration")?;
    required(&params.intake.frequency, "frequency")?;
    if params.intake.has_allergies {
        required(params.intake.allergy_details.as_deref().unwrap_or_default(), "allergy details")?;
    }

    if params.documents.is_empty() {
        return Err(PrescriptionError::ValidationError("at least one document is required".to_string()));
    }
    if params.documents.len() > params.max_documents {
        return Err(PrescriptionError::ValidationError(format!(
            "at most {} documents may be attached, got {}",
            params.max_documents,
            params.documents.len()
        )));
    }
    for doc in &params.documents {
        required(&doc.file_name, "document file name")?;
        if !ACCEPTED_CONTENT_TYPES.contains(&doc.content_type.as_str()) {
            return Err(PrescriptionError::ValidationError(format!(
                "unsupported document type {} for {}",
                doc.content_type, doc.file_name
            )));
        }
    }
    Ok(())
}

impl Entity for Prescription {
    type Id = PrescriptionId;
    type CreateParams = PrescriptionSubmit;
    type Patch = ();
    type Action = PrescriptionAction;
    type ActionResult = Prescription;
    type Error = PrescriptionError;

    fn id(&self) -> &PrescriptionId { &self.id }
    fn version(&self) -> u64 { self.version }
    fn set_version(&mut self, version: u64) { self.version = version; }

    /// Creates a pending prescription after validating the intake form and documents.
    fn from_create_params(id: PrescriptionId, params: PrescriptionSubmit) -> Result<Self, PrescriptionError> {
        validate_submission(&params)?;
        let now = Utc::now();
        Ok(Self {
            id,
            customer_id: params.customer_id,
            documents: params.documents,
            intake: params.intake,
            status: PrescriptionStatus::Pending,
            rejection_reason: None,
            verified: false,
            reviewed_by: None,
            submitted_at: now,
            updated_at: now,
            version: 0,
        })
    }

    /// Prescriptions are only changed through actions.
    fn on_update(&mut self, _patch: ()) -> Result<(), PrescriptionError> {
        Ok(())
    }

    /// Deletion is only allowed once a pharmacist has resolved the prescription.
    fn on_delete(&self) -> Result<(), PrescriptionError> {
        if self.status.is_terminal() {
            Ok(())
        } else {
            Err(PrescriptionError::InvalidTransition { from: self.status, action: "delete" })
        }
    }

    fn handle_action(&mut self, action: PrescriptionAction) -> Result<Prescription, PrescriptionError> {
        let name = action.name();
        match (self.status, action) {
            (PrescriptionStatus::Pending, PrescriptionAction::Verify { reviewer }) => {
                self.status = PrescriptionStatus::Processing;
                self.verified = true;
                self.reviewed_by = Some(reviewer);
            }
            (PrescriptionStatus::Processing, PrescriptionAction::Approve { reviewer }) => {
                self.status = PrescriptionStatus::Approved;
                self.reviewed_by = Some(reviewer);
            }
            (PrescriptionStatus::Processing, PrescriptionAction::Reject { reviewer, reason }) => {
                let reason = reason.trim();
                if reason.is_empty() {
                    return Err(PrescriptionError::ValidationError("rejection reason is required".to_string()));
                }
                self.status = PrescriptionStatus::Rejected;
                self.rejection_reason = Some(reason.to_string());
                self.reviewed_by = Some(reviewer);
            }
            (from, _) => return Err(PrescriptionError::InvalidTransition { from, action: name }),
        }
        self.updated_at = Utc::now();
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CustomerId, Document, IntakeFields, PaymentMethod};

    pub(crate) fn intake() -> IntakeFields {
        IntakeFields {
            duration: "30 days".to_string(),
            frequency: "twice daily".to_string(),
            payment_method: PaymentMethod::Card,
            has_allergies: false,
            allergy_details: None,
            substitution_allowed: true,
            notes: None,
        }
    }

    fn submit(documents: Vec<Document>) -> PrescriptionSubmit {
        PrescriptionSubmit {
            customer_id: CustomerId::new("alice@example.com"),
            intake: intake(),
            documents,
            max_documents: 2,
        }
    }

    fn pending() -> Prescription {
        Prescription::from_create_params(PrescriptionId::new(), submit(vec![Document::new("rx.pdf", "application/pdf")])).unwrap()
    }

    #[test]
    fn submission_requires_documents_and_fields() {
        let err = Prescription::from_create_params(PrescriptionId::new(), submit(vec![])).unwrap_err();
        assert!(matches!(err, PrescriptionError::ValidationError(_)));

        let mut params = submit(vec![Document::new("rx.png", "image/png")]);
        params.intake.frequency = "  ".to_string();
        let err = Prescription::from_create_params(PrescriptionId::new(), params).unwrap_err();
        assert_eq!(err, PrescriptionError::ValidationError("frequency is required".to_string()));
    }

    #[test]
    fn submission_checks_allergy_details_and_document_types() {
        let mut params = submit(vec![Document::new("rx.png", "image/png")]);
        params.intake.has_allergies = true;
        assert!(Prescription::from_create_params(PrescriptionId::new(), params).is_err());

        let params = submit(vec![Document::new("rx.exe", "application/octet-stream")]);
        assert!(Prescription::from_create_params(PrescriptionId::new(), params).is_err());

        let doc = Document::new("rx.jpg", "image/jpeg");
        let params = submit(vec![doc.clone(), doc.clone(), doc]);
        assert!(Prescription::from_create_params(PrescriptionId::new(), params).is_err());
    }

    #[test]
    fn walks_the_happy_path() {
        let mut rx = pending();
        assert_eq!(rx.status, PrescriptionStatus::Pending);
        assert!(!rx.verified);

        rx.handle_action(PrescriptionAction::Verify { reviewer: "ph1".into() }).unwrap();
        assert_eq!(rx.status, PrescriptionStatus::Processing);
        assert!(rx.verified);

        rx.handle_action(PrescriptionAction::Approve { reviewer: "ph1".into() }).unwrap();
        assert_eq!(rx.status, PrescriptionStatus::Approved);
        assert!(rx.on_delete().is_ok());
    }

    #[test]
    fn reject_requires_a_reason() {
        let mut rx = pending();
        rx.handle_action(PrescriptionAction::Verify { reviewer: "ph1".into() }).unwrap();

        let err = rx
            .handle_action(PrescriptionAction::Reject { reviewer: "ph1".into(), reason: "   ".into() })
            .unwrap_err();
        assert!(matches!(err, PrescriptionError::ValidationError(_)));

        rx.handle_action(PrescriptionAction::Reject { reviewer: "ph1".into(), reason: "illegible scan".into() })
            .unwrap();
        assert_eq!(rx.status, PrescriptionStatus::Rejected);
        assert_eq!(rx.rejection_reason.as_deref(), Some("illegible scan"));
    }

    #[test]
    fn rejects_out_of_order_transitions() {
        let mut rx = pending();
        let err = rx.handle_action(PrescriptionAction::Approve { reviewer: "ph1".into() }).unwrap_err();
        assert_eq!(err, PrescriptionError::InvalidTransition { from: PrescriptionStatus::Pending, action: "approve" });
        assert!(rx.on_delete().is_err());

        rx.handle_action(PrescriptionAction::Verify { reviewer: "ph1".into() }).unwrap();
        let err = rx.handle_action(PrescriptionAction::Verify { reviewer: "ph2".into() }).unwrap_err();
        assert_eq!(err, PrescriptionError::InvalidTransition { from: PrescriptionStatus::Processing, action: "verify" });
    }
}
