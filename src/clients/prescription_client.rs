use tracing::{debug, info, instrument, warn};

use crate::actor_framework::ResourceClient;
use crate::domain::{
    CustomerId, Document, IntakeFields, Prescription, PrescriptionId, PrescriptionStatus, PrescriptionSubmit, Principal,
    StaffId,
};
use crate::prescription_actor::{PrescriptionAction, PrescriptionError};

/// Client for the prescription lifecycle.
///
/// Customers submit; pharmacists move the prescription through review.
/// Every review transition carries the version the pharmacist last saw, so
/// two pharmacists acting on the same prescription cannot both succeed.
#[derive(Clone)]
pub struct PrescriptionClient {
    inner: ResourceClient<Prescription>,
    max_documents: usize,
}

crate::impl_client_methods!(PrescriptionClient, Prescription, PrescriptionId, PrescriptionError, prescription);

fn require_pharmacist(principal: &Principal) -> Result<&StaffId, PrescriptionError> {
    match principal {
        Principal::Pharmacist(staff) => Ok(staff),
        other => Err(PrescriptionError::Unauthorized(format!("{} cannot review prescriptions", other.role()))),
    }
}

impl PrescriptionClient {
    pub fn new(inner: ResourceClient<Prescription>, max_documents: usize) -> Self {
        Self { inner, max_documents }
    }

    #[instrument(skip(self, intake, documents), fields(role = principal.role(), documents = documents.len()))]
    pub async fn submit(
        &self,
        principal: &Principal,
        intake: IntakeFields,
        documents: Vec<Document>,
    ) -> Result<PrescriptionId, PrescriptionError> {
        let customer_id = principal
            .customer_id()
            .cloned()
            .ok_or_else(|| PrescriptionError::Unauthorized("sign in to submit a prescription".to_string()))?;

        let params = PrescriptionSubmit {
            customer_id,
            intake,
            documents,
            max_documents: self.max_documents,
        };
        let id = self.inner.create(params).await?;
        info!(prescription_id = %id, "Prescription submitted");
        Ok(id)
    }

    async fn transition(
        &self,
        id: PrescriptionId,
        expected_version: u64,
        action: PrescriptionAction,
    ) -> Result<Prescription, PrescriptionError> {
        let name = action.name();
        match self.inner.perform_action(id, action, Some(expected_version)).await {
            Ok(prescription) => {
                info!(prescription_id = %id, status = %prescription.status, "Prescription {}", name);
                Ok(prescription)
            }
            Err(e) => {
                warn!(prescription_id = %id, error = %e, "Prescription {} rejected", name);
                Err(e)
            }
        }
    }

    /// pending → processing
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn verify(
        &self,
        principal: &Principal,
        id: PrescriptionId,
        expected_version: u64,
    ) -> Result<Prescription, PrescriptionError> {
        let reviewer = require_pharmacist(principal)?.to_string();
        self.transition(id, expected_version, PrescriptionAction::Verify { reviewer }).await
    }

    /// processing → approved. Does not create an order.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn approve(
        &self,
        principal: &Principal,
        id: PrescriptionId,
        expected_version: u64,
    ) -> Result<Prescription, PrescriptionError> {
        let reviewer = require_pharmacist(principal)?.to_string();
        self.transition(id, expected_version, PrescriptionAction::Approve { reviewer }).await
    }

    /// processing → rejected; `reason` must not be blank.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn reject(
        &self,
        principal: &Principal,
        id: PrescriptionId,
        expected_version: u64,
        reason: &str,
    ) -> Result<Prescription, PrescriptionError> {
        let reviewer = require_pharmacist(principal)?.to_string();
        if reason.trim().is_empty() {
            return Err(PrescriptionError::ValidationError("rejection reason is required".to_string()));
        }
        let action = PrescriptionAction::Reject { reviewer, reason: reason.to_string() };
        self.transition(id, expected_version, action).await
    }

    /// Removes a resolved (approved or rejected) prescription.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn delete(&self, principal: &Principal, id: PrescriptionId) -> Result<(), PrescriptionError> {
        require_pharmacist(principal)?;
        self.inner.delete(id).await?;
        info!(prescription_id = %id, "Prescription deleted");
        Ok(())
    }

    /// A customer's prescriptions, newest first. Customers may only list their own.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn list_by_customer(
        &self,
        principal: &Principal,
        customer_id: &CustomerId,
    ) -> Result<Vec<Prescription>, PrescriptionError> {
        match principal {
            Principal::Customer(own) if own == customer_id => {}
            Principal::Pharmacist(_) | Principal::Admin(_) => {}
            other => {
                return Err(PrescriptionError::Unauthorized(format!(
                    "{} cannot list prescriptions of {}",
                    other.role(),
                    customer_id
                )))
            }
        }
        let owner = customer_id.clone();
        let mut items = self.inner.list(Some(Box::new(move |p: &Prescription| p.customer_id == owner))).await?;
        items.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        debug!(count = items.len(), "Listed prescriptions");
        Ok(items)
    }

    /// Pharmacist work queue: everything not yet resolved, oldest first.
    #[instrument(skip(self), fields(role = principal.role()))]
    pub async fn list_review_queue(&self, principal: &Principal) -> Result<Vec<Prescription>, PrescriptionError> {
        require_pharmacist(principal)?;
        let mut items = self
            .inner
            .list(Some(Box::new(|p: &Prescription| !p.status.is_terminal())))
            .await?;
        items.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(items)
    }

    /// Convenience for callers that need the approved state before assembling an order.
    pub async fn get_approved(&self, id: PrescriptionId) -> Result<Prescription, PrescriptionError> {
        let prescription = self.get_prescription(id).await?;
        if prescription.status != PrescriptionStatus::Approved {
            return Err(PrescriptionError::ValidationError(format!(
                "prescription {} is {}, not approved",
                id, prescription.status
            )));
        }
        Ok(prescription)
    }
}
