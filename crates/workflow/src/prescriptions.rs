use async_trait::async_trait;
use derive_new::new;
use ulid::Ulid;

use domain::identity::{Identity, STAFF};
use domain::orders::PrescriptionDirectory;
use domain::prescriptions::{self, FileMeta, PrescriptionStatus};
use domain::Error;

use crate::cqrs::{self, PrescriptionCqrs, PrescriptionViews};

/// Reason recorded when a reviewer rejects without giving one.
const DEFAULT_REJECTION_REASON: &str = "No reason provided";

/// Upload and review of prescription documents.
#[derive(new)]
pub struct PrescriptionWorkflow {
    prescriptions: PrescriptionCqrs,
    views: PrescriptionViews,
}

impl PrescriptionWorkflow {
    /// Record an uploaded document for review. Every upload starts pending,
    /// whoever uploads it.
    pub async fn upload(
        &self,
        identity: &Identity,
        file: FileMeta,
    ) -> Result<prescriptions::View, Error> {
        let prescription_id = Ulid::new().to_string();
        let command = prescriptions::Command::Upload {
            id: prescription_id.clone(),
            customer_id: identity.user_id.clone(),
            file,
        };
        cqrs::execute(&self.prescriptions, &prescription_id, command).await?;
        tracing::info!(
            prescription_id,
            customer_id = %identity.user_id,
            "prescription uploaded"
        );

        cqrs::require_view(&self.views, &prescription_id).await
    }

    /// Approve a pending prescription. Pharmacist or admin only.
    pub async fn approve(
        &self,
        reviewer: &Identity,
        prescription_id: &str,
    ) -> Result<prescriptions::View, Error> {
        reviewer.require_role(STAFF, "approve prescriptions")?;

        let command = prescriptions::Command::Approve {
            reviewer_id: reviewer.user_id.clone(),
        };
        cqrs::execute(&self.prescriptions, prescription_id, command).await?;
        tracing::info!(prescription_id, reviewer_id = %reviewer.user_id, "prescription approved");

        cqrs::require_view(&self.views, prescription_id).await
    }

    /// Reject a pending prescription. An omitted reason gets the stock text.
    pub async fn reject(
        &self,
        reviewer: &Identity,
        prescription_id: &str,
        reason: Option<String>,
    ) -> Result<prescriptions::View, Error> {
        reviewer.require_role(STAFF, "reject prescriptions")?;

        let command = prescriptions::Command::Reject {
            reviewer_id: reviewer.user_id.clone(),
            reason: reason.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string()),
        };
        cqrs::execute(&self.prescriptions, prescription_id, command).await?;
        tracing::info!(prescription_id, reviewer_id = %reviewer.user_id, "prescription rejected");

        cqrs::require_view(&self.views, prescription_id).await
    }

    pub async fn get(&self, prescription_id: &str) -> Result<prescriptions::View, Error> {
        cqrs::require_view(&self.views, prescription_id).await
    }

    pub async fn for_user(&self, user_id: &str) -> Vec<prescriptions::View> {
        self.views
            .select(|view| view.prescription.customer_id == user_id)
            .await
    }

    /// The review queue: everything still awaiting a decision.
    pub async fn pending(&self) -> Vec<prescriptions::View> {
        self.views
            .select(|view| view.prescription.status == PrescriptionStatus::Pending)
            .await
    }
}

/// Prescription lookups backed by the view store. The order aggregate
/// consults this when confirming, so approval is checked against current
/// state rather than a flag captured at order time.
#[derive(Clone, new)]
pub struct ViewPrescriptionDirectory {
    views: PrescriptionViews,
}

#[async_trait]
impl PrescriptionDirectory for ViewPrescriptionDirectory {
    async fn has_approved(&self, customer_id: &str) -> Result<bool, Error> {
        let approved = self
            .views
            .select(|view| {
                view.prescription.customer_id == customer_id
                    && view.prescription.status == PrescriptionStatus::Approved
            })
            .await;
        Ok(!approved.is_empty())
    }
}
