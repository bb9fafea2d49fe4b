use std::sync::Arc;

use async_trait::async_trait;
use derive_new::new;

use crate::errors::Error;

/// Read access to prescription state. Confirming an order re-checks it here
/// rather than trusting a flag captured at order time, so an order whose
/// prescription was never approved can never confirm.
#[async_trait]
pub trait PrescriptionDirectory: Send + Sync {
    /// Whether the customer currently holds an approved prescription.
    async fn has_approved(&self, customer_id: &str) -> Result<bool, Error>;
}

#[derive(Clone, new)]
pub struct Services {
    pub prescriptions: Arc<dyn PrescriptionDirectory>,
}
