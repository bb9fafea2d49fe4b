use std::sync::Arc;

use async_trait::async_trait;
use derive_new::new;

/// External payment gateway. Verification is a yes/no answer; the gateway
/// owns retries and settlement details.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Whether the gateway recognises this transaction as settled.
    async fn verify_transaction(&self, transaction_id: &str) -> bool;
}

/// Stand-in gateway: any non-empty transaction id verifies.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn verify_transaction(&self, transaction_id: &str) -> bool {
        !transaction_id.is_empty()
    }
}

#[derive(Clone, new)]
pub struct Services {
    pub gateway: Arc<dyn PaymentGateway>,
}
