use derive_new::new;
use ulid::Ulid;

use domain::identity::{Identity, STAFF};
use domain::orders::{self, OrderStatus};
use domain::payments::{self, PaymentStatus};
use domain::Error;

use crate::cqrs::{self, OrderCqrs, OrderViews, PaymentCqrs, PaymentViews};

/// Payment initiation and settlement. Completion and order confirmation span
/// two aggregates; the order is anchored first so that two payments can
/// never settle the same order, and a completed payment whose order cannot
/// confirm is refunded.
#[derive(new)]
pub struct PaymentWorkflow {
    payments: PaymentCqrs,
    payment_views: PaymentViews,
    orders: OrderCqrs,
    order_views: OrderViews,
}

impl PaymentWorkflow {
    /// Open a pending payment for a pending order. The amount is taken as
    /// given. The order accepts at most one active payment, so a second
    /// initiation is rejected until the first fails.
    pub async fn initiate(
        &self,
        identity: &Identity,
        order_id: &str,
        amount_cents: u64,
        method: &str,
    ) -> Result<payments::View, Error> {
        let order = cqrs::require_view(&self.order_views, order_id).await?;
        if order.order.customer_id != identity.user_id {
            identity.require_role(STAFF, "initiate another customer's payment")?;
        }

        let payment_id = Ulid::new().to_string();
        let attach = orders::Command::AttachPayment {
            payment_id: payment_id.clone(),
        };
        cqrs::execute(&self.orders, order_id, attach).await?;

        let command = payments::Command::Initiate {
            id: payment_id.clone(),
            order_id: order_id.to_string(),
            customer_id: order.order.customer_id.clone(),
            amount_cents,
            method: method.to_string(),
            transaction_id: format!("TXN-{}", Ulid::new()),
        };
        if let Err(err) = cqrs::execute(&self.payments, &payment_id, command).await {
            self.detach(order_id, &payment_id).await;
            return Err(err);
        }
        tracing::info!(payment_id, order_id, "payment initiated");

        cqrs::require_view(&self.payment_views, &payment_id).await
    }

    /// Settle a pending payment against the gateway. On success the order is
    /// confirmed in the same call; on gateway failure the payment fails and
    /// the order is released for another attempt.
    pub async fn verify(
        &self,
        identity: &Identity,
        payment_id: &str,
        transaction_id: &str,
    ) -> Result<payments::View, Error> {
        let payment = cqrs::require_view(&self.payment_views, payment_id).await?;
        if payment.payment.customer_id != identity.user_id {
            identity.require_role(STAFF, "verify another customer's payment")?;
        }
        let order_id = payment.payment.order_id.clone();

        // A payment racing its order's cancellation fails without consulting
        // the gateway.
        let order = cqrs::require_view(&self.order_views, &order_id).await?;
        if order.order.status == OrderStatus::Cancelled
            && payment.payment.status == PaymentStatus::Pending
        {
            let command = payments::Command::MarkFailed {
                reason: "order cancelled".to_string(),
            };
            cqrs::execute(&self.payments, payment_id, command).await?;
            return cqrs::require_view(&self.payment_views, payment_id).await;
        }

        let command = payments::Command::Verify {
            transaction_id: transaction_id.to_string(),
        };
        cqrs::execute(&self.payments, payment_id, command).await?;

        let settled = cqrs::require_view(&self.payment_views, payment_id).await?;
        match settled.payment.status {
            PaymentStatus::Completed => {
                let confirm = orders::Command::Confirm {
                    payment_id: payment_id.to_string(),
                };
                if let Err(err) = cqrs::execute(&self.orders, &order_id, confirm).await {
                    self.refund_unconfirmable(payment_id).await;
                    return Err(err);
                }
                tracing::info!(payment_id, order_id, "payment completed, order confirmed");
            }
            PaymentStatus::Failed => {
                self.detach(&order_id, payment_id).await;
                tracing::info!(payment_id, order_id, "payment failed verification");
            }
            _ => {}
        }

        cqrs::require_view(&self.payment_views, payment_id).await
    }

    pub async fn get(&self, payment_id: &str) -> Result<payments::View, Error> {
        cqrs::require_view(&self.payment_views, payment_id).await
    }

    /// Payment history for a customer, oldest first.
    pub async fn for_user(&self, user_id: &str) -> Vec<payments::View> {
        self.payment_views
            .select(|view| view.payment.customer_id == user_id)
            .await
    }

    /// Compensation: money was taken but the order leg did not commit.
    async fn refund_unconfirmable(&self, payment_id: &str) {
        let refund = payments::Command::Refund {
            reason: "order confirmation failed".to_string(),
        };
        if let Err(err) = cqrs::execute(&self.payments, payment_id, refund).await {
            tracing::error!(payment_id, %err, "failed to refund unconfirmable payment");
        }
    }

    /// Release the order's payment slot after a failed attempt.
    async fn detach(&self, order_id: &str, payment_id: &str) {
        let command = orders::Command::DetachPayment {
            payment_id: payment_id.to_string(),
        };
        if let Err(err) = cqrs::execute(&self.orders, order_id, command).await {
            tracing::error!(order_id, payment_id, %err, "failed to detach payment from order");
        }
    }
}
