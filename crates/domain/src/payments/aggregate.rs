use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;

use super::services::Services;
use super::{Command, Event};

/// Payment settlement status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Initial state - initiated, not yet verified
    Pending,
    /// Gateway confirmed the transaction; terminal except for refund
    Completed,
    /// Gateway declined, or failed administratively; terminal
    Failed,
    /// Completed payment returned to the customer; terminal
    Refunded,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(label)
    }
}

/// Payment aggregate. Verification consults the gateway exactly once per
/// attempt; a settled payment never settles again.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub customer_id: String,
    pub amount_cents: u64,
    pub method: String,
    pub transaction_id: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

pub const AGGREGATE_TYPE: &str = "Payment";

#[async_trait]
impl Aggregate for Payment {
    type Command = Command;
    type Event = Event;
    type Error = Error;
    type Services = Services;

    fn aggregate_type() -> String {
        AGGREGATE_TYPE.to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            Command::Initiate {
                id,
                order_id,
                customer_id,
                amount_cents,
                method,
                transaction_id,
            } => {
                self.validate_new()?;
                if amount_cents == 0 {
                    return Err(Error::Validation {
                        message: "payment amount must be positive".to_string(),
                    });
                }

                Ok(vec![Event::Initiated {
                    id,
                    order_id,
                    customer_id,
                    amount_cents,
                    method,
                    transaction_id,
                    created_at: Utc::now(),
                }])
            }

            Command::Verify { transaction_id } => {
                self.validate_existing()?;
                self.validate_pending(PaymentStatus::Completed)?;

                if services.gateway.verify_transaction(&transaction_id).await {
                    Ok(vec![Event::Completed {
                        id: self.id.clone(),
                        order_id: self.order_id.clone(),
                        customer_id: self.customer_id.clone(),
                        transaction_id,
                        completed_at: Utc::now(),
                    }])
                } else {
                    Ok(vec![Event::Failed {
                        id: self.id.clone(),
                        order_id: self.order_id.clone(),
                        customer_id: self.customer_id.clone(),
                        reason: "gateway declined the transaction".to_string(),
                        failed_at: Utc::now(),
                    }])
                }
            }

            Command::MarkFailed { reason } => {
                self.validate_existing()?;
                self.validate_pending(PaymentStatus::Failed)?;

                Ok(vec![Event::Failed {
                    id: self.id.clone(),
                    order_id: self.order_id.clone(),
                    customer_id: self.customer_id.clone(),
                    reason,
                    failed_at: Utc::now(),
                }])
            }

            Command::Refund { reason } => {
                self.validate_existing()?;
                if self.status != PaymentStatus::Completed {
                    return Err(Error::InvalidTransition {
                        from: self.status.to_string(),
                        to: PaymentStatus::Refunded.to_string(),
                    });
                }

                Ok(vec![Event::Refunded {
                    id: self.id.clone(),
                    order_id: self.order_id.clone(),
                    customer_id: self.customer_id.clone(),
                    amount_cents: self.amount_cents,
                    reason,
                    refunded_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::Initiated {
                id,
                order_id,
                customer_id,
                amount_cents,
                method,
                transaction_id,
                created_at,
            } => {
                self.id = id;
                self.order_id = order_id;
                self.customer_id = customer_id;
                self.amount_cents = amount_cents;
                self.method = method;
                self.transaction_id = transaction_id;
                self.status = PaymentStatus::Pending;
                self.created_at = created_at;
            }

            Event::Completed {
                transaction_id,
                completed_at,
                ..
            } => {
                self.transaction_id = transaction_id;
                self.status = PaymentStatus::Completed;
                self.completed_at = Some(completed_at);
            }

            Event::Failed { reason, .. } => {
                self.status = PaymentStatus::Failed;
                self.failure_reason = Some(reason);
            }

            Event::Refunded { .. } => {
                self.status = PaymentStatus::Refunded;
            }
        }
    }
}

impl Payment {
    fn validate_new(&self) -> Result<(), Error> {
        if !self.id.is_empty() {
            return Err(Error::AlreadyExists {
                entity: AGGREGATE_TYPE.to_string(),
            });
        }
        Ok(())
    }

    fn validate_existing(&self) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::NotFound {
                entity: AGGREGATE_TYPE.to_string(),
            });
        }
        Ok(())
    }

    fn validate_pending(&self, to: PaymentStatus) -> Result<(), Error> {
        if self.status != PaymentStatus::Pending {
            return Err(Error::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use cqrs_es::test::TestFramework;

    use super::{Payment, PaymentStatus};
    use crate::payments::{Command, Event, MockPaymentGateway, Services};

    type PaymentTester = TestFramework<Payment>;

    fn services() -> Services {
        Services::new(Arc::new(MockPaymentGateway))
    }

    fn initiated() -> Event {
        Event::Initiated {
            id: "pay-1".to_string(),
            order_id: "order-1".to_string(),
            customer_id: "cust-1".to_string(),
            amount_cents: 1100,
            method: "CARD".to_string(),
            transaction_id: "TXN-PROVISIONAL".to_string(),
            created_at: Utc::now(),
        }
    }

    fn completed() -> Event {
        Event::Completed {
            id: "pay-1".to_string(),
            order_id: "order-1".to_string(),
            customer_id: "cust-1".to_string(),
            transaction_id: "TXN-ABC".to_string(),
            completed_at: Utc::now(),
        }
    }

    fn failed() -> Event {
        Event::Failed {
            id: "pay-1".to_string(),
            order_id: "order-1".to_string(),
            customer_id: "cust-1".to_string(),
            reason: "gateway declined the transaction".to_string(),
            failed_at: Utc::now(),
        }
    }

    #[test]
    fn initiate_opens_a_pending_payment() {
        let events = PaymentTester::with(services())
            .given_no_previous_events()
            .when(Command::Initiate {
                id: "pay-1".to_string(),
                order_id: "order-1".to_string(),
                customer_id: "cust-1".to_string(),
                amount_cents: 1100,
                method: "CARD".to_string(),
                transaction_id: "TXN-PROVISIONAL".to_string(),
            })
            .inspect_result()
            .expect("initiate should succeed");

        assert!(matches!(
            &events[0],
            Event::Initiated {
                amount_cents: 1100,
                ..
            }
        ));
    }

    #[test]
    fn zero_amount_is_rejected() {
        PaymentTester::with(services())
            .given_no_previous_events()
            .when(Command::Initiate {
                id: "pay-1".to_string(),
                order_id: "order-1".to_string(),
                customer_id: "cust-1".to_string(),
                amount_cents: 0,
                method: "CARD".to_string(),
                transaction_id: "TXN-PROVISIONAL".to_string(),
            })
            .then_expect_error_message("payment amount must be positive");
    }

    #[test]
    fn verify_with_a_transaction_id_completes() {
        let events = PaymentTester::with(services())
            .given(vec![initiated()])
            .when(Command::Verify {
                transaction_id: "TXN-ABC".to_string(),
            })
            .inspect_result()
            .expect("verify should succeed");

        assert!(matches!(
            &events[0],
            Event::Completed { transaction_id, .. } if transaction_id == "TXN-ABC"
        ));
    }

    #[test]
    fn verify_with_an_empty_transaction_id_fails_the_payment() {
        let events = PaymentTester::with(services())
            .given(vec![initiated()])
            .when(Command::Verify {
                transaction_id: "".to_string(),
            })
            .inspect_result()
            .expect("verify itself should not error");

        assert!(matches!(&events[0], Event::Failed { .. }));
    }

    #[test]
    fn verify_twice_is_rejected() {
        PaymentTester::with(services())
            .given(vec![initiated(), completed()])
            .when(Command::Verify {
                transaction_id: "TXN-ABC".to_string(),
            })
            .then_expect_error_message("invalid state transition from completed to completed");
    }

    #[test]
    fn failed_payment_cannot_complete_later() {
        PaymentTester::with(services())
            .given(vec![initiated(), failed()])
            .when(Command::Verify {
                transaction_id: "TXN-ABC".to_string(),
            })
            .then_expect_error_message("invalid state transition from failed to completed");
    }

    #[test]
    fn refund_requires_a_completed_payment() {
        PaymentTester::with(services())
            .given(vec![initiated()])
            .when(Command::Refund {
                reason: "order cancelled".to_string(),
            })
            .then_expect_error_message("invalid state transition from pending to refunded");
    }

    #[test]
    fn refund_returns_the_full_amount() {
        let events = PaymentTester::with(services())
            .given(vec![initiated(), completed()])
            .when(Command::Refund {
                reason: "order cancelled".to_string(),
            })
            .inspect_result()
            .expect("refund should succeed");

        assert!(matches!(
            &events[0],
            Event::Refunded {
                amount_cents: 1100,
                ..
            }
        ));
    }

    #[test]
    fn mark_failed_only_applies_to_pending_payments() {
        PaymentTester::with(services())
            .given(vec![initiated(), completed()])
            .when(Command::MarkFailed {
                reason: "order cancelled".to_string(),
            })
            .then_expect_error_message("invalid state transition from completed to failed");
    }

    #[test]
    fn completed_payment_keeps_the_gateway_reference() {
        use cqrs_es::Aggregate;
        let mut payment = Payment::default();
        payment.apply(initiated());
        payment.apply(completed());
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.transaction_id, "TXN-ABC");
        assert!(payment.completed_at.is_some());
    }
}
