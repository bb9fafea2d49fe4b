use std::sync::Arc;

use async_trait::async_trait;
use cqrs_es::{EventEnvelope, Query};
use derive_new::new;

use domain::orders::{self, Order};
use domain::payments::{self, Payment};
use domain::prescriptions::{self, Prescription};
use domain::tickets::{self, SupportTicket};

use crate::notifications::{NotificationCategory, NotificationSink};

const RESPONSE_PREVIEW_LIMIT: usize = 50;

/// Renders cents as a dollar amount for notification copy.
fn format_amount(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

fn preview(text: &str) -> String {
    if text.chars().count() > RESPONSE_PREVIEW_LIMIT {
        let cut: String = text.chars().take(RESPONSE_PREVIEW_LIMIT).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

async fn deliver(
    sink: &Arc<dyn NotificationSink>,
    user_id: &str,
    title: &str,
    body: &str,
    category: NotificationCategory,
) {
    if let Err(err) = sink.create(user_id, title, body, category).await {
        tracing::error!(%err, user_id, title, "dropping undeliverable notification");
    }
}

/// Announces order transitions to the owning customer. Confirmation is not
/// announced here; the payment-success notification already names the order.
#[derive(new)]
pub struct OrderNotifier {
    sink: Arc<dyn NotificationSink>,
}

#[async_trait]
impl Query<Order> for OrderNotifier {
    async fn dispatch(&self, _aggregate_id: &str, events: &[EventEnvelope<Order>]) {
        for envelope in events {
            let (user_id, title, body) = match &envelope.payload {
                orders::Event::Created {
                    id,
                    customer_id,
                    total_cents,
                    ..
                } => (
                    customer_id,
                    "Order Placed",
                    format!(
                        "Order #{} for {} has been placed and is awaiting payment",
                        id,
                        format_amount(*total_cents)
                    ),
                ),
                orders::Event::Shipped { id, customer_id, .. } => (
                    customer_id,
                    "Order Shipped",
                    format!("Order #{} has been shipped", id),
                ),
                orders::Event::Cancelled { id, customer_id, .. } => (
                    customer_id,
                    "Order Cancelled",
                    format!("Order #{} has been cancelled", id),
                ),
                _ => continue,
            };
            deliver(
                &self.sink,
                user_id,
                title,
                &body,
                NotificationCategory::OrderUpdate,
            )
            .await;
        }
    }
}

/// Announces payment outcomes to the paying customer.
#[derive(new)]
pub struct PaymentNotifier {
    sink: Arc<dyn NotificationSink>,
}

#[async_trait]
impl Query<Payment> for PaymentNotifier {
    async fn dispatch(&self, _aggregate_id: &str, events: &[EventEnvelope<Payment>]) {
        for envelope in events {
            let (user_id, title, body) = match &envelope.payload {
                payments::Event::Initiated {
                    order_id,
                    customer_id,
                    amount_cents,
                    ..
                } => (
                    customer_id,
                    "Payment Initiated",
                    format!(
                        "Payment of {} has been initiated for order #{}",
                        format_amount(*amount_cents),
                        order_id
                    ),
                ),
                payments::Event::Completed {
                    order_id,
                    customer_id,
                    ..
                } => (
                    customer_id,
                    "Payment Successful",
                    format!("Payment completed for order #{}", order_id),
                ),
                payments::Event::Failed {
                    order_id,
                    customer_id,
                    ..
                } => (
                    customer_id,
                    "Payment Failed",
                    format!("Payment failed for order #{}", order_id),
                ),
                payments::Event::Refunded {
                    order_id,
                    customer_id,
                    amount_cents,
                    ..
                } => (
                    customer_id,
                    "Payment Refunded",
                    format!(
                        "Payment of {} for order #{} has been refunded",
                        format_amount(*amount_cents),
                        order_id
                    ),
                ),
            };
            deliver(
                &self.sink,
                user_id,
                title,
                &body,
                NotificationCategory::PaymentUpdate,
            )
            .await;
        }
    }
}

/// Announces review outcomes to the uploading customer.
#[derive(new)]
pub struct PrescriptionNotifier {
    sink: Arc<dyn NotificationSink>,
}

#[async_trait]
impl Query<Prescription> for PrescriptionNotifier {
    async fn dispatch(&self, _aggregate_id: &str, events: &[EventEnvelope<Prescription>]) {
        for envelope in events {
            let (user_id, title, body) = match &envelope.payload {
                prescriptions::Event::Approved { customer_id, .. } => (
                    customer_id,
                    "Prescription Approved",
                    "Your prescription has been approved".to_string(),
                ),
                prescriptions::Event::Rejected {
                    customer_id,
                    reason,
                    ..
                } => (
                    customer_id,
                    "Prescription Rejected",
                    format!("Your prescription was rejected: {}", reason),
                ),
                prescriptions::Event::Uploaded { .. } => continue,
            };
            deliver(
                &self.sink,
                user_id,
                title,
                &body,
                NotificationCategory::PrescriptionUpdate,
            )
            .await;
        }
    }
}

/// Announces ticket activity: assignments go to the staff member, everything
/// else to the customer.
#[derive(new)]
pub struct TicketNotifier {
    sink: Arc<dyn NotificationSink>,
}

#[async_trait]
impl Query<SupportTicket> for TicketNotifier {
    async fn dispatch(&self, _aggregate_id: &str, events: &[EventEnvelope<SupportTicket>]) {
        for envelope in events {
            let (user_id, title, body) = match &envelope.payload {
                tickets::Event::Opened { id, customer_id, subject, .. } => (
                    customer_id,
                    "Support Ticket Created",
                    format!("Ticket #{} ({}) has been opened", id, subject),
                ),
                tickets::Event::Assigned { id, staff_id, .. } => (
                    staff_id,
                    "New Support Ticket",
                    format!("Ticket #{} has been assigned to you", id),
                ),
                tickets::Event::StatusChanged {
                    id,
                    customer_id,
                    status,
                    ..
                } => (
                    customer_id,
                    "Support Ticket Updated",
                    format!("Ticket #{} is now {}", id, status),
                ),
                tickets::Event::ResponseAdded {
                    customer_id,
                    response,
                    ..
                } => (
                    customer_id,
                    "Support Response",
                    preview(response),
                ),
            };
            deliver(
                &self.sink,
                user_id,
                title,
                &body,
                NotificationCategory::SupportUpdate,
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_render_as_dollars_and_cents() {
        assert_eq!(format_amount(1100), "$11.00");
        assert_eq!(format_amount(509), "$5.09");
        assert_eq!(format_amount(0), "$0.00");
    }

    #[test]
    fn long_responses_are_previewed() {
        let long = "a".repeat(60);
        let previewed = preview(&long);
        assert_eq!(previewed.len(), RESPONSE_PREVIEW_LIMIT + 3);
        assert!(previewed.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
