use std::sync::Arc;

use derive_new::new;
use ulid::Ulid;

use domain::identity::{Identity, STAFF};
use domain::orders::{self, LineItem, OrderStatus, PrescriptionDirectory};
use domain::payments;
use domain::products::{self, StockOperation};
use domain::Error;

use crate::cqrs::{self, OrderCqrs, OrderViews, PaymentCqrs, ProductCqrs, ProductViews};

/// Retries for compensating stock releases that hit a concurrent writer.
const RELEASE_RETRIES: u32 = 3;

/// A product line as requested by the caller; prices come from the catalog.
#[derive(Clone, Debug, new)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

/// Order placement and lifecycle. Stock reservation and payment settlement
/// run as multi-aggregate steps with compensating actions, so a failure in
/// a later step undoes the earlier ones.
#[derive(new)]
pub struct OrderWorkflow {
    orders: OrderCqrs,
    order_views: OrderViews,
    products: ProductCqrs,
    product_views: ProductViews,
    payments: PaymentCqrs,
    prescriptions: Arc<dyn PrescriptionDirectory>,
}

impl OrderWorkflow {
    /// Validate the lines, reserve stock, and persist the pending order.
    /// Stock already subtracted is added back if a later step fails.
    pub async fn create(
        &self,
        identity: &Identity,
        items: Vec<OrderItemRequest>,
    ) -> Result<orders::View, Error> {
        if items.is_empty() {
            return Err(Error::Validation {
                message: "order must contain at least one item".to_string(),
            });
        }

        let mut lines = Vec::with_capacity(items.len());
        let mut requires_prescription = false;
        for item in &items {
            if item.quantity == 0 {
                return Err(Error::Validation {
                    message: "order item quantity must be positive".to_string(),
                });
            }
            let product = cqrs::require_view(&self.product_views, &item.product_id).await?;
            if product.product.stock_quantity < item.quantity {
                return Err(Error::InsufficientStock {
                    product_id: item.product_id.clone(),
                    requested: item.quantity,
                    available: product.product.stock_quantity,
                });
            }
            requires_prescription |= product.product.prescription_required;
            lines.push(LineItem::new(
                item.product_id.clone(),
                product.product.name.clone(),
                item.quantity,
                product.product.price_cents,
            ));
        }

        if requires_prescription && !self.prescriptions.has_approved(&identity.user_id).await? {
            return Err(Error::PrescriptionRequired {
                customer_id: identity.user_id.clone(),
            });
        }

        self.reserve_stock(&lines).await?;

        let order_id = Ulid::new().to_string();
        let command = orders::Command::Create {
            id: order_id.clone(),
            customer_id: identity.user_id.clone(),
            items: lines.clone(),
            requires_prescription,
        };
        if let Err(err) = cqrs::execute(&self.orders, &order_id, command).await {
            self.release_stock(&lines).await;
            return Err(err);
        }
        tracing::info!(order_id, customer_id = %identity.user_id, "order placed");

        cqrs::require_view(&self.order_views, &order_id).await
    }

    /// Route a requested status change. Confirmation is never set directly;
    /// it only happens through payment verification.
    pub async fn update_status(
        &self,
        identity: &Identity,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<orders::View, Error> {
        match status {
            OrderStatus::Shipped => self.ship(identity, order_id).await,
            OrderStatus::Cancelled => self.cancel(identity, order_id).await,
            OrderStatus::Pending | OrderStatus::Confirmed => {
                let view = cqrs::require_view(&self.order_views, order_id).await?;
                Err(Error::InvalidTransition {
                    from: view.order.status.to_string(),
                    to: status.to_string(),
                })
            }
        }
    }

    /// Dispatch a confirmed order. Staff only.
    pub async fn ship(&self, identity: &Identity, order_id: &str) -> Result<orders::View, Error> {
        identity.require_role(STAFF, "ship orders")?;

        cqrs::execute(&self.orders, order_id, orders::Command::Ship).await?;
        tracing::info!(order_id, "order shipped");

        cqrs::require_view(&self.order_views, order_id).await
    }

    /// Cancel a pending or confirmed order. Reserved stock is released and
    /// an attached payment is failed or refunded, depending on its state.
    pub async fn cancel(&self, identity: &Identity, order_id: &str) -> Result<orders::View, Error> {
        let view = cqrs::require_view(&self.order_views, order_id).await?;
        if view.order.customer_id != identity.user_id {
            identity.require_role(STAFF, "cancel another customer's order")?;
        }

        cqrs::execute(&self.orders, order_id, orders::Command::Cancel).await?;
        self.release_stock(&view.order.items).await;
        if let Some(payment_id) = &view.order.payment_id {
            self.settle_cancelled_payment(payment_id).await;
        }
        tracing::info!(order_id, "order cancelled");

        cqrs::require_view(&self.order_views, order_id).await
    }

    pub async fn get(&self, order_id: &str) -> Result<orders::View, Error> {
        cqrs::require_view(&self.order_views, order_id).await
    }

    pub async fn for_user(&self, user_id: &str) -> Vec<orders::View> {
        self.order_views
            .select(|view| view.order.customer_id == user_id)
            .await
    }

    pub async fn all(&self) -> Vec<orders::View> {
        self.order_views.select(|_| true).await
    }

    async fn reserve_stock(&self, lines: &[LineItem]) -> Result<(), Error> {
        for (index, line) in lines.iter().enumerate() {
            let command = products::Command::AdjustStock {
                quantity: line.quantity,
                operation: StockOperation::Subtract,
            };
            if let Err(err) = cqrs::execute(&self.products, &line.product_id, command).await {
                self.release_stock(&lines[..index]).await;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Compensating add-back. Retried on conflict; losing a release would
    /// leak reserved stock, so the last failure is logged loudly.
    async fn release_stock(&self, lines: &[LineItem]) {
        for line in lines {
            let command = products::Command::AdjustStock {
                quantity: line.quantity,
                operation: StockOperation::Add,
            };
            let mut attempts = 0;
            loop {
                match cqrs::execute(&self.products, &line.product_id, command.clone()).await {
                    Ok(()) => break,
                    Err(Error::Conflict { .. }) if attempts < RELEASE_RETRIES => attempts += 1,
                    Err(err) => {
                        tracing::error!(
                            product_id = %line.product_id,
                            quantity = line.quantity,
                            %err,
                            "failed to release reserved stock"
                        );
                        break;
                    }
                }
            }
        }
    }

    /// A pending payment on a cancelled order is failed; one that completed
    /// in the meantime is refunded.
    async fn settle_cancelled_payment(&self, payment_id: &str) {
        let mark_failed = payments::Command::MarkFailed {
            reason: "order cancelled".to_string(),
        };
        match cqrs::execute(&self.payments, payment_id, mark_failed).await {
            Ok(()) => {
                tracing::info!(payment_id, "pending payment failed with its order");
                return;
            }
            Err(Error::InvalidTransition { .. }) => {}
            Err(err) => {
                tracing::error!(payment_id, %err, "failed to settle payment for cancelled order");
                return;
            }
        }

        let refund = payments::Command::Refund {
            reason: "order cancelled".to_string(),
        };
        match cqrs::execute(&self.payments, payment_id, refund).await {
            Ok(()) => tracing::info!(payment_id, "completed payment refunded with its order"),
            Err(Error::InvalidTransition { .. }) => {}
            Err(err) => {
                tracing::error!(payment_id, %err, "failed to refund payment for cancelled order");
            }
        }
    }
}
