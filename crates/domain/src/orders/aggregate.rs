use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;

use super::services::Services;
use super::{Command, Event};

/// Order workflow status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Initial state - placed, awaiting payment
    Pending,
    /// Linked payment completed
    Confirmed,
    /// Dispatched; terminal
    Shipped,
    /// Cancelled before shipping; terminal
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// A product line captured at order time, price included, so later catalog
/// edits never change what the customer owes.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, new)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

/// Order aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub total_cents: u64,
    pub status: OrderStatus,

    /// The one payment currently allowed to settle this order
    pub payment_id: Option<String>,

    pub requires_prescription: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const AGGREGATE_TYPE: &str = "Order";

#[async_trait]
impl Aggregate for Order {
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
            Command::Create {
                id,
                customer_id,
                items,
                requires_prescription,
            } => {
                self.validate_new()?;
                if items.is_empty() {
                    return Err(Error::Validation {
                        message: "order must contain at least one item".to_string(),
                    });
                }
                if items.iter().any(|item| item.quantity == 0) {
                    return Err(Error::Validation {
                        message: "order item quantity must be positive".to_string(),
                    });
                }
                let total_cents = items.iter().try_fold(0u64, |total, item| {
                    item.unit_price_cents
                        .checked_mul(u64::from(item.quantity))
                        .and_then(|line| total.checked_add(line))
                        .ok_or_else(|| Error::Validation {
                            message: "order total overflow".to_string(),
                        })
                })?;

                Ok(vec![Event::Created {
                    id,
                    customer_id,
                    items,
                    total_cents,
                    requires_prescription,
                    created_at: Utc::now(),
                }])
            }

            Command::AttachPayment { payment_id } => {
                self.validate_existing()?;
                if self.status != OrderStatus::Pending {
                    return Err(Error::Validation {
                        message: format!(
                            "order is {}, a payment can only be initiated while pending",
                            self.status
                        ),
                    });
                }
                if self.payment_id.is_some() {
                    return Err(Error::Validation {
                        message: "order already has an active payment".to_string(),
                    });
                }

                Ok(vec![Event::PaymentAttached {
                    id: self.id.clone(),
                    payment_id,
                    updated_at: Utc::now(),
                }])
            }

            Command::DetachPayment { payment_id } => {
                self.validate_existing()?;
                self.validate_attached(&payment_id)?;

                Ok(vec![Event::PaymentDetached {
                    id: self.id.clone(),
                    payment_id,
                    updated_at: Utc::now(),
                }])
            }

            Command::Confirm { payment_id } => {
                self.validate_existing()?;
                if self.status != OrderStatus::Pending {
                    return Err(self.invalid_transition(OrderStatus::Confirmed));
                }
                self.validate_attached(&payment_id)?;
                if self.requires_prescription
                    && !services.prescriptions.has_approved(&self.customer_id).await?
                {
                    return Err(Error::PrescriptionRequired {
                        customer_id: self.customer_id.clone(),
                    });
                }

                Ok(vec![Event::Confirmed {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    payment_id,
                    updated_at: Utc::now(),
                }])
            }

            Command::Ship => {
                self.validate_existing()?;
                if self.status != OrderStatus::Confirmed {
                    return Err(self.invalid_transition(OrderStatus::Shipped));
                }

                Ok(vec![Event::Shipped {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    updated_at: Utc::now(),
                }])
            }

            Command::Cancel => {
                self.validate_existing()?;
                if !matches!(self.status, OrderStatus::Pending | OrderStatus::Confirmed) {
                    return Err(self.invalid_transition(OrderStatus::Cancelled));
                }

                Ok(vec![Event::Cancelled {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    updated_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::Created {
                id,
                customer_id,
                items,
                total_cents,
                requires_prescription,
                created_at,
            } => {
                self.id = id;
                self.customer_id = customer_id;
                self.items = items;
                self.total_cents = total_cents;
                self.requires_prescription = requires_prescription;
                self.status = OrderStatus::Pending;
                self.created_at = created_at;
                self.updated_at = created_at;
            }

            Event::PaymentAttached {
                payment_id,
                updated_at,
                ..
            } => {
                self.payment_id = Some(payment_id);
                self.updated_at = updated_at;
            }

            Event::PaymentDetached { updated_at, .. } => {
                self.payment_id = None;
                self.updated_at = updated_at;
            }

            Event::Confirmed { updated_at, .. } => {
                self.status = OrderStatus::Confirmed;
                self.updated_at = updated_at;
            }

            Event::Shipped { updated_at, .. } => {
                self.status = OrderStatus::Shipped;
                self.updated_at = updated_at;
            }

            Event::Cancelled { updated_at, .. } => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = updated_at;
            }
        }
    }
}

impl Order {
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

    fn validate_attached(&self, payment_id: &str) -> Result<(), Error> {
        if self.payment_id.as_deref() != Some(payment_id) {
            return Err(Error::Validation {
                message: "payment is not attached to this order".to_string(),
            });
        }
        Ok(())
    }

    fn invalid_transition(&self, to: OrderStatus) -> Error {
        Error::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}
