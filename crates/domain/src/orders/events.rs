use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use super::aggregate::LineItem;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    Created {
        id: String,
        customer_id: String,
        items: Vec<LineItem>,
        total_cents: u64,
        requires_prescription: bool,
        created_at: DateTime<Utc>,
    },

    PaymentAttached {
        id: String,
        payment_id: String,
        updated_at: DateTime<Utc>,
    },

    PaymentDetached {
        id: String,
        payment_id: String,
        updated_at: DateTime<Utc>,
    },

    Confirmed {
        id: String,
        customer_id: String,
        payment_id: String,
        updated_at: DateTime<Utc>,
    },

    Shipped {
        id: String,
        customer_id: String,
        updated_at: DateTime<Utc>,
    },

    Cancelled {
        id: String,
        customer_id: String,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::Created { .. } => "Order:Created".to_string(),
            Event::PaymentAttached { .. } => "Order:PaymentAttached".to_string(),
            Event::PaymentDetached { .. } => "Order:PaymentDetached".to_string(),
            Event::Confirmed { .. } => "Order:Confirmed".to_string(),
            Event::Shipped { .. } => "Order:Shipped".to_string(),
            Event::Cancelled { .. } => "Order:Cancelled".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
