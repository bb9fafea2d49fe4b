use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    Initiated {
        id: String,
        order_id: String,
        customer_id: String,
        amount_cents: u64,
        method: String,
        transaction_id: String,
        created_at: DateTime<Utc>,
    },

    /// The gateway confirmed the transaction; carries the external reference
    /// that replaces the provisional one from initiation.
    Completed {
        id: String,
        order_id: String,
        customer_id: String,
        transaction_id: String,
        completed_at: DateTime<Utc>,
    },

    Failed {
        id: String,
        order_id: String,
        customer_id: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },

    Refunded {
        id: String,
        order_id: String,
        customer_id: String,
        amount_cents: u64,
        reason: String,
        refunded_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::Initiated { .. } => "Payment:Initiated".to_string(),
            Event::Completed { .. } => "Payment:Completed".to_string(),
            Event::Failed { .. } => "Payment:Failed".to_string(),
            Event::Refunded { .. } => "Payment:Refunded".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = Event::Completed {
            id: "pay-1".to_string(),
            order_id: "order-1".to_string(),
            customer_id: "cust-1".to_string(),
            transaction_id: "TXN-ABC".to_string(),
            completed_at: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "Completed");
        assert_eq!(value["transaction_id"], "TXN-ABC");
        assert_eq!(event.event_type(), "Payment:Completed");
    }
}
