use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use super::aggregate::StockOperation;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    Created {
        id: String,
        name: String,
        price_cents: u64,
        stock_quantity: u32,
        prescription_required: bool,
        created_at: DateTime<Utc>,
    },

    /// Carries the resulting quantity so the ledger never has to replay
    /// deltas to know the current level.
    StockAdjusted {
        id: String,
        operation: StockOperation,
        quantity: u32,
        stock_quantity: u32,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::Created { .. } => "Product:Created".to_string(),
            Event::StockAdjusted { .. } => "Product:StockAdjusted".to_string(),
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
        let event = Event::StockAdjusted {
            id: "prod-1".to_string(),
            operation: StockOperation::Subtract,
            quantity: 2,
            stock_quantity: 3,
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "StockAdjusted");
        assert_eq!(value["operation"], "SUBTRACT");
        assert_eq!(event.event_type(), "Product:StockAdjusted");
        assert_eq!(event.event_version(), "1.0");
    }
}
