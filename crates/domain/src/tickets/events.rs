use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use super::aggregate::{TicketPriority, TicketStatus};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    Opened {
        id: String,
        customer_id: String,
        subject: String,
        description: String,
        priority: TicketPriority,
        created_at: DateTime<Utc>,
    },

    Assigned {
        id: String,
        customer_id: String,
        staff_id: String,
        updated_at: DateTime<Utc>,
    },

    StatusChanged {
        id: String,
        customer_id: String,
        status: TicketStatus,
        updated_at: DateTime<Utc>,
    },

    ResponseAdded {
        id: String,
        customer_id: String,
        staff_id: String,
        response: String,
        updated_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::Opened { .. } => "SupportTicket:Opened".to_string(),
            Event::Assigned { .. } => "SupportTicket:Assigned".to_string(),
            Event::StatusChanged { .. } => "SupportTicket:StatusChanged".to_string(),
            Event::ResponseAdded { .. } => "SupportTicket:ResponseAdded".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
