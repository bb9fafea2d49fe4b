use chrono::{DateTime, Utc};
use cqrs_es::DomainEvent;
use serde::{Deserialize, Serialize};

use super::aggregate::FileMeta;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(tag = "type")]
pub enum Event {
    Uploaded {
        id: String,
        customer_id: String,
        file: FileMeta,
        created_at: DateTime<Utc>,
    },

    Approved {
        id: String,
        customer_id: String,
        reviewer_id: String,
        reviewed_at: DateTime<Utc>,
    },

    Rejected {
        id: String,
        customer_id: String,
        reviewer_id: String,
        reason: String,
        reviewed_at: DateTime<Utc>,
    },
}

impl DomainEvent for Event {
    fn event_type(&self) -> String {
        match self {
            Event::Uploaded { .. } => "Prescription:Uploaded".to_string(),
            Event::Approved { .. } => "Prescription:Approved".to_string(),
            Event::Rejected { .. } => "Prescription:Rejected".to_string(),
        }
    }

    fn event_version(&self) -> String {
        "1.0".to_string()
    }
}
