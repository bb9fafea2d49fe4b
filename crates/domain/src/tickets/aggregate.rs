use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;

use super::{Command, Event};

/// Support ticket status. Deliberately permissive: staff may move a ticket
/// between any two states, including reopening a resolved one.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Open => "open",
            Self::InProgress => "in progress",
            Self::Resolved => "resolved",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Support ticket aggregate
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct SupportTicket {
    pub id: String,
    pub customer_id: String,
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub assigned_to: Option<String>,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const AGGREGATE_TYPE: &str = "SupportTicket";

#[derive(Clone, Default)]
pub struct Services {}

#[async_trait]
impl Aggregate for SupportTicket {
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
        _services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            Command::Open {
                id,
                customer_id,
                subject,
                description,
                priority,
            } => {
                self.validate_new()?;
                if subject.is_empty() {
                    return Err(Error::Validation {
                        message: "ticket subject must not be empty".to_string(),
                    });
                }
                if description.is_empty() {
                    return Err(Error::Validation {
                        message: "ticket description must not be empty".to_string(),
                    });
                }

                Ok(vec![Event::Opened {
                    id,
                    customer_id,
                    subject,
                    description,
                    priority,
                    created_at: Utc::now(),
                }])
            }

            Command::Assign { staff_id } => {
                self.validate_existing()?;

                Ok(vec![Event::Assigned {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    staff_id,
                    updated_at: Utc::now(),
                }])
            }

            Command::SetStatus { status } => {
                self.validate_existing()?;
                if status == self.status {
                    return Ok(vec![]);
                }

                Ok(vec![Event::StatusChanged {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    status,
                    updated_at: Utc::now(),
                }])
            }

            Command::AddResponse { staff_id, response } => {
                self.validate_existing()?;
                if response.is_empty() {
                    return Err(Error::Validation {
                        message: "ticket response must not be empty".to_string(),
                    });
                }

                Ok(vec![Event::ResponseAdded {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    staff_id,
                    response,
                    updated_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::Opened {
                id,
                customer_id,
                subject,
                description,
                priority,
                created_at,
            } => {
                self.id = id;
                self.customer_id = customer_id;
                self.subject = subject;
                self.description = description;
                self.priority = priority;
                self.status = TicketStatus::Open;
                self.created_at = created_at;
                self.updated_at = created_at;
            }

            Event::Assigned {
                staff_id,
                updated_at,
                ..
            } => {
                self.assigned_to = Some(staff_id);
                self.updated_at = updated_at;
            }

            Event::StatusChanged {
                status, updated_at, ..
            } => {
                self.status = status;
                self.updated_at = updated_at;
            }

            Event::ResponseAdded {
                response,
                updated_at,
                ..
            } => {
                self.response = Some(response);
                self.updated_at = updated_at;
            }
        }
    }
}

impl SupportTicket {
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
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cqrs_es::test::TestFramework;

    use super::{Services, SupportTicket, TicketPriority, TicketStatus};
    use crate::tickets::{Command, Event};

    type TicketTester = TestFramework<SupportTicket>;

    fn opened() -> Event {
        Event::Opened {
            id: "ticket-1".to_string(),
            customer_id: "cust-1".to_string(),
            subject: "Late delivery".to_string(),
            description: "Order has not arrived".to_string(),
            priority: TicketPriority::Medium,
            created_at: Utc::now(),
        }
    }

    fn resolved() -> Event {
        Event::StatusChanged {
            id: "ticket-1".to_string(),
            customer_id: "cust-1".to_string(),
            status: TicketStatus::Resolved,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn open_starts_in_the_open_status() {
        let events = TicketTester::with(Services::default())
            .given_no_previous_events()
            .when(Command::Open {
                id: "ticket-1".to_string(),
                customer_id: "cust-1".to_string(),
                subject: "Late delivery".to_string(),
                description: "Order has not arrived".to_string(),
                priority: TicketPriority::Medium,
            })
            .inspect_result()
            .expect("open should succeed");

        assert!(matches!(&events[0], Event::Opened { .. }));
    }

    #[test]
    fn open_without_a_subject_is_rejected() {
        TicketTester::with(Services::default())
            .given_no_previous_events()
            .when(Command::Open {
                id: "ticket-1".to_string(),
                customer_id: "cust-1".to_string(),
                subject: "".to_string(),
                description: "Order has not arrived".to_string(),
                priority: TicketPriority::Medium,
            })
            .then_expect_error_message("ticket subject must not be empty");
    }

    #[test]
    fn resolved_ticket_can_reopen() {
        let events = TicketTester::with(Services::default())
            .given(vec![opened(), resolved()])
            .when(Command::SetStatus {
                status: TicketStatus::Open,
            })
            .inspect_result()
            .expect("reopen should succeed");

        assert!(matches!(
            &events[0],
            Event::StatusChanged {
                status: TicketStatus::Open,
                ..
            }
        ));
    }

    #[test]
    fn same_status_change_emits_nothing() {
        let events = TicketTester::with(Services::default())
            .given(vec![opened()])
            .when(Command::SetStatus {
                status: TicketStatus::Open,
            })
            .inspect_result()
            .expect("no-op change should succeed");

        assert!(events.is_empty());
    }

    #[test]
    fn response_is_kept_on_the_ticket() {
        use cqrs_es::Aggregate;
        let mut ticket = SupportTicket::default();
        ticket.apply(opened());
        ticket.apply(Event::ResponseAdded {
            id: "ticket-1".to_string(),
            customer_id: "cust-1".to_string(),
            staff_id: "pharm-1".to_string(),
            response: "We are looking into it".to_string(),
            updated_at: Utc::now(),
        });
        assert_eq!(ticket.response.as_deref(), Some("We are looking into it"));
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[test]
    fn responding_to_an_unknown_ticket_is_rejected() {
        TicketTester::with(Services::default())
            .given_no_previous_events()
            .when(Command::AddResponse {
                staff_id: "pharm-1".to_string(),
                response: "We are looking into it".to_string(),
            })
            .then_expect_error_message("SupportTicket not found");
    }
}
