use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;

use super::{Command, Event};

/// Prescription review status
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    /// Initial state - uploaded, awaiting pharmacist review
    Pending,
    /// Cleared for prescription-only purchases
    Approved,
    /// Review failed; a new upload is required
    Rejected,
}

impl Default for PrescriptionStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Metadata of the uploaded document. The binary itself lives in object
/// storage and is out of scope here.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct FileMeta {
    pub file_name: String,
    pub file_type: String,
    pub doctor_name: Option<String>,
    pub notes: Option<String>,
}

/// Prescription aggregate. Approved and rejected are terminal, so every
/// prescription is reviewed exactly once.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub customer_id: String,
    pub file: FileMeta,
    pub status: PrescriptionStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const AGGREGATE_TYPE: &str = "Prescription";

#[derive(Clone, Default)]
pub struct Services {}

#[async_trait]
impl Aggregate for Prescription {
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
            Command::Upload { id, customer_id, file } => {
                self.validate_new()?;
                if file.file_name.is_empty() {
                    return Err(Error::Validation {
                        message: "prescription file name must not be empty".to_string(),
                    });
                }

                Ok(vec![Event::Uploaded {
                    id,
                    customer_id,
                    file,
                    created_at: Utc::now(),
                }])
            }

            Command::Approve { reviewer_id } => {
                self.validate_existing()?;
                self.validate_pending(PrescriptionStatus::Approved)?;

                Ok(vec![Event::Approved {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    reviewer_id,
                    reviewed_at: Utc::now(),
                }])
            }

            Command::Reject { reviewer_id, reason } => {
                self.validate_existing()?;
                self.validate_pending(PrescriptionStatus::Rejected)?;

                Ok(vec![Event::Rejected {
                    id: self.id.clone(),
                    customer_id: self.customer_id.clone(),
                    reviewer_id,
                    reason,
                    reviewed_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::Uploaded {
                id,
                customer_id,
                file,
                created_at,
            } => {
                self.id = id;
                self.customer_id = customer_id;
                self.file = file;
                self.status = PrescriptionStatus::Pending;
                self.created_at = created_at;
                self.updated_at = created_at;
            }

            Event::Approved {
                reviewer_id,
                reviewed_at,
                ..
            } => {
                self.status = PrescriptionStatus::Approved;
                self.reviewed_by = Some(reviewer_id);
                self.reviewed_at = Some(reviewed_at);
                self.updated_at = reviewed_at;
            }

            Event::Rejected {
                reviewer_id,
                reason,
                reviewed_at,
                ..
            } => {
                self.status = PrescriptionStatus::Rejected;
                self.reviewed_by = Some(reviewer_id);
                self.reviewed_at = Some(reviewed_at);
                self.rejection_reason = Some(reason);
                self.updated_at = reviewed_at;
            }
        }
    }
}

impl Prescription {
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

    fn validate_pending(&self, to: PrescriptionStatus) -> Result<(), Error> {
        if self.status != PrescriptionStatus::Pending {
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
    use chrono::Utc;
    use cqrs_es::test::TestFramework;

    use super::{FileMeta, Prescription, PrescriptionStatus, Services};
    use crate::prescriptions::{Command, Event};

    type PrescriptionTester = TestFramework<Prescription>;

    fn file() -> FileMeta {
        FileMeta {
            file_name: "rx-scan.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            doctor_name: Some("Dr. Osei".to_string()),
            notes: None,
        }
    }

    fn uploaded() -> Event {
        Event::Uploaded {
            id: "rx-1".to_string(),
            customer_id: "cust-1".to_string(),
            file: file(),
            created_at: Utc::now(),
        }
    }

    fn approved() -> Event {
        Event::Approved {
            id: "rx-1".to_string(),
            customer_id: "cust-1".to_string(),
            reviewer_id: "pharm-1".to_string(),
            reviewed_at: Utc::now(),
        }
    }

    #[test]
    fn upload_starts_pending() {
        let events = PrescriptionTester::with(Services::default())
            .given_no_previous_events()
            .when(Command::Upload {
                id: "rx-1".to_string(),
                customer_id: "cust-1".to_string(),
                file: file(),
            })
            .inspect_result()
            .expect("upload should succeed");

        assert!(matches!(&events[0], Event::Uploaded { .. }));

        let mut prescription = Prescription::default();
        use cqrs_es::Aggregate;
        prescription.apply(events.into_iter().next().unwrap());
        assert_eq!(prescription.status, PrescriptionStatus::Pending);
    }

    #[test]
    fn upload_without_file_name_is_rejected() {
        PrescriptionTester::with(Services::default())
            .given_no_previous_events()
            .when(Command::Upload {
                id: "rx-1".to_string(),
                customer_id: "cust-1".to_string(),
                file: FileMeta::default(),
            })
            .then_expect_error_message("prescription file name must not be empty");
    }

    #[test]
    fn approve_records_the_reviewer() {
        let events = PrescriptionTester::with(Services::default())
            .given(vec![uploaded()])
            .when(Command::Approve {
                reviewer_id: "pharm-1".to_string(),
            })
            .inspect_result()
            .expect("approve should succeed");

        assert!(matches!(
            &events[0],
            Event::Approved { reviewer_id, .. } if reviewer_id == "pharm-1"
        ));
    }

    #[test]
    fn approve_after_approval_is_rejected() {
        PrescriptionTester::with(Services::default())
            .given(vec![uploaded(), approved()])
            .when(Command::Approve {
                reviewer_id: "pharm-2".to_string(),
            })
            .then_expect_error_message("invalid state transition from approved to approved");
    }

    #[test]
    fn reject_after_approval_is_rejected() {
        PrescriptionTester::with(Services::default())
            .given(vec![uploaded(), approved()])
            .when(Command::Reject {
                reviewer_id: "pharm-2".to_string(),
                reason: "illegible".to_string(),
            })
            .then_expect_error_message("invalid state transition from approved to rejected");
    }

    #[test]
    fn reject_keeps_the_reason() {
        let events = PrescriptionTester::with(Services::default())
            .given(vec![uploaded()])
            .when(Command::Reject {
                reviewer_id: "pharm-1".to_string(),
                reason: "No reason provided".to_string(),
            })
            .inspect_result()
            .expect("reject should succeed");

        assert!(matches!(
            &events[0],
            Event::Rejected { reason, .. } if reason == "No reason provided"
        ));
    }
}
