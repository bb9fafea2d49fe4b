use serde::{Deserialize, Serialize};

use super::aggregate::FileMeta;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Record an uploaded prescription document for review
    Upload {
        id: String,
        customer_id: String,
        file: FileMeta,
    },

    /// Approve a pending prescription
    Approve { reviewer_id: String },

    /// Reject a pending prescription with a reason
    Reject { reviewer_id: String, reason: String },
}
