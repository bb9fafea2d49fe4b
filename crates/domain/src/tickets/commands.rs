use serde::{Deserialize, Serialize};

use super::aggregate::{TicketPriority, TicketStatus};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Open a ticket on behalf of a customer
    Open {
        id: String,
        customer_id: String,
        subject: String,
        description: String,
        priority: TicketPriority,
    },

    /// Hand the ticket to a staff member
    Assign { staff_id: String },

    /// Move the ticket to any status; same-status changes are a no-op
    SetStatus { status: TicketStatus },

    /// Record a staff reply
    AddResponse { staff_id: String, response: String },
}
