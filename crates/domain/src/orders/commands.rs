use serde::{Deserialize, Serialize};

use super::aggregate::LineItem;

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Place a new order; stock for the lines is reserved by the caller
    Create {
        id: String,
        customer_id: String,
        items: Vec<LineItem>,
        requires_prescription: bool,
    },

    /// Record the single active payment for this order
    AttachPayment { payment_id: String },

    /// Release a payment that failed, allowing a new attempt
    DetachPayment { payment_id: String },

    /// Confirm after the attached payment completed
    Confirm { payment_id: String },

    /// Dispatch a confirmed order
    Ship,

    /// Cancel an order that has not shipped yet
    Cancel,
}
