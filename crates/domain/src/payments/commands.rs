use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub enum Command {
    /// Open a pending payment for an order
    Initiate {
        id: String,
        order_id: String,
        customer_id: String,
        amount_cents: u64,
        method: String,
        transaction_id: String,
    },

    /// Settle against the gateway; completes or fails the payment
    Verify { transaction_id: String },

    /// Fail a pending payment without consulting the gateway
    MarkFailed { reason: String },

    /// Return a completed payment to the customer
    Refund { reason: String },
}
