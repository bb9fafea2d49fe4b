use thiserror::Error;

/// Failure taxonomy shared by every workflow operation. Rejected commands
/// surface one of these and leave no partial state behind.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("{entity} already exists")]
    AlreadyExists { entity: String },

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    #[error("customer {customer_id} has no approved prescription on file")]
    PrescriptionRequired { customer_id: String },

    #[error("role {role} is not permitted to {action}")]
    Unauthorized { role: String, action: String },

    #[error("concurrent modification of {entity}")]
    Conflict { entity: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("storage error: {message}")]
    Storage { message: String },
}
