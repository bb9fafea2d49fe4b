//! Pharmacy Workflow Domain Models

/// Order aggregate
pub mod orders;

/// Payment aggregate
pub mod payments;

/// Prescription aggregate
pub mod prescriptions;

/// Product aggregate
pub mod products;

/// Support ticket aggregate
pub mod tickets;

/// Domain errors
pub mod errors;

/// Caller identity and roles
pub mod identity;

pub use errors::Error;
pub use identity::{Identity, Role};
