//! Pharmacy Workflow Engine
//!
//! Command-side services over the domain aggregates, an in-memory event
//! store with optimistic concurrency, per-aggregate read models, and
//! notification fan-out running behind the commits.

/// Wiring facade
pub mod app;

/// Framework glue (type aliases, command execution, error mapping)
pub mod cqrs;

/// Event store
pub mod store;

/// View repositories
pub mod views;

/// Notification sink and read model
pub mod notifications;

/// Event-to-notification emitters
pub mod notifiers;

/// Inventory ledger service
pub mod inventory;

/// Order workflow service
pub mod orders;

/// Payment workflow service
pub mod payments;

/// Prescription workflow service
pub mod prescriptions;

/// Support ticket workflow service
pub mod tickets;

pub use app::App;
