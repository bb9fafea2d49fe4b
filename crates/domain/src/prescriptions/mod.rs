/// Prescription aggregate
pub mod aggregate;

/// Commands
pub mod commands;

/// Events
pub mod events;

/// View (read model)
pub mod view;

pub use aggregate::{FileMeta, Prescription, PrescriptionStatus, Services, AGGREGATE_TYPE};
pub use commands::Command;
pub use events::Event;
pub use view::{Query, View};
