/// Payment aggregate
pub mod aggregate;

/// Commands
pub mod commands;

/// Events
pub mod events;

/// Collaborating services
pub mod services;

/// View (read model)
pub mod view;

pub use aggregate::{Payment, PaymentStatus, AGGREGATE_TYPE};
pub use commands::Command;
pub use events::Event;
pub use services::{MockPaymentGateway, PaymentGateway, Services};
pub use view::{Query, View};
