/// Support ticket aggregate
pub mod aggregate;

/// Commands
pub mod commands;

/// Events
pub mod events;

/// View (read model)
pub mod view;

pub use aggregate::{Services, SupportTicket, TicketPriority, TicketStatus, AGGREGATE_TYPE};
pub use commands::Command;
pub use events::Event;
pub use view::{Query, View};
