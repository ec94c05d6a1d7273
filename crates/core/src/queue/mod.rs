//! Branch queue: tickets, counters, daily statistics and their persistence.

mod sequencer;
mod service;
mod sqlite_store;
mod state;
mod stats;
mod store;
mod types;

pub use sequencer::TicketSequencer;
pub use service::{QueueOptions, QueueService};
pub use sqlite_store::SqliteQueueStore;
pub use state::QueueState;
pub use stats::{minutes_between, running_mean, HourlyCount, QueueStats, ServiceStats};
pub use store::{QueueError, QueueStore, StoredQueue};
pub use types::{Counter, Ticket, TicketFilter, TicketState, TicketStatus};
