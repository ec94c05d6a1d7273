//! Queue persistence trait and errors.

use thiserror::Error;

use super::{Counter, QueueState, QueueStats, Ticket, TicketSequencer};

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The counter is still serving a ticket and must complete or skip it first.
    #[error("Counter {counter_id} is still serving ticket {display_code}")]
    CounterBusy {
        counter_id: u32,
        ticket_id: String,
        display_code: String,
    },

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A persisted entry could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The configured branch offset is not a valid UTC offset.
    #[error("Invalid UTC offset: {0} minutes")]
    InvalidOffset(i32),
}

/// Snapshot as read back from a store.
///
/// Each collection is persisted as its own entry; an entry that was never
/// written comes back as `None` and the caller substitutes the initial value.
#[derive(Debug, Clone, Default)]
pub struct StoredQueue {
    pub tickets: Option<Vec<Ticket>>,
    pub counters: Option<Vec<Counter>>,
    pub stats: Option<QueueStats>,
    pub sequencer: Option<TicketSequencer>,
}

impl StoredQueue {
    pub fn is_empty(&self) -> bool {
        self.tickets.is_none()
            && self.counters.is_none()
            && self.stats.is_none()
            && self.sequencer.is_none()
    }
}

/// Trait for queue snapshot storage backends.
///
/// Implementations must write all four collections atomically: a reader
/// never observes tickets from one save and counters from another.
pub trait QueueStore: Send + Sync {
    /// Read the last saved snapshot.
    fn load(&self) -> Result<StoredQueue, QueueError>;

    /// Replace the stored snapshot with `state`.
    fn save(&self, state: &QueueState) -> Result<(), QueueError>;
}
