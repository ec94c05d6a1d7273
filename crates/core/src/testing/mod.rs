//! Testing utilities: in-memory store, controllable clock, fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use queue_buddy_core::testing::{ManualClock, MemoryQueueStore};
//!
//! let store = Arc::new(MemoryQueueStore::new());
//! let clock = Arc::new(ManualClock::new(Utc::now()));
//! let service = QueueService::open(store.clone(), clock.clone(), QueueOptions::default())?;
//!
//! service.take_ticket(ServiceType::Teller);
//! clock.advance(Duration::minutes(3));
//! service.call_next(1)?;
//!
//! assert_eq!(store.save_count(), 2);
//! ```

mod manual_clock;
mod memory_store;

pub use manual_clock::ManualClock;
pub use memory_store::MemoryQueueStore;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};

    use super::{ManualClock, MemoryQueueStore};
    use crate::config::{load_config_from_str, Config};
    use crate::queue::{QueueOptions, QueueService};

    /// 09:00 UTC on a fixed weekday.
    pub fn opening_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    /// Minimal valid configuration with authentication disabled.
    pub fn test_config() -> Config {
        load_config_from_str(
            r#"
[auth]
method = "none"
"#,
        )
        .unwrap()
    }

    /// A queue service over an in-memory store with the default counters,
    /// starting at [`opening_time`].
    pub fn queue_service() -> (Arc<QueueService>, Arc<MemoryQueueStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryQueueStore::new());
        let clock = Arc::new(ManualClock::new(opening_time()));
        let service =
            QueueService::open(store.clone(), clock.clone(), QueueOptions::default()).unwrap();
        (Arc::new(service), store, clock)
    }
}
