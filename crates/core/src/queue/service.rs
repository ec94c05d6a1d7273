//! The queue service: owns the state, serializes mutations, persists snapshots.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use tracing::{debug, error, info, warn};

use super::stats::{minutes_between, QueueStats};
use super::{Counter, QueueError, QueueState, QueueStore, Ticket, TicketFilter, TicketState};
use crate::catalog::ServiceType;
use crate::clock::Clock;
use crate::config::{default_counters, Config};
use crate::metrics;

/// Startup parameters for a [`QueueService`].
#[derive(Debug, Clone)]
pub struct QueueOptions {
    /// Counters restored on first start and by `reset_queue`.
    pub initial_counters: Vec<Counter>,
    /// Branch local time, used for "today" and hourly buckets.
    pub utc_offset: FixedOffset,
}

impl QueueOptions {
    pub fn from_config(config: &Config) -> Result<Self, QueueError> {
        let minutes = config.branch.utc_offset_minutes;
        let utc_offset = FixedOffset::east_opt(minutes * 60)
            .ok_or(QueueError::InvalidOffset(minutes))?;
        Ok(Self {
            initial_counters: config.counters.iter().map(Counter::from).collect(),
            utc_offset,
        })
    }
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            initial_counters: default_counters().iter().map(Counter::from).collect(),
            utc_offset: Utc.fix(),
        }
    }
}

/// Single owner of the branch queue.
///
/// Every mutation takes the lock, runs to completion, and writes the full
/// snapshot to the store before the lock is released. Store failures are
/// logged and counted; the in-memory state stays authoritative until the
/// next successful write.
pub struct QueueService {
    state: Mutex<QueueState>,
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
    options: QueueOptions,
}

impl QueueService {
    /// Load the persisted snapshot and take ownership of the queue.
    ///
    /// Missing entries fall back to their initial values. Statistics from
    /// another day are discarded.
    pub fn open(
        store: Arc<dyn QueueStore>,
        clock: Arc<dyn Clock>,
        options: QueueOptions,
    ) -> Result<Self, QueueError> {
        let stored = store.load()?;
        let today = clock.now().with_timezone(&options.utc_offset).date_naive();

        if stored.is_empty() {
            info!("No saved queue found, starting empty");
        }

        let stats = match stored.stats {
            Some(stats) if stats.is_for(today) => stats,
            Some(stats) => {
                info!(stale_date = %stats.date, %today, "Discarding statistics from another day");
                metrics::STATS_ROLLOVERS.inc();
                QueueStats::new(today)
            }
            None => QueueStats::new(today),
        };

        let state = QueueState {
            tickets: stored.tickets.unwrap_or_default(),
            counters: stored
                .counters
                .unwrap_or_else(|| options.initial_counters.clone()),
            stats,
            sequencer: stored.sequencer.unwrap_or_default(),
        };

        for problem in state.inconsistencies() {
            warn!(%problem, "Saved queue is inconsistent");
        }

        info!(
            tickets = state.tickets.len(),
            waiting = state.waiting_count(None),
            counters = state.counters.len(),
            "Queue loaded"
        );

        Ok(Self {
            state: Mutex::new(state),
            store,
            clock,
            options,
        })
    }

    /// Write the current snapshot, surfacing any store error.
    pub fn flush(&self) -> Result<(), QueueError> {
        let state = self.lock();
        self.store.save(&state)?;
        debug!("Queue snapshot flushed");
        Ok(())
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.options.utc_offset
    }

    /// Current instant in branch local time.
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.options.utc_offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(&self, op: impl FnOnce(&mut QueueState, DateTime<FixedOffset>) -> T) -> T {
        let at = self.now();
        let mut state = self.lock();

        if state.roll_stats(at.date_naive()) {
            info!(today = %at.date_naive(), "New day, statistics reset");
            metrics::STATS_ROLLOVERS.inc();
        }

        let result = op(&mut state, at);
        self.persist(&state);
        result
    }

    fn persist(&self, state: &QueueState) {
        if let Err(e) = self.store.save(state) {
            error!(error = %e, "Failed to persist queue snapshot");
            metrics::SNAPSHOT_SAVE_FAILURES.inc();
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Issue a new ticket for `service_type`.
    pub fn take_ticket(&self, service_type: ServiceType) -> Ticket {
        let ticket = self.mutate(|state, at| state.take_ticket(service_type, at));

        metrics::TICKETS_ISSUED
            .with_label_values(&[service_type.as_str()])
            .inc();
        info!(
            ticket_id = %ticket.id,
            display_code = %ticket.display_code,
            service_type = %service_type,
            "Ticket issued"
        );
        ticket
    }

    /// Call the next waiting ticket to `counter_id`.
    pub fn call_next(&self, counter_id: u32) -> Result<Option<Ticket>, QueueError> {
        let result = self.mutate(|state, at| state.call_next(counter_id, at));

        match &result {
            Ok(Some(ticket)) => {
                metrics::TICKETS_CALLED
                    .with_label_values(&[ticket.service_type.as_str()])
                    .inc();
                info!(
                    counter_id,
                    ticket_id = %ticket.id,
                    display_code = %ticket.display_code,
                    "Ticket called"
                );
            }
            Ok(None) => debug!(counter_id, "Nothing to call"),
            Err(QueueError::CounterBusy { display_code, .. }) => {
                metrics::COUNTER_BUSY_REJECTIONS.inc();
                debug!(counter_id, %display_code, "Call rejected, counter busy");
            }
            Err(e) => warn!(counter_id, error = %e, "Call failed"),
        }
        result
    }

    /// Complete the ticket being served at `counter_id`.
    pub fn complete_service(&self, counter_id: u32) -> Option<Ticket> {
        let ticket = self.mutate(|state, at| state.complete_service(counter_id, at));

        match &ticket {
            Some(ticket) => {
                let service_type = ticket.service_type.as_str();
                metrics::TICKETS_RESOLVED
                    .with_label_values(&[service_type, "completed"])
                    .inc();
                if let TicketState::Completed {
                    called_at,
                    completed_at,
                    ..
                } = ticket.state
                {
                    metrics::WAIT_MINUTES
                        .with_label_values(&[service_type])
                        .observe(minutes_between(ticket.created_at, called_at));
                    metrics::SERVICE_MINUTES
                        .with_label_values(&[service_type])
                        .observe(minutes_between(called_at, completed_at));
                }
                info!(
                    counter_id,
                    ticket_id = %ticket.id,
                    display_code = %ticket.display_code,
                    "Service completed"
                );
            }
            None => debug!(counter_id, "Nothing to complete"),
        }
        ticket
    }

    /// Skip (no-show) the ticket being served at `counter_id`.
    pub fn skip_ticket(&self, counter_id: u32) -> Option<Ticket> {
        let ticket = self.mutate(|state, at| state.skip_ticket(counter_id, at));

        match &ticket {
            Some(ticket) => {
                metrics::TICKETS_RESOLVED
                    .with_label_values(&[ticket.service_type.as_str(), "skipped"])
                    .inc();
                info!(
                    counter_id,
                    ticket_id = %ticket.id,
                    display_code = %ticket.display_code,
                    "Ticket skipped"
                );
            }
            None => debug!(counter_id, "Nothing to skip"),
        }
        ticket
    }

    pub fn set_counter_active(&self, counter_id: u32, active: bool) -> Option<Counter> {
        let counter = self.mutate(|state, _| state.set_counter_active(counter_id, active));
        if counter.is_some() {
            info!(counter_id, active, "Counter availability changed");
        }
        counter
    }

    pub fn set_officer_name(&self, counter_id: u32, name: &str) -> Option<Counter> {
        let counter = self.mutate(|state, _| state.set_officer_name(counter_id, name));
        if let Some(counter) = &counter {
            info!(
                counter_id,
                officer = counter.officer_name.as_deref().unwrap_or(""),
                "Officer name changed"
            );
        }
        counter
    }

    /// Clear every ticket and restore the initial counters. Irreversible.
    ///
    /// Returns the number of tickets dropped.
    pub fn reset_queue(&self) -> usize {
        let counters = self.options.initial_counters.clone();
        let dropped = self.mutate(|state, at| {
            let dropped = state.tickets.len();
            state.reset(counters, at.date_naive());
            dropped
        });
        warn!(dropped_tickets = dropped, "Queue reset");
        dropped
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn waiting_count(&self, service_type: Option<ServiceType>) -> usize {
        self.lock().waiting_count(service_type)
    }

    pub fn current_serving(&self) -> Vec<Ticket> {
        self.lock().current_serving()
    }

    pub fn waiting_tickets(&self, service_type: Option<ServiceType>) -> Vec<Ticket> {
        self.lock().waiting_tickets(service_type)
    }

    pub fn queue_position(&self, ticket_id: &str) -> Option<usize> {
        self.lock().queue_position(ticket_id)
    }

    pub fn tickets(&self, filter: &TicketFilter) -> Vec<Ticket> {
        self.lock().tickets(filter)
    }

    pub fn ticket(&self, ticket_id: &str) -> Option<Ticket> {
        self.lock().ticket(ticket_id).cloned()
    }

    pub fn counter(&self, counter_id: u32) -> Option<Counter> {
        self.lock().counter(counter_id).cloned()
    }

    pub fn counters(&self) -> Vec<Counter> {
        self.lock().counters.clone()
    }

    /// Today's statistics. Figures left over from a previous day read as zero.
    pub fn today_stats(&self) -> QueueStats {
        let today = self.today();
        let state = self.lock();
        if state.stats.is_for(today) {
            state.stats.clone()
        } else {
            QueueStats::new(today)
        }
    }

    /// A consistent copy of the whole queue.
    pub fn snapshot(&self) -> QueueState {
        self.lock().clone()
    }
}
