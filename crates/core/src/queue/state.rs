//! In-memory queue state and its transitions.

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::stats::{minutes_between, QueueStats};
use super::{Counter, QueueError, Ticket, TicketFilter, TicketSequencer, TicketState};
use crate::catalog::{display_code, ServiceType};

/// Everything the queue owns: tickets, counters, today's statistics and
/// the per-service numbering.
///
/// Transitions take the current instant in the branch's local offset so
/// that hourly buckets and day boundaries follow local time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueState {
    /// Tickets in issue order.
    pub tickets: Vec<Ticket>,
    pub counters: Vec<Counter>,
    pub stats: QueueStats,
    pub sequencer: TicketSequencer,
}

/// Outcome of resolving a counter's current ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Completed,
    Skipped,
}

impl QueueState {
    /// Empty queue with the given counters and zeroed statistics for `today`.
    pub fn new(counters: Vec<Counter>, today: NaiveDate) -> Self {
        Self {
            tickets: Vec::new(),
            counters,
            stats: QueueStats::new(today),
            sequencer: TicketSequencer::new(),
        }
    }

    /// Replace the statistics with a fresh day if they belong to another date.
    ///
    /// Returns true if the statistics were discarded.
    pub fn roll_stats(&mut self, today: NaiveDate) -> bool {
        if self.stats.is_for(today) {
            return false;
        }
        self.stats = QueueStats::new(today);
        true
    }

    /// Issue a new waiting ticket for `service_type`.
    pub fn take_ticket(&mut self, service_type: ServiceType, at: DateTime<FixedOffset>) -> Ticket {
        let number = self.sequencer.next_number(service_type);
        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            number,
            display_code: display_code(service_type, number),
            service_type,
            created_at: at.with_timezone(&Utc),
            state: TicketState::Waiting,
        };

        self.stats.record_issued(service_type, at.hour());
        self.tickets.push(ticket.clone());
        ticket
    }

    /// Move the earliest waiting ticket of the counter's service type to serving.
    ///
    /// Returns `Ok(None)` for an unknown or inactive counter, or when nothing
    /// is waiting. A counter that is still serving is rejected.
    pub fn call_next(
        &mut self,
        counter_id: u32,
        at: DateTime<FixedOffset>,
    ) -> Result<Option<Ticket>, QueueError> {
        let Some(counter_idx) = self.counter_index(counter_id) else {
            return Ok(None);
        };
        let counter = &self.counters[counter_idx];
        if !counter.is_active {
            return Ok(None);
        }
        if let Some(current_id) = &counter.current_ticket_id {
            let display_code = self
                .ticket(current_id)
                .map(|t| t.display_code.clone())
                .unwrap_or_else(|| current_id.clone());
            return Err(QueueError::CounterBusy {
                counter_id,
                ticket_id: current_id.clone(),
                display_code,
            });
        }

        let service_type = counter.service_type;
        let next = self
            .tickets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.service_type == service_type && t.is_waiting())
            .min_by_key(|(_, t)| t.created_at)
            .map(|(idx, _)| idx);
        let Some(ticket_idx) = next else {
            return Ok(None);
        };

        let ticket = &mut self.tickets[ticket_idx];
        ticket.state = TicketState::Serving {
            called_at: at.with_timezone(&Utc),
            counter_id,
        };
        self.counters[counter_idx].current_ticket_id = Some(ticket.id.clone());
        Ok(Some(ticket.clone()))
    }

    /// Complete the ticket currently served at `counter_id`.
    pub fn complete_service(
        &mut self,
        counter_id: u32,
        at: DateTime<FixedOffset>,
    ) -> Option<Ticket> {
        self.resolve_current(counter_id, at, Resolution::Completed)
    }

    /// Mark the ticket currently served at `counter_id` as a no-show.
    pub fn skip_ticket(&mut self, counter_id: u32, at: DateTime<FixedOffset>) -> Option<Ticket> {
        self.resolve_current(counter_id, at, Resolution::Skipped)
    }

    fn resolve_current(
        &mut self,
        counter_id: u32,
        at: DateTime<FixedOffset>,
        resolution: Resolution,
    ) -> Option<Ticket> {
        let counter_idx = self.counter_index(counter_id)?;
        let current_id = self.counters[counter_idx].current_ticket_id.clone()?;

        let serving = self.tickets.iter().position(|t| t.id == current_id);
        let (ticket_idx, called_at) = match serving.map(|idx| (idx, &self.tickets[idx].state)) {
            Some((idx, TicketState::Serving { called_at, .. })) => (idx, *called_at),
            _ => {
                warn!(
                    counter_id,
                    ticket_id = %current_id,
                    "Counter references a ticket that is not being served, clearing slot"
                );
                self.counters[counter_idx].current_ticket_id = None;
                return None;
            }
        };

        let now = at.with_timezone(&Utc);
        let ticket = &mut self.tickets[ticket_idx];
        match resolution {
            Resolution::Completed => {
                let wait = minutes_between(ticket.created_at, called_at);
                let service = minutes_between(called_at, now);
                ticket.state = TicketState::Completed {
                    called_at,
                    counter_id,
                    completed_at: now,
                };
                self.stats.record_completed(ticket.service_type, wait, service);
            }
            Resolution::Skipped => {
                ticket.state = TicketState::Skipped {
                    called_at,
                    counter_id,
                    skipped_at: now,
                };
                self.stats.record_skipped(ticket.service_type);
            }
        }

        let resolved = ticket.clone();
        self.counters[counter_idx].current_ticket_id = None;
        Some(resolved)
    }

    /// Set whether a counter may call tickets. Its current ticket is unaffected.
    pub fn set_counter_active(&mut self, counter_id: u32, active: bool) -> Option<Counter> {
        let counter = self.counter_mut(counter_id)?;
        counter.is_active = active;
        Some(counter.clone())
    }

    /// Label a counter with the officer on duty. A blank name clears the label.
    pub fn set_officer_name(&mut self, counter_id: u32, name: &str) -> Option<Counter> {
        let counter = self.counter_mut(counter_id)?;
        let name = name.trim();
        counter.officer_name = (!name.is_empty()).then(|| name.to_string());
        Some(counter.clone())
    }

    /// Drop every ticket, restore `counters`, and zero statistics and numbering.
    pub fn reset(&mut self, counters: Vec<Counter>, today: NaiveDate) {
        *self = Self::new(counters, today);
    }

    pub fn ticket(&self, id: &str) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn counter(&self, id: u32) -> Option<&Counter> {
        self.counters.iter().find(|c| c.id == id)
    }

    fn counter_index(&self, id: u32) -> Option<usize> {
        self.counters.iter().position(|c| c.id == id)
    }

    fn counter_mut(&mut self, id: u32) -> Option<&mut Counter> {
        self.counters.iter_mut().find(|c| c.id == id)
    }

    /// Number of waiting tickets, optionally for one service type.
    pub fn waiting_count(&self, service_type: Option<ServiceType>) -> usize {
        self.tickets
            .iter()
            .filter(|t| t.is_waiting())
            .filter(|t| service_type.is_none_or(|s| t.service_type == s))
            .count()
    }

    /// Tickets currently being served at any counter.
    pub fn current_serving(&self) -> Vec<Ticket> {
        self.tickets.iter().filter(|t| t.is_serving()).cloned().collect()
    }

    /// Waiting tickets, earliest first, optionally for one service type.
    pub fn waiting_tickets(&self, service_type: Option<ServiceType>) -> Vec<Ticket> {
        let mut waiting: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|t| t.is_waiting())
            .filter(|t| service_type.is_none_or(|s| t.service_type == s))
            .cloned()
            .collect();
        // Stable, so equal timestamps keep issue order.
        waiting.sort_by_key(|t| t.created_at);
        waiting
    }

    /// 1-based position of a waiting ticket within its service queue.
    pub fn queue_position(&self, ticket_id: &str) -> Option<usize> {
        let ticket = self.ticket(ticket_id).filter(|t| t.is_waiting())?;
        self.waiting_tickets(Some(ticket.service_type))
            .iter()
            .position(|t| t.id == ticket.id)
            .map(|idx| idx + 1)
    }

    /// All tickets matching `filter`, in issue order.
    pub fn tickets(&self, filter: &TicketFilter) -> Vec<Ticket> {
        self.tickets
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Describe every disagreement between counter slots and serving tickets.
    pub fn inconsistencies(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for counter in &self.counters {
            let Some(ticket_id) = &counter.current_ticket_id else {
                continue;
            };
            match self.ticket(ticket_id) {
                None => problems.push(format!(
                    "counter {} references unknown ticket {}",
                    counter.id, ticket_id
                )),
                Some(ticket)
                    if !ticket.is_serving() || ticket.state.counter_id() != Some(counter.id) =>
                {
                    problems.push(format!(
                        "counter {} references ticket {} which is {}",
                        counter.id,
                        ticket.display_code,
                        ticket.status()
                    ))
                }
                Some(_) => {}
            }
        }

        for ticket in self.tickets.iter().filter(|t| t.is_serving()) {
            let held = ticket
                .state
                .counter_id()
                .and_then(|id| self.counter(id))
                .is_some_and(|c| c.current_ticket_id.as_deref() == Some(ticket.id.as_str()));
            if !held {
                problems.push(format!(
                    "ticket {} is serving but no counter holds it",
                    ticket.display_code
                ));
            }
        }

        problems
    }
}
