//! Core queue data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ServiceType;
use crate::config::CounterConfig;

/// Lifecycle state of a ticket.
///
/// Each variant carries only the timestamps that are valid for it, so a
/// waiting ticket can never have a call time and a resolved ticket always
/// knows which counter served it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TicketState {
    /// In the queue, not yet called.
    Waiting,

    /// Called to a counter and currently being served.
    Serving {
        called_at: DateTime<Utc>,
        counter_id: u32,
    },

    /// Service finished.
    Completed {
        called_at: DateTime<Utc>,
        counter_id: u32,
        completed_at: DateTime<Utc>,
    },

    /// Called but the customer did not show up.
    Skipped {
        called_at: DateTime<Utc>,
        counter_id: u32,
        skipped_at: DateTime<Utc>,
    },
}

impl TicketState {
    /// Returns the flat status of this state.
    pub fn status(&self) -> TicketStatus {
        match self {
            TicketState::Waiting => TicketStatus::Waiting,
            TicketState::Serving { .. } => TicketStatus::Serving,
            TicketState::Completed { .. } => TicketStatus::Completed,
            TicketState::Skipped { .. } => TicketStatus::Skipped,
        }
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TicketState::Completed { .. } | TicketState::Skipped { .. }
        )
    }

    /// When the ticket was called, if it has been.
    pub fn called_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TicketState::Waiting => None,
            TicketState::Serving { called_at, .. }
            | TicketState::Completed { called_at, .. }
            | TicketState::Skipped { called_at, .. } => Some(*called_at),
        }
    }

    /// The counter that called the ticket, if any.
    pub fn counter_id(&self) -> Option<u32> {
        match self {
            TicketState::Waiting => None,
            TicketState::Serving { counter_id, .. }
            | TicketState::Completed { counter_id, .. }
            | TicketState::Skipped { counter_id, .. } => Some(*counter_id),
        }
    }

    /// When the ticket reached a terminal state.
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TicketState::Completed { completed_at, .. } => Some(*completed_at),
            TicketState::Skipped { skipped_at, .. } => Some(*skipped_at),
            _ => None,
        }
    }
}

/// Flat ticket status, used for filtering and display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Waiting,
    Serving,
    Completed,
    Skipped,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Waiting,
        TicketStatus::Serving,
        TicketStatus::Completed,
        TicketStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Waiting => "waiting",
            TicketStatus::Serving => "serving",
            TicketStatus::Completed => "completed",
            TicketStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown ticket status: {}", s))
    }
}

/// A customer's place in one service queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Unique identifier (UUID).
    pub id: String,
    /// Sequence number within the service type, starting at 1.
    pub number: u32,
    /// Human-facing label, e.g. "A001".
    pub display_code: String,
    pub service_type: ServiceType,
    pub created_at: DateTime<Utc>,
    pub state: TicketState,
}

impl Ticket {
    pub fn status(&self) -> TicketStatus {
        self.state.status()
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self.state, TicketState::Waiting)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self.state, TicketState::Serving { .. })
    }
}

/// A service point that calls tickets of one fixed service type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Counter {
    pub id: u32,
    pub name: String,
    pub service_type: ServiceType,
    pub is_active: bool,
    /// Ticket currently being served here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ticket_id: Option<String>,
    /// Free-text label for the officer on duty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officer_name: Option<String>,
}

impl From<&CounterConfig> for Counter {
    fn from(config: &CounterConfig) -> Self {
        Self {
            id: config.id,
            name: config.name.clone(),
            service_type: config.service_type,
            is_active: config.active,
            current_ticket_id: None,
            officer_name: None,
        }
    }
}

/// Filter for listing tickets.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by status.
    pub status: Option<TicketStatus>,
    /// Filter by service type.
    pub service_type: Option<ServiceType>,
}

impl TicketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = Some(service_type);
        self
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.status.is_none_or(|status| ticket.status() == status)
            && self
                .service_type
                .is_none_or(|service_type| ticket.service_type == service_type)
    }
}
