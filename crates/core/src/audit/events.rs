use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ServiceType;

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Ticket lifecycle
    TicketIssued {
        ticket_id: String,
        display_code: String,
        service_type: ServiceType,
    },
    TicketCalled {
        ticket_id: String,
        display_code: String,
        counter_id: u32,
        called_by: String,
    },
    TicketCompleted {
        ticket_id: String,
        display_code: String,
        counter_id: u32,
        completed_by: String,
        wait_minutes: f64,
        service_minutes: f64,
    },
    TicketSkipped {
        ticket_id: String,
        display_code: String,
        counter_id: u32,
        skipped_by: String,
    },

    // Counters
    CounterActiveChanged {
        counter_id: u32,
        is_active: bool,
        changed_by: String,
    },
    OfficerNameChanged {
        counter_id: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        officer_name: Option<String>,
        changed_by: String,
    },

    /// Every ticket was dropped and counters restored.
    QueueReset {
        reset_by: String,
        dropped_tickets: usize,
    },

    // User directory
    UserCreated {
        target_user_id: String,
        email: String,
        created_by: String,
    },
    UserDeleted {
        target_user_id: String,
        deleted_by: String,
    },
    AdminRoleGranted {
        target_user_id: String,
        granted_by: String,
    },
    AdminRoleRevoked {
        target_user_id: String,
        revoked_by: String,
    },
}

impl AuditEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketIssued { .. } => "ticket_issued",
            Self::TicketCalled { .. } => "ticket_called",
            Self::TicketCompleted { .. } => "ticket_completed",
            Self::TicketSkipped { .. } => "ticket_skipped",
            Self::CounterActiveChanged { .. } => "counter_active_changed",
            Self::OfficerNameChanged { .. } => "officer_name_changed",
            Self::QueueReset { .. } => "queue_reset",
            Self::UserCreated { .. } => "user_created",
            Self::UserDeleted { .. } => "user_deleted",
            Self::AdminRoleGranted { .. } => "admin_role_granted",
            Self::AdminRoleRevoked { .. } => "admin_role_revoked",
        }
    }

    /// Get the queue ticket ID if this event is ticket-related
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::TicketIssued { ticket_id, .. }
            | Self::TicketCalled { ticket_id, .. }
            | Self::TicketCompleted { ticket_id, .. }
            | Self::TicketSkipped { ticket_id, .. } => Some(ticket_id),
            _ => None,
        }
    }

    /// Get the counter ID if this event happened at a counter
    pub fn counter_id(&self) -> Option<u32> {
        match self {
            Self::TicketCalled { counter_id, .. }
            | Self::TicketCompleted { counter_id, .. }
            | Self::TicketSkipped { counter_id, .. }
            | Self::CounterActiveChanged { counter_id, .. }
            | Self::OfficerNameChanged { counter_id, .. } => Some(*counter_id),
            _ => None,
        }
    }

    /// Get the acting user ID if available
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::TicketCalled { called_by, .. } => Some(called_by),
            Self::TicketCompleted { completed_by, .. } => Some(completed_by),
            Self::TicketSkipped { skipped_by, .. } => Some(skipped_by),
            Self::CounterActiveChanged { changed_by, .. }
            | Self::OfficerNameChanged { changed_by, .. } => Some(changed_by),
            Self::QueueReset { reset_by, .. } => Some(reset_by),
            Self::UserCreated { created_by, .. } => Some(created_by),
            Self::UserDeleted { deleted_by, .. } => Some(deleted_by),
            Self::AdminRoleGranted { granted_by, .. } => Some(granted_by),
            Self::AdminRoleRevoked { revoked_by, .. } => Some(revoked_by),
            Self::ServiceStarted { .. }
            | Self::ServiceStopped { .. }
            | Self::TicketIssued { .. } => None,
        }
    }
}

/// Stored audit record (what gets persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<String>,
    pub counter_id: Option<u32>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}

impl AuditRecord {
    /// Build a record for `event`; the id is assigned by the store.
    pub fn from_event(timestamp: DateTime<Utc>, event: AuditEvent) -> Self {
        Self {
            id: 0,
            timestamp,
            event_type: event.event_type().to_string(),
            ticket_id: event.ticket_id().map(String::from),
            counter_id: event.counter_id(),
            user_id: event.user_id().map(String::from),
            data: event,
        }
    }
}
