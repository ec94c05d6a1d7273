use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, warn};

use super::AuditEvent;

/// An event stamped with the moment it was emitted, not when it was stored.
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

/// Sending side of the audit trail, cloned into every request handler.
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
}

impl AuditHandle {
    pub fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self { tx }
    }

    fn stamp(event: AuditEvent) -> AuditEventEnvelope {
        AuditEventEnvelope {
            timestamp: Utc::now(),
            event,
        }
    }

    /// Waits for room in the channel. Used for startup and shutdown events.
    pub async fn emit(&self, event: AuditEvent) {
        if self.tx.send(Self::stamp(event)).await.is_err() {
            error!("Audit writer is gone, event lost");
        }
    }

    /// Never waits; a full or closed channel drops the event.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        let envelope = Self::stamp(event);
        let event_type = envelope.event.event_type();
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event_type, "Audit channel full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(event_type, "Audit writer is gone, event lost");
                false
            }
        }
    }
}
