use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use super::{AuditEventEnvelope, AuditHandle, AuditRecord, AuditStore};

/// Drains emitted events into the audit trail. Exits once the last
/// [`AuditHandle`] is gone.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub fn new(rx: mpsc::Receiver<AuditEventEnvelope>, store: Arc<dyn AuditStore>) -> Self {
        Self { rx, store }
    }

    pub async fn run(mut self) {
        info!("Audit writer started");
        let mut written = 0u64;
        let mut failed = 0u64;

        while let Some(AuditEventEnvelope { timestamp, event }) = self.rx.recv().await {
            let record = AuditRecord::from_event(timestamp, event);
            match self.store.insert(&record) {
                Ok(_) => written += 1,
                Err(e) => {
                    failed += 1;
                    error!(event_type = %record.event_type, "Audit insert failed: {}", e);
                }
            }
        }

        info!(written, failed, "Audit writer stopped");
    }
}

/// Wire a handle to a writer over a channel of `capacity` events.
///
/// Spawn the writer with `tokio::spawn(writer.run())`; clones of the handle
/// go to request handlers.
pub fn create_audit_system(
    store: Arc<dyn AuditStore>,
    capacity: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(capacity);
    (AuditHandle::new(tx), AuditWriter::new(rx, store))
}
