//! WebSocket push of queue changes for display boards and officer screens.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use queue_buddy_core::{Counter, ServiceType, Ticket, TicketStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients for real-time updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// A customer drew a ticket.
    TicketIssued {
        ticket_id: String,
        display_code: String,
        service_type: ServiceType,
        waiting: usize,
    },
    /// A ticket was called to a counter.
    TicketCalled {
        ticket_id: String,
        display_code: String,
        counter_id: u32,
        counter_name: String,
    },
    /// A ticket was completed or skipped.
    TicketResolved {
        ticket_id: String,
        display_code: String,
        counter_id: u32,
        status: TicketStatus,
    },
    /// Availability or officer of a counter changed.
    CounterUpdated { counter: Counter },
    /// Every ticket was cleared.
    QueueReset,
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    /// Message type label, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            WsMessage::TicketIssued { .. } => "ticket_issued",
            WsMessage::TicketCalled { .. } => "ticket_called",
            WsMessage::TicketResolved { .. } => "ticket_resolved",
            WsMessage::CounterUpdated { .. } => "counter_updated",
            WsMessage::QueueReset => "queue_reset",
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Broadcaster for WebSocket messages using tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct WsBroadcaster {
    sender: broadcast::Sender<WsMessage>,
}

impl WsBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast a message to all connected clients.
    pub fn broadcast(&self, msg: WsMessage) {
        // No receivers is not an error
        let _ = self.sender.send(msg);
    }

    /// Subscribe to receive messages.
    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.sender.subscribe()
    }

    pub fn ticket_issued(&self, ticket: &Ticket, waiting: usize) {
        self.broadcast(WsMessage::TicketIssued {
            ticket_id: ticket.id.clone(),
            display_code: ticket.display_code.clone(),
            service_type: ticket.service_type,
            waiting,
        });
    }

    pub fn ticket_called(&self, ticket: &Ticket, counter: &Counter) {
        self.broadcast(WsMessage::TicketCalled {
            ticket_id: ticket.id.clone(),
            display_code: ticket.display_code.clone(),
            counter_id: counter.id,
            counter_name: counter.name.clone(),
        });
    }

    pub fn ticket_resolved(&self, ticket: &Ticket, counter_id: u32) {
        self.broadcast(WsMessage::TicketResolved {
            ticket_id: ticket.id.clone(),
            display_code: ticket.display_code.clone(),
            counter_id,
            status: ticket.status(),
        });
    }

    pub fn counter_updated(&self, counter: &Counter) {
        self.broadcast(WsMessage::CounterUpdated {
            counter: counter.clone(),
        });
    }

    pub fn queue_reset(&self) {
        self.broadcast(WsMessage::QueueReset);
    }
}

impl Default for WsBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.ws_broadcaster().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            let msg = tokio::select! {
                result = rx.recv() => match result {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} messages", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => WsMessage::Heartbeat {
                    timestamp: Utc::now().timestamp(),
                },
            };

            WS_MESSAGES_SENT.with_label_values(&[msg.kind()]).inc();

            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize WsMessage: {}", e);
                }
            }
        }
    });

    // Clients only listen; anything they send besides close is ignored
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_buddy_core::testing::fixtures;

    #[test]
    fn test_message_tag_matches_kind() {
        let (queue, _store, _clock) = fixtures::queue_service();
        let ticket = queue.take_ticket(ServiceType::Loan);
        let counter = queue.counter(5).unwrap();

        let messages = vec![
            WsMessage::TicketIssued {
                ticket_id: ticket.id.clone(),
                display_code: ticket.display_code.clone(),
                service_type: ticket.service_type,
                waiting: 1,
            },
            WsMessage::TicketCalled {
                ticket_id: ticket.id.clone(),
                display_code: ticket.display_code.clone(),
                counter_id: 5,
                counter_name: counter.name.clone(),
            },
            WsMessage::CounterUpdated { counter },
            WsMessage::QueueReset,
            WsMessage::Heartbeat { timestamp: 0 },
        ];

        for msg in messages {
            let json = serde_json::to_value(&msg).unwrap();
            assert_eq!(json["type"], msg.kind());
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let (queue, _store, _clock) = fixtures::queue_service();
        let broadcaster = WsBroadcaster::new(8);
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        let ticket = queue.take_ticket(ServiceType::Teller);
        broadcaster.ticket_issued(&ticket, 1);

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                WsMessage::TicketIssued {
                    display_code,
                    waiting,
                    ..
                } => {
                    assert_eq!(display_code, "A001");
                    assert_eq!(waiting, 1);
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_resolved_message_carries_status() {
        let (queue, _store, _clock) = fixtures::queue_service();
        let broadcaster = WsBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        queue.take_ticket(ServiceType::Teller);
        queue.call_next(1).unwrap();
        let skipped = queue.skip_ticket(1).unwrap();
        broadcaster.ticket_resolved(&skipped, 1);

        assert_eq!(
            rx.recv().await.unwrap(),
            WsMessage::TicketResolved {
                ticket_id: skipped.id.clone(),
                display_code: "A001".to_string(),
                counter_id: 1,
                status: TicketStatus::Skipped,
            }
        );
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        // Must not panic
        WsBroadcaster::default().queue_reset();
    }
}
