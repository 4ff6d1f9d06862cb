//! Event Bus - connection flow event distribution
//!
//! Producers (initiator, callback listener, status store, poller) emit
//! [`DomainEvent`]s; consumers (toast bridge, status widgets, audit log)
//! each subscribe and receive every event emitted after subscription.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                Event Bus (broadcast channel)               │
//! │                                                            │
//! │  Producers:                  Consumers:                    │
//! │  ├─ ConnectionService        ├─ Toast bridge (FlowFailed)  │
//! │  ├─ CallbackListener         ├─ Status widgets             │
//! │  ├─ ConnectionStatusStore    └─ Audit log                  │
//! │  └─ StatusPoller                                           │
//! └────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::DomainEvent;

/// Default channel capacity for the event bus
const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Get a cloneable sender for a producer
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Subscribe to all events emitted from now on
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Used by producers to emit domain events
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventSender {
    /// Emit an event, returning the number of receivers.
    ///
    /// Zero receivers is not an error.
    pub fn emit(&self, event: DomainEvent) -> usize {
        let type_name = event.type_name();
        let platform = event.platform().to_string();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(
                    event_type = type_name,
                    platform = %platform,
                    receivers = count,
                    "[EventBus] Emitted event"
                );
                count
            }
            Err(_) => {
                debug!(
                    event_type = type_name,
                    platform = %platform,
                    "[EventBus] No receivers for event"
                );
                0
            }
        }
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

/// Used by consumers to receive domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event; `None` once the bus is gone.
    ///
    /// Lag is logged and skipped.
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "[EventBus] Receiver lagged, skipped {} events", skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("[EventBus] Channel closed");
                    return None;
                }
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<DomainEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped_events = skipped, "[EventBus] Receiver lagged on try_recv");
                self.receiver.try_recv().ok()
            }
            Err(_) => None,
        }
    }

    /// Drain every event currently buffered
    pub fn drain(&mut self) -> Vec<DomainEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_shared_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}
