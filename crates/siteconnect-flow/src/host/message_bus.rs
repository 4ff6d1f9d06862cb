//! Window message channel.
//!
//! Fan-out of `message` events. Each pending popup flow holds one
//! [`MessageListener`] for its lifetime; dropping the listener unregisters it.
//!
//! Every listener gets its own unbounded queue, so a frame flooding the
//! window cannot push the real callback out of a fixed-size buffer. Queued
//! messages live until the listener reads them or is dropped.

use dashmap::DashMap;
use siteconnect_core::WindowMessage;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

type Listeners = DashMap<Uuid, mpsc::UnboundedSender<WindowMessage>>;

#[derive(Clone, Default)]
pub struct MessageBus {
    listeners: Arc<Listeners>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a message event; returns how many listeners received it
    pub fn post(&self, message: WindowMessage) -> usize {
        if self.listeners.is_empty() {
            debug!("[Messages] Message posted with no listeners registered");
            return 0;
        }

        let mut delivered = 0;
        self.listeners.retain(|_, tx| match tx.send(message.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        delivered
    }

    pub fn subscribe(&self) -> MessageListener {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.insert(id, tx);
        MessageListener {
            id,
            rx,
            bus: Arc::downgrade(&self.listeners),
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

pub struct MessageListener {
    id: Uuid,
    rx: mpsc::UnboundedReceiver<WindowMessage>,
    bus: Weak<Listeners>,
}

impl MessageListener {
    /// Next message; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<WindowMessage> {
        self.rx.recv().await
    }
}

impl Drop for MessageListener {
    fn drop(&mut self) {
        if let Some(listeners) = self.bus.upgrade() {
            listeners.remove(&self.id);
        }
    }
}
