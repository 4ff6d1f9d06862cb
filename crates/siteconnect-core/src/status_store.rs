//! Connection Status Store
//!
//! Single observable source of truth for which platforms are connected.
//! Every mutation publishes a fresh immutable [`ConnectionSnapshot`] on a
//! `watch` channel and, when something actually changed, a [`DomainEvent`]
//! on the event bus. `add`/`remove` are idempotent; the callback path and
//! the status poller both write through here and converge last-write-wins.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{ConnectedPlatform, ConnectionSnapshot, DomainEvent, EventSender, PlatformId};

pub struct ConnectionStatusStore {
    tx: watch::Sender<Arc<ConnectionSnapshot>>,
    events: Option<EventSender>,
}

impl ConnectionStatusStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(ConnectionSnapshot::default()));
        Self { tx, events: None }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ConnectionSnapshot> {
        self.tx.borrow().clone()
    }

    /// Observe snapshots; the receiver starts at the current one
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConnectionSnapshot>> {
        self.tx.subscribe()
    }

    pub fn is_connected(&self, platform: &PlatformId) -> bool {
        self.tx.borrow().is_connected(platform)
    }

    pub fn connected_platforms(&self) -> Vec<PlatformId> {
        self.tx.borrow().connected_platforms()
    }

    /// Mark a platform connected. Returns `false` if it already was.
    pub fn add(&self, platform: &PlatformId) -> bool {
        let added = self.update(|next| next.connected.insert(platform.clone()));
        if added {
            info!("[StatusStore] {} connected", platform);
            self.emit(DomainEvent::ConnectionAdded {
                platform: platform.clone(),
            });
        }
        added
    }

    /// Mark a platform disconnected and drop its detail. Returns `false` if
    /// there was nothing to remove.
    pub fn remove(&self, platform: &PlatformId) -> bool {
        let mut was_connected = false;
        let changed = self.update(|next| {
            was_connected = next.connected.remove(platform);
            let had_detail = next.details.remove(platform).is_some();
            was_connected || had_detail
        });
        if was_connected {
            info!("[StatusStore] {} disconnected", platform);
            self.emit(DomainEvent::ConnectionRemoved {
                platform: platform.clone(),
            });
        }
        changed
    }

    /// Replace the connected set wholesale (details for dropped platforms go too)
    pub fn replace<I>(&self, platforms: I)
    where
        I: IntoIterator<Item = PlatformId>,
    {
        let incoming: BTreeSet<PlatformId> = platforms.into_iter().collect();

        // Diff against the value being replaced, under the channel lock
        let mut added = Vec::new();
        let mut removed = Vec::new();
        self.update(|next| {
            if next.connected == incoming {
                return false;
            }
            added = incoming.difference(&next.connected).cloned().collect();
            removed = next.connected.difference(&incoming).cloned().collect();
            next.details.retain(|id, _| incoming.contains(id));
            next.connected = incoming.clone();
            true
        });

        for platform in added {
            self.emit(DomainEvent::ConnectionAdded { platform });
        }
        for platform in removed {
            self.emit(DomainEvent::ConnectionRemoved { platform });
        }
    }

    /// Store a polled detail object; its `connected` flag drives membership
    pub fn upsert_detail(&self, detail: ConnectedPlatform) {
        let platform = detail.platform_id.clone();
        let connected = detail.connected;

        let mut membership_changed = false;
        self.update(|next| {
            membership_changed = if connected {
                next.connected.insert(platform.clone())
            } else {
                next.connected.remove(&platform)
            };
            let detail_changed = next.details.get(&platform) != Some(&detail);
            next.details.insert(platform.clone(), detail.clone());
            membership_changed || detail_changed
        });

        debug!(
            "[StatusStore] Detail for {} refreshed (connected={})",
            platform, connected
        );
        if membership_changed {
            self.emit(if connected {
                DomainEvent::ConnectionAdded {
                    platform: platform.clone(),
                }
            } else {
                DomainEvent::ConnectionRemoved {
                    platform: platform.clone(),
                }
            });
        }
        self.emit(DomainEvent::ConnectionDetailUpdated {
            platform,
            connected,
        });
    }

    /// Apply `mutate` to a copy of the snapshot; publish it if `mutate`
    /// reports a change
    fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut ConnectionSnapshot) -> bool,
    {
        self.tx.send_if_modified(|current| {
            let mut next = (**current).clone();
            if !mutate(&mut next) {
                return false;
            }
            next.version = current.version + 1;
            *current = Arc::new(next);
            true
        })
    }

    fn emit(&self, event: DomainEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }
}

impl Default for ConnectionStatusStore {
    fn default() -> Self {
        Self::new()
    }
}
