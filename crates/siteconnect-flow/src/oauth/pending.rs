//! In-memory registry of pending flows, one per platform.
//!
//! A slot is reserved before any work starts so two concurrent `initiate`
//! calls for the same platform cannot both proceed. A live reservation
//! rejects the second caller; an expired one is superseded (its listener is
//! cancelled).

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use siteconnect_core::{ConnectError, ConnectResult, PendingAuthFlow, PlatformId};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::listener::ListenerOutcome;

struct PendingEntry {
    id: Uuid,
    flow: Option<PendingAuthFlow>,
    deadline: Instant,
    cancel: CancellationToken,
    task: Option<JoinHandle<ListenerOutcome>>,
    /// A popup listener was spawned (its task may since have been taken)
    listening: bool,
}

impl PendingEntry {
    fn is_live(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// Handle to a reserved slot
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: Uuid,
    pub cancel: CancellationToken,
    /// When the slot expires; the popup listener times out at the same instant
    pub deadline: Instant,
}

#[derive(Clone)]
pub struct PendingFlows {
    entries: Arc<DashMap<PlatformId, PendingEntry>>,
    ttl: Duration,
}

impl PendingFlows {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Claim the platform's slot
    pub fn reserve(&self, platform: &PlatformId) -> ConnectResult<Reservation> {
        let reservation = Reservation {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            deadline: Instant::now() + self.ttl,
        };
        let entry = PendingEntry {
            id: reservation.id,
            flow: None,
            deadline: reservation.deadline,
            cancel: reservation.cancel.clone(),
            task: None,
            listening: false,
        };

        match self.entries.entry(platform.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    return Err(ConnectError::FlowAlreadyPending(platform.clone()));
                }
                info!("[OAuth] Superseding expired flow for {}", platform);
                occupied.get().cancel.cancel();
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        Ok(reservation)
    }

    pub fn attach_flow(&self, platform: &PlatformId, id: Uuid, flow: PendingAuthFlow) {
        if let Some(mut entry) = self.entries.get_mut(platform) {
            if entry.id == id {
                entry.flow = Some(flow);
            }
        }
    }

    pub fn attach_task(
        &self,
        platform: &PlatformId,
        id: Uuid,
        task: JoinHandle<ListenerOutcome>,
    ) {
        match self.entries.get_mut(platform) {
            Some(mut entry) if entry.id == id => {
                entry.task = Some(task);
                entry.listening = true;
            }
            // Listener already finished and released the slot
            _ => debug!(
                "[OAuth] Flow for {} completed before its task was attached",
                platform
            ),
        }
    }

    /// Drop the slot if it still belongs to `id`
    pub fn release(&self, platform: &PlatformId, id: Uuid) -> bool {
        self.entries
            .remove_if(platform, |_, entry| entry.id == id)
            .is_some()
    }

    /// Drop the slot regardless of owner, cancelling its listener
    pub fn cancel(&self, platform: &PlatformId) -> Option<JoinHandle<ListenerOutcome>> {
        let (_, entry) = self.entries.remove(platform)?;
        entry.cancel.cancel();
        entry.task
    }

    /// Detach the listener task so the caller can await its outcome
    pub fn take_task(&self, platform: &PlatformId) -> Option<JoinHandle<ListenerOutcome>> {
        self.entries
            .get_mut(platform)
            .and_then(|mut entry| entry.task.take())
    }

    /// Whether a popup listener owns the platform's slot
    pub fn has_listener(&self, platform: &PlatformId) -> bool {
        self.entries
            .get(platform)
            .map(|entry| entry.listening)
            .unwrap_or(false)
    }

    pub fn is_pending(&self, platform: &PlatformId) -> bool {
        let expired = match self.entries.get(platform) {
            Some(entry) if entry.is_live() => return true,
            Some(entry) => Some(entry.id),
            None => None,
        };
        if let Some(id) = expired {
            // Expired, clean up
            if let Some((_, entry)) = self.entries.remove_if(platform, |_, e| e.id == id) {
                entry.cancel.cancel();
            }
        }
        false
    }

    pub fn flow(&self, platform: &PlatformId) -> Option<PendingAuthFlow> {
        self.entries
            .get(platform)
            .and_then(|entry| entry.flow.clone())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
