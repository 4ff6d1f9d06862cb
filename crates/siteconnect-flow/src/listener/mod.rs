//! Callback listener
//!
//! One listener task per popup flow. It owns the flow's message
//! subscription and ends on the first of: an accepted success/error message,
//! the popup timeout, or cancellation. Whatever ends it, the subscription is
//! dropped, the popup is closed and the persisted flow state is cleared.

mod redirect_result;
mod validation;

pub use redirect_result::{consume_redirect_result, RedirectOutcome};
pub use validation::{validate_message, AcceptedMessage, Rejection};

use parking_lot::RwLock;
use siteconnect_core::{
    ConnectionStatusStore, DomainEvent, EventSender, FlowStateRepository, MessageKind,
    PendingAuthFlow, PlatformDescriptor, TrustedOriginSet,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::host::{MessageListener, PopupHandle, WindowHost};
use crate::oauth::PendingFlows;

/// How a popup flow ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    Connected,
    Failed(String),
    TimedOut,
    Cancelled,
    /// Message bus dropped while waiting
    Closed,
}

/// Shared collaborators a listener acts on
#[derive(Clone)]
pub struct ListenerDeps {
    pub trusted: Arc<RwLock<TrustedOriginSet>>,
    pub flows: Arc<dyn FlowStateRepository>,
    pub store: Arc<ConnectionStatusStore>,
    pub events: EventSender,
    pub host: Arc<dyn WindowHost>,
    pub pending: PendingFlows,
    pub timeout: Duration,
    /// Return path and delay for the post-success navigation
    pub success_redirect: Option<(String, Duration)>,
}

pub struct CallbackListener {
    deps: ListenerDeps,
    descriptor: PlatformDescriptor,
    flow: PendingAuthFlow,
    popup: Arc<dyn PopupHandle>,
    messages: MessageListener,
    reservation: Uuid,
    cancel: CancellationToken,
    /// Shared with the pending slot so both expire together
    deadline: Instant,
}

impl CallbackListener {
    pub fn new(
        deps: ListenerDeps,
        descriptor: PlatformDescriptor,
        flow: PendingAuthFlow,
        popup: Arc<dyn PopupHandle>,
        messages: MessageListener,
        reservation: Uuid,
        cancel: CancellationToken,
        deadline: Instant,
    ) -> Self {
        Self {
            deps,
            descriptor,
            flow,
            popup,
            messages,
            reservation,
            cancel,
            deadline,
        }
    }

    pub async fn run(self) -> ListenerOutcome {
        let Self {
            deps,
            descriptor,
            flow,
            popup,
            mut messages,
            reservation,
            cancel,
            deadline,
        } = self;

        info!(
            "[OAuth] Waiting for {} callback (state={}, timeout={}s)",
            descriptor.id,
            flow.state_prefix(),
            deps.timeout.as_secs()
        );

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        let accepted = loop {
            tokio::select! {
                // The registry cancels the slot at the deadline too; report the timeout
                biased;
                _ = &mut sleep => break Err(ListenerOutcome::TimedOut),
                _ = cancel.cancelled() => break Err(ListenerOutcome::Cancelled),
                message = messages.recv() => {
                    let Some(message) = message else {
                        break Err(ListenerOutcome::Closed);
                    };
                    let result = {
                        let trusted = deps.trusted.read();
                        validate_message(&message, &trusted, &descriptor, &flow)
                    };
                    match result {
                        Ok(accepted) => break Ok(accepted),
                        Err(rejection) => {
                            debug!(
                                "[OAuth] Message ignored for {}: {:?}",
                                descriptor.id, rejection
                            );
                        }
                    }
                }
            }
        };

        // Unregister before acting on the outcome
        drop(messages);
        deps.pending.release(&descriptor.id, reservation);

        let finish = Finish {
            deps: &deps,
            descriptor: &descriptor,
            flow: &flow,
            popup: popup.as_ref(),
        };
        match accepted {
            Ok(AcceptedMessage {
                kind: MessageKind::Success,
                ..
            }) => finish.connected().await,
            Ok(AcceptedMessage {
                kind: MessageKind::Error,
                message,
            }) => finish.failed(message.error_message()).await,
            Err(ListenerOutcome::TimedOut) => finish.timed_out().await,
            Err(ListenerOutcome::Cancelled) => finish.cancelled().await,
            Err(outcome) => {
                warn!("[OAuth] Listener for {} stopped: {:?}", descriptor.id, outcome);
                outcome
            }
        }
    }
}

struct Finish<'a> {
    deps: &'a ListenerDeps,
    descriptor: &'a PlatformDescriptor,
    flow: &'a PendingAuthFlow,
    popup: &'a dyn PopupHandle,
}

impl Finish<'_> {
    fn close_popup(&self) {
        if !self.popup.is_closed() {
            self.popup.close();
        }
    }

    /// Drop the persisted flow; `finished` also forgets the return-to location
    async fn clear_state(&self, finished: bool) {
        self.deps
            .flows
            .clear(&self.descriptor.id, Some(&self.flow.state))
            .await;
        if finished {
            self.deps.flows.take_return_to(&self.descriptor.id).await;
        }
    }

    async fn connected(&self) -> ListenerOutcome {
        let platform = &self.descriptor.id;
        info!(
            "[OAuth] {} connected (state={})",
            self.descriptor.display_name,
            self.flow.state_prefix()
        );

        self.close_popup();
        self.deps.store.add(platform);
        self.clear_state(true).await;

        if let Some((path, delay)) = self.deps.success_redirect.clone() {
            self.deps.events.emit(DomainEvent::SuccessRedirectScheduled {
                platform: platform.clone(),
                path: path.clone(),
            });
            let host = self.deps.host.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                host.navigate(&path);
            });
        }

        ListenerOutcome::Connected
    }

    async fn failed(&self, error: String) -> ListenerOutcome {
        warn!(
            "[OAuth] {} authorization failed: {}",
            self.descriptor.display_name, error
        );

        self.close_popup();
        self.clear_state(true).await;
        self.deps.events.emit(DomainEvent::FlowFailed {
            platform: self.descriptor.id.clone(),
            error: error.clone(),
        });

        ListenerOutcome::Failed(error)
    }

    async fn timed_out(&self) -> ListenerOutcome {
        warn!(
            "[OAuth] No callback for {} after {}s, closing popup",
            self.descriptor.id,
            self.deps.timeout.as_secs()
        );

        self.close_popup();
        self.clear_state(true).await;
        self.deps.events.emit(DomainEvent::FlowTimedOut {
            platform: self.descriptor.id.clone(),
        });

        ListenerOutcome::TimedOut
    }

    async fn cancelled(&self) -> ListenerOutcome {
        info!(
            "[OAuth] Cancelled pending flow for {} (state={})",
            self.descriptor.id,
            self.flow.state_prefix()
        );

        self.close_popup();
        self.clear_state(false).await;
        self.deps.events.emit(DomainEvent::FlowCancelled {
            platform: self.descriptor.id.clone(),
        });

        ListenerOutcome::Cancelled
    }
}
