//! Connection service - entry point for shells
//!
//! Owns the pending-flow registry and the trusted origin set, and drives a
//! connection from `initiate` to its outcome:
//!
//! ```text
//! initiate(platform)
//!   ├─ reserve slot (one pending flow per platform)
//!   ├─ remember return-to (first write wins)
//!   ├─ resolve payload (backend / legacy backend / client factory)
//!   ├─ merge trusted origins
//!   ├─ persist PendingAuthFlow (all storage layers)
//!   └─ popup ──► CallbackListener task ──► store.add / FlowFailed / FlowTimedOut
//!      redirect or blocked popup ──► navigate ──► consume_redirect_result on return
//! ```

use parking_lot::RwLock;
use siteconnect_core::{
    ConnectConfig, ConnectError, ConnectResult, ConnectionStatusStore, DomainEvent, EventSender,
    FlowStateRepository, LaunchMode, PayloadSource, PendingAuthFlow, PlatformDescriptor,
    PlatformId, PlatformRegistry, SharedEventBus, TrustedOriginSet,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::api::ConnectionApi;
use crate::host::{MessageBus, WindowHost};
use crate::listener::{self, CallbackListener, ListenerDeps, ListenerOutcome, RedirectOutcome};
use crate::oauth::{AuthorizationPayload, ClientAuthFactory, PendingFlows, Reservation};
use crate::status::StatusPoller;

/// How `initiate` presented the authorization page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Popup opened; a callback listener is waiting
    Popup,
    /// Platform uses a full-page redirect
    Redirected,
    /// Popup was blocked; fell back to a full-page redirect
    PopupBlocked,
}

pub struct ConnectionService {
    config: ConnectConfig,
    registry: Arc<PlatformRegistry>,
    api: Arc<dyn ConnectionApi>,
    host: Arc<dyn WindowHost>,
    flows: Arc<dyn FlowStateRepository>,
    messages: MessageBus,
    store: Arc<ConnectionStatusStore>,
    events: EventSender,
    trusted: Arc<RwLock<TrustedOriginSet>>,
    pending: PendingFlows,
}

impl ConnectionService {
    pub fn new(
        config: ConnectConfig,
        api: Arc<dyn ConnectionApi>,
        host: Arc<dyn WindowHost>,
        flows: Arc<dyn FlowStateRepository>,
        event_bus: SharedEventBus,
    ) -> Self {
        let events = event_bus.sender();
        let current_url = host.current_url();
        let trusted = TrustedOriginSet::seeded(
            config.configured_origin.as_deref(),
            Some(current_url.as_str()),
        );
        Self {
            registry: Arc::new(PlatformRegistry::builtin()),
            store: Arc::new(ConnectionStatusStore::new().with_events(events.clone())),
            messages: MessageBus::new(),
            trusted: Arc::new(RwLock::new(trusted)),
            pending: PendingFlows::new(config.popup_timeout),
            config,
            api,
            host,
            flows,
            events,
        }
    }

    pub fn with_registry(mut self, registry: PlatformRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_status_store(mut self, store: Arc<ConnectionStatusStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_message_bus(mut self, messages: MessageBus) -> Self {
        self.messages = messages;
        self
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<ConnectionStatusStore> {
        &self.store
    }

    /// Bus the shell forwards `message` events into
    pub fn message_bus(&self) -> &MessageBus {
        &self.messages
    }

    pub fn trusted_origins(&self) -> TrustedOriginSet {
        self.trusted.read().clone()
    }

    pub fn is_pending(&self, platform: &PlatformId) -> bool {
        self.pending.is_pending(platform)
    }

    /// Pending flow held in memory for the platform, if any
    pub fn pending_flow(&self, platform: &PlatformId) -> Option<PendingAuthFlow> {
        self.pending.flow(platform)
    }

    /// Start connecting `platform`.
    ///
    /// Fails with `FlowAlreadyPending` while an unexpired flow exists for the
    /// same platform, and with `Configuration` when the authorization payload
    /// is incomplete (nothing is opened or navigated in that case).
    pub async fn initiate(&self, platform: &PlatformId) -> ConnectResult<LaunchOutcome> {
        let descriptor = self
            .registry
            .get(platform)
            .cloned()
            .ok_or_else(|| ConnectError::UnknownPlatform(platform.clone()))?;

        let reservation = self.pending.reserve(platform)?;
        let current_url = self.host.current_url();

        let remembered = self.flows.remember_return_to(platform, &current_url).await;
        if !remembered {
            debug!("[OAuth] Keeping previously stored return-to for {}", platform);
        }

        match self.launch(&descriptor, &reservation, &current_url).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("[OAuth] Failed to start {} connection: {}", platform, e);
                // A failed start must not pin later flows to this page
                if remembered {
                    self.flows.take_return_to(platform).await;
                }
                self.pending.release(platform, reservation.id);
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
        descriptor: &PlatformDescriptor,
        reservation: &Reservation,
        current_url: &str,
    ) -> ConnectResult<LaunchOutcome> {
        let platform = &descriptor.id;
        let payload = self.resolve_payload(descriptor, current_url).await?;

        {
            let mut trusted = self.trusted.write();
            trusted.insert(current_url);
            let added = trusted.merge(&payload.trusted_origins);
            if added > 0 {
                debug!(
                    "[OAuth] Trusted {} backend origins for {} ({} total)",
                    added,
                    platform,
                    trusted.len()
                );
            }
        }

        let flow = payload.to_pending_flow(platform);
        let report = self.flows.save(&flow).await;
        if !report.any() {
            warn!(
                "[OAuth] No storage layer accepted the {} flow, continuing without persistence",
                platform
            );
        }
        if let Some(client_id) = &payload.client_id {
            self.flows.save_client_id(platform, client_id).await;
        }
        self.pending.attach_flow(platform, reservation.id, flow.clone());

        match descriptor.launch_mode {
            LaunchMode::Redirect => {
                info!("[OAuth] Redirecting to {} authorization", descriptor.display_name);
                self.events.emit(DomainEvent::FlowStarted {
                    platform: platform.clone(),
                    launch_mode: LaunchMode::Redirect,
                });
                self.host.navigate(&payload.auth_url);
                Ok(LaunchOutcome::Redirected)
            }
            LaunchMode::Popup => {
                Ok(self.open_popup(descriptor, flow, &payload.auth_url, reservation))
            }
        }
    }

    fn open_popup(
        &self,
        descriptor: &PlatformDescriptor,
        flow: PendingAuthFlow,
        auth_url: &str,
        reservation: &Reservation,
    ) -> LaunchOutcome {
        let platform = &descriptor.id;

        // Register before the popup exists so no callback can be missed
        let messages = self.messages.subscribe();
        let popup_name = format!("{}_oauth", platform);

        let Some(popup) =
            self.host
                .open_popup(auth_url, &popup_name, &self.config.popup_features())
        else {
            drop(messages);
            warn!(
                "[OAuth] Popup blocked for {}, falling back to full-page redirect",
                platform
            );
            self.events.emit(DomainEvent::PopupBlocked {
                platform: platform.clone(),
            });
            self.host.navigate(auth_url);
            return LaunchOutcome::PopupBlocked;
        };

        info!(
            "[OAuth] Opened {} authorization popup (state={})",
            descriptor.display_name,
            flow.state_prefix()
        );
        self.events.emit(DomainEvent::FlowStarted {
            platform: platform.clone(),
            launch_mode: LaunchMode::Popup,
        });

        let listener = CallbackListener::new(
            self.listener_deps(),
            descriptor.clone(),
            flow,
            popup,
            messages,
            reservation.id,
            reservation.cancel.clone(),
            reservation.deadline,
        );
        let task = tokio::spawn(listener.run());
        self.pending.attach_task(platform, reservation.id, task);

        LaunchOutcome::Popup
    }

    async fn resolve_payload(
        &self,
        descriptor: &PlatformDescriptor,
        current_url: &str,
    ) -> ConnectResult<AuthorizationPayload> {
        let platform = &descriptor.id;
        match &descriptor.payload_source {
            PayloadSource::Backend => {
                let response = self.api.auth_url(platform).await?;
                AuthorizationPayload::from_backend(platform, response, true)
            }
            PayloadSource::LegacyBackend => {
                let response = self.api.legacy_auth_url(platform).await?;
                AuthorizationPayload::from_backend(platform, response, false)
            }
            PayloadSource::ClientFactory {
                authorize_endpoint,
                client_id,
                scopes,
            } => {
                let client_id = match client_id {
                    Some(id) => id.clone(),
                    None => self.flows.load_client_id(platform).await.ok_or_else(|| {
                        ConnectError::configuration(platform, "no client id configured")
                    })?,
                };
                let redirect_uri = Url::parse(current_url)?
                    .join(&format!("/oauth/{}/callback", platform))?
                    .to_string();

                let request =
                    ClientAuthFactory::new(platform, authorize_endpoint, &client_id, scopes)
                        .create(&redirect_uri)?;
                Ok(AuthorizationPayload::from_client_request(
                    request,
                    &redirect_uri,
                ))
            }
        }
    }

    fn listener_deps(&self) -> ListenerDeps {
        ListenerDeps {
            trusted: self.trusted.clone(),
            flows: self.flows.clone(),
            store: self.store.clone(),
            events: self.events.clone(),
            host: self.host.clone(),
            pending: self.pending.clone(),
            timeout: self.config.popup_timeout,
            success_redirect: self
                .config
                .success_redirect_path
                .clone()
                .map(|path| (path, self.config.success_redirect_delay)),
        }
    }

    /// Wait for the platform's popup flow to finish.
    ///
    /// `None` when no popup listener is running for the platform.
    pub async fn wait_for_outcome(&self, platform: &PlatformId) -> Option<ListenerOutcome> {
        let task = self.pending.take_task(platform)?;
        match task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("[OAuth] Listener task for {} failed: {}", platform, e);
                None
            }
        }
    }

    /// Abandon the platform's pending flow. Returns `false` if none was pending.
    pub async fn cancel(&self, platform: &PlatformId) -> bool {
        let was_pending = self.pending.is_pending(platform);
        let listening = self.pending.has_listener(platform);

        match self.pending.cancel(platform) {
            Some(task) => {
                if let Err(e) = task.await {
                    warn!("[OAuth] Listener task for {} ended abnormally: {}", platform, e);
                }
            }
            // The listener clears state and reports the cancel itself
            None if listening => {}
            None if was_pending => {
                info!("[OAuth] Cancelled pending redirect flow for {}", platform);
                self.flows.clear(platform, None).await;
                self.events.emit(DomainEvent::FlowCancelled {
                    platform: platform.clone(),
                });
            }
            None => {}
        }
        was_pending
    }

    /// Handle `?{platform}_connected=true` / `?error=` on page load
    pub async fn consume_redirect_result(&self) -> Vec<RedirectOutcome> {
        let outcomes = listener::consume_redirect_result(
            self.host.as_ref(),
            &self.registry,
            self.flows.as_ref(),
            &self.store,
            &self.events,
        )
        .await;

        for outcome in &outcomes {
            let platform = match outcome {
                RedirectOutcome::Connected { platform, .. } => Some(platform),
                RedirectOutcome::Failed { platform, .. } => platform.as_ref(),
            };
            if let Some(platform) = platform {
                // Redirect flows have no listener; this only drops the slot
                self.pending.cancel(platform);
            }
        }
        outcomes
    }

    /// Disconnect on the backend, then forget the platform locally
    pub async fn disconnect(&self, platform: &PlatformId) -> ConnectResult<()> {
        if self.registry.get(platform).is_none() {
            return Err(ConnectError::UnknownPlatform(platform.clone()));
        }

        self.api.disconnect(platform).await?;
        self.cancel(platform).await;
        self.flows.clear(platform, None).await;
        self.store.remove(platform);
        info!("[OAuth] {} disconnected", platform);
        Ok(())
    }

    /// Poller over every registered platform at the configured interval
    pub fn status_poller(&self) -> StatusPoller {
        StatusPoller::new(
            self.api.clone(),
            self.store.clone(),
            self.registry.ids(),
            self.config.status_poll_interval,
        )
    }
}
