//! Periodic status reconciliation.
//!
//! Refreshes per-platform connection detail from the backend status
//! endpoints. Poll results and callback results write the same
//! boolean-derived truth into the store, so last-write-wins is enough.

use siteconnect_core::{ConnectionStatusStore, PlatformId};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ConnectionApi;

pub struct StatusPoller {
    api: Arc<dyn ConnectionApi>,
    store: Arc<ConnectionStatusStore>,
    platforms: Vec<PlatformId>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl StatusPoller {
    pub fn new(
        api: Arc<dyn ConnectionApi>,
        store: Arc<ConnectionStatusStore>,
        platforms: Vec<PlatformId>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            store,
            platforms,
            interval,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the polling loop when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Poll every platform once; returns how many polls succeeded.
    ///
    /// A failed poll leaves the platform's current detail untouched.
    pub async fn poll_once(&self) -> usize {
        let mut refreshed = 0;
        for platform in &self.platforms {
            match self.api.status(platform).await {
                Ok(status) => {
                    debug!(
                        "[Poller] {} connected={} sites={}",
                        platform,
                        status.connected,
                        status.sites.len()
                    );
                    self.store.upsert_detail(status.into_detail(platform.clone()));
                    refreshed += 1;
                }
                Err(e) => warn!("[Poller] Status check for {} failed: {}", platform, e),
            }
        }
        refreshed
    }

    /// Poll immediately, then on every interval tick until shut down
    pub async fn run(self) {
        info!(
            "[Poller] Polling {} platforms every {}s",
            self.platforms.len(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("[Poller] Stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }

    pub fn spawn(self) -> (JoinHandle<()>, CancellationToken) {
        let token = self.shutdown_token();
        (tokio::spawn(self.run()), token)
    }
}
