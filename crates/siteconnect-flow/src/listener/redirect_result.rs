//! Query-parameter fallback.
//!
//! When the popup was blocked or the platform uses a full-page redirect,
//! the backend sends the user back to the app with `?{platform}_connected=true`
//! or `?error=<code>`. These are consumed once on page load and stripped from
//! the displayed URL so a refresh or back-navigation does not replay them.

use siteconnect_core::{
    ConnectionStatusStore, DomainEvent, EventSender, FlowStateRepository, PlatformId,
    PlatformRegistry,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::host::WindowHost;

const ERROR_PARAM: &str = "error";
const ERROR_DESCRIPTION_PARAM: &str = "error_description";
const PLATFORM_PARAMS: [&str; 2] = ["platform", "provider"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Connected {
        platform: PlatformId,
        /// Location saved when the flow started, if any
        return_to: Option<String>,
    },
    Failed {
        /// `None` when no platform could be attributed
        platform: Option<PlatformId>,
        error: String,
    },
}

pub async fn consume_redirect_result(
    host: &dyn WindowHost,
    registry: &PlatformRegistry,
    flows: &dyn FlowStateRepository,
    store: &ConnectionStatusStore,
    events: &EventSender,
) -> Vec<RedirectOutcome> {
    let current = host.current_url();
    let mut url = match Url::parse(&current) {
        Ok(url) => url,
        Err(e) => {
            debug!("[OAuth] Current URL {} not parseable: {}", current, e);
            return Vec::new();
        }
    };

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let param = |name: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    let platforms = registry.ids();
    let flag_names: Vec<String> = platforms
        .iter()
        .map(PlatformId::connected_query_param)
        .collect();

    let consumed = pairs
        .iter()
        .any(|(k, _)| k == ERROR_PARAM || flag_names.iter().any(|flag| flag == k));
    if !consumed {
        return Vec::new();
    }

    let mut outcomes = Vec::new();

    for platform in &platforms {
        if param(&platform.connected_query_param()) != Some("true") {
            continue;
        }
        info!("[OAuth] {} connected via redirect", platform);
        store.add(platform);
        flows.clear(platform, None).await;
        outcomes.push(RedirectOutcome::Connected {
            platform: platform.clone(),
            return_to: flows.take_return_to(platform).await,
        });
    }

    if let Some(code) = param(ERROR_PARAM).filter(|c| !c.is_empty()) {
        let error = match param(ERROR_DESCRIPTION_PARAM).filter(|d| !d.is_empty()) {
            Some(description) => format!("{}: {}", code, description),
            None => code.to_string(),
        };

        let named = PLATFORM_PARAMS
            .iter()
            .find_map(|name| param(*name))
            .map(PlatformId::new)
            .filter(|p| registry.get(p).is_some());
        let platform = match named {
            Some(p) => Some(p),
            None => latest_pending(&platforms, flows).await,
        };

        match &platform {
            Some(platform) => {
                warn!("[OAuth] {} redirect reported error: {}", platform, error);
                flows.clear(platform, None).await;
                flows.take_return_to(platform).await;
                events.emit(DomainEvent::FlowFailed {
                    platform: platform.clone(),
                    error: error.clone(),
                });
            }
            None => warn!("[OAuth] Redirect reported error with no pending flow: {}", error),
        }
        outcomes.push(RedirectOutcome::Failed { platform, error });
    }

    let remaining: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(k, _)| {
            k != ERROR_PARAM
                && k != ERROR_DESCRIPTION_PARAM
                && !PLATFORM_PARAMS.contains(&k.as_str())
                && !flag_names.iter().any(|flag| flag == k)
        })
        .collect();
    if remaining.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(remaining.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    host.replace_url(url.as_str());

    outcomes
}

/// First platform (registry order) with a persisted pending flow
async fn latest_pending(
    platforms: &[PlatformId],
    flows: &dyn FlowStateRepository,
) -> Option<PlatformId> {
    for platform in platforms {
        if flows.load_latest(platform).await.is_some() {
            return Some(platform.clone());
        }
    }
    None
}
