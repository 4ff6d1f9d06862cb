//! Callback page logic.
//!
//! Runs where the provider redirects after authorization. It finds the
//! pending flow through whichever persistence layer survived the round-trip
//! and decides what to report: a message posted to the opener window, or,
//! when there is no opener, a redirect back into the app carrying the
//! query-parameter fallback.

use serde::Deserialize;
use siteconnect_core::{
    state_prefix, FlowStateRepository, OAuthMessage, PendingAuthFlow, PlatformDescriptor,
};
use tracing::{debug, info, warn};
use url::Url;

/// Query string the provider appends to the redirect URI
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `window.opener.postMessage(message, target_origin)` then close
    PostToOpener {
        message: OAuthMessage,
        target_origin: String,
    },
    /// `window.location.replace(url)`
    Redirect { url: String },
}

/// Both possible reports; the page picks one depending on `window.opener`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResolution {
    pub message: OAuthMessage,
    pub target_origin: String,
    pub fallback_redirect: String,
}

impl CallbackResolution {
    pub fn is_success(&self) -> bool {
        self.message.error.is_none()
    }

    pub fn action(&self, has_opener: bool) -> CallbackAction {
        if has_opener {
            CallbackAction::PostToOpener {
                message: self.message.clone(),
                target_origin: self.target_origin.clone(),
            }
        } else {
            CallbackAction::Redirect {
                url: self.fallback_redirect.clone(),
            }
        }
    }
}

pub struct CallbackPage<'a> {
    descriptor: &'a PlatformDescriptor,
    flows: &'a dyn FlowStateRepository,
    app_url: &'a Url,
}

impl<'a> CallbackPage<'a> {
    pub fn new(
        descriptor: &'a PlatformDescriptor,
        flows: &'a dyn FlowStateRepository,
        app_url: &'a Url,
    ) -> Self {
        Self {
            descriptor,
            flows,
            app_url,
        }
    }

    pub async fn resolve(&self, query: &CallbackQuery) -> CallbackResolution {
        let platform = &self.descriptor.id;
        let flow = match query.state.as_deref() {
            Some(state) => self.flows.load_by_state(platform, state).await,
            None => self.flows.load_latest(platform).await,
        };

        let outcome = match (&query.error, &query.code, &flow) {
            (Some(error), _, _) => Err((error.clone(), query.error_description.clone())),
            (None, None, _) => Err(("missing_code".to_string(), None)),
            (None, Some(_), None) => {
                warn!(
                    "[OAuth] {} callback with unknown state={:?}",
                    platform,
                    query.state.as_deref().map(state_prefix)
                );
                Err(("invalid_state".to_string(), None))
            }
            (None, Some(_), Some(flow)) => Ok(flow),
        };

        let message = match outcome {
            Ok(flow) => {
                info!(
                    "[OAuth] {} callback matched pending flow (state={})",
                    platform,
                    flow.state_prefix()
                );
                self.message(&self.descriptor.success_type, Some(flow), None, None)
            }
            Err((error, description)) => {
                debug!("[OAuth] {} callback reports error {}", platform, error);
                self.message(
                    &self.descriptor.error_type,
                    flow.as_ref(),
                    Some(error),
                    description,
                )
            }
        };

        CallbackResolution {
            fallback_redirect: self.fallback_redirect(&message),
            target_origin: self.app_url.origin().ascii_serialization(),
            message,
        }
    }

    fn message(
        &self,
        message_type: &str,
        flow: Option<&PendingAuthFlow>,
        error: Option<String>,
        error_description: Option<String>,
    ) -> OAuthMessage {
        OAuthMessage {
            message_type: message_type.to_string(),
            state: flow.map(|f| f.state.clone()),
            nonce: flow.and_then(|f| f.nonce.clone()),
            error,
            error_description,
        }
    }

    fn fallback_redirect(&self, message: &OAuthMessage) -> String {
        let mut url = self.app_url.clone();
        {
            let mut query = url.query_pairs_mut();
            match &message.error {
                None => {
                    query.append_pair(&self.descriptor.id.connected_query_param(), "true");
                }
                Some(error) => {
                    query.append_pair("error", error);
                    query.append_pair("platform", self.descriptor.id.as_str());
                }
            }
        }
        url.to_string()
    }
}
