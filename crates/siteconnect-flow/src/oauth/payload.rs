//! Authorization payload resolution.
//!
//! Normalizes the different payload sources (backend endpoint, legacy
//! endpoint, client-side factory) into one [`AuthorizationPayload`].

use serde_json::Value;
use siteconnect_core::{ConnectError, ConnectResult, PendingAuthFlow, PlatformId};
use url::Url;

use super::client_factory::ClientAuthRequest;
use crate::api::AuthUrlResponse;

/// Everything needed to persist a pending flow and launch authorization
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationPayload {
    pub auth_url: String,
    pub state: String,
    pub verifier: Option<String>,
    pub nonce: Option<String>,
    pub redirect_uri: String,
    pub oauth_data: Option<Value>,
    pub trusted_origins: Vec<String>,
    pub client_id: Option<String>,
}

impl AuthorizationPayload {
    /// Resolve a backend response.
    ///
    /// `auth_url` is always required; `oauth_data` only when
    /// `require_oauth_data` is set (the current endpoint). The state token is
    /// read from `oauth_data.state`, falling back to the `state` query
    /// parameter of the authorize URL.
    pub fn from_backend(
        platform: &PlatformId,
        response: AuthUrlResponse,
        require_oauth_data: bool,
    ) -> ConnectResult<Self> {
        let auth_url = response
            .auth_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                ConnectError::configuration(platform, "backend response has no auth_url")
            })?;

        let oauth_data = response.oauth_data.filter(|d| !d.is_null());
        if require_oauth_data && oauth_data.is_none() {
            return Err(ConnectError::configuration(
                platform,
                "backend response has no oauth_data",
            ));
        }

        let parsed = Url::parse(&auth_url).map_err(|e| {
            ConnectError::configuration(platform, format!("auth_url is not a valid URL: {}", e))
        })?;

        let data_field = |names: &[&str]| {
            oauth_data.as_ref().and_then(|data| {
                names
                    .iter()
                    .find_map(|name| data.get(*name).and_then(Value::as_str))
                    .map(str::to_string)
            })
        };
        let query_param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        let state = data_field(&["state"])
            .or_else(|| query_param("state"))
            .ok_or_else(|| {
                ConnectError::configuration(platform, "authorization payload carries no state")
            })?;

        Ok(Self {
            verifier: data_field(&["code_verifier", "verifier"]),
            nonce: data_field(&["nonce"]),
            redirect_uri: data_field(&["redirect_uri"])
                .or_else(|| query_param("redirect_uri"))
                .unwrap_or_default(),
            auth_url,
            state,
            oauth_data,
            trusted_origins: response.trusted_origins,
            client_id: response.client_id.filter(|c| !c.is_empty()),
        })
    }

    pub fn from_client_request(request: ClientAuthRequest, redirect_uri: &str) -> Self {
        Self {
            auth_url: request.auth_url,
            state: request.state,
            verifier: Some(request.verifier),
            nonce: None,
            redirect_uri: redirect_uri.to_string(),
            oauth_data: None,
            trusted_origins: Vec::new(),
            client_id: None,
        }
    }

    pub fn to_pending_flow(&self, platform: &PlatformId) -> PendingAuthFlow {
        let mut flow = PendingAuthFlow::new(platform.clone(), &self.state, &self.redirect_uri);
        if let Some(verifier) = &self.verifier {
            flow = flow.with_verifier(verifier);
        }
        if let Some(nonce) = &self.nonce {
            flow = flow.with_nonce(nonce);
        }
        if let Some(data) = &self.oauth_data {
            flow = flow.with_oauth_data(data.clone());
        }
        flow
    }
}
