//! Client-side authorization request factory.
//!
//! Used by platforms whose authorize endpoint is called directly from the
//! app (no backend round-trip): generates `state` and a PKCE pair and builds
//! the authorize URL.

use siteconnect_core::{ConnectError, ConnectResult, PlatformId};
use tracing::debug;
use url::Url;

use super::pkce::{generate_state, PkceChallenge};

/// Authorization request generated locally
#[derive(Debug, Clone)]
pub struct ClientAuthRequest {
    pub state: String,
    pub verifier: String,
    pub auth_url: String,
}

pub struct ClientAuthFactory<'a> {
    platform: &'a PlatformId,
    authorize_endpoint: &'a str,
    client_id: &'a str,
    scopes: &'a [String],
}

impl<'a> ClientAuthFactory<'a> {
    pub fn new(
        platform: &'a PlatformId,
        authorize_endpoint: &'a str,
        client_id: &'a str,
        scopes: &'a [String],
    ) -> Self {
        Self {
            platform,
            authorize_endpoint,
            client_id,
            scopes,
        }
    }

    pub fn create(&self, redirect_uri: &str) -> ConnectResult<ClientAuthRequest> {
        let state = generate_state();
        let pkce = PkceChallenge::generate();

        let mut url = Url::parse(self.authorize_endpoint).map_err(|e| {
            ConnectError::configuration(
                self.platform,
                format!("invalid authorize endpoint {}: {}", self.authorize_endpoint, e),
            )
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", self.client_id);
            query.append_pair("redirect_uri", redirect_uri);
            if !self.scopes.is_empty() {
                query.append_pair("scope", &self.scopes.join(" "));
            }
            query.append_pair("state", &state);
            query.append_pair("code_challenge", &pkce.challenge);
            query.append_pair("code_challenge_method", &pkce.method);
        }

        debug!("[OAuth] Built client-side authorization URL for {}", self.platform);

        Ok(ClientAuthRequest {
            state,
            verifier: pkce.verifier,
            auth_url: url.to_string(),
        })
    }
}
