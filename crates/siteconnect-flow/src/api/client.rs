//! HTTP client for the connection backend.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use siteconnect_core::{ConnectError, ConnectResult, PlatformId};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::types::{AuthUrlResponse, StatusResponse};

/// Backend operations the flow depends on
#[async_trait]
pub trait ConnectionApi: Send + Sync {
    /// `GET /api/oauth/{provider}/auth-url`
    async fn auth_url(&self, platform: &PlatformId) -> ConnectResult<AuthUrlResponse>;

    /// `GET /{provider}/auth/url`
    async fn legacy_auth_url(&self, platform: &PlatformId) -> ConnectResult<AuthUrlResponse>;

    /// `GET /api/oauth/{provider}/status`
    async fn status(&self, platform: &PlatformId) -> ConnectResult<StatusResponse>;

    /// `POST /api/oauth/{provider}/disconnect`
    async fn disconnect(&self, platform: &PlatformId) -> ConnectResult<()>;
}

/// reqwest-backed [`ConnectionApi`]
pub struct BackendApiClient {
    base_url: String,
    client: reqwest::Client,
    bearer_token: Option<String>,
}

impl BackendApiClient {
    pub fn new(base_url: impl Into<String>) -> ConnectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("SiteConnect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConnectError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            bearer_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> ConnectResult<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ConnectError::Http(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!("[Api] {} returned {}", url, status);
            return Err(ConnectError::Http(format!("{} returned status {}", url, status)));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ConnectResult<T> {
        let url = self.url(path);
        debug!("[Api] GET {}", url);

        let response = self.send(self.client.get(&url), &url).await?;
        response
            .json()
            .await
            .map_err(|e| ConnectError::Http(format!("Invalid JSON from {}: {}", url, e)))
    }
}

#[async_trait]
impl ConnectionApi for BackendApiClient {
    async fn auth_url(&self, platform: &PlatformId) -> ConnectResult<AuthUrlResponse> {
        self.get_json(&format!(
            "/api/oauth/{}/auth-url",
            urlencoding::encode(platform.as_str())
        ))
        .await
    }

    async fn legacy_auth_url(&self, platform: &PlatformId) -> ConnectResult<AuthUrlResponse> {
        self.get_json(&format!("/{}/auth/url", urlencoding::encode(platform.as_str())))
            .await
    }

    async fn status(&self, platform: &PlatformId) -> ConnectResult<StatusResponse> {
        self.get_json(&format!(
            "/api/oauth/{}/status",
            urlencoding::encode(platform.as_str())
        ))
        .await
    }

    async fn disconnect(&self, platform: &PlatformId) -> ConnectResult<()> {
        let url = self.url(&format!(
            "/api/oauth/{}/disconnect",
            urlencoding::encode(platform.as_str())
        ));
        info!("[Api] Disconnecting {}", platform);
        self.send(self.client.post(&url), &url).await?;
        Ok(())
    }
}
