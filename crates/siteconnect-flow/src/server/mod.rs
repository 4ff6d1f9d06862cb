//! Loopback callback page server
//!
//! Serves `/oauth/{platform}/callback` on 127.0.0.1 for hosts that register
//! a loopback redirect URI (desktop webviews, local development). The page
//! posts the result to `window.opener` and closes itself, or redirects back
//! into the app when it has no opener.

mod callback_page;

pub use callback_page::{CallbackAction, CallbackPage, CallbackQuery, CallbackResolution};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use siteconnect_core::{FlowStateRepository, PlatformId, PlatformRegistry};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

/// Route path for the callback page
pub const CALLBACK_PATH: &str = "/oauth/{platform}/callback";

/// Redirect URI served by the loopback server for `platform`
pub fn callback_uri(port: u16, platform: &PlatformId) -> String {
    format!("http://127.0.0.1:{}/oauth/{}/callback", port, platform)
}

#[derive(Clone)]
pub struct CallbackServerState {
    pub registry: Arc<PlatformRegistry>,
    pub flows: Arc<dyn FlowStateRepository>,
    /// App page the fallback redirect returns to; its origin is the
    /// `postMessage` target
    pub app_url: Url,
}

pub fn callback_router(state: CallbackServerState) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .with_state(Arc::new(state))
}

async fn handle_callback(
    State(state): State<Arc<CallbackServerState>>,
    Path(platform): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let platform = PlatformId::new(platform);
    let Some(descriptor) = state.registry.get(&platform) else {
        debug!("[OAuth] Callback for unknown platform {}", platform);
        return (StatusCode::NOT_FOUND, Html("Unknown platform".to_string())).into_response();
    };

    info!("[OAuth] Callback received for {}", platform);
    let page = CallbackPage::new(descriptor, state.flows.as_ref(), &state.app_url);
    let resolution = page.resolve(&query).await;

    Html(render_page(&descriptor.display_name, &resolution)).into_response()
}

/// Serialize for embedding inside a `<script>` element
fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_page(display_name: &str, resolution: &CallbackResolution) -> String {
    let (title, subtitle) = if resolution.is_success() {
        (
            "Connection Complete",
            format!("{} is connected. This window will close automatically.", display_name),
        )
    } else {
        (
            "Connection Failed",
            format!("{} could not be connected. You can close this window.", display_name),
        )
    };

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            min-height: 100vh;
            margin: 0;
            display: flex;
            align-items: center;
            justify-content: center;
            text-align: center;
        }}
        h1 {{ font-size: 1.5rem; font-weight: 600; }}
    </style>
</head>
<body>
    <div>
        <h1>{title}</h1>
        <p>{subtitle}</p>
    </div>
    <script>
    (function () {{
        var message = {message};
        if (window.opener && !window.opener.closed) {{
            window.opener.postMessage(message, {target});
            setTimeout(function () {{ window.close(); }}, 300);
        }} else {{
            window.location.replace({redirect});
        }}
    }})();
    </script>
</body>
</html>"##,
        title = title,
        subtitle = html_escape(&subtitle),
        message = script_json(&resolution.message),
        target = script_json(&resolution.target_origin),
        redirect = script_json(&resolution.fallback_redirect),
    )
}

/// Running loopback server
pub struct CallbackServerHandle {
    pub port: u16,
    shutdown: CancellationToken,
}

impl CallbackServerHandle {
    pub fn callback_uri(&self, platform: &PlatformId) -> String {
        callback_uri(self.port, platform)
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for CallbackServerHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Try to bind to preferred port, fall back to dynamic port
async fn try_bind_with_fallback(preferred_port: u16) -> Result<(TcpListener, &'static str)> {
    match TcpListener::bind(("127.0.0.1", preferred_port)).await {
        Ok(l) => Ok((l, "preferred")),
        Err(_) => {
            info!(
                "[OAuth] Preferred port {} unavailable, allocating dynamic port",
                preferred_port
            );
            let l = TcpListener::bind(("127.0.0.1", 0))
                .await
                .context("Failed to bind loopback callback server")?;
            Ok((l, "dynamic"))
        }
    }
}

/// Start the callback server on `preferred_port` (or a dynamic port)
pub async fn start_callback_server(
    state: CallbackServerState,
    preferred_port: u16,
) -> Result<CallbackServerHandle> {
    let (listener, port_source) = try_bind_with_fallback(preferred_port).await?;
    let port = listener.local_addr()?.port();
    info!(
        "[OAuth] Callback server listening on 127.0.0.1:{} ({})",
        port, port_source
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    let app = callback_router(state);

    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            signal.cancelled().await;
            info!("[OAuth] Callback server shutting down");
        });

        if let Err(e) = server.await {
            error!("[OAuth] Callback server error: {}", e);
        }
    });

    Ok(CallbackServerHandle { port, shutdown })
}
