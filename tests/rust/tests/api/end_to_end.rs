//! ConnectionService wired to the real HTTP client

use pretty_assertions::assert_eq;
use serde_json::json;
use siteconnect_core::{create_shared_event_bus, PlatformRegistry};
use siteconnect_flow::{start_callback_server, BackendApiClient, CallbackServerState};
use siteconnect_storage::{LayeredFlowStateRepository, MemoryNavigationSlot, MemorySessionStore};
use siteconnect_tests::*;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_popup_flow_over_http() {
    init_test_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/oauth/bing/auth-url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "auth_url": "https://www.bing.com/webmasters/oauth/authorize?state=b-1",
            "oauth_data": { "state": "b-1" },
            "trusted_origins": [server.uri()],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/oauth/bing/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "connected": true })))
        .mount(&server)
        .await;

    let bing = PlatformId::new("bing");
    let host = Arc::new(MockWindowHost::new(APP_URL));
    let flows = Arc::new(
        LayeredFlowStateRepository::new(Arc::new(MemorySessionStore::new()))
            .with_navigation_slot(Arc::new(MemoryNavigationSlot::new())),
    );
    let api = Arc::new(BackendApiClient::new(server.uri()).unwrap());
    let service = ConnectionService::new(
        ConnectConfig::default(),
        api,
        host.clone(),
        flows,
        create_shared_event_bus(),
    );

    assert_eq!(service.initiate(&bing).await.unwrap(), LaunchOutcome::Popup);
    assert!(service.trusted_origins().contains(&server.uri()));

    service.message_bus().post(callback_message(
        &server.uri(),
        "BING_OAUTH_SUCCESS",
        "b-1",
    ));
    assert_eq!(
        service.wait_for_outcome(&bing).await,
        Some(ListenerOutcome::Connected)
    );

    // A poll agrees with the callback
    service.status_poller().poll_once().await;
    let snapshot = service.store().snapshot();
    assert_eq!(snapshot.connected_platforms(), vec![bing.clone()]);
    assert_eq!(snapshot.detail(&bing).map(|d| d.connected), Some(true));
}

#[tokio::test]
async fn test_loopback_callback_page_over_http() {
    let flows = Arc::new(LayeredFlowStateRepository::new(Arc::new(
        MemorySessionStore::new(),
    )));
    flows
        .save(&PendingAuthFlow::new(wordpress(), "wp-state", "http://127.0.0.1/cb"))
        .await;

    let handle = start_callback_server(
        CallbackServerState {
            registry: Arc::new(PlatformRegistry::builtin()),
            flows,
            app_url: Url::parse(APP_URL).unwrap(),
        },
        0,
    )
    .await
    .unwrap();

    let uri = format!("{}?code=c-1&state=wp-state", handle.callback_uri(&wordpress()));
    let response = reqwest::get(&uri).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body = response.text().await.unwrap();
    assert!(body.contains("WORDPRESS_OAUTH_SUCCESS"));
    assert!(body.contains("wordpress_connected=true"));

    handle.shutdown();
}
