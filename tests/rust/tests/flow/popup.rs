//! Popup launch and callback message handling

use pretty_assertions::assert_eq;
use serde_json::json;
use siteconnect_flow::PopupHandle;
use siteconnect_tests::events::wait_for_event;
use siteconnect_tests::*;
use std::time::Duration;

/// Let the listener task drain whatever is queued on the message bus
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

fn wix_harness(state: &str) -> Harness {
    Harness::new(MockConnectionApi::new().with_auth_url(&wix(), auth_response(&wix(), state)))
}

#[tokio::test]
async fn test_successful_message_connects_and_closes_popup() {
    init_test_tracing();
    let h = wix_harness("state-abc");
    let mut events = h.events();

    let launched = h.service.initiate(&wix()).await.unwrap();
    assert_eq!(launched, LaunchOutcome::Popup);

    let popup = h.host.last_popup().expect("popup opened");
    assert_eq!(popup.name, "wix_oauth");
    assert_eq!(popup.features, "width=600,height=700,scrollbars=yes,resizable=yes");
    assert!(popup.url.contains("state=state-abc"));
    assert_eq!(h.service.message_bus().listener_count(), 1);
    assert!(h.service.is_pending(&wix()));

    h.service.message_bus().post(callback_message(
        BACKEND_ORIGIN,
        "WIX_OAUTH_SUCCESS",
        "state-abc",
    ));

    let outcome = h.service.wait_for_outcome(&wix()).await;
    assert_eq!(outcome, Some(ListenerOutcome::Connected));

    assert!(h.service.store().is_connected(&wix()));
    assert!(popup.handle.is_closed());
    assert_eq!(popup.handle.close_calls(), 1);
    assert_eq!(h.service.message_bus().listener_count(), 0);
    assert!(!h.service.is_pending(&wix()));
    assert!(h.flows.load_latest(&wix()).await.is_none());
    assert!(h.flows.take_return_to(&wix()).await.is_none());

    let added = wait_for_event(&mut events, EVENT_TIMEOUT, |e| {
        matches!(e, DomainEvent::ConnectionAdded { .. })
    })
    .await;
    assert_eq!(added, Some(DomainEvent::ConnectionAdded { platform: wix() }));
}

#[tokio::test]
async fn test_message_from_untrusted_origin_is_ignored() {
    let h = wix_harness("state-abc");
    h.service.initiate(&wix()).await.unwrap();

    h.service.message_bus().post(callback_message(
        "https://evil.example.com",
        "WIX_OAUTH_SUCCESS",
        "state-abc",
    ));
    settle().await;

    assert!(!h.service.store().is_connected(&wix()));
    assert!(h.service.is_pending(&wix()));
    assert_eq!(h.service.message_bus().listener_count(), 1);
    assert!(!h.host.last_popup().unwrap().handle.is_closed());

    // Listener is still waiting for the real callback
    h.service.message_bus().post(callback_message(
        BACKEND_ORIGIN,
        "WIX_OAUTH_SUCCESS",
        "state-abc",
    ));
    assert_eq!(
        h.service.wait_for_outcome(&wix()).await,
        Some(ListenerOutcome::Connected)
    );
}

#[tokio::test]
async fn test_message_with_mismatched_state_is_ignored() {
    let h = wix_harness("state-abc");
    h.service.initiate(&wix()).await.unwrap();

    h.service.message_bus().post(callback_message(
        BACKEND_ORIGIN,
        "WIX_OAUTH_SUCCESS",
        "state-from-an-older-tab",
    ));
    settle().await;

    assert!(!h.service.store().is_connected(&wix()));
    assert!(h.service.is_pending(&wix()));
    assert!(h.flows.load_by_state(&wix(), "state-abc").await.is_some());
}

#[tokio::test]
async fn test_foreign_and_malformed_messages_are_ignored() {
    let h = wix_harness("state-abc");
    h.service.initiate(&wix()).await.unwrap();

    let bus = h.service.message_bus();
    bus.post(callback_message(BACKEND_ORIGIN, "BING_OAUTH_SUCCESS", "state-abc"));
    bus.post(WindowMessage::new(BACKEND_ORIGIN, json!("WIX_OAUTH_SUCCESS")));
    bus.post(WindowMessage::new(BACKEND_ORIGIN, json!({ "source": "react-devtools" })));
    bus.post(WindowMessage::new(
        BACKEND_ORIGIN,
        json!({ "type": "WIX_OAUTH_SUCCESS" }),
    ));
    settle().await;

    assert!(!h.service.store().is_connected(&wix()));
    assert!(h.service.is_pending(&wix()));
}

#[tokio::test]
async fn test_error_message_fails_flow() {
    let h = wix_harness("state-abc");
    let mut events = h.events();
    h.service.initiate(&wix()).await.unwrap();

    h.service.message_bus().post(WindowMessage::new(
        BACKEND_ORIGIN,
        json!({
            "type": "WIX_OAUTH_ERROR",
            "state": "state-abc",
            "error": "access_denied",
            "error_description": "User cancelled",
        }),
    ));

    let outcome = h.service.wait_for_outcome(&wix()).await;
    assert_eq!(
        outcome,
        Some(ListenerOutcome::Failed("access_denied: User cancelled".to_string()))
    );
    assert!(!h.service.store().is_connected(&wix()));
    assert!(h.host.last_popup().unwrap().handle.is_closed());
    assert!(h.flows.load_latest(&wix()).await.is_none());

    let failed = wait_for_event(&mut events, EVENT_TIMEOUT, |e| {
        matches!(e, DomainEvent::FlowFailed { .. })
    })
    .await;
    assert_eq!(
        failed,
        Some(DomainEvent::FlowFailed {
            platform: wix(),
            error: "access_denied: User cancelled".to_string(),
        })
    );
}

#[tokio::test]
async fn test_blocked_popup_falls_back_to_redirect() {
    let h = Harness::build(
        MockConnectionApi::new().with_auth_url(&wix(), auth_response(&wix(), "state-abc")),
        MockWindowHost::new(APP_URL).blocking_popups(),
        ConnectConfig::default(),
    );
    let mut events = h.events();

    let launched = h.service.initiate(&wix()).await.unwrap();
    assert_eq!(launched, LaunchOutcome::PopupBlocked);

    assert!(h.host.popups().is_empty());
    assert_eq!(
        h.host.navigations(),
        vec!["https://auth.wix.example/authorize?client_id=abc&state=state-abc".to_string()]
    );
    assert_eq!(h.service.message_bus().listener_count(), 0);

    // State must survive the navigation
    let persisted = h.flows.load_by_state(&wix(), "state-abc").await.unwrap();
    assert_eq!(persisted.verifier.as_deref(), Some("verifier-state-abc"));

    let blocked = wait_for_event(&mut events, EVENT_TIMEOUT, |e| {
        matches!(e, DomainEvent::PopupBlocked { .. })
    })
    .await;
    assert_eq!(blocked, Some(DomainEvent::PopupBlocked { platform: wix() }));
}

#[tokio::test]
async fn test_legacy_endpoint_and_custom_message_types() {
    let h = Harness::new(MockConnectionApi::new().with_legacy_auth_url(
        &gsc(),
        AuthUrlResponse {
            auth_url: Some(
                "https://accounts.google.com/o/oauth2/auth?client_id=g&state=g-state".to_string(),
            ),
            trusted_origins: vec![BACKEND_ORIGIN.to_string()],
            ..Default::default()
        },
    ));

    assert_eq!(h.service.initiate(&gsc()).await.unwrap(), LaunchOutcome::Popup);
    assert_eq!(h.api.auth_url_calls(), 0);
    assert_eq!(h.host.last_popup().unwrap().name, "gsc_oauth");

    // The generic discriminator is not the one Search Console uses
    h.service.message_bus().post(callback_message(
        BACKEND_ORIGIN,
        "GSC_OAUTH_SUCCESS",
        "g-state",
    ));
    settle().await;
    assert!(!h.service.store().is_connected(&gsc()));

    h.service.message_bus().post(callback_message(
        BACKEND_ORIGIN,
        "GSC_AUTH_SUCCESS",
        "g-state",
    ));
    assert_eq!(
        h.service.wait_for_outcome(&gsc()).await,
        Some(ListenerOutcome::Connected)
    );
    assert!(h.service.store().is_connected(&gsc()));
}

#[tokio::test]
async fn test_configured_origin_is_trusted() {
    let mut response = auth_response(&wix(), "state-abc");
    response.trusted_origins.clear();

    let config = ConnectConfig {
        configured_origin: Some("https://callback.example.net".to_string()),
        ..Default::default()
    };
    let h = Harness::build(
        MockConnectionApi::new().with_auth_url(&wix(), response),
        MockWindowHost::new(APP_URL),
        config,
    );
    h.service.initiate(&wix()).await.unwrap();

    let trusted = h.service.trusted_origins();
    assert!(trusted.contains("https://callback.example.net"));
    assert!(trusted.contains(APP_ORIGIN));
    assert!(!trusted.contains(BACKEND_ORIGIN));

    h.service.message_bus().post(callback_message(
        "https://callback.example.net",
        "WIX_OAUTH_SUCCESS",
        "state-abc",
    ));
    assert_eq!(
        h.service.wait_for_outcome(&wix()).await,
        Some(ListenerOutcome::Connected)
    );
}

#[tokio::test(start_paused = true)]
async fn test_success_schedules_return_navigation() {
    let config = ConnectConfig {
        success_redirect_path: Some("/dashboard".to_string()),
        ..Default::default()
    };
    let h = Harness::build(
        MockConnectionApi::new().with_auth_url(&wix(), auth_response(&wix(), "state-abc")),
        MockWindowHost::new(APP_URL),
        config,
    );
    let mut events = h.events();
    h.service.initiate(&wix()).await.unwrap();

    h.service.message_bus().post(callback_message(
        BACKEND_ORIGIN,
        "WIX_OAUTH_SUCCESS",
        "state-abc",
    ));
    h.service.wait_for_outcome(&wix()).await;

    let scheduled = wait_for_event(&mut events, EVENT_TIMEOUT, |e| {
        matches!(e, DomainEvent::SuccessRedirectScheduled { .. })
    })
    .await;
    assert_eq!(
        scheduled,
        Some(DomainEvent::SuccessRedirectScheduled {
            platform: wix(),
            path: "/dashboard".to_string(),
        })
    );
    assert!(h.host.navigations().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.host.navigations(), vec!["/dashboard".to_string()]);
}
