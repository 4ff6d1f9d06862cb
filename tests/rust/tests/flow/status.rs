//! Connection status store, disconnect and polling

use pretty_assertions::assert_eq;
use siteconnect_core::{ConnectedSite, ConnectionStatusStore};
use siteconnect_flow::StatusResponse;
use siteconnect_tests::events::collect_events;
use siteconnect_tests::*;
use std::time::Duration;

#[tokio::test]
async fn test_add_is_idempotent() {
    let h = Harness::new(MockConnectionApi::new());
    let mut events = h.events();
    let store = h.service.store();

    assert!(store.add(&wix()));
    let after_first = store.snapshot();
    assert!(!store.add(&wix()));

    assert_eq!(store.connected_platforms(), vec![wix()]);
    assert_eq!(store.snapshot().connected, after_first.connected);

    let added: Vec<_> = collect_events(&mut events, EVENT_TIMEOUT)
        .await
        .into_iter()
        .filter(|e| matches!(e, DomainEvent::ConnectionAdded { .. }))
        .collect();
    assert_eq!(added.len(), 1);
}

#[tokio::test]
async fn test_remove_absent_is_noop() {
    let store = ConnectionStatusStore::new();
    store.add(&wix());
    let before = store.snapshot();

    assert!(!store.remove(&gsc()));
    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn test_subscribers_observe_changes() {
    let store = ConnectionStatusStore::new();
    let mut rx = store.subscribe();

    store.add(&wix());
    rx.changed().await.unwrap();
    assert!(rx.borrow().is_connected(&wix()));

    store.remove(&wix());
    rx.changed().await.unwrap();
    assert!(rx.borrow().connected.is_empty());
}

#[tokio::test]
async fn test_disconnect_removes_platform() {
    let h = Harness::new(MockConnectionApi::new());
    let mut events = h.events();
    h.service.store().add(&wix());

    h.service.disconnect(&wix()).await.unwrap();

    assert_eq!(h.api.disconnected(), vec![wix()]);
    assert!(!h.service.store().is_connected(&wix()));
    assert!(collect_events(&mut events, EVENT_TIMEOUT)
        .await
        .contains(&DomainEvent::ConnectionRemoved { platform: wix() }));
}

#[tokio::test]
async fn test_disconnect_cancels_pending_flow() {
    let h = Harness::new(
        MockConnectionApi::new().with_auth_url(&wix(), auth_response(&wix(), "state-abc")),
    );
    h.service.initiate(&wix()).await.unwrap();

    h.service.disconnect(&wix()).await.unwrap();

    assert!(!h.service.is_pending(&wix()));
    assert_eq!(h.service.message_bus().listener_count(), 0);
    assert!(h.flows.load_latest(&wix()).await.is_none());
}

#[tokio::test]
async fn test_poll_once_refreshes_details() {
    let h = Harness::new(MockConnectionApi::new());
    h.api.set_status(
        &wix(),
        StatusResponse {
            connected: true,
            sites: vec![ConnectedSite {
                url: "https://shop.example.com".to_string(),
                name: "Shop".to_string(),
            }],
            last_sync: None,
        },
    );

    let poller = h.service.status_poller();
    assert_eq!(poller.poll_once().await, 4);

    let snapshot = h.service.store().snapshot();
    assert_eq!(snapshot.connected_platforms(), vec![wix()]);
    let detail = snapshot.detail(&wix()).unwrap();
    assert_eq!(detail.sites.len(), 1);
    assert!(detail.last_sync.is_some());
    assert_eq!(snapshot.detail(&gsc()).map(|d| d.connected), Some(false));
}

#[tokio::test]
async fn test_failed_poll_keeps_previous_detail() {
    let h = Harness::new(MockConnectionApi::new());
    h.api.set_status(
        &wix(),
        StatusResponse {
            connected: true,
            ..Default::default()
        },
    );
    let poller = h.service.status_poller();
    poller.poll_once().await;

    h.api.fail_status(&wix());
    assert_eq!(poller.poll_once().await, 3);
    assert!(h.service.store().is_connected(&wix()));
}

#[tokio::test]
async fn test_poll_disconnects_platform_reported_gone() {
    let h = Harness::new(MockConnectionApi::new());
    h.service.store().add(&wix());

    // Backend says nothing is connected any more
    h.service.status_poller().poll_once().await;
    assert!(!h.service.store().is_connected(&wix()));
}

#[tokio::test(start_paused = true)]
async fn test_poller_runs_until_shutdown() {
    let h = Harness::new(MockConnectionApi::new());
    let (task, shutdown) = h.service.status_poller().spawn();

    h.api.set_status(
        &wix(),
        StatusResponse {
            connected: true,
            ..Default::default()
        },
    );
    tokio::time::sleep(Duration::from_secs(301)).await;
    assert!(h.service.store().is_connected(&wix()));

    shutdown.cancel();
    task.await.unwrap();
}
