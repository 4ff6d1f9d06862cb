//! Layered repository over in-memory browser storage

use pretty_assertions::assert_eq;
use siteconnect_core::{keys, SaveReport};
use siteconnect_storage::{LayeredFlowStateRepository, MemoryNavigationSlot, MemorySessionStore};
use siteconnect_tests::*;
use std::sync::Arc;
use std::time::Duration;

fn repo() -> (
    LayeredFlowStateRepository,
    Arc<MemorySessionStore>,
    Arc<MemoryNavigationSlot>,
) {
    let session = Arc::new(MemorySessionStore::new());
    let slot = Arc::new(MemoryNavigationSlot::new());
    let repo = LayeredFlowStateRepository::new(session.clone()).with_navigation_slot(slot.clone());
    (repo, session, slot)
}

#[tokio::test]
async fn test_save_then_load_by_state() {
    let (repo, session, _) = repo();
    let flow = PendingAuthFlow::new(wix(), "state-abc", "https://api.example.com/cb")
        .with_verifier("verifier-abc")
        .with_nonce("nonce-1");

    let report = repo.save(&flow).await;
    assert_eq!(
        report,
        SaveReport {
            latest: true,
            by_state: true,
            navigation: true,
        }
    );

    let mut stored = session.keys();
    stored.sort();
    assert_eq!(
        stored,
        vec![
            keys::flow_data(&wix()),
            keys::flow_data_for_state(&wix(), "state-abc"),
        ]
    );

    let loaded = repo.load_by_state(&wix(), "state-abc").await.unwrap();
    assert_eq!(loaded, flow);
    assert!(repo.load_by_state(&wix(), "other").await.is_none());
    assert!(repo.load_by_state(&gsc(), "state-abc").await.is_none());
}

#[tokio::test]
async fn test_older_flow_reachable_by_state_after_newer_save() {
    let (repo, _, _) = repo();
    let old = PendingAuthFlow::new(wix(), "old-state", "r");
    let new = PendingAuthFlow::new(wix(), "new-state", "r");
    repo.save(&old).await;
    repo.save(&new).await;

    assert_eq!(repo.load_latest(&wix()).await, Some(new.clone()));
    assert_eq!(repo.load_by_state(&wix(), "old-state").await, Some(old));

    // Clearing the stale flow leaves the newer one alone
    repo.clear(&wix(), Some("old-state")).await;
    assert_eq!(repo.load_by_state(&wix(), "new-state").await, Some(new));
}

#[tokio::test]
async fn test_navigation_segments_are_per_platform() {
    let (repo, _, slot) = repo();
    let wix_flow = PendingAuthFlow::new(wix(), "w", "r");
    let gsc_flow = PendingAuthFlow::new(gsc(), "g", "r");
    repo.save(&wix_flow).await;
    repo.save(&gsc_flow).await;

    let value = slot.get().unwrap();
    assert!(value.contains("WIX_OAUTH::"));
    assert!(value.contains("GSC_OAUTH::"));

    repo.clear(&wix(), None).await;
    let value = slot.get().unwrap();
    assert!(!value.contains("WIX_OAUTH::"));
    assert_eq!(repo.load_latest(&gsc()).await, Some(gsc_flow));
}

#[tokio::test]
async fn test_foreign_window_name_content_preserved() {
    let session = Arc::new(MemorySessionStore::new());
    let slot = Arc::new(MemoryNavigationSlot::with_value("analytics-widget"));
    let repo = LayeredFlowStateRepository::new(session).with_navigation_slot(slot.clone());

    let flow = PendingAuthFlow::new(wix(), "w", "r");
    repo.save(&flow).await;
    repo.clear(&wix(), Some("w")).await;

    assert_eq!(slot.get().as_deref(), Some("analytics-widget"));
}

#[tokio::test]
async fn test_expired_flow_is_absent() {
    let session = Arc::new(MemorySessionStore::new());
    let repo = LayeredFlowStateRepository::new(session).with_ttl(Duration::from_secs(180));

    let mut flow = PendingAuthFlow::new(wix(), "w", "r");
    flow.created_at = chrono::Utc::now() - chrono::Duration::seconds(181);
    repo.save(&flow).await;

    assert!(repo.load_by_state(&wix(), "w").await.is_none());
    assert!(repo.load_latest(&wix()).await.is_none());
}

#[tokio::test]
async fn test_return_to_and_client_id() {
    let (repo, _, _) = repo();

    assert!(repo.remember_return_to(&wix(), APP_URL).await);
    assert!(!repo.remember_return_to(&wix(), "https://app.example.com/other").await);
    assert_eq!(repo.take_return_to(&wix()).await.as_deref(), Some(APP_URL));
    assert!(repo.take_return_to(&wix()).await.is_none());

    repo.save_client_id(&wordpress(), "wp-123").await;
    assert_eq!(repo.load_client_id(&wordpress()).await.as_deref(), Some("wp-123"));
    assert!(repo.load_client_id(&wix()).await.is_none());
}
