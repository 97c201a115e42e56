//! Tests for the session registry and its lifecycle policies.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use scan_relay::scan::{ScanError, SessionOptions};
use tokio_util::sync::CancellationToken;

use super::{registry, registry_with, wait_done};

#[tokio::test]
async fn start_scan_issues_fresh_ids() {
    let registry = registry("echo hi");
    let mut seen = HashSet::new();

    for _ in 0..5 {
        let id = registry.start_scan("example.com", "").await.unwrap();
        assert!(seen.insert(id));
    }

    assert_eq!(registry.len().await, 5);
    for id in registry.ids().await {
        assert!(seen.contains(&id));
    }
}

#[tokio::test]
async fn blank_target_registers_nothing() {
    let registry = registry("echo hi");

    for target in ["", "   ", "\t\n"] {
        let err = registry.start_scan(target, "nmap").await.unwrap_err();
        assert!(matches!(err, ScanError::InvalidInput(ref msg) if msg == "target is required"));
    }

    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn unknown_id_is_not_found_everywhere() {
    let registry = registry("echo hi");

    assert!(matches!(
        registry.status("unknown").await,
        Err(ScanError::NotFound(_))
    ));
    assert!(matches!(
        registry.stop_scan("unknown").await,
        Err(ScanError::NotFound(_))
    ));
    assert!(matches!(
        registry.stream_events("unknown").await,
        Err(ScanError::NotFound(_))
    ));
}

#[tokio::test]
async fn concurrent_starts_are_all_registered() {
    let registry = Arc::new(registry("echo hi"));

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.start_scan(&format!("host-{i}"), "").await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap());
    }

    assert_eq!(ids.len(), 8);
    assert_eq!(registry.len().await, 8);
}

#[tokio::test]
async fn grace_period_force_kills_stubborn_scanner() {
    let options = SessionOptions {
        stop_grace: Some(Duration::from_millis(200)),
        ..SessionOptions::default()
    };
    let registry = registry_with(
        "trap '' INT TERM; echo stubborn; while true; do sleep 0.1; done",
        options,
    );
    let id = registry.start_scan("example.com", "").await.unwrap();
    let session = registry.get(id.as_str()).await.unwrap();

    let mut cursor = session.subscribe();
    assert_eq!(
        cursor.next_timeout(Duration::from_secs(5)).await.as_deref(),
        Some("stubborn")
    );

    registry.stop_scan(id.as_str()).await.unwrap();
    let status = wait_done(&registry, id.as_str()).await;

    assert!(status.done);
    assert_eq!(session.exit_code(), None);
}

#[tokio::test]
async fn reaper_evicts_finished_sessions() {
    let options = SessionOptions {
        ttl: Some(Duration::ZERO),
        reap_interval: Duration::from_millis(20),
        ..SessionOptions::default()
    };
    let registry = Arc::new(registry_with("echo hi", options));
    let id = registry.start_scan("example.com", "").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    let cancel = CancellationToken::new();
    let reaper = registry.spawn_reaper(cancel.clone()).expect("ttl configured");

    tokio::time::timeout(Duration::from_secs(5), async {
        while !registry.is_empty().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session reaped");

    cancel.cancel();
    reaper.await.unwrap();
    assert!(matches!(
        registry.status(id.as_str()).await,
        Err(ScanError::NotFound(_))
    ));
}
