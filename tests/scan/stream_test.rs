//! Tests for the event stream adapter against live sessions.

use futures_util::StreamExt;
use scan_relay::scan::{Progress, ScanEvent};

use super::{registry, wait_done};

fn data_lines(events: &[ScanEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::Data(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn stream_ends_with_single_complete() {
    let registry = registry(r#"echo "Deploying 1/10"; echo "Deploying 5/10""#);
    let id = registry.start_scan("example.com", "").await.unwrap();

    let events: Vec<ScanEvent> = registry
        .stream_events(id.as_str())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.last(), Some(&ScanEvent::Complete));
    assert_eq!(events.iter().filter(|e| e.is_complete()).count(), 1);
    assert_eq!(data_lines(&events), vec!["Deploying 1/10", "Deploying 5/10"]);

    // The progress immediately before `complete` matches a later status poll.
    let last_progress = events
        .iter()
        .rev()
        .find_map(|event| match event {
            ScanEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_progress, Progress::new(5, 10));

    let status = registry.status(id.as_str()).await.unwrap();
    assert_eq!(status.progress_pair(), last_progress);
    assert!(status.done);
}

#[tokio::test]
async fn every_data_event_is_followed_by_progress() {
    let registry = registry("echo one; echo two; echo three");
    let id = registry.start_scan("example.com", "").await.unwrap();

    let events: Vec<ScanEvent> = registry
        .stream_events(id.as_str())
        .await
        .unwrap()
        .collect()
        .await;

    for pair in events.windows(2) {
        if matches!(pair[0], ScanEvent::Data(_)) {
            assert!(matches!(pair[1], ScanEvent::Progress(_)));
        }
    }
}

#[tokio::test]
async fn stderr_lines_precede_complete() {
    let registry = registry("echo out; sleep 0.2; echo late-err >&2");
    let id = registry.start_scan("example.com", "").await.unwrap();

    let events: Vec<ScanEvent> = registry
        .stream_events(id.as_str())
        .await
        .unwrap()
        .collect()
        .await;

    let lines = data_lines(&events);
    assert!(lines.contains(&"late-err".to_string()));
    assert_eq!(events.last(), Some(&ScanEvent::Complete));
}

#[tokio::test]
async fn subscribing_after_completion_replays_output() {
    let registry = registry("echo early");
    let id = registry.start_scan("example.com", "").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    let events: Vec<ScanEvent> = registry
        .stream_events(id.as_str())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            ScanEvent::Data("early".to_string()),
            ScanEvent::Progress(Progress::default()),
            ScanEvent::Complete,
        ]
    );
}

#[tokio::test]
async fn concurrent_subscribers_see_same_lines() {
    let registry = registry("sleep 0.2; for i in 1 2 3 4 5; do echo line $i; sleep 0.05; done");
    let id = registry.start_scan("example.com", "").await.unwrap();

    let first = registry.stream_events(id.as_str()).await.unwrap();
    let second = registry.stream_events(id.as_str()).await.unwrap();

    let (first, second): (Vec<ScanEvent>, Vec<ScanEvent>) =
        tokio::join!(first.collect(), second.collect());

    let expected: Vec<String> = (1..=5).map(|i| format!("line {i}")).collect();
    assert_eq!(data_lines(&first), expected);
    assert_eq!(data_lines(&second), expected);
    assert_eq!(first.last(), Some(&ScanEvent::Complete));
    assert_eq!(second.last(), Some(&ScanEvent::Complete));
}

#[tokio::test]
async fn quiet_scanner_still_gets_heartbeats() {
    let registry = registry("sleep 0.5");
    let id = registry.start_scan("example.com", "").await.unwrap();

    let events: Vec<ScanEvent> = registry
        .stream_events(id.as_str())
        .await
        .unwrap()
        .collect()
        .await;

    let heartbeats = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::Progress(_)))
        .count();
    assert!(heartbeats >= 3, "expected periodic progress, got {heartbeats}");
    assert!(data_lines(&events).is_empty());
}
