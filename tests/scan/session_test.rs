//! Tests for session lifecycle: spawning, pumping, completion and stop.

use std::time::Duration;

use scan_relay::scan::{ScanCommand, ScanError, ScanSession, SessionId};

use super::{fake_scanner, registry, wait_done};

fn collect_lines(session: &ScanSession) -> Vec<String> {
    let mut cursor = session.subscribe();
    std::iter::from_fn(|| cursor.try_next()).collect()
}

#[tokio::test]
async fn progress_from_scanner_output() {
    let registry = registry(r#"echo "Deploying 1/10 | nmap"; echo "Deploying 5/10 | whois""#);
    let id = registry.start_scan("example.com", "").await.unwrap();

    let status = wait_done(&registry, id.as_str()).await;

    assert_eq!((status.progress, status.total, status.done), (5, 10, true));
    let session = registry.get(id.as_str()).await.unwrap();
    assert_eq!(session.exit_code(), Some(0));
    assert!(session.pid().is_some());
    assert_eq!(session.line_count(), 2);
    let finished = session.finished_at().expect("finish time recorded");
    assert!(session.started_at() <= finished);
}

#[tokio::test]
async fn scanner_receives_flags_in_order() {
    let registry = registry(r#"printf '%s\n' "$@""#);
    let id = registry.start_scan("  example.com ", "a, b  c").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    let session = registry.get(id.as_str()).await.unwrap();
    assert_eq!(session.target(), "example.com");
    assert_eq!(
        collect_lines(&session),
        vec!["-n", "--skip", "a", "--skip", "b", "--skip", "c", "example.com"]
    );
}

#[tokio::test]
async fn whitespace_skip_list_adds_no_flags() {
    let registry = registry(r#"printf '%s\n' "$@""#);
    let id = registry.start_scan("10.0.0.1", "   ").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    let session = registry.get(id.as_str()).await.unwrap();
    assert_eq!(collect_lines(&session), vec!["-n", "10.0.0.1"]);
}

#[tokio::test]
async fn stderr_is_captured() {
    let registry = registry("echo to-stdout; echo to-stderr >&2");
    let id = registry.start_scan("example.com", "").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    let session = registry.get(id.as_str()).await.unwrap();
    let lines = collect_lines(&session);
    assert_eq!(lines.len(), 2);
    assert!(lines.contains(&"to-stdout".to_string()));
    assert!(lines.contains(&"to-stderr".to_string()));
}

#[tokio::test]
async fn stderr_does_not_update_progress() {
    let registry = registry(r#"echo "Deploying 4/8" >&2"#);
    let id = registry.start_scan("example.com", "").await.unwrap();

    let status = wait_done(&registry, id.as_str()).await;
    assert_eq!((status.progress, status.total), (0, 0));
}

#[tokio::test]
async fn control_sequences_are_stripped() {
    let registry = registry(r"printf '\033[1m\033[92mPASS\033[0m port 80\n'");
    let id = registry.start_scan("example.com", "").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    let session = registry.get(id.as_str()).await.unwrap();
    assert_eq!(collect_lines(&session), vec!["PASS port 80"]);
}

#[tokio::test]
async fn nonzero_exit_is_recorded() {
    let registry = registry("echo failing; exit 3");
    let id = registry.start_scan("example.com", "").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    let session = registry.get(id.as_str()).await.unwrap();
    assert_eq!(session.exit_code(), Some(3));
}

#[tokio::test]
async fn stop_interrupts_running_scan() {
    let registry = registry(
        "trap 'echo interrupted; exit 130' INT; echo ready; while true; do sleep 0.1; done",
    );
    let id = registry.start_scan("example.com", "").await.unwrap();
    let session = registry.get(id.as_str()).await.unwrap();

    let mut cursor = session.subscribe();
    let first = cursor.next_timeout(Duration::from_secs(5)).await;
    assert_eq!(first.as_deref(), Some("ready"));
    assert!(!session.is_done());

    registry.stop_scan(id.as_str()).await.unwrap();
    wait_done(&registry, id.as_str()).await;

    assert!(collect_lines(&session).contains(&"interrupted".to_string()));
    assert_eq!(session.exit_code(), Some(130));
}

#[tokio::test]
async fn stop_after_exit_is_noop() {
    let registry = registry("echo done");
    let id = registry.start_scan("example.com", "").await.unwrap();
    wait_done(&registry, id.as_str()).await;

    tokio_test::assert_ok!(registry.stop_scan(id.as_str()).await);
    tokio_test::assert_ok!(registry.stop_scan(id.as_str()).await);

    let status = registry.status(id.as_str()).await.unwrap();
    assert!(status.done);
}

#[tokio::test]
async fn start_directly_rejects_empty_target() {
    let err = ScanSession::start(SessionId::generate(), &fake_scanner("echo"), "", "")
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidInput(_)));
}

#[tokio::test]
async fn start_directly_reports_spawn_failure() {
    let command = ScanCommand::new("/nonexistent/rapidscan");
    let err = ScanSession::start(SessionId::generate(), &command, "example.com", "").unwrap_err();
    assert!(matches!(err, ScanError::SpawnFailure { .. }));
}
