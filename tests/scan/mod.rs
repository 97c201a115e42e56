//! Scan session tests against fake `sh` scanners.

mod registry_test;
mod session_test;
mod stream_test;

use std::time::Duration;

use scan_relay::scan::{ScanCommand, ScanRegistry, ScanStatus, SessionOptions};

/// A scanner that runs `script` under `sh`; the scan flags land in `$@`.
pub fn fake_scanner(script: &str) -> ScanCommand {
    ScanCommand::new("sh").prefix_args(["-c", script, "fake-scanner"])
}

/// Registry with a fast heartbeat so tests finish quickly.
pub fn registry(script: &str) -> ScanRegistry {
    registry_with(script, SessionOptions::default())
}

pub fn registry_with(script: &str, options: SessionOptions) -> ScanRegistry {
    let options = SessionOptions {
        heartbeat: Duration::from_millis(50),
        ..options
    };
    ScanRegistry::new(fake_scanner(script), options)
}

/// Poll status until the session is done.
pub async fn wait_done(registry: &ScanRegistry, id: &str) -> ScanStatus {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let status = registry.status(id).await.expect("session exists");
            if status.done {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("session finished in time")
}

/// Verify the public scan types are exported from the library.
#[test]
fn test_all_scan_types_exported() {
    use scan_relay::scan::{
        extract_progress, sanitize_line, tokenize_skip_list, EventLog, Progress, PumpRole,
        ScanError, ScanEvent, ScanSession, SessionId,
    };

    let _ = EventLog::new();
    let _ = ScanSession::new(SessionId::generate(), "example.com", None);
    let _ = PumpRole::Primary;
    let _ = ScanEvent::Complete;
    let _: fn() -> ScanError = ScanError::target_required;

    assert_eq!(extract_progress("Deploying 1/2"), Some(Progress::new(1, 2)));
    assert_eq!(sanitize_line("\x1b[1mbold\x1b[0m"), "bold");
    assert_eq!(tokenize_skip_list("a,b"), vec!["a", "b"]);
}
