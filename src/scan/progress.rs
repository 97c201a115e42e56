//! Progress extraction from scanner output lines.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DEPLOYING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Deploying\s+(\d+)/(\d+)").expect("progress pattern is valid")
});

/// Scan completion counters as reported by the scanner.
///
/// `current <= total` is not enforced; the values are relayed as printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Number of the tool currently being run.
    #[serde(rename = "progress")]
    pub current: u64,
    /// Total number of tools in the scan.
    pub total: u64,
}

impl Progress {
    /// Create a progress pair.
    #[must_use]
    pub fn new(current: u64, total: u64) -> Self {
        Self { current, total }
    }
}

/// Extract a `Deploying <current>/<total>` pair from a sanitized line.
///
/// Returns `None` when the pattern is absent or either number does not fit
/// in a `u64`.
#[must_use]
pub fn extract_progress(line: &str) -> Option<Progress> {
    let caps = DEPLOYING.captures(line)?;
    let current = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some(Progress { current, total })
}
