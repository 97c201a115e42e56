//! Colored terminal output for the `scan` command.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::scan::{Progress, ScanSession};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Render a progress pair as `current/total (pct%)`.
#[must_use]
pub fn format_progress(progress: Progress) -> String {
    if progress.total == 0 {
        return format!("{}/{}", progress.current, progress.total);
    }
    let pct = progress.current.saturating_mul(100) / progress.total;
    format!("{}/{} ({pct}%)", progress.current, progress.total)
}

/// Render the time between two instants as `1m 05s` or `3.2s`.
#[must_use]
pub fn format_elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let millis = (end - start).num_milliseconds().max(0);
    let secs = millis / 1000;
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}.{}s", (millis % 1000) / 100)
    }
}

/// Print scan session start information.
pub fn print_scan_start(session: &ScanSession) {
    let pid = session
        .pid()
        .map_or_else(|| "unknown".to_string(), |p| p.to_string());
    println!(
        "{} {} target={}, session={}, pid={}",
        timestamp().dimmed(),
        "[SCAN]".blue().bold(),
        session.target().cyan(),
        session.id().as_str().dimmed(),
        pid
    );
    let _ = io::stdout().flush();
}

/// Print one line of scanner output.
pub fn print_line(line: &str) {
    println!("{line}");
    let _ = io::stdout().flush();
}

/// Print a progress change.
pub fn print_progress(progress: Progress) {
    println!(
        "{} {} {}",
        timestamp().dimmed(),
        "[PROGRESS]".yellow().bold(),
        format_progress(progress)
    );
    let _ = io::stdout().flush();
}

/// Print that a stop was requested.
pub fn print_stopping() {
    println!(
        "{} {} Stop requested, waiting for scanner to exit",
        timestamp().dimmed(),
        "[SCAN]".red().bold()
    );
    let _ = io::stdout().flush();
}

/// Print the final status of a session.
pub fn print_complete(session: &ScanSession) {
    let progress = format_progress(session.snapshot().progress_pair());
    let elapsed = format_elapsed(
        session.started_at(),
        session.finished_at().unwrap_or_else(Utc::now),
    );
    let summary = format!(
        "progress={progress}, lines={}, elapsed={elapsed}",
        session.line_count()
    );
    let ts = timestamp();
    match session.exit_code() {
        Some(0) => println!(
            "{} {} Scan finished, {}",
            ts.dimmed(),
            "[DONE]".green().bold(),
            summary
        ),
        Some(code) => println!(
            "{} {} Scan exited with code {}, {}",
            ts.dimmed(),
            "[DONE]".red().bold(),
            code,
            summary
        ),
        None => println!(
            "{} {} Scan terminated by signal, {}",
            ts.dimmed(),
            "[DONE]".red().bold(),
            summary
        ),
    }
    let _ = io::stdout().flush();
}
