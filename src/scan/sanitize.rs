//! Terminal escape sequence removal for scanner output.

use std::sync::LazyLock;

use regex::Regex;

/// CSI sequences, OSC sequences (BEL or ST terminated) and two-byte `ESC Fe`
/// sequences. `ESC [` and `ESC ]` are only stripped as part of a complete
/// sequence.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1B]*(?:\x07|\x1B\\)|[@-Z\\^_])")
        .expect("ANSI escape pattern is valid")
});

/// Remove terminal control sequences and the trailing line terminator.
#[must_use]
pub fn sanitize_line(line: &str) -> String {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    ANSI_ESCAPE.replace_all(line, "").into_owned()
}

/// Split one raw chunk read up to `\n` into display lines.
///
/// Carriage returns inside the chunk start a new line, so progress redraws
/// (`"50%\r60%\r"`) arrive as separate lines. A lone `"\r\n"` terminator
/// counts as one line break.
#[must_use]
pub fn split_lines(raw: &str) -> Vec<String> {
    let raw = raw.strip_suffix('\n').unwrap_or(raw);
    let raw = raw.strip_suffix('\r').unwrap_or(raw);
    raw.split('\r').map(sanitize_line).collect()
}
