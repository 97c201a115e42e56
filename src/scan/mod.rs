//! Scan session core: process spawning, output pumping, progress tracking
//! and event streaming.

mod command;
mod error;
mod log;
mod progress;
mod pump;
mod registry;
mod sanitize;
mod session;
mod stream;

pub use command::*;
pub use error::ScanError;
pub use log::{EventLog, LogCursor};
pub use progress::{extract_progress, Progress};
pub use pump::{pump_lines, PumpRole};
pub use registry::{ScanRegistry, SessionOptions};
pub use sanitize::{sanitize_line, split_lines};
pub use session::{ScanSession, ScanStatus, SessionId};
pub use stream::{event_stream, ScanEvent, DEFAULT_HEARTBEAT, MIN_HEARTBEAT};
