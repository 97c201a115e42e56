//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scan::{ScanCommand, SessionOptions, DEFAULT_NON_INTERACTIVE_FLAG, MIN_HEARTBEAT};

/// Default port for the HTTP server.
pub const DEFAULT_PORT: u16 = 8000;

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// How the scanner is launched.
    pub scanner: ScannerConfig,
    /// Event stream settings.
    pub stream: StreamConfig,
    /// Session lifecycle policy.
    pub sessions: SessionsConfig,
}

impl RelayConfig {
    /// Build the session policy from the `[stream]` and `[sessions]` sections.
    ///
    /// A heartbeat below [`MIN_HEARTBEAT`] is raised to it with a warning.
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        let mut heartbeat = Duration::from_millis(self.stream.heartbeat_ms);
        if heartbeat < MIN_HEARTBEAT {
            tracing::warn!(
                heartbeat_ms = self.stream.heartbeat_ms,
                min = ?MIN_HEARTBEAT,
                "heartbeat_ms too small, using minimum"
            );
            heartbeat = MIN_HEARTBEAT;
        }

        SessionOptions {
            heartbeat,
            stop_grace: self.sessions.stop_grace_secs.map(Duration::from_secs),
            ttl: self.sessions.ttl_secs.map(Duration::from_secs),
            reap_interval: Duration::from_secs(self.sessions.reap_interval_secs.max(1)),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Whether to enable permissive CORS.
    pub cors_permissive: bool,
    /// Directory of static files served at `/`.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_permissive: false,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Scanner invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments placed before the scan flags.
    pub args: Vec<String>,
    /// Flag that disables interactive prompts.
    pub non_interactive_flag: String,
    /// Working directory for the scanner.
    pub working_dir: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["-u".to_string(), "rapidscan.py".to_string()],
            non_interactive_flag: DEFAULT_NON_INTERACTIVE_FLAG.to_string(),
            working_dir: None,
        }
    }
}

impl ScannerConfig {
    /// Build the scan command described by this section.
    #[must_use]
    pub fn to_command(&self) -> ScanCommand {
        let command = ScanCommand::new(&self.program)
            .prefix_args(self.args.iter().cloned())
            .non_interactive_flag(&self.non_interactive_flag);
        match &self.working_dir {
            Some(dir) => command.working_dir(dir),
            None => command,
        }
    }
}

/// Event stream configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Longest wait for a new line before a progress heartbeat, in milliseconds.
    pub heartbeat_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { heartbeat_ms: 500 }
    }
}

/// Session lifecycle policy. Everything here is off by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Force-kill a stopped scanner still running after this many seconds.
    pub stop_grace_secs: Option<u64>,
    /// Evict sessions this many seconds after they finish.
    pub ttl_secs: Option<u64>,
    /// Seconds between reaper passes when `ttl_secs` is set.
    pub reap_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            stop_grace_secs: None,
            ttl_secs: None,
            reap_interval_secs: 60,
        }
    }
}
