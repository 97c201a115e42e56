//! Scanner process invocation and control.
//!
//! [`ScanCommand`] describes how the scanner binary is launched and builds
//! the per-scan argument vector; [`ScanProcess`] wraps the spawned child.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use super::ScanError;

/// Flag that puts the scanner into non-interactive mode.
pub const DEFAULT_NON_INTERACTIVE_FLAG: &str = "-n";

/// Split a user supplied skip list on commas and whitespace runs.
///
/// Empty tokens are discarded; order is preserved.
#[must_use]
pub fn tokenize_skip_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builder describing how to invoke the scanner binary.
#[derive(Debug, Clone)]
pub struct ScanCommand {
    program: String,
    prefix_args: Vec<String>,
    non_interactive_flag: String,
    working_dir: Option<PathBuf>,
}

impl ScanCommand {
    /// Create a command for the given scanner program.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            non_interactive_flag: DEFAULT_NON_INTERACTIVE_FLAG.to_string(),
            working_dir: None,
        }
    }

    /// Arguments placed before the scan flags (e.g. an interpreter script path).
    #[must_use]
    pub fn prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Override the non-interactive flag.
    #[must_use]
    pub fn non_interactive_flag(mut self, flag: impl Into<String>) -> Self {
        self.non_interactive_flag = flag.into();
        self
    }

    /// Set the working directory for the scanner process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Get the program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build the argument vector for one scan.
    ///
    /// Layout: prefix args, the non-interactive flag, one `--skip <token>`
    /// pair per skip token, then the target.
    #[must_use]
    pub fn build_args(&self, target: &str, skip: &str) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        args.push(self.non_interactive_flag.clone());

        for token in tokenize_skip_list(skip) {
            args.push("--skip".to_string());
            args.push(token);
        }

        args.push(target.to_string());
        args
    }

    /// Spawn the scanner against `target`.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::InvalidInput` if the target is empty after
    /// trimming, or `ScanError::SpawnFailure` if the process cannot start.
    pub fn spawn(&self, target: &str, skip: &str) -> Result<ScanProcess, ScanError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(ScanError::target_required());
        }

        let args = self.build_args(target, skip);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| ScanError::SpawnFailure {
            program: self.program.clone(),
            source,
        })?;

        tracing::debug!(program = %self.program, ?args, pid = ?child.id(), "Spawned scanner");

        Ok(ScanProcess { child })
    }
}

/// A running scanner process.
#[derive(Debug)]
pub struct ScanProcess {
    child: Child,
}

impl ScanProcess {
    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Ask the process to stop: interrupt, then terminate, then kill.
    ///
    /// Does nothing once the child has been reaped, so a recycled pid is
    /// never signalled.
    ///
    /// # Errors
    ///
    /// Returns an error if the fallback kill cannot be sent.
    pub fn interrupt(&mut self) -> std::io::Result<()> {
        match self.child.id() {
            Some(pid) if interrupt_or_terminate(pid) => Ok(()),
            Some(_) => self.child.start_kill(),
            None => Ok(()),
        }
    }

    /// Send a kill request without waiting for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub fn start_kill(&mut self) -> std::io::Result<()> {
        self.child.start_kill()
    }
}

/// Deliver an interrupt to `pid`, falling back to a terminate request.
///
/// Both failures are logged and swallowed; the process may already be gone.
/// Returns `true` if either signal was delivered.
#[cfg(unix)]
pub fn interrupt_or_terminate(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    let nix_pid = Pid::from_raw(raw);

    match kill(nix_pid, Signal::SIGINT) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(pid, error = %err, "SIGINT failed, sending SIGTERM");
            match kill(nix_pid, Signal::SIGTERM) {
                Ok(()) => true,
                Err(err) => {
                    tracing::debug!(pid, error = %err, "SIGTERM failed");
                    false
                }
            }
        }
    }
}

/// Signals are not available on this platform; callers fall back to a kill.
#[cfg(not(unix))]
pub fn interrupt_or_terminate(_pid: u32) -> bool {
    false
}
