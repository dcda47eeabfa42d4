//! External tool execution.
//!
//! CLI-driven backends describe the command they need as a [`ToolCommand`]
//! and hand it to a [`CommandRunner`]. The system runner bounds every
//! invocation with a timeout; tests substitute scripted runners.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};
use zeroize::Zeroizing;

use crate::error::BackendError;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A single invocation of an external tool.
pub struct ToolCommand {
    program: &'static str,
    args: Vec<String>,
    stdin: Option<Zeroizing<Vec<u8>>>,
}

impl ToolCommand {
    /// Start a command for `program`.
    pub fn new(program: &'static str) -> Self {
        Self {
            program,
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Bytes written to the child's standard input, wiped on drop.
    pub fn stdin(mut self, input: Vec<u8>) -> Self {
        self.stdin = Some(Zeroizing::new(input));
        self
    }

    pub fn program(&self) -> &'static str {
        self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_stdin(&self) -> Option<&[u8]> {
        self.stdin.as_deref().map(Vec::as_slice)
    }
}

// Arguments may hold encoded secrets, so Debug only shows the shape.
impl std::fmt::Debug for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCommand")
            .field("program", &self.program)
            .field("args", &self.args.len())
            .field("stdin", &self.stdin.as_ref().map(|s| s.len()))
            .finish()
    }
}

/// Captured result of a finished tool.
#[derive(Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: Zeroizing<Vec<u8>>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Output of a tool that exited with `code`.
    pub fn new(code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(code),
            stdout: Zeroizing::new(stdout.into()),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Case-insensitive search of standard error.
    pub fn stderr_contains_any(&self, needles: &[&str]) -> bool {
        let haystack = String::from_utf8_lossy(&self.stderr).to_lowercase();
        needles
            .iter()
            .any(|needle| haystack.contains(&needle.to_lowercase()))
    }
}

impl std::fmt::Debug for CommandOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandOutput")
            .field("status", &self.status)
            .field("stdout", &self.stdout.len())
            .field("stderr", &String::from_utf8_lossy(&self.stderr))
            .finish()
    }
}

/// Runs external tools on behalf of a backend.
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// A non-zero exit is not an error here; backends interpret the status.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Spawn` if the tool cannot be started, or
    /// `BackendError::Timeout` if it does not finish in time.
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput, BackendError>;
}

/// Checks whether a tool is installed.
pub trait ToolProbe: Send + Sync {
    fn is_available(&self, program: &str) -> bool;
}

/// Probes `PATH` with `which`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ToolProbe for SystemProbe {
    fn is_available(&self, program: &str) -> bool {
        #[cfg(not(target_arch = "wasm32"))]
        let found = which::which(program).is_ok();
        // Browsers cannot spawn processes
        #[cfg(target_arch = "wasm32")]
        let found = false;
        debug!(tool = program, found, "probed for tool");
        found
    }
}

/// Runs tools as child processes with a deadline.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn deadline(&self) -> Instant {
        let now = Instant::now();
        // Timeouts too large for the clock saturate to about a century
        now.checked_add(self.timeout)
            .unwrap_or_else(|| now + Duration::from_secs(100 * 365 * 24 * 60 * 60))
    }

    fn timed_out(&self, program: &str) -> BackendError {
        BackendError::Timeout {
            tool: program.to_string(),
            timeout: self.timeout,
        }
    }

    fn wait(
        &self,
        program: &str,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<Option<i32>, BackendError> {
        loop {
            let polled = child.try_wait().map_err(|source| BackendError::Spawn {
                tool: program.to_string(),
                source,
            })?;
            if let Some(status) = polled {
                return Ok(status.code());
            }
            if Instant::now() >= deadline {
                warn!(tool = program, timeout = ?self.timeout, "tool timed out, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out(program));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Wait for a drained pipe until `deadline`.
    ///
    /// A background process that inherited the pipe keeps it open after the
    /// tool exits, so the read may never finish on its own.
    fn collect(
        &self,
        program: &str,
        pipe: Option<Receiver<Vec<u8>>>,
        deadline: Instant,
    ) -> Result<Vec<u8>, BackendError> {
        let Some(pipe) = pipe else {
            return Ok(Vec::new());
        };
        match pipe.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(buf) => Ok(buf),
            Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
            Err(RecvTimeoutError::Timeout) => {
                warn!(tool = program, timeout = ?self.timeout, "tool output still open after exit");
                Err(self.timed_out(program))
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<CommandOutput, BackendError> {
        let program = command.program();
        let deadline = self.deadline();
        trace!(tool = program, args = command.get_args().len(), "spawning tool");

        let mut child = Command::new(program)
            .args(command.get_args())
            .stdin(if command.get_stdin().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => BackendError::ToolMissing {
                    tool: program.to_string(),
                },
                _ => BackendError::Spawn {
                    tool: program.to_string(),
                    source,
                },
            })?;

        // Pipes are serviced on detached helper threads so a chatty tool
        // cannot block on a full buffer while we poll for exit, and a stuck
        // pipe cannot hold the caller past the deadline.
        if let (Some(mut pipe), Some(input)) = (child.stdin.take(), command.get_stdin()) {
            let input = Zeroizing::new(input.to_vec());
            thread::spawn(move || {
                let _ = pipe.write_all(&input);
            });
        }
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = self.wait(program, &mut child, deadline)?;

        let output = CommandOutput {
            status,
            stdout: Zeroizing::new(self.collect(program, stdout, deadline)?),
            stderr: self.collect(program, stderr, deadline)?,
        };
        trace!(tool = program, status = ?output.status, "tool finished");
        Ok(output)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}
