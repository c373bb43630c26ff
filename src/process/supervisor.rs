use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Narrow capability over a line-oriented command sink. Transport agnostic:
/// the supervised child process is one implementation.
#[async_trait]
pub trait LineChannel: Send {
    fn name(&self) -> &str;

    fn is_alive(&mut self) -> bool;

    /// Appends the newline. Fails with `BrokenChannel` if the peer is gone.
    async fn write_line(&mut self, text: &str) -> Result<()>;

    /// Idempotent. Waits at most `grace` for an orderly exit before killing.
    async fn terminate(&mut self, grace: Duration);
}

#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

pub struct ProcessSupervisor;

impl ProcessSupervisor {
    /// Spawn with a piped stdin. The child is killed if the handle is dropped.
    pub fn spawn(spec: &ProcessSpec) -> Result<ProcessHandle> {
        // Bare names go through PATH; explicit paths must exist up front.
        if spec.program.components().count() > 1 && !spec.program.exists() {
            return Err(Error::ProcessUnavailable(format!(
                "{} ({} not found)",
                spec.name,
                spec.program.display()
            )));
        }

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ProcessUnavailable(format!("{}: {}", spec.name, e)))?;

        let stdin = child.stdin.take();
        info!(name = %spec.name, pid = ?child.id(), "process spawned");

        Ok(ProcessHandle {
            name: spec.name.clone(),
            child,
            stdin,
            exit: None,
        })
    }
}

pub struct ProcessHandle {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    exit: Option<ProcessExit>,
}

#[derive(Debug, Clone, Copy)]
enum ProcessExit {
    Exited(ExitStatus),
    Unknown,
}

impl ProcessHandle {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Exit status once the process has been observed to exit.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        match self.exit {
            Some(ProcessExit::Exited(status)) => Some(status),
            _ => None,
        }
    }

    fn broken(&self, message: impl Into<String>) -> Error {
        Error::BrokenChannel {
            name: self.name.clone(),
            message: message.into(),
        }
    }

    fn record_exit(&mut self, status: ExitStatus) {
        if self.exit.is_none() {
            info!(name = %self.name, %status, "process exited");
        }
        self.exit = Some(ProcessExit::Exited(status));
        self.stdin = None;
    }
}

#[async_trait]
impl LineChannel for ProcessHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&mut self) -> bool {
        if self.exit.is_some() {
            return false;
        }
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.record_exit(status);
                false
            }
            Err(e) => {
                warn!(name = %self.name, error = %e, "cannot poll process");
                self.exit = Some(ProcessExit::Unknown);
                false
            }
        }
    }

    async fn write_line(&mut self, text: &str) -> Result<()> {
        if !self.is_alive() {
            return Err(self.broken("process has exited"));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(self.broken("stdin closed"));
        };

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // A failed pipe is not reused.
            self.stdin = None;
            return Err(self.broken(e.to_string()));
        }
        debug!(name = %self.name, line = text, "line written");
        Ok(())
    }

    async fn terminate(&mut self, grace: Duration) {
        if !self.is_alive() {
            return;
        }

        // Closing stdin is the orderly stop signal for line-driven children.
        self.stdin = None;
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.record_exit(status);
                return;
            }
            Ok(Err(e)) => warn!(name = %self.name, error = %e, "wait failed"),
            Err(_) => warn!(name = %self.name, grace_ms = grace.as_millis() as u64, "process unresponsive; killing"),
        }

        if let Err(e) = self.child.start_kill() {
            warn!(name = %self.name, error = %e, "kill failed");
        }
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => self.record_exit(status),
            _ => {
                warn!(name = %self.name, "process did not confirm exit");
                self.exit = Some(ProcessExit::Unknown);
            }
        }
    }
}
