//! External media tool execution with testable command dispatch.
//!
//! Slicing and concatenation shell out to ffmpeg. The `CommandExecutor` trait
//! keeps that behind a seam so the pipeline can run without the real binary.

use crate::error::{ReelError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Trait for executing external commands.
///
/// Object-safe, Send + Sync for use in concurrent contexts.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Execute `program` with `args`.
    ///
    /// Returns captured output on success. A non-zero exit, a missing binary,
    /// or a timeout is an error.
    async fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

#[async_trait]
impl<T: CommandExecutor + ?Sized> CommandExecutor for Arc<T> {
    async fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).execute(program, args).await
    }
}

/// Production executor backed by `tokio::process`.
///
/// Every invocation is bounded by `timeout`; the child is killed when the
/// deadline passes.
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::defaults::PROCESS_TIMEOUT_SECS))
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let rendered = render(program, args);
        tracing::debug!(command = %rendered, "spawning media tool");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ReelError::ToolNotFound {
                        tool: program.to_string(),
                    }
                } else {
                    ReelError::process(format!("Failed to execute {program}: {e}"))
                }
            })?;

        // Dropping the in-flight future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ReelError::ProcessTimeout {
                command: rendered.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(failure(&rendered, output.status.code(), &stderr));
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Build the error for a command that exited unsuccessfully.
pub fn failure(rendered: &str, code: Option<i32>, stderr: &str) -> ReelError {
    let status = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    let trimmed = stderr.trim();
    let message = if trimmed.is_empty() {
        format!("`{rendered}` exited with status {status}")
    } else {
        format!("`{rendered}` exited with status {status}: {trimmed}")
    };
    ReelError::Process { message }
}

fn render(program: &str, args: &[String]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

type Handler = dyn Fn(&str, &[String]) -> Result<CommandOutput> + Send + Sync;

/// Mock executor for testing.
///
/// Records every invocation and answers with a configurable handler.
#[derive(Clone)]
pub struct MockCommandExecutor {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    handler: Arc<Handler>,
}

impl MockCommandExecutor {
    /// Executor that succeeds with empty output.
    pub fn succeeding() -> Self {
        Self::with_handler(|_, _| Ok(CommandOutput::default()))
    }

    /// Executor whose every invocation fails with the given stderr.
    pub fn failing(stderr: &str) -> Self {
        let stderr = stderr.to_string();
        Self::with_handler(move |program, args| {
            Err(failure(&render(program, args), Some(1), &stderr))
        })
    }

    /// Executor that delegates to `handler`.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&str, &[String]) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            handler: Arc::new(handler),
        }
    }

    /// Argument lists of every invocation so far, program first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for MockCommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCommandExecutor")
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl CommandExecutor for MockCommandExecutor {
    async fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            let mut call = Vec::with_capacity(args.len() + 1);
            call.push(program.to_string());
            call.extend(args.iter().cloned());
            calls.push(call);
        }
        (self.handler)(program, args)
    }
}
