// Program runners - execute one code artifact and capture what it did
//
// Runners never fail the caller: spawn failures, abnormal exits and deadline
// expiry all come back as `Execution::error`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::{Mutex, MutexGuard};

use crate::candidate::LanguageTag;

/// Only one execution at a time may own stdin redirection.
static EXECUTION_SLOT: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Acquire the process-wide execution slot.
///
/// The slot is released when the returned guard is dropped, which covers
/// early returns and error paths as well.
pub async fn acquire_execution_slot() -> MutexGuard<'static, ()> {
    EXECUTION_SLOT.lock().await
}

/// Observable result of running one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub stdout: String,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl Execution {
    pub fn succeeded(stdout: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stdout: stdout.into(),
            elapsed,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            stdout: String::new(),
            elapsed,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Executes code artifacts in one execution environment
#[async_trait]
pub trait ProgramRunner: Send + Sync {
    /// Name of the execution environment (e.g. "python")
    fn environment(&self) -> &str;

    /// Whether artifacts tagged with `language` can be executed
    fn supports(&self, language: &LanguageTag) -> bool {
        language.as_str() == self.environment()
    }

    /// Run `code` in isolation, feeding `input` to stdin when present
    async fn execute(&self, code: &str, input: Option<&str>) -> Execution;
}

/// Runs Python source in a fresh interpreter process per execution
#[derive(Debug, Clone)]
pub struct PythonRunner {
    interpreter: String,
    timeout: Duration,
}

impl PythonRunner {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for PythonRunner {
    fn default() -> Self {
        Self::new("python3", Duration::from_secs(10))
    }
}

#[async_trait]
impl ProgramRunner for PythonRunner {
    fn environment(&self) -> &str {
        "python"
    }

    async fn execute(&self, code: &str, input: Option<&str>) -> Execution {
        let _slot = acquire_execution_slot().await;

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-c")
            .arg(code)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Execution::failed(
                    format!("Failed to start {}: {}", self.interpreter, e),
                    start.elapsed(),
                );
            }
        };

        // Best effort: programs that never read stdin close the pipe early.
        if let (Some(text), Some(mut stdin)) = (input, child.stdin.take()) {
            let text = text.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    tracing::debug!("stdin not consumed by program: {}", e);
                }
            });
        }

        let waited = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        let elapsed = start.elapsed();

        match waited {
            Err(_) => Execution::failed(
                format!("Execution timed out after {}s", self.timeout.as_secs_f64()),
                elapsed,
            ),
            Ok(Err(e)) => Execution::failed(format!("Failed to collect output: {}", e), elapsed),
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                if output.status.success() {
                    Execution::succeeded(stdout, elapsed)
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    let error = if stderr.is_empty() {
                        format!("Process exited with {}", output.status)
                    } else {
                        stderr
                    };
                    Execution {
                        stdout,
                        elapsed,
                        error: Some(error),
                    }
                }
            }
        }
    }
}
