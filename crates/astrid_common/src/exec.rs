//! Shell command execution layer.
//!
//! Runs one command line synchronously via `sh -c` and captures the real
//! exit code, stdout and stderr. A failing command is NOT an error here:
//! non-zero exit plus populated stderr is the failure signal. This layer
//! never reinterprets output.

use serde::{Deserialize, Serialize};
use std::process::Command;
use std::sync::Mutex;

/// Maximum output length to capture (prevent memory issues)
const MAX_OUTPUT_BYTES: usize = 64 * 1024; // 64KB

/// Result of one shell execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (0 = success, -1 = spawn failure)
    pub exit_code: i32,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Convenience constructor for a clean run.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// Convenience constructor for a failed run.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

/// Synchronous command runner.
///
/// `execute` must never error for a failing command; spawn problems
/// (missing shell, exhausted resources) surface as exit code -1 with the
/// OS error text in stderr.
pub trait ShellExecutor: Send + Sync {
    fn execute(&self, command: &str) -> ExecResult;
}

/// Real executor running commands through `sh -c`.
pub struct SystemShell;

impl ShellExecutor for SystemShell {
    fn execute(&self, command: &str) -> ExecResult {
        let output = Command::new("sh").arg("-c").arg(command).output();

        match output {
            Ok(output) => {
                let (stdout, stdout_truncated) = truncate_output(&output.stdout);
                let (stderr, _) = truncate_output(&output.stderr);
                if stdout_truncated {
                    tracing::debug!(command, "stdout truncated at {} bytes", MAX_OUTPUT_BYTES);
                }
                ExecResult {
                    stdout,
                    stderr,
                    exit_code: output.status.code().unwrap_or(-1),
                }
            }
            Err(e) => ExecResult {
                stdout: String::new(),
                stderr: format!("sh: {}", e),
                exit_code: -1,
            },
        }
    }
}

/// Truncate output to max bytes, converting to string
fn truncate_output(bytes: &[u8]) -> (String, bool) {
    let truncated = bytes.len() > MAX_OUTPUT_BYTES;
    let slice = if truncated {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };
    (String::from_utf8_lossy(slice).to_string(), truncated)
}

/// Fake executor for tests: returns scripted results and records every
/// command line it was asked to run.
pub struct FakeShell {
    results: Mutex<Vec<ExecResult>>,
    commands: Mutex<Vec<String>>,
}

impl Default for FakeShell {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeShell {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Create a fake with a queue of scripted results, returned in order.
    pub fn with_results(results: Vec<ExecResult>) -> Self {
        Self {
            results: Mutex::new(results),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Append one scripted result to the queue.
    pub fn push_result(&self, result: ExecResult) {
        self.results.lock().unwrap().push(result);
    }

    /// Every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }
}

impl ShellExecutor for FakeShell {
    fn execute(&self, command: &str) -> ExecResult {
        self.commands.lock().unwrap().push(command.to_string());

        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            ExecResult::ok("")
        } else {
            results.remove(0)
        }
    }
}
