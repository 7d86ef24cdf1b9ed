//! Event log sink.
//!
//! Tool handlers and the router append one-line events here. This is the
//! user-facing activity trail (separate from `tracing` diagnostics), kept
//! as a plain timestamped file under the state directory.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

const LOG_DIR: &str = "astrid";
const LOG_FILE: &str = "astrid.log";

/// Append-only event sink.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// File-backed sink writing `YYYY-MM-DD HH:MM:SS | message` lines.
/// Write failures are swallowed: the event log must never take the
/// session down.
pub struct FileLogSink {
    path: PathBuf,
}

impl FileLogSink {
    /// Sink at the default location under the user state directory.
    pub fn new() -> Self {
        let base = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: base.join(LOG_DIR).join(LOG_FILE),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for FileLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for FileLogSink {
    fn log(&self, message: &str) {
        if let Some(parent) = self.path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let line = format!("{} | {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()) {
                    tracing::debug!("event log write failed: {}", e);
                }
            }
            Err(e) => tracing::debug!("event log open failed: {}", e),
        }
    }
}

/// In-memory sink for tests.
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}
