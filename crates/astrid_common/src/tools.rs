//! Diagnostic tool registry.
//!
//! Maps a tool identifier to a handler. Handlers receive the free-text
//! argument, a shell executor, and the event log sink; they return a
//! human-readable report printed as-is. The router treats them as opaque:
//! no retries, no output interpretation.

use crate::exec::ShellExecutor;
use crate::logging::LogSink;
use crate::status;
use anyhow::Result;
use std::collections::HashMap;

pub type ToolHandler =
    Box<dyn Fn(&str, &dyn ShellExecutor, &dyn LogSink) -> Result<String> + Send + Sync>;

/// Registry of diagnostic/automation tools keyed by identifier.
pub struct ToolRegistry {
    entries: HashMap<String, ToolHandler>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the built-in diagnostic set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("DISK_DIAG", Box::new(disk_diag));
        registry.register("NET_INFO", Box::new(net_info));
        registry.register("NET_DIAG", Box::new(net_diag));
        registry.register("SYSTEM_DIAG", Box::new(system_diag));
        registry.register("AUDIO_DIAG", Box::new(audio_diag));
        registry.register("DESKTOP_DIAG", Box::new(desktop_diag));
        registry.register("LOG_ANALYZE", Box::new(log_analyze));
        registry.register("STATUS", Box::new(status_monitor));
        registry
    }

    pub fn register(&mut self, id: &str, handler: ToolHandler) {
        self.entries.insert(id.to_string(), handler);
    }

    pub fn get(&self, id: &str) -> Option<&ToolHandler> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Sorted identifiers, for help output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Run one command and render it as a labelled report section. A failing
/// command contributes its stderr; the report itself never fails.
fn run_section(shell: &dyn ShellExecutor, label: &str, command: &str) -> String {
    let res = shell.execute(command);
    let body = if res.success() {
        res.stdout.trim().to_string()
    } else {
        format!("(failed: {})", res.stderr.trim())
    };
    format!("--- {}\n{}", label, body)
}

fn disk_diag(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool DISK_DIAG arg='{}'", arg));
    let df_cmd = if arg.trim().is_empty() {
        "df -h".to_string()
    } else {
        format!("df -h {}", arg.trim())
    };
    Ok([
        run_section(shell, "Disk usage", &df_cmd),
        run_section(shell, "Block devices", "lsblk"),
    ]
    .join("\n"))
}

fn net_info(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool NET_INFO arg='{}'", arg));
    Ok([
        run_section(shell, "Interfaces", "ip -brief addr"),
        run_section(shell, "Routes", "ip route"),
    ]
    .join("\n"))
}

fn net_diag(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool NET_DIAG arg='{}'", arg));
    let target = if arg.trim().is_empty() { "1.1.1.1" } else { arg.trim() };
    Ok([
        run_section(shell, "Reachability", &format!("ping -c 2 -W 2 {}", target)),
        run_section(shell, "DNS", "cat /etc/resolv.conf"),
    ]
    .join("\n"))
}

fn system_diag(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool SYSTEM_DIAG arg='{}'", arg));
    Ok([
        run_section(shell, "Uptime", "uptime"),
        run_section(shell, "Memory", "free -m"),
        run_section(shell, "Top CPU", "ps aux --sort=-%cpu | head -6"),
    ]
    .join("\n"))
}

fn audio_diag(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool AUDIO_DIAG arg='{}'", arg));
    Ok([
        run_section(shell, "Audio server", "pactl info | head -8"),
        run_section(shell, "Playback devices", "aplay -l"),
    ]
    .join("\n"))
}

fn desktop_diag(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool DESKTOP_DIAG arg='{}'", arg));
    Ok([
        run_section(
            shell,
            "Session",
            "echo \"desktop=$XDG_CURRENT_DESKTOP session=$XDG_SESSION_TYPE\"",
        ),
        run_section(shell, "Monitors", "xrandr --listmonitors"),
    ]
    .join("\n"))
}

fn log_analyze(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool LOG_ANALYZE arg='{}'", arg));
    Ok(run_section(
        shell,
        "Recent errors",
        "journalctl -p err -n 20 --no-pager",
    ))
}

fn status_monitor(arg: &str, shell: &dyn ShellExecutor, log: &dyn LogSink) -> Result<String> {
    log.log(&format!("tool STATUS arg='{}'", arg));
    Ok([
        format!("--- Resources\n{}", status::resource_summary()),
        run_section(shell, "Uptime", "uptime"),
    ]
    .join("\n"))
}
