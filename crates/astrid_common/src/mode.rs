//! Operating modes for the interactive shell.
//!
//! Exactly one mode is active at a time. The mode is owned by the router
//! instance and changes only through the explicit switch tokens below.

use serde::{Deserialize, Serialize};

/// Active interaction style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Raw shell execution of every input line.
    Shell,
    /// AI chat with tool dispatch. Startup default.
    #[default]
    Chat,
    /// Programming-oriented AI chat, no tool dispatch.
    Code,
}

/// Switch token for shell mode.
pub const SHELL_TOKEN: &str = ":bash";
/// Switch token for chat mode.
pub const CHAT_TOKEN: &str = ":chat";
/// Switch token for code mode.
pub const CODE_TOKEN: &str = ":code";

impl Mode {
    /// Parse a mode-switch token. Matches the entire trimmed input,
    /// case-insensitively. Anything else is not a switch.
    pub fn from_switch_token(input: &str) -> Option<Mode> {
        if input.eq_ignore_ascii_case(SHELL_TOKEN) {
            Some(Mode::Shell)
        } else if input.eq_ignore_ascii_case(CHAT_TOKEN) {
            Some(Mode::Chat)
        } else if input.eq_ignore_ascii_case(CODE_TOKEN) {
            Some(Mode::Code)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Shell => "shell",
            Mode::Chat => "chat",
            Mode::Code => "code",
        }
    }

    /// Short announcement printed when the mode becomes active.
    pub fn announcement(&self) -> &'static str {
        match self {
            Mode::Shell => "SHELL - system command mode active",
            Mode::Chat => "CHAT - AI assistant mode active",
            Mode::Code => "CODE - programming & debugging mode active",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
