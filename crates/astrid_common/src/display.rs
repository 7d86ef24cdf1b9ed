//! Terminal output primitives.
//!
//! Consistent formatting for the interactive shell. Uses pastel colors
//! and Unicode box drawing.

use crate::mode::{Mode, CHAT_TOKEN, CODE_TOKEN, SHELL_TOKEN};
use crate::status;
use chrono::Local;

/// ANSI color codes - pastel palette
pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BLUE: &'static str = "\x1b[38;5;117m";      // Pastel blue
    pub const GREEN: &'static str = "\x1b[38;5;120m";     // Pastel green
    pub const YELLOW: &'static str = "\x1b[38;5;228m";    // Pastel yellow
    pub const RED: &'static str = "\x1b[38;5;210m";       // Pastel red
    pub const GRAY: &'static str = "\x1b[38;5;250m";      // Light gray
    pub const CYAN: &'static str = "\x1b[38;5;159m";      // Pastel cyan
    pub const MAGENTA: &'static str = "\x1b[38;5;183m";   // Pastel magenta
    pub const BOLD: &'static str = "\x1b[1m";
}

/// Prompt/announcement color for a mode.
pub fn mode_color(mode: Mode) -> &'static str {
    match mode {
        Mode::Shell => Colors::YELLOW,
        Mode::Chat => Colors::BLUE,
        Mode::Code => Colors::CYAN,
    }
}

/// Box a set of plain lines, coloring only the border.
pub fn boxed(lines: &[String]) -> String {
    let max_len = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let top = format!("{}╭{}╮{}", Colors::BLUE, "─".repeat(max_len + 2), Colors::RESET);
    let bottom = format!("{}╰{}╯{}", Colors::BLUE, "─".repeat(max_len + 2), Colors::RESET);

    let mut result = vec![top];
    for line in lines {
        let padding = " ".repeat(max_len - line.chars().count());
        result.push(format!(
            "{}│{} {}{} {}│{}",
            Colors::BLUE,
            Colors::RESET,
            line,
            padding,
            Colors::BLUE,
            Colors::RESET
        ));
    }
    result.push(bottom);
    result.join("\n")
}

/// Strategy banner shown before AI-eligible interactions: mode, local
/// target, clock, and a resource line.
pub fn banner(mode: Mode, local_target: &str) -> String {
    let clock = Local::now().format("%H:%M:%S");
    boxed(&[
        format!("Astrid {} │ model: {} │ {}", mode.as_str().to_uppercase(), local_target, clock),
        format!("Resources: {}", status::resource_summary()),
    ])
}

/// Startup greeting with the recognized control tokens.
pub fn greeting() -> String {
    format!(
        "{}--- Astrid interactive shell ---{}\n{}Commands: {}, {}, {}, :state, :screen, exit{}",
        Colors::GREEN,
        Colors::RESET,
        Colors::GRAY,
        SHELL_TOKEN,
        CHAT_TOKEN,
        CODE_TOKEN,
        Colors::RESET
    )
}

/// Interactive prompt, colored by the active mode.
pub fn prompt(mode: Mode) -> String {
    format!(
        "{}{}@{} ({}):~$ {}",
        mode_color(mode),
        status::username(),
        status::host_name(),
        mode.as_str(),
        Colors::RESET
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_pads_to_longest_line() {
        let b = boxed(&["short".to_string(), "a much longer line".to_string()]);
        assert!(b.contains("╭"));
        assert!(b.contains("short"));
    }

    #[test]
    fn test_banner_mentions_mode_and_model() {
        let b = banner(Mode::Code, "qwen2.5-coder");
        assert!(b.contains("CODE"));
        assert!(b.contains("qwen2.5-coder"));
    }

    #[test]
    fn test_prompt_carries_mode_name() {
        assert!(prompt(Mode::Shell).contains("(shell)"));
        assert!(prompt(Mode::Chat).contains("(chat)"));
    }
}
