//! Interactive yes/no confirmation.
//!
//! Used by the router before re-running a failed command with elevated
//! privileges. Only the exact token `y` (case-insensitive) is an
//! acceptance; everything else, including `yes`, declines.

use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

/// Yes/no gate for privileged retries.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Real gate reading one line from stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        println!();
        println!("{}  {}", "!".bright_yellow().bold(), prompt.bright_white());
        print!("   {}  ", ">>>".bright_magenta());
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(_) => is_affirmative(&input),
            Err(_) => false,
        }
    }
}

/// Scripted gate for tests: queued raw answers, recorded prompts.
pub struct ScriptedConfirm {
    answers: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl Default for ScriptedConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedConfirm {
    /// Gate that declines everything.
    pub fn new() -> Self {
        Self {
            answers: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answers(answers: Vec<&str>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(String::from).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every prompt shown so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut answers = self.answers.lock().unwrap();
        if answers.is_empty() {
            false
        } else {
            is_affirmative(&answers.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exact_y_is_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("Y"));
        assert!(is_affirmative("  y \n"));
        assert!(!is_affirmative("yes"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn test_scripted_confirm_records_and_answers() {
        let confirm = ScriptedConfirm::with_answers(vec!["Y", "yes"]);
        assert!(confirm.confirm("first?"));
        assert!(!confirm.confirm("second?"));
        // Exhausted queue declines
        assert!(!confirm.confirm("third?"));
        assert_eq!(confirm.prompts().len(), 3);
    }
}
