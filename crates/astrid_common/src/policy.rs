//! Model selection policy.
//!
//! Derives a (local, cloud) target pair for one command. The policy is
//! advisory: `None` means "no opinion" and the router falls back to the
//! configured default pair.

use serde::{Deserialize, Serialize};

/// Target pair for one command, immutable for that command's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStrategy {
    pub local_target: String,
    pub cloud_target: String,
}

pub trait ModelSelectionPolicy: Send + Sync {
    fn choose(&self, command: &str) -> Option<RoutingStrategy>;
}

/// Prompt length above which the heavier local candidate is preferred.
const LONG_PROMPT_CHARS: usize = 400;

const CODE_HINTS: &[&str] = &[
    "code", "function", "compile", "debug", "script", "rust", "python", "bash",
];

/// Deterministic heuristic: code-flavored prompts get the code candidate,
/// long prompts get the heavier general candidate, everything else is left
/// to the configured defaults.
pub struct HeuristicPolicy {
    code_local: String,
    heavy_local: String,
    cloud: String,
}

impl Default for HeuristicPolicy {
    fn default() -> Self {
        Self {
            code_local: "qwen2.5-coder".to_string(),
            heavy_local: "llama3.1:8b".to_string(),
            cloud: "gpt-4o".to_string(),
        }
    }
}

impl HeuristicPolicy {
    pub fn new(code_local: String, heavy_local: String, cloud: String) -> Self {
        Self {
            code_local,
            heavy_local,
            cloud,
        }
    }
}

impl ModelSelectionPolicy for HeuristicPolicy {
    fn choose(&self, command: &str) -> Option<RoutingStrategy> {
        let lower = command.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        if CODE_HINTS.iter().any(|h| words.contains(h)) {
            return Some(RoutingStrategy {
                local_target: self.code_local.clone(),
                cloud_target: self.cloud.clone(),
            });
        }

        if command.chars().count() > LONG_PROMPT_CHARS {
            return Some(RoutingStrategy {
                local_target: self.heavy_local.clone(),
                cloud_target: self.cloud.clone(),
            });
        }

        None
    }
}

/// Fixed-answer policy for tests.
pub struct ScriptedPolicy {
    strategy: Option<RoutingStrategy>,
}

impl ScriptedPolicy {
    pub fn none() -> Self {
        Self { strategy: None }
    }

    pub fn always(strategy: RoutingStrategy) -> Self {
        Self {
            strategy: Some(strategy),
        }
    }
}

impl ModelSelectionPolicy for ScriptedPolicy {
    fn choose(&self, _command: &str) -> Option<RoutingStrategy> {
        self.strategy.clone()
    }
}
