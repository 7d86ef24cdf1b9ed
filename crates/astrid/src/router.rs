//! Routing core - v0.6.0
//!
//! One input line goes through exactly one of four paths: a mode switch,
//! raw shell execution, a diagnostic tool, or an AI query. The paths are
//! checked in a fixed precedence order, so an input can never be both a
//! tool call and an AI query.
//!
//! Resilience lives here too: failed shell commands get an optional
//! privileged retry and an AI diagnosis; AI queries fall back from the
//! local model to the cloud model, and cloud failure is terminal for
//! that query.

use crate::ask_user::{Confirm, StdinConfirm};
use anyhow::Result;
use astrid_common::config::AstridConfig;
use astrid_common::display::{self, Colors};
use astrid_common::exec::{ShellExecutor, SystemShell};
use astrid_common::intent::{self, IntentClassifier, KeywordClassifier};
use astrid_common::llm::{BackendKind, HttpModelBackend, ModelBackend};
use astrid_common::logging::{FileLogSink, LogSink};
use astrid_common::mode::Mode;
use astrid_common::policy::{HeuristicPolicy, ModelSelectionPolicy, RoutingStrategy};
use astrid_common::status;
use astrid_common::tools::ToolRegistry;
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::Duration;

/// Non-mutating snapshot token: current mode + resources.
const STATE_TOKEN: &str = ":state";
/// Non-mutating tmux pane capture token.
const SCREEN_TOKEN: &str = ":screen";
/// Prefix forcing shell execution of the rest of the line.
const FORCE_SHELL_MARKER: char = '!';

const GENERAL_INSTRUCTION: &str =
    "You are Astrid, a helpful operations assistant for this machine. Be concise.";
const CODE_INSTRUCTION: &str =
    "You are an expert programmer. Reply with clean code, comment where it matters, be concise.";

/// Which backend produced the printed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOrigin {
    Local,
    Cloud,
}

/// What one routing decision did. The REPL only logs this; tests assert
/// on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Input was blank after trimming.
    Empty,
    /// A mode-switch token consumed the input.
    Switched(Mode),
    /// The `:state` snapshot ran.
    Snapshot,
    /// The `:screen` capture ran.
    Screen,
    /// A command line went through the shell protocol.
    ShellCompleted {
        exit_code: i32,
        /// A privileged retry ran (its own result is not inspected).
        escalated: bool,
        /// AI diagnosis ran, and which backend answered.
        diagnosis: Option<AnswerOrigin>,
    },
    /// A registry tool handled the input.
    ToolDispatched(String),
    /// The force-cloud token sent the input straight online.
    CloudForced,
    /// The AI query protocol answered.
    Answered(AnswerOrigin),
}

/// The failure signal for a local answer: empty text, or any occurrence
/// of the substring "error". Crude and deterministic; an answer that
/// legitimately discusses errors is misclassified. Accepted limitation.
pub fn is_failed_answer(text: &str) -> bool {
    text.trim().is_empty() || text.to_lowercase().contains("error")
}

/// Strip the force-cloud token (`gpt ` prefix, case-insensitive).
fn strip_cloud_token(command: &str) -> Option<&str> {
    let prefix = command.get(..4)?;
    if prefix.eq_ignore_ascii_case("gpt ") {
        Some(command[4..].trim())
    } else {
        None
    }
}

/// Last `n` characters of a capture.
fn tail(text: &str, n: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars[chars.len().saturating_sub(n)..].iter().collect()
}

/// The routing core. Owns the mode; everything else is a collaborator
/// behind a trait.
pub struct Router {
    mode: Mode,
    config: AstridConfig,
    backend: Arc<dyn ModelBackend>,
    shell: Arc<dyn ShellExecutor>,
    registry: ToolRegistry,
    classifier: Arc<dyn IntentClassifier>,
    policy: Arc<dyn ModelSelectionPolicy>,
    confirm: Arc<dyn Confirm>,
    log: Arc<dyn LogSink>,
}

impl Router {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AstridConfig,
        backend: Arc<dyn ModelBackend>,
        shell: Arc<dyn ShellExecutor>,
        registry: ToolRegistry,
        classifier: Arc<dyn IntentClassifier>,
        policy: Arc<dyn ModelSelectionPolicy>,
        confirm: Arc<dyn Confirm>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            mode: Mode::default(),
            config,
            backend,
            shell,
            registry,
            classifier,
            policy,
            confirm,
            log,
        }
    }

    /// Router wired to the real collaborators.
    pub fn with_defaults(config: AstridConfig) -> Result<Self> {
        let backend = HttpModelBackend::new(config.llm.clone(), config.cloud.clone())?;
        let policy = HeuristicPolicy::new(
            config.llm.code_model.clone(),
            "llama3.1:8b".to_string(),
            config.cloud.model.clone(),
        );
        Ok(Self::new(
            config,
            Arc::new(backend),
            Arc::new(SystemShell),
            ToolRegistry::with_defaults(),
            Arc::new(KeywordClassifier),
            Arc::new(policy),
            Arc::new(StdinConfirm),
            Arc::new(FileLogSink::new()),
        ))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Route one input line to completion.
    pub fn route(&mut self, input: &str) -> Result<Outcome> {
        let command = input.trim();
        if command.is_empty() {
            return Ok(Outcome::Empty);
        }

        // Mode switches and snapshot tokens are terminal for this input.
        if let Some(mode) = Mode::from_switch_token(command) {
            self.mode = mode;
            println!(
                "{}[mode]: {}{}",
                display::mode_color(mode),
                mode.announcement(),
                Colors::RESET
            );
            self.log.log(&format!("mode: {}", mode));
            return Ok(Outcome::Switched(mode));
        }

        if command.eq_ignore_ascii_case(STATE_TOKEN) {
            println!("Mode: {} | {}", self.mode, status::resource_summary());
            return Ok(Outcome::Snapshot);
        }

        if command.eq_ignore_ascii_case(SCREEN_TOKEN) {
            let res = self.shell.execute("tmux capture-pane -p");
            if res.success() {
                println!(
                    "--- TMUX SNAPSHOT ---\n{}\n---------------------",
                    tail(&res.stdout, 1000)
                );
            } else {
                println!("{} {}", "✗".red(), res.stderr.trim());
            }
            return Ok(Outcome::Screen);
        }

        // Shell mode and the force-shell marker are explicit intent to
        // execute, never to converse.
        if self.mode == Mode::Shell || command.starts_with(FORCE_SHELL_MARKER) {
            let line = command
                .strip_prefix(FORCE_SHELL_MARKER)
                .unwrap_or(command)
                .trim();
            if line.is_empty() {
                return Ok(Outcome::Empty);
            }
            return self.run_shell(line);
        }

        if let Some(question) = strip_cloud_token(command) {
            return Ok(self.force_cloud(question));
        }

        // Strategy for this command, fixed from here on.
        let mut strategy = self.policy.choose(command).unwrap_or_else(|| RoutingStrategy {
            local_target: self.config.llm.local_model.clone(),
            cloud_target: self.config.cloud.model.clone(),
        });
        let instruction = if self.mode == Mode::Code {
            strategy.local_target = self.config.llm.code_model.clone();
            CODE_INSTRUCTION
        } else {
            GENERAL_INSTRUCTION
        };

        println!("{}", display::banner(self.mode, &strategy.local_target));

        // Tools are chat-mode conveniences only.
        if self.mode == Mode::Chat {
            if let Some(raw) = self.classifier.classify(command) {
                if let Some(found) = intent::normalize(&raw) {
                    if let Some(handler) = self.registry.get(&found.tool) {
                        println!("{}", format!("⚙ tool: {}", found.tool).cyan());
                        let report = handler(&found.arg, self.shell.as_ref(), self.log.as_ref())?;
                        println!("{}", report);
                        self.log.log(&format!("tool dispatched: {}", found.tool));
                        return Ok(Outcome::ToolDispatched(found.tool));
                    }
                    tracing::debug!("intent '{}' not in registry, falling through", found.tool);
                }
            }
        }

        println!(
            "{}",
            format!(
                "strategy {}: {} | {}",
                self.mode, strategy.local_target, strategy.cloud_target
            )
            .dimmed()
        );
        let prompt = format!("{}\n\nQuery: {}", instruction, command);
        let origin = self.ask_with_fallback(
            &prompt,
            &strategy,
            Duration::from_secs(self.config.llm.chat_timeout_secs),
            false,
        );
        Ok(Outcome::Answered(origin))
    }

    /// Shell execution protocol: run, surface failure, offer escalation,
    /// then fall back to AI diagnosis.
    fn run_shell(&self, command: &str) -> Result<Outcome> {
        println!("{}", format!("$ {}", command).dimmed());
        self.log.log(&format!("shell: {}", command));

        let res = self.shell.execute(command);
        if !res.stdout.trim().is_empty() {
            println!("{}", res.stdout.trim_end());
        }
        if res.success() {
            // Exit 0 never triggers diagnosis, whatever stderr says.
            return Ok(Outcome::ShellCompleted {
                exit_code: 0,
                escalated: false,
                diagnosis: None,
            });
        }

        let stderr = res.stderr.trim().to_string();
        println!("{} {}", format!("✗ exit {}:", res.exit_code).red(), stderr);

        let lower = stderr.to_lowercase();
        if lower.contains("permission denied") || lower.contains("not permitted") {
            if self
                .confirm
                .confirm("Permission failure detected. Retry with sudo? [y/n]")
            {
                let sudo_command = format!("sudo {}", command);
                println!("{}", format!("$ {}", sudo_command).dimmed());
                let retry = self.shell.execute(&sudo_command);
                if !retry.stdout.trim().is_empty() {
                    println!("{}", retry.stdout.trim_end());
                }
                if !retry.stderr.trim().is_empty() {
                    println!("{}", retry.stderr.trim_end());
                }
                // The privileged retry is not inspected further.
                self.log.log(&format!("escalated: {}", sudo_command));
                return Ok(Outcome::ShellCompleted {
                    exit_code: res.exit_code,
                    escalated: true,
                    diagnosis: None,
                });
            }
        }

        println!("{}", "⟲ analyzing the failure...".magenta());
        let diag_prompt = format!(
            "Briefly diagnose why the command `{}` failed: {}",
            command, stderr
        );
        let strategy = RoutingStrategy {
            local_target: self.config.llm.local_model.clone(),
            cloud_target: self.config.cloud.model.clone(),
        };
        let origin = self.ask_with_fallback(
            &diag_prompt,
            &strategy,
            Duration::from_secs(self.config.llm.diag_timeout_secs),
            true,
        );
        Ok(Outcome::ShellCompleted {
            exit_code: res.exit_code,
            escalated: false,
            diagnosis: Some(origin),
        })
    }

    /// Force-cloud path: straight to the cloud target, no local attempt.
    fn force_cloud(&self, question: &str) -> Outcome {
        let target = self.config.cloud.model.clone();
        println!("{}", format!("~ forcing {} online", target).dimmed());
        match self.backend.query(
            question,
            &target,
            BackendKind::Cloud,
            Duration::from_secs(self.config.cloud.timeout_secs),
            &[],
        ) {
            Ok(answer) => println!("\n[{}]:\n{}\n", target.to_uppercase(), answer.text.trim()),
            Err(e) => println!("\n[{}]: {}\n", target.to_uppercase(), e),
        }
        Outcome::CloudForced
    }

    /// AI query protocol: local first, cloud on failure, nothing after
    /// that. Used identically by the chat path and the diagnosis path;
    /// only prompt, timeout and answer tagging differ.
    fn ask_with_fallback(
        &self,
        prompt: &str,
        strategy: &RoutingStrategy,
        timeout: Duration,
        diagnosis: bool,
    ) -> AnswerOrigin {
        match self.backend.query(
            prompt,
            &strategy.local_target,
            BackendKind::Local,
            timeout,
            &[],
        ) {
            Ok(answer) if !is_failed_answer(&answer.text) => {
                if diagnosis {
                    println!("{} {}", "[Local diagnosis]:".cyan(), answer.text.trim());
                } else {
                    println!("\n{}\n", answer.text.trim());
                }
                return AnswerOrigin::Local;
            }
            Ok(answer) => {
                tracing::debug!(
                    "local answer from {} flagged as failed ({} chars)",
                    strategy.local_target,
                    answer.text.len()
                );
            }
            Err(e) => tracing::debug!("local backend {} failed: {}", strategy.local_target, e),
        }

        println!(
            "{}",
            format!("~ falling back to {} online...", strategy.cloud_target).dimmed()
        );
        match self.backend.query(
            prompt,
            &strategy.cloud_target,
            BackendKind::Cloud,
            Duration::from_secs(self.config.cloud.timeout_secs),
            &[],
        ) {
            Ok(answer) => {
                // The cloud text is printed as-is, even when it happens
                // to contain the "error" sentinel itself.
                if diagnosis {
                    println!("{} {}", "[Online diagnosis]:".cyan(), answer.text.trim());
                } else {
                    println!(
                        "\n[{}]:\n{}\n",
                        strategy.cloud_target.to_uppercase(),
                        answer.text.trim()
                    );
                }
            }
            Err(e) => {
                if diagnosis {
                    println!("{} {}", "[Online diagnosis]:".cyan(), e);
                } else {
                    println!("\n[{}]: {}\n", strategy.cloud_target.to_uppercase(), e);
                }
            }
        }
        AnswerOrigin::Cloud
    }
}
