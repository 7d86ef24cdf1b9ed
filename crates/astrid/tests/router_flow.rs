//! End-to-end routing behavior against fake collaborators.

use astrid::ask_user::ScriptedConfirm;
use astrid::router::{AnswerOrigin, Outcome, Router};
use astrid_common::config::AstridConfig;
use astrid_common::exec::{ExecResult, FakeShell};
use astrid_common::intent::FakeClassifier;
use astrid_common::llm::{BackendKind, FakeModelBackend, LlmError};
use astrid_common::logging::MemoryLogSink;
use astrid_common::mode::Mode;
use astrid_common::policy::{RoutingStrategy, ScriptedPolicy};
use astrid_common::tools::ToolRegistry;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Router over fakes, with handles kept for assertions.
struct Harness {
    backend: Arc<FakeModelBackend>,
    shell: Arc<FakeShell>,
    classifier: Arc<FakeClassifier>,
    confirm: Arc<ScriptedConfirm>,
    log: Arc<MemoryLogSink>,
    router: Router,
}

impl Harness {
    fn new() -> Self {
        Self::build(FakeClassifier::new(), ScriptedConfirm::new(), None)
    }

    fn with_classifier(classifier: FakeClassifier) -> Self {
        Self::build(classifier, ScriptedConfirm::new(), None)
    }

    fn with_confirm(confirm: ScriptedConfirm) -> Self {
        Self::build(FakeClassifier::new(), confirm, None)
    }

    fn with_policy(strategy: RoutingStrategy) -> Self {
        Self::build(FakeClassifier::new(), ScriptedConfirm::new(), Some(strategy))
    }

    fn build(
        classifier: FakeClassifier,
        confirm: ScriptedConfirm,
        policy: Option<RoutingStrategy>,
    ) -> Self {
        let backend = Arc::new(FakeModelBackend::new());
        let shell = Arc::new(FakeShell::new());
        let classifier = Arc::new(classifier);
        let confirm = Arc::new(confirm);
        let log = Arc::new(MemoryLogSink::new());
        let policy = match policy {
            Some(s) => ScriptedPolicy::always(s),
            None => ScriptedPolicy::none(),
        };
        let router = Router::new(
            AstridConfig::default(),
            backend.clone(),
            shell.clone(),
            ToolRegistry::with_defaults(),
            classifier.clone(),
            Arc::new(policy),
            confirm.clone(),
            log.clone(),
        );
        Self {
            backend,
            shell,
            classifier,
            confirm,
            log,
            router,
        }
    }
}

// ---------------------------------------------------------------------
// Mode state machine
// ---------------------------------------------------------------------

#[test]
fn mode_switch_runs_no_other_path() {
    let mut h = Harness::new();

    let outcome = h.router.route(":BASH").unwrap();
    assert_eq!(outcome, Outcome::Switched(Mode::Shell));
    assert_eq!(h.router.mode(), Mode::Shell);

    let outcome = h.router.route(":code").unwrap();
    assert_eq!(outcome, Outcome::Switched(Mode::Code));

    assert_eq!(h.shell.call_count(), 0);
    assert!(h.backend.calls().is_empty());
    assert!(h.classifier.inputs().is_empty());
}

#[test]
fn snapshot_token_terminates_routing() {
    let mut h = Harness::new();
    let outcome = h.router.route(":state").unwrap();
    assert_eq!(outcome, Outcome::Snapshot);
    assert_eq!(h.router.mode(), Mode::Chat);
    assert_eq!(h.shell.call_count(), 0);
    assert!(h.backend.calls().is_empty());
}

#[test]
fn screen_token_captures_tmux_pane() {
    let mut h = Harness::new();
    h.shell.push_result(ExecResult::ok("pane contents"));
    let outcome = h.router.route(":screen").unwrap();
    assert_eq!(outcome, Outcome::Screen);
    assert_eq!(h.shell.commands(), vec!["tmux capture-pane -p"]);
    assert!(h.backend.calls().is_empty());
}

// ---------------------------------------------------------------------
// Shell path precedence
// ---------------------------------------------------------------------

#[test]
fn shell_mode_routes_everything_to_shell() {
    let mut h = Harness::new();
    h.router.route(":bash").unwrap();

    // A force-cloud token and a tool keyword elsewhere in the string do
    // not matter in shell mode.
    let outcome = h.router.route("gpt check my disk").unwrap();
    assert!(matches!(outcome, Outcome::ShellCompleted { .. }));
    assert_eq!(h.shell.commands(), vec!["gpt check my disk"]);
    assert!(h.backend.calls().is_empty());
    assert!(h.classifier.inputs().is_empty());
}

#[test]
fn force_shell_marker_executes_from_chat_mode() {
    let mut h = Harness::new();
    let outcome = h.router.route("!uname -a").unwrap();
    assert!(matches!(outcome, Outcome::ShellCompleted { .. }));
    assert_eq!(h.shell.commands(), vec!["uname -a"]);
    assert_eq!(h.router.mode(), Mode::Chat);
    assert!(h.backend.calls().is_empty());
}

// ---------------------------------------------------------------------
// AI query protocol: local-first, cloud-fallback
// ---------------------------------------------------------------------

#[test]
fn local_success_skips_cloud() {
    let mut h = Harness::new();
    h.backend.push_local(Ok("the disk looks healthy".to_string()));

    let outcome = h.router.route("how is my machine doing").unwrap();
    assert_eq!(outcome, Outcome::Answered(AnswerOrigin::Local));
    assert_eq!(h.backend.local_calls(), 1);
    assert_eq!(h.backend.cloud_calls(), 0);

    let call = &h.backend.calls()[0];
    assert_eq!(call.target, "mistral");
    assert_eq!(call.timeout, Duration::from_secs(90));
    assert_eq!(call.history_len, 0);
}

fn assert_falls_back_to_cloud(local: Result<String, LlmError>) {
    let mut h = Harness::new();
    h.backend.push_local(local);
    h.backend.push_cloud(Ok("cloud answer".to_string()));

    let outcome = h.router.route("hello there").unwrap();
    assert_eq!(outcome, Outcome::Answered(AnswerOrigin::Cloud));
    assert_eq!(h.backend.local_calls(), 1);
    assert_eq!(h.backend.cloud_calls(), 1);

    let cloud_call = &h.backend.calls()[1];
    assert_eq!(cloud_call.kind, BackendKind::Cloud);
    assert_eq!(cloud_call.target, "gpt-4o");
}

#[test]
fn local_error_falls_back_to_cloud_once() {
    assert_falls_back_to_cloud(Err(LlmError::Http("connection refused".to_string())));
}

#[test]
fn local_timeout_falls_back_to_cloud_once() {
    assert_falls_back_to_cloud(Err(LlmError::Timeout(90)));
}

#[test]
fn local_empty_answer_falls_back_to_cloud_once() {
    assert_falls_back_to_cloud(Ok(String::new()));
}

#[test]
fn local_flagged_answer_falls_back_to_cloud_once() {
    assert_falls_back_to_cloud(Ok("Error: model not loaded".to_string()));
}

#[test]
fn cloud_failure_is_terminal_not_retried() {
    let mut h = Harness::new();
    h.backend.push_local(Ok(String::new()));
    h.backend.push_cloud(Err(LlmError::NotConfigured));

    let outcome = h.router.route("hello").unwrap();
    // Failure is reported, not escalated further.
    assert_eq!(outcome, Outcome::Answered(AnswerOrigin::Cloud));
    assert_eq!(h.backend.cloud_calls(), 1);
}

#[test]
fn policy_strategy_overrides_default_targets() {
    let mut h = Harness::with_policy(RoutingStrategy {
        local_target: "llama3.1:8b".to_string(),
        cloud_target: "gpt-4o-mini".to_string(),
    });
    h.backend.push_local(Ok(String::new()));

    h.router.route("a long question").unwrap();
    let calls = h.backend.calls();
    assert_eq!(calls[0].target, "llama3.1:8b");
    assert_eq!(calls[1].target, "gpt-4o-mini");
}

// ---------------------------------------------------------------------
// Shell failure: escalation and diagnosis
// ---------------------------------------------------------------------

#[test]
fn exit_zero_never_diagnoses() {
    let mut h = Harness::new();
    h.router.route(":bash").unwrap();
    // Even suspicious stderr is ignored when the exit code is 0.
    h.shell.push_result(ExecResult {
        stdout: "done".to_string(),
        stderr: "warning: permission denied somewhere".to_string(),
        exit_code: 0,
    });

    let outcome = h.router.route("some-command").unwrap();
    assert_eq!(
        outcome,
        Outcome::ShellCompleted {
            exit_code: 0,
            escalated: false,
            diagnosis: None
        }
    );
    assert!(h.backend.calls().is_empty());
    assert!(h.confirm.prompts().is_empty());
}

#[test]
fn permission_denied_with_affirmative_runs_sudo_retry() {
    let mut h = Harness::with_confirm(ScriptedConfirm::with_answers(vec!["y"]));
    h.shell.push_result(ExecResult::failed(
        1,
        "touch: cannot touch '/etc/x': Permission denied",
    ));
    h.shell.push_result(ExecResult::ok("ok"));

    let outcome = h.router.route("!touch /etc/x").unwrap();
    assert_eq!(
        outcome,
        Outcome::ShellCompleted {
            exit_code: 1,
            escalated: true,
            diagnosis: None
        }
    );
    assert_eq!(h.shell.commands(), vec!["touch /etc/x", "sudo touch /etc/x"]);
    assert_eq!(h.confirm.prompts().len(), 1);
    // The privileged retry is never diagnosed.
    assert!(h.backend.calls().is_empty());
}

#[test]
fn non_exact_affirmative_skips_retry_and_diagnoses() {
    // "yes" is not the exact affirmative token.
    let mut h = Harness::with_confirm(ScriptedConfirm::with_answers(vec!["yes"]));
    h.shell
        .push_result(ExecResult::failed(1, "Operation not permitted"));
    h.backend.push_local(Ok("you need elevated rights".to_string()));

    let outcome = h.router.route("!systemctl restart foo").unwrap();
    assert_eq!(
        outcome,
        Outcome::ShellCompleted {
            exit_code: 1,
            escalated: false,
            diagnosis: Some(AnswerOrigin::Local)
        }
    );
    // No sudo retry ran.
    assert_eq!(h.shell.call_count(), 1);
    assert_eq!(h.confirm.prompts().len(), 1);
    assert_eq!(h.backend.local_calls(), 1);
}

#[test]
fn plain_failure_diagnoses_without_escalation_prompt() {
    let mut h = Harness::new();
    h.router.route(":bash").unwrap();
    h.shell.push_result(ExecResult::failed(
        2,
        "ls: cannot access '/nonexistent': No such file or directory",
    ));
    h.backend.push_local(Ok("that path does not exist".to_string()));

    let outcome = h.router.route("ls /nonexistent").unwrap();
    assert!(h.confirm.prompts().is_empty());
    assert_eq!(
        outcome,
        Outcome::ShellCompleted {
            exit_code: 2,
            escalated: false,
            diagnosis: Some(AnswerOrigin::Local)
        }
    );

    // The diagnosis prompt embeds the command and its stderr, and uses
    // the shorter diagnosis timeout.
    let call = &h.backend.calls()[0];
    assert!(call.prompt.contains("`ls /nonexistent`"));
    assert!(call.prompt.contains("No such file or directory"));
    assert_eq!(call.timeout, Duration::from_secs(20));
}

#[test]
fn diagnosis_falls_back_to_cloud_like_chat() {
    let mut h = Harness::new();
    h.shell.push_result(ExecResult::failed(127, "frob: command not found"));
    h.backend.push_local(Err(LlmError::Timeout(20)));
    h.backend.push_cloud(Ok("frob is not installed".to_string()));

    let outcome = h.router.route("!frob --all").unwrap();
    assert_eq!(
        outcome,
        Outcome::ShellCompleted {
            exit_code: 127,
            escalated: false,
            diagnosis: Some(AnswerOrigin::Cloud)
        }
    );
    assert_eq!(h.backend.cloud_calls(), 1);
}

// ---------------------------------------------------------------------
// Code mode round-trip
// ---------------------------------------------------------------------

#[test]
fn code_mode_uses_code_model_and_instruction() {
    let mut h = Harness::new();
    h.router.route(":code").unwrap();
    h.backend.push_local(Ok("fn main() {}".to_string()));

    h.router.route("write a hello world").unwrap();
    let call = &h.backend.calls()[0];
    assert_eq!(call.target, "qwen2.5-coder");
    assert!(call.prompt.contains("expert programmer"));

    // Switching back restores the general pair.
    h.router.route(":chat").unwrap();
    h.backend.push_local(Ok("hello to you too".to_string()));
    h.router.route("write a greeting").unwrap();
    let call = &h.backend.calls()[1];
    assert_eq!(call.target, "mistral");
    assert!(call.prompt.contains("operations assistant"));
}

#[test]
fn code_mode_skips_tool_dispatch() {
    let mut h = Harness::with_classifier(FakeClassifier::with_responses(vec![Some(json!([
        "DISK_DIAG", ""
    ]))]));
    h.router.route(":code").unwrap();
    h.backend.push_local(Ok("no tools here".to_string()));

    let outcome = h.router.route("check my disk").unwrap();
    assert_eq!(outcome, Outcome::Answered(AnswerOrigin::Local));
    // The classifier is never consulted outside chat mode.
    assert!(h.classifier.inputs().is_empty());
}

// ---------------------------------------------------------------------
// Tool dispatch
// ---------------------------------------------------------------------

#[test]
fn chat_tool_dispatch_short_circuits_ai() {
    let mut h = Harness::with_classifier(FakeClassifier::with_responses(vec![Some(json!([
        "DISK_DIAG", ""
    ]))]));

    let outcome = h.router.route("check my disk").unwrap();
    assert_eq!(outcome, Outcome::ToolDispatched("DISK_DIAG".to_string()));
    assert!(h.backend.calls().is_empty());
    // The handler received the empty argument and logged the dispatch.
    assert!(h.log.lines().iter().any(|l| l.contains("tool DISK_DIAG arg=''")));
}

#[test]
fn mapping_shape_intent_dispatches_too() {
    let mut h = Harness::with_classifier(FakeClassifier::with_responses(vec![Some(json!({
        "tool": "NET_INFO"
    }))]));

    let outcome = h.router.route("show my interfaces").unwrap();
    assert_eq!(outcome, Outcome::ToolDispatched("NET_INFO".to_string()));
    assert!(h.backend.calls().is_empty());
}

#[test]
fn unknown_tool_falls_through_to_ai() {
    let mut h = Harness::with_classifier(FakeClassifier::with_responses(vec![Some(json!([
        "NOT_A_TOOL", ""
    ]))]));
    h.backend.push_local(Ok("plain answer".to_string()));

    let outcome = h.router.route("do something exotic").unwrap();
    assert_eq!(outcome, Outcome::Answered(AnswerOrigin::Local));
    assert_eq!(h.backend.local_calls(), 1);
}

#[test]
fn malformed_intent_falls_through_to_ai() {
    let mut h = Harness::with_classifier(FakeClassifier::with_responses(vec![Some(json!(42))]));
    h.backend.push_local(Ok("plain answer".to_string()));

    let outcome = h.router.route("whatever this is").unwrap();
    assert_eq!(outcome, Outcome::Answered(AnswerOrigin::Local));
}

// ---------------------------------------------------------------------
// Force-cloud token
// ---------------------------------------------------------------------

#[test]
fn force_cloud_token_goes_straight_online() {
    let mut h = Harness::new();
    h.backend.push_cloud(Ok("summary here".to_string()));

    let outcome = h.router.route("gpt summarize this").unwrap();
    assert_eq!(outcome, Outcome::CloudForced);
    assert_eq!(h.backend.local_calls(), 0);
    assert_eq!(h.backend.cloud_calls(), 1);

    let call = &h.backend.calls()[0];
    assert_eq!(call.prompt, "summarize this");
    assert_eq!(call.target, "gpt-4o");
    assert_eq!(call.timeout, Duration::from_secs(15));
}

// ---------------------------------------------------------------------
// Session-level behavior
// ---------------------------------------------------------------------

#[test]
fn empty_input_is_ignored() {
    let mut h = Harness::new();
    assert_eq!(h.router.route("   ").unwrap(), Outcome::Empty);
    assert_eq!(h.router.route("!").unwrap(), Outcome::Empty);
    assert!(h.backend.calls().is_empty());
    assert_eq!(h.shell.call_count(), 0);
}

#[test]
fn shell_commands_are_logged() {
    let mut h = Harness::new();
    h.router.route("!echo hi").unwrap();
    assert!(h.log.lines().iter().any(|l| l.contains("shell: echo hi")));
}
