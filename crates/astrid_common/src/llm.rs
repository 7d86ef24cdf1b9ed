//! Model backend abstraction - v0.6.0
//!
//! One interface for asking a named model a question, local or remote,
//! bounded by a timeout. The local path speaks the Ollama generate API;
//! the cloud path speaks an OpenAI-compatible chat completions API and
//! refuses to touch the network without a configured key.
//!
//! A fake backend with call recording lives here too so routing logic can
//! be tested without any inference server.

use crate::config::{CloudSettings, LlmSettings};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Persona sent as the system message on cloud calls.
const CLOUD_PERSONA: &str = "You are Astrid, an advanced AI assistant.";

/// Which kind of backend a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Local,
    Cloud,
}

/// One prior conversation turn. Accepted for interface symmetry; the
/// routing core always passes an empty history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// A successful model answer: text plus a backend status tag.
#[derive(Debug, Clone)]
pub struct ModelAnswer {
    pub text: String,
    pub status_tag: String,
}

/// Model backend errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("cloud API key is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timeout after {0} seconds")]
    Timeout(u64),

    #[error("model returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// Uniform interface to local and cloud inference.
pub trait ModelBackend: Send + Sync {
    fn query(
        &self,
        prompt: &str,
        target: &str,
        kind: BackendKind,
        timeout: Duration,
        history: &[ChatTurn],
    ) -> Result<ModelAnswer, LlmError>;
}

/// Real backend speaking HTTP to both worlds.
pub struct HttpModelBackend {
    llm: LlmSettings,
    cloud: CloudSettings,
    client: reqwest::blocking::Client,
}

impl HttpModelBackend {
    pub fn new(llm: LlmSettings, cloud: CloudSettings) -> anyhow::Result<Self> {
        // Timeouts are per-request; the client itself carries none.
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self { llm, cloud, client })
    }

    fn query_local(
        &self,
        prompt: &str,
        target: &str,
        timeout: Duration,
        history: &[ChatTurn],
    ) -> Result<ModelAnswer, LlmError> {
        let url = format!("{}/api/generate", self.llm.endpoint);

        // The generate API has no message list; fold prior turns into the
        // prompt. With the empty history the core supplies, this is a no-op.
        let mut full_prompt = String::new();
        for turn in history {
            full_prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        full_prompt.push_str(prompt);

        let body = serde_json::json!({
            "model": target,
            "prompt": full_prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&body)
            .send()
            .map_err(|e| map_transport_error(e, timeout))?;

        if !response.status().is_success() {
            return Err(LlmError::Http(format!(
                "HTTP {} from local backend",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = json
            .get("response")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LlmError::InvalidResponse("missing 'response' field".to_string()))?;

        Ok(ModelAnswer {
            text: text.to_string(),
            status_tag: "local".to_string(),
        })
    }

    fn query_cloud(
        &self,
        prompt: &str,
        target: &str,
        timeout: Duration,
        history: &[ChatTurn],
    ) -> Result<ModelAnswer, LlmError> {
        if !self.cloud.is_configured() {
            return Err(LlmError::NotConfigured);
        }

        let url = format!("{}/v1/chat/completions", self.cloud.endpoint);

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": CLOUD_PERSONA,
        })];
        for turn in history {
            messages.push(serde_json::json!({
                "role": turn.role,
                "content": turn.content,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": prompt,
        }));

        let body = serde_json::json!({
            "model": target,
            "messages": messages,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.cloud.api_key.trim())
            .timeout(timeout)
            .json(&body)
            .send()
            .map_err(|e| map_transport_error(e, timeout))?;

        if !response.status().is_success() {
            return Err(LlmError::Http(format!(
                "HTTP {} from cloud backend",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                LlmError::InvalidResponse("missing choices[0].message.content".to_string())
            })?;

        Ok(ModelAnswer {
            text: text.to_string(),
            status_tag: "online".to_string(),
        })
    }
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout(timeout.as_secs())
    } else {
        LlmError::Http(e.to_string())
    }
}

impl ModelBackend for HttpModelBackend {
    fn query(
        &self,
        prompt: &str,
        target: &str,
        kind: BackendKind,
        timeout: Duration,
        history: &[ChatTurn],
    ) -> Result<ModelAnswer, LlmError> {
        match kind {
            BackendKind::Local => self.query_local(prompt, target, timeout, history),
            BackendKind::Cloud => self.query_cloud(prompt, target, timeout, history),
        }
    }
}

/// One recorded query against the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub prompt: String,
    pub target: String,
    pub kind: BackendKind,
    pub timeout: Duration,
    pub history_len: usize,
}

/// Fake backend for tests: scripted answers per backend kind, with full
/// call recording.
pub struct FakeModelBackend {
    local_responses: Mutex<Vec<Result<String, LlmError>>>,
    cloud_responses: Mutex<Vec<Result<String, LlmError>>>,
    calls: Mutex<Vec<RecordedQuery>>,
}

impl Default for FakeModelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeModelBackend {
    pub fn new() -> Self {
        Self {
            local_responses: Mutex::new(Vec::new()),
            cloud_responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a local-backend response.
    pub fn push_local(&self, response: Result<String, LlmError>) {
        self.local_responses.lock().unwrap().push(response);
    }

    /// Queue a cloud-backend response.
    pub fn push_cloud(&self, response: Result<String, LlmError>) {
        self.cloud_responses.lock().unwrap().push(response);
    }

    /// Every query made so far, in order.
    pub fn calls(&self) -> Vec<RecordedQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub fn local_calls(&self) -> usize {
        self.count(BackendKind::Local)
    }

    pub fn cloud_calls(&self) -> usize {
        self.count(BackendKind::Cloud)
    }

    fn count(&self, kind: BackendKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.kind == kind)
            .count()
    }
}

impl ModelBackend for FakeModelBackend {
    fn query(
        &self,
        prompt: &str,
        target: &str,
        kind: BackendKind,
        timeout: Duration,
        history: &[ChatTurn],
    ) -> Result<ModelAnswer, LlmError> {
        self.calls.lock().unwrap().push(RecordedQuery {
            prompt: prompt.to_string(),
            target: target.to_string(),
            kind,
            timeout,
            history_len: history.len(),
        });

        let queue = match kind {
            BackendKind::Local => &self.local_responses,
            BackendKind::Cloud => &self.cloud_responses,
        };
        let mut queue = queue.lock().unwrap();
        let scripted = if queue.is_empty() {
            Ok("ok".to_string())
        } else {
            queue.remove(0)
        };

        scripted.map(|text| ModelAnswer {
            text,
            status_tag: match kind {
                BackendKind::Local => "local".to_string(),
                BackendKind::Cloud => "online".to_string(),
            },
        })
    }
}
