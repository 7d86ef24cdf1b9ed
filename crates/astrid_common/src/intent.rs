//! Intent classification boundary.
//!
//! Fast, deterministic keyword matching BEFORE any model call: common
//! diagnostic requests go straight to a tool without burning an inference
//! round-trip.
//!
//! Classifiers are allowed to produce either a `["TOOL", "arg"]` pair or a
//! `{"tool": ..., "arg": ...}` mapping. That ambiguity stops here:
//! `normalize` turns both shapes into one typed `Intent` and anything
//! malformed into "no intent matched".

use serde_json::Value;
use std::sync::Mutex;

/// A structured (tool, argument) interpretation of free-text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub tool: String,
    pub arg: String,
}

/// External classifier contract. `None` means nothing matched.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, command: &str) -> Option<Value>;
}

/// Normalize a raw classifier result into a typed intent.
///
/// Accepted shapes:
/// - pair: `["DISK_DIAG", "arg"]` (second element optional)
/// - mapping: `{"tool": "DISK_DIAG", "arg": "..."}` (`arg` optional)
///
/// Anything else is treated as "no intent matched", never an error.
pub fn normalize(raw: &Value) -> Option<Intent> {
    match raw {
        Value::Array(items) => {
            let tool = items.first()?.as_str()?;
            let arg = items.get(1).and_then(|v| v.as_str()).unwrap_or("");
            Some(Intent {
                tool: tool.to_string(),
                arg: arg.to_string(),
            })
        }
        Value::Object(map) => {
            let tool = map.get("tool")?.as_str()?;
            let arg = map.get("arg").and_then(|v| v.as_str()).unwrap_or("");
            Some(Intent {
                tool: tool.to_string(),
                arg: arg.to_string(),
            })
        }
        _ => None,
    }
}

/// Keyword table entry: tool identifier plus trigger words.
struct KeywordRule {
    tool: &'static str,
    keywords: &'static [&'static str],
}

/// Rules are checked in order; the first hit wins. More specific rules
/// sit above broader ones (NET_INFO before NET_DIAG).
const RULES: &[KeywordRule] = &[
    KeywordRule {
        tool: "DISK_DIAG",
        keywords: &["disk", "storage", "filesystem", "partition"],
    },
    KeywordRule {
        tool: "NET_INFO",
        keywords: &["ip", "interface", "interfaces"],
    },
    KeywordRule {
        tool: "NET_DIAG",
        keywords: &["internet", "ping", "dns", "network", "wifi"],
    },
    KeywordRule {
        tool: "AUDIO_DIAG",
        keywords: &["audio", "sound", "speaker", "speakers", "microphone"],
    },
    KeywordRule {
        tool: "SYSTEM_DIAG",
        keywords: &["cpu", "memory", "ram", "slow", "performance"],
    },
    KeywordRule {
        tool: "DESKTOP_DIAG",
        keywords: &["desktop", "monitor", "xorg", "wayland"],
    },
    KeywordRule {
        tool: "LOG_ANALYZE",
        keywords: &["log", "logs", "journal", "errors"],
    },
    KeywordRule {
        tool: "STATUS",
        keywords: &["status", "health"],
    },
];

/// Default deterministic classifier: whole-word keyword matching.
///
/// Emits the pair shape. Tests exercise the mapping shape through a
/// scripted classifier.
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, command: &str) -> Option<Value> {
        let lower = command.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        for rule in RULES {
            if rule.keywords.iter().any(|k| words.contains(k)) {
                return Some(serde_json::json!([rule.tool, ""]));
            }
        }
        None
    }
}

/// Scripted classifier for tests: returns queued raw values and records
/// every input it saw.
pub struct FakeClassifier {
    responses: Mutex<Vec<Option<Value>>>,
    inputs: Mutex<Vec<String>>,
}

impl Default for FakeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClassifier {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responses(responses: Vec<Option<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

impl IntentClassifier for FakeClassifier {
    fn classify(&self, command: &str) -> Option<Value> {
        self.inputs.lock().unwrap().push(command.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            None
        } else {
            responses.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_pair() {
        let intent = normalize(&json!(["DISK_DIAG", "/home"])).unwrap();
        assert_eq!(intent.tool, "DISK_DIAG");
        assert_eq!(intent.arg, "/home");
    }

    #[test]
    fn test_normalize_pair_without_arg() {
        let intent = normalize(&json!(["STATUS"])).unwrap();
        assert_eq!(intent.tool, "STATUS");
        assert_eq!(intent.arg, "");
    }

    #[test]
    fn test_normalize_mapping() {
        let intent = normalize(&json!({"tool": "NET_DIAG", "arg": "1.1.1.1"})).unwrap();
        assert_eq!(intent.tool, "NET_DIAG");
        assert_eq!(intent.arg, "1.1.1.1");
    }

    #[test]
    fn test_normalize_mapping_without_arg() {
        let intent = normalize(&json!({"tool": "NET_DIAG"})).unwrap();
        assert_eq!(intent.arg, "");
    }

    #[test]
    fn test_malformed_results_mean_no_intent() {
        assert_eq!(normalize(&json!("DISK_DIAG")), None);
        assert_eq!(normalize(&json!(42)), None);
        assert_eq!(normalize(&json!([1, 2])), None);
        assert_eq!(normalize(&json!({"arg": "x"})), None);
        assert_eq!(normalize(&json!(null)), None);
    }

    #[test]
    fn test_keyword_classifier_matches_whole_words() {
        let c = KeywordClassifier;
        let raw = c.classify("check my disk please").unwrap();
        assert_eq!(normalize(&raw).unwrap().tool, "DISK_DIAG");

        // "diskette" must not hit the "disk" rule
        assert!(c.classify("format a diskette").is_none());
    }

    #[test]
    fn test_keyword_classifier_rule_order() {
        let c = KeywordClassifier;
        // "ip" is the more specific NET_INFO rule even though "network"
        // appears too
        let raw = c.classify("show the ip of this network box").unwrap();
        assert_eq!(normalize(&raw).unwrap().tool, "NET_INFO");
    }

    #[test]
    fn test_keyword_classifier_no_match() {
        let c = KeywordClassifier;
        assert!(c.classify("tell me a story about boats").is_none());
    }
}
