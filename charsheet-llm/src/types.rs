//! Core types for LLM requests and responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to the model.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// The full prompt text.
    pub prompt: String,
    /// Quiet requests are not shown in the host's chat.
    pub quiet: bool,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// A quiet (non-displayed) request with default sampling.
    #[must_use]
    pub fn quiet(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            quiet: true,
            max_tokens: 1024,
            temperature: 0.7,
            timeout_ms: 60_000,
        }
    }

    /// Set the token limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the model.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}

impl LlmResponse {
    /// A response carrying only text, as returned by hosts that hide the rest.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens_generated: 0,
            latency_ms: 0,
            model: String::new(),
        }
    }
}

/// The parsed combined-evaluation object: participant name → verdict.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReply {
    entries: Map<String, Value>,
}

impl EvaluationReply {
    /// Wrap a parsed JSON object.
    #[must_use]
    pub fn new(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Raw entry for an exact participant name.
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Verdict for an exact participant name.
    ///
    /// `None` if the name is absent; `Some(None)` if present but the value is
    /// not an object.
    #[must_use]
    pub fn verdict(&self, name: &str) -> Option<Option<CharacterVerdict>> {
        self.entries.get(name).map(CharacterVerdict::from_value)
    }

    /// Names present in the reply.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the reply has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the model said about one participant, leniently interpreted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterVerdict {
    /// New title, only if the model sent a string.
    pub title: Option<String>,
    /// Numeric stat values, only if the model sent an object. Non-numeric
    /// members are dropped.
    pub stats: Option<BTreeMap<String, f64>>,
}

impl CharacterVerdict {
    /// Interpret one reply value. Returns `None` unless it is an object.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let title = object.get("title").and_then(Value::as_str).map(str::to_string);
        let stats = object.get("stats").and_then(Value::as_object).map(|stats| {
            stats
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
                .collect()
        });
        Some(Self { title, stats })
    }

    /// Numeric value for one stat.
    #[must_use]
    pub fn stat(&self, name: &str) -> Option<f64> {
        self.stats.as_ref().and_then(|s| s.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_reads_title_and_numeric_stats() {
        let v = CharacterVerdict::from_value(&json!({
            "title": "Alice, the Bold",
            "stats": {"Strength": 15, "Dexterity": "high", "Wisdom": 11.5}
        }))
        .expect("object");
        assert_eq!(v.title.as_deref(), Some("Alice, the Bold"));
        assert_eq!(v.stat("Strength"), Some(15.0));
        assert_eq!(v.stat("Dexterity"), None);
        assert_eq!(v.stat("Wisdom"), Some(11.5));
    }

    #[test]
    fn verdict_ignores_wrong_shapes() {
        let v = CharacterVerdict::from_value(&json!({"title": 7, "stats": [1, 2]})).expect("object");
        assert!(v.title.is_none());
        assert!(v.stats.is_none());
        assert!(CharacterVerdict::from_value(&json!("Alice")).is_none());
    }

    #[test]
    fn reply_distinguishes_absent_and_malformed() {
        let mut map = Map::new();
        map.insert("Alice".into(), json!({"title": "A"}));
        map.insert("Bob".into(), json!(null));
        let reply = EvaluationReply::new(map);

        assert!(reply.verdict("Carol").is_none());
        assert_eq!(reply.verdict("Bob"), Some(None));
        assert!(matches!(reply.verdict("Alice"), Some(Some(_))));
        assert_eq!(reply.len(), 2);
    }

    #[test]
    fn quiet_request_builder() {
        let req = LlmRequest::quiet("hi").with_max_tokens(64).with_timeout(250);
        assert!(req.quiet);
        assert_eq!(req.max_tokens, 64);
        assert_eq!(req.timeout_ms, 250);
    }
}
