//! LLM Client — Ollama and OpenAI-compatible backends behind [`ModelService`].
//!
//! Each call is a single attempt. The request timeout is the only deadline.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use charsheet_core::config::LlmConfig;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::service::ModelService;
use crate::types::{LlmRequest, LlmResponse};

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally.
    Ollama { base_url: String },
    /// OpenAI-compatible API.
    OpenAiCompatible { base_url: String, api_key: String },
    /// No LLM available — every call fails with [`LlmError::Unavailable`].
    None,
}

/// HTTP client that routes requests to the configured backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let provider = match &self.provider {
            LlmProvider::Ollama { .. } => "ollama",
            LlmProvider::OpenAiCompatible { .. } => "openai",
            LlmProvider::None => "none",
        };
        f.debug_struct("LlmClient")
            .field("provider", &provider)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
        }
    }

    /// Create a client with no backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new())
    }

    /// Build a client from `[llm]` configuration.
    ///
    /// The OpenAI API key is read from the environment variable named by
    /// `api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider or a missing
    /// API key.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let provider = match config.provider.as_str() {
            "ollama" => LlmProvider::Ollama { base_url },
            "openai" => {
                let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                    LlmError::ConfigError(format!(
                        "environment variable {} is not set",
                        config.api_key_env
                    ))
                })?;
                LlmProvider::OpenAiCompatible { base_url, api_key }
            }
            "none" => LlmProvider::None,
            other => {
                return Err(LlmError::ConfigError(format!("unknown provider '{other}'")));
            }
        };
        Ok(Self::new(provider, config.model.clone()))
    }

    /// Check if the client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Generate using Ollama's API.
    async fn generate_ollama(
        &self,
        base_url: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/api/generate");
        let body = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });

        let start = Instant::now();
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .timeout(Duration::from_millis(request.timeout_ms))
            .send()
            .await
            .map_err(|e| self.transport_error(e, request))?;
        let latency_ms = elapsed_ms(start);

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            warn!(%status, "Ollama returned error");
            return Err(LlmError::RequestFailed(format!("HTTP {status}: {detail}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        Ok(LlmResponse {
            text: json["response"].as_str().unwrap_or("").to_string(),
            tokens_generated: token_count(&json["eval_count"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    /// Generate using an OpenAI-compatible API.
    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &LlmRequest,
    ) -> Result<LlmResponse, LlmError> {
        let url = format!("{base_url}/v1/chat/completions");
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": request.prompt },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let start = Instant::now();
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .timeout(Duration::from_millis(request.timeout_ms))
            .send()
            .await
            .map_err(|e| self.transport_error(e, request))?;
        let latency_ms = elapsed_ms(start);

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(%status, "OpenAI API returned error");
            return Err(LlmError::RequestFailed(format!("HTTP {status}")));
        }

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        Ok(LlmResponse {
            text: json["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or("")
                .to_string(),
            tokens_generated: token_count(&json["usage"]["completion_tokens"]),
            latency_ms,
            model: self.model.clone(),
        })
    }

    fn transport_error(&self, err: reqwest::Error, request: &LlmRequest) -> LlmError {
        if err.is_timeout() {
            warn!(model = %self.model, timeout_ms = request.timeout_ms, "LLM request timed out");
            LlmError::Timeout(request.timeout_ms)
        } else {
            warn!(model = %self.model, error = %err, "LLM request failed");
            LlmError::from(err)
        }
    }
}

#[async_trait]
impl ModelService for LlmClient {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            quiet = request.quiet,
            "Invoking model"
        );
        match &self.provider {
            LlmProvider::None => Err(LlmError::Unavailable("No LLM provider configured".into())),
            LlmProvider::Ollama { base_url } => self.generate_ollama(base_url, request).await,
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                self.generate_openai(base_url, api_key, request).await
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn token_count(value: &serde_json::Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}
