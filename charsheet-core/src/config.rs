//! Configuration for the character sheet system.
//!
//! Maps directly to `charsheet.toml`. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// When and how evaluations run.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    /// Model backend.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Settings database.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl SheetConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `SheetError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::SheetError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Evaluation cadence and prompt context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Run an incremental evaluation every N received messages (0 disables).
    #[serde(default = "default_every_n")]
    pub every_n_messages: u32,
    /// Delay before the fresh evaluation of a new conversation.
    #[serde(default = "default_fresh_delay")]
    pub fresh_delay_ms: u64,
    /// Append the recent transcript to the evaluation prompt.
    #[serde(default = "default_true")]
    pub include_transcript: bool,
    /// How many trailing messages make up that transcript.
    #[serde(default = "default_transcript_messages")]
    pub transcript_messages: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            every_n_messages: default_every_n(),
            fresh_delay_ms: default_fresh_delay(),
            include_transcript: true,
            transcript_messages: default_transcript_messages(),
        }
    }
}

/// Model backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `ollama`, `openai` or `none`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL of the backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key (OpenAI-compatible only).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_ms: default_timeout(),
        }
    }
}

/// Settings database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Settings namespace inside the database.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Enable WAL journaling.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            namespace: default_namespace(),
            wal_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (required by serde)
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_every_n() -> u32 {
    3
}
fn default_fresh_delay() -> u64 {
    1500
}
fn default_transcript_messages() -> usize {
    20
}
fn default_provider() -> String {
    "ollama".to_string()
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout() -> u64 {
    60_000
}
fn default_db_path() -> PathBuf {
    PathBuf::from("charsheet.db")
}
fn default_namespace() -> String {
    "character-sheet".to_string()
}
