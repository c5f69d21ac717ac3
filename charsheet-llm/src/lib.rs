//! # charsheet-llm — LLM Layer for Character Sheets
//!
//! Everything that talks to, or about, the language model:
//!   - **Model port** ([`ModelService`]) the evaluation cycle depends on
//!   - **HTTP client** ([`LlmClient`]) for Ollama and OpenAI-compatible APIs
//!   - **Prompt** building for the combined all-characters evaluation
//!   - **Extraction** of the first balanced JSON object from free-form output
//!
//! There is no retry policy anywhere in this crate: a failed call is reported
//! once and the caller decides what to do.
//!
//! # Flow
//!
//! ```text
//! roster + stats ──► prompt::build_combined_eval_prompt ──► ModelService::generate
//!                                                              │
//!        EvaluationReply ◄── extract::parse_reply ◄── free text┘
//! ```

pub mod client;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod service;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use service::ModelService;
pub use types::{CharacterVerdict, EvaluationReply, LlmRequest, LlmResponse};
