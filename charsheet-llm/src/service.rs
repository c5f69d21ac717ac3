//! The model invocation port.
//!
//! The host (or [`LlmClient`](crate::LlmClient)) supplies the actual model
//! call. Tests plug in scripted implementations.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::types::{LlmRequest, LlmResponse};

/// Something that turns one text prompt into generated text.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Generate a reply for `request`.
    ///
    /// # Errors
    ///
    /// Implementations return [`LlmError`] for transport or provider
    /// failures. Callers must not expect a retry.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;
}
