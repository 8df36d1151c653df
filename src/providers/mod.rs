// LLM provider abstraction
//
// Agents talk to a model through `LlmProvider`; the concrete provider is
// chosen from configuration.

use anyhow::Result;
use async_trait::async_trait;

pub mod gemini;
pub mod retry;
pub mod types;

pub use gemini::GeminiProvider;
pub use types::{Message, ProviderRequest, ProviderResponse};

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request and wait for the complete response
    async fn send_message(&self, request: &ProviderRequest) -> Result<ProviderResponse>;

    /// Provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// Model used when a request does not name one
    fn default_model(&self) -> &str;
}
