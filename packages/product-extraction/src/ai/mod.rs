//! Generative completion service.
//!
//! The pipeline only needs one capability: send a system and a user prompt,
//! get text back. Implementations wrap a specific provider.

pub mod openai;

use async_trait::async_trait;

use crate::error::CompletionError;

pub use openai::OpenAICompletion;

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete a prompt pair and return the raw text response.
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, CompletionError>;

    /// Name of the backing provider (for logging).
    fn name(&self) -> &str;
}
