//! `LlmClient` trait: abstraction over reasoning backends.
//!
//! Providers (Anthropic, Ollama) implement this trait so the agent loop
//! only depends on the shared message/tool types.

use anyhow::Result;
use async_trait::async_trait;

use super::{LlmResponse, Message, ToolDefinition};

/// Abstraction over LLM backends (Anthropic, Ollama).
///
/// Each provider translates the shared message/tool types into its own
/// wire format and normalizes responses back into [`LlmResponse`].
/// Implementations must fail fast: one request, bounded by a timeout,
/// no retry.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends a conversation to the LLM and returns the response.
    ///
    /// When `tools` is `Some`, tool definitions are included and the
    /// response may contain tool calls. When `None`, the `tools`
    /// field is omitted.
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse>;

    /// Human-readable description of the provider and model.
    ///
    /// Used in log output, e.g. `"anthropic (claude-sonnet-4-5-20250929)"`.
    fn description(&self) -> String;
}

/// Shared HTTP client builder: explicit request and connect timeouts.
pub(super) fn http_client(request_timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(request_timeout_secs))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;
    Ok(client)
}
