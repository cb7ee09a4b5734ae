//! Reasoning backend abstraction and provider adapters.
//!
//! The message/tool types below follow the Anthropic Messages API shape;
//! other providers translate them into their own wire format.

pub mod anthropic;
pub mod client;
pub mod ollama;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

pub use anthropic::AnthropicClient;
pub use client::LlmClient;
pub use ollama::OllamaClient;

/// A conversation message as sent to the backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

/// Plain text or a list of typed content blocks.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<InputContentBlock>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

/// Tool definition published to the backend.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool invocation requested by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Provider tool-use id, synthesized when the provider has none
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Other(String),
}

/// Normalized backend response. Either field may be empty.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Builds the backend client selected by `[llm] provider`.
pub fn from_config(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider.as_str() {
        "anthropic" => Ok(Box::new(AnthropicClient::new(config.clone())?)),
        "ollama" => Ok(Box::new(OllamaClient::new(config.clone())?)),
        other => bail!("Unsupported LLM provider '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            model: "some-model".to_string(),
            api_key: "key".to_string(),
            host: None,
            max_tokens_per_request: 1024,
            request_timeout_secs: 10,
        }
    }

    #[test]
    fn test_from_config_selects_provider() {
        let client = from_config(&llm_config("anthropic")).unwrap();
        assert_eq!(client.description(), "anthropic (some-model)");
        let client = from_config(&llm_config("ollama")).unwrap();
        assert_eq!(client.description(), "ollama (some-model)");
    }

    #[test]
    fn test_from_config_unknown_provider() {
        assert!(from_config(&llm_config("gemini")).is_err());
    }

    #[test]
    fn test_tool_result_block_serialization() {
        let block = InputContentBlock::ToolResult {
            tool_use_id: "toolu_1".to_string(),
            content: "Error: boom".to_string(),
            is_error: true,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "toolu_1");
        assert_eq!(json["is_error"], true);

        let ok = InputContentBlock::ToolResult {
            tool_use_id: "toolu_2".to_string(),
            content: "fine".to_string(),
            is_error: false,
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("is_error").is_none());
    }

    #[test]
    fn test_text_content_serializes_as_string() {
        let msg = Message {
            role: "user".to_string(),
            content: MessageContent::Text("hi".to_string()),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["content"], "hi");
    }
}
