//! Ollama adapter: `POST {host}/api/chat` with `stream: false`.
//!
//! The system prompt travels as a `role: "system"` message, tools use the
//! OpenAI `{type: "function", function}` shape, and each tool result becomes
//! its own `role: "tool"` message. Ollama has no tool-call ids, so they are
//! synthesized from the call's position in the response.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LlmConfig;

use super::client::{http_client, LlmClient};
use super::{
    InputContentBlock, LlmResponse, Message, MessageContent, StopReason, ToolCall, ToolDefinition,
};

/// Default Ollama API base URL.
const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

// ── Ollama API request types ─────────────────────────────

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaToolDef>>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Debug, Serialize)]
struct OllamaToolDef {
    #[serde(rename = "type")]
    tool_type: String,
    function: OllamaFunctionDef,
}

#[derive(Debug, Serialize)]
struct OllamaFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

// ── Ollama API response types ────────────────────────────

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

// ── OllamaClient ────────────────────────────────────────

/// Client for a local or remote Ollama server.
pub struct OllamaClient {
    client: Client,
    config: LlmConfig,
    host: String,
}

impl OllamaClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = http_client(config.request_timeout_secs)?;
        let host = config
            .host
            .as_deref()
            .unwrap_or(DEFAULT_OLLAMA_HOST)
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            client,
            config,
            host,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse> {
        let mut ollama_messages = Vec::with_capacity(messages.len() + 1);

        if !system_prompt.is_empty() {
            ollama_messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
                tool_calls: None,
            });
        }

        for msg in messages {
            translate_message(msg, &mut ollama_messages);
        }

        let request = OllamaChatRequest {
            model: &self.config.model,
            messages: ollama_messages,
            stream: false,
            tools: tools.map(translate_tools),
            options: OllamaOptions {
                num_predict: self.config.max_tokens_per_request,
            },
        };

        debug!(
            "Calling Ollama API ({}) with {} messages{}",
            self.config.model,
            messages.len(),
            if tools.is_some() { " + tools" } else { "" }
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ollama API error ({status}): {body}");
        }

        let resp: OllamaChatResponse = response.json().await?;
        let llm_response = normalize_response(resp);

        info!(
            "LLM response: {} in / {} out tokens, {} tool call(s)",
            llm_response.input_tokens,
            llm_response.output_tokens,
            llm_response.tool_calls.len()
        );

        Ok(llm_response)
    }

    fn description(&self) -> String {
        format!("{} ({})", self.config.provider, self.config.model)
    }
}

fn translate_tools(defs: &[ToolDefinition]) -> Vec<OllamaToolDef> {
    defs.iter()
        .map(|td| OllamaToolDef {
            tool_type: "function".to_string(),
            function: OllamaFunctionDef {
                name: td.name.clone(),
                description: td.description.clone(),
                parameters: td.input_schema.clone(),
            },
        })
        .collect()
}

/// Tool calls take precedence over `done_reason`: Ollama reports "stop"
/// even when it asks for tools.
fn normalize_response(resp: OllamaChatResponse) -> LlmResponse {
    let tool_calls: Vec<ToolCall> = resp
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, tc)| ToolCall {
            id: format!("ollama_tool_{i}"),
            name: tc.function.name,
            input: tc.function.arguments,
        })
        .collect();

    let stop_reason = if !tool_calls.is_empty() {
        StopReason::ToolUse
    } else {
        match resp.done_reason.as_deref() {
            Some("stop") | None => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
        }
    };

    LlmResponse {
        text: resp.message.content,
        tool_calls,
        stop_reason,
        input_tokens: resp.prompt_eval_count.unwrap_or(0),
        output_tokens: resp.eval_count.unwrap_or(0),
    }
}

// ── Message translation helpers ──────────────────────────

/// One shared message may expand into several Ollama messages (one per
/// tool result).
fn translate_message(msg: &Message, out: &mut Vec<OllamaMessage>) {
    match &msg.content {
        MessageContent::Text(text) => {
            out.push(OllamaMessage {
                role: msg.role.clone(),
                content: text.clone(),
                tool_calls: None,
            });
        }
        MessageContent::Blocks(blocks) => {
            let mut text_parts = Vec::new();
            let mut tool_use_calls = Vec::new();
            let mut tool_results = Vec::new();

            for block in blocks {
                match block {
                    InputContentBlock::Text { text } => {
                        text_parts.push(text.clone());
                    }
                    InputContentBlock::ToolUse { id: _, name, input } => {
                        tool_use_calls.push(OllamaToolCall {
                            function: OllamaFunctionCall {
                                name: name.clone(),
                                arguments: input.clone(),
                            },
                        });
                    }
                    InputContentBlock::ToolResult { content, .. } => {
                        tool_results.push(content.clone());
                    }
                }
            }

            if !tool_use_calls.is_empty() {
                out.push(OllamaMessage {
                    role: "assistant".to_string(),
                    content: text_parts.join("\n"),
                    tool_calls: Some(tool_use_calls),
                });
                return;
            }

            if !tool_results.is_empty() {
                for result in tool_results {
                    out.push(OllamaMessage {
                        role: "tool".to_string(),
                        content: result,
                        tool_calls: None,
                    });
                }
                return;
            }

            out.push(OllamaMessage {
                role: msg.role.clone(),
                content: text_parts.join("\n"),
                tool_calls: None,
            });
        }
    }
}
