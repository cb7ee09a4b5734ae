use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::LlmConfig;

use super::client::{http_client, LlmClient};
use super::{LlmResponse, Message, StopReason, ToolCall, ToolDefinition};

/// Default Anthropic API base URL.
const DEFAULT_ANTHROPIC_HOST: &str = "https://api.anthropic.com";

/// Client for Anthropic Messages API
pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
    host: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = http_client(config.request_timeout_secs)?;
        let host = config
            .host
            .as_deref()
            .unwrap_or(DEFAULT_ANTHROPIC_HOST)
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
impl LlmClient for AnthropicClient {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LlmResponse> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens_per_request,
            system: system_prompt,
            messages,
            tools,
        };

        debug!(
            "Calling Claude API ({}) with {} messages{}",
            self.config.model,
            messages.len(),
            if tools.is_some() { " + tools" } else { "" }
        );

        let response = self
            .client
            .post(format!("{}/v1/messages", self.host))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Claude API error ({status}): {body}");
        }

        let resp: MessagesResponse = response.json().await?;
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

fn normalize_response(resp: MessagesResponse) -> LlmResponse {
    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();
    for block in resp.content {
        match block {
            ContentBlock::Text { text } => texts.push(text),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall { id, name, input })
            }
            ContentBlock::Unknown => {}
        }
    }

    let stop_reason = match resp.stop_reason.as_deref() {
        Some("end_turn") | Some("stop_sequence") | None => StopReason::EndTurn,
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some(other) => StopReason::Other(other.to_string()),
    };

    let (input_tokens, output_tokens) = resp
        .usage
        .map(|u| (u.input_tokens, u.output_tokens))
        .unwrap_or((0, 0));

    LlmResponse {
        text: texts.join("\n"),
        tool_calls,
        stop_reason,
        input_tokens,
        output_tokens,
    }
}
