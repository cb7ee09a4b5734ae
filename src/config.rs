use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// "anthropic" or "ollama"
    pub provider: String,
    pub model: String,
    /// Supports ${ENV_VAR} substitution. Unused by Ollama.
    #[serde(default)]
    pub api_key: String,
    /// Base URL override. Each provider has its own default.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_request: u32,
    /// Hard limit on a single backend request. No retry on expiry.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Directory every tool call is confined to
    pub working_dir: PathBuf,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Replaces the built-in system prompt when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ToolsConfig {
    #[serde(default = "default_max_file_content_length")]
    pub max_file_content_length: usize,
    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,
    /// File extension (without the dot) → interpreter command
    #[serde(default = "default_interpreters")]
    pub interpreters: BTreeMap<String, String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_file_content_length: default_max_file_content_length(),
            script_timeout_secs: default_script_timeout(),
            interpreters: default_interpreters(),
        }
    }
}

const KNOWN_PROVIDERS: &[&str] = &["anthropic", "ollama"];

fn default_max_tokens() -> u32 {
    4096
}

fn default_request_timeout() -> u64 {
    120
}

fn default_max_iterations() -> u32 {
    20
}

fn default_max_file_content_length() -> usize {
    10_000
}

fn default_script_timeout() -> u64 {
    30
}

fn default_interpreters() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("py".to_string(), "python3".to_string()),
        ("sh".to_string(), "sh".to_string()),
    ])
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {path}"))?;
        Self::parse(&content)
    }

    /// Parses a TOML document after expanding `${ENV_VAR}` references.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let expanded = shellexpand::env(content)?;
        let config: Config = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            bail!(
                "Unsupported LLM provider '{}'. Supported: {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            );
        }
        if let Some(ref host) = self.llm.host {
            url::Url::parse(host).with_context(|| format!("Invalid llm.host '{host}'"))?;
        }
        if self.llm.request_timeout_secs == 0 {
            bail!("llm.request_timeout_secs must be at least 1");
        }
        if self.agent.max_iterations == 0 {
            bail!("agent.max_iterations must be at least 1");
        }
        if self.tools.script_timeout_secs == 0 {
            bail!("tools.script_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
