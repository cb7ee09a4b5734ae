pub mod builtin;
pub mod error;
pub mod registry;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::llm::ToolDefinition;
use crate::sandbox::WorkingRoot;

pub use error::ToolError;
pub use registry::ToolRegistry;

/// Value kind accepted by a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    StringArray,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

/// Name, description and ordered parameters of a tool, as published to
/// the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    /// Renders the descriptor as a JSON-schema tool definition.
    pub fn to_definition(&self) -> ToolDefinition {
        let mut properties = Map::new();
        for param in &self.parameters {
            let schema = match param.kind {
                ParamKind::String => json!({
                    "type": "string",
                    "description": param.description,
                }),
                ParamKind::StringArray => json!({
                    "type": "array",
                    "items": {"type": "string"},
                    "description": param.description,
                }),
            };
            properties.insert(param.name.to_string(), schema);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Checks `args` against the declared parameters.
    ///
    /// Required parameters must be present and non-null; present values must
    /// match their kind. Undeclared keys are ignored.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), String> {
        for param in &self.parameters {
            match args.get(param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(format!("missing required parameter `{}`", param.name));
                    }
                }
                Some(value) => {
                    let ok = match param.kind {
                        ParamKind::String => value.is_string(),
                        ParamKind::StringArray => value
                            .as_array()
                            .is_some_and(|items| items.iter().all(Value::is_string)),
                    };
                    if !ok {
                        let expected = match param.kind {
                            ParamKind::String => "a string",
                            ParamKind::StringArray => "an array of strings",
                        };
                        return Err(format!("parameter `{}` must be {expected}", param.name));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Text outcome of a tool call, fed back to the model verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub content: String,
    /// Advisory flag forwarded to providers that support it
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(err: &ToolError) -> Self {
        Self {
            content: format!("Error: {err}"),
            is_error: true,
        }
    }
}

/// A capability the model can invoke.
///
/// Arguments arrive already validated against [`Tool::descriptor`] and
/// deserialized into `Args`. The working root always comes from the
/// registry, never from the model.
#[async_trait]
pub trait Tool: Send + Sync {
    type Args: DeserializeOwned + Send + 'static;

    fn descriptor(&self) -> ToolDescriptor;

    /// Runs the tool. Errors are rendered into the tool result by the
    /// registry; they never abort the agent loop.
    async fn execute(&self, root: &WorkingRoot, args: Self::Args) -> Result<String, ToolError>;
}
