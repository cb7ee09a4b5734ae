//! Tool registry: name → descriptor + executor.
//!
//! Dispatch is the security boundary between the model and the
//! filesystem: the working root is always the one the registry is given,
//! root-like arguments from the model are discarded, and nothing the model
//! sends (unknown name, bad arguments) can make dispatch fail.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::llm::{ToolCall, ToolDefinition};
use crate::sandbox::WorkingRoot;

use super::{Tool, ToolDescriptor, ToolError, ToolResult};

/// Argument names the model might use to pick its own root.
const ROOT_ARGUMENTS: &[&str] = &["working_directory"];

/// Object-safe view of a [`Tool`]: deserializes raw JSON into the tool's
/// typed arguments before running it.
#[async_trait]
trait ErasedTool: Send + Sync {
    async fn call(&self, root: &WorkingRoot, args: Value) -> Result<String, ToolError>;
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    async fn call(&self, root: &WorkingRoot, args: Value) -> Result<String, ToolError> {
        let args: T::Args =
            serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
                tool: self.descriptor().name.to_string(),
                reason: e.to_string(),
            })?;
        self.execute(root, args).await
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    executor: Box<dyn ErasedTool>,
}

/// Immutable once the agent starts; tools keep registration order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. A later registration with the same name replaces
    /// the earlier one.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let descriptor = tool.descriptor();
        let entry = RegisteredTool {
            descriptor,
            executor: Box::new(tool),
        };
        match self
            .tools
            .iter_mut()
            .find(|t| t.descriptor.name == entry.descriptor.name)
        {
            Some(existing) => {
                warn!("Tool {} registered twice, replacing", entry.descriptor.name);
                *existing = entry;
            }
            None => self.tools.push(entry),
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.descriptor.name).collect()
    }

    /// Tool definitions to publish to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| t.descriptor.to_definition())
            .collect()
    }

    fn find(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.descriptor.name == name)
    }

    /// Executes one tool call inside `root`. Always yields a result.
    pub async fn dispatch(&self, root: &WorkingRoot, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.find(&call.name) else {
            warn!("Model requested unknown tool: {}", call.name);
            return ToolResult::error(&ToolError::UnknownTool {
                name: call.name.clone(),
            });
        };

        let args = match prepare_arguments(&tool.descriptor, &call.input) {
            Ok(args) => args,
            Err(err) => {
                warn!("Rejected call to {}: {err}", call.name);
                return ToolResult::error(&err);
            }
        };

        let args = Value::Object(args);
        debug!("Dispatching {} with {}", call.name, args);

        match tool.executor.call(root, args).await {
            Ok(content) => ToolResult::success(content),
            Err(err) => {
                debug!("Tool {} failed: {err}", call.name);
                ToolResult::error(&err)
            }
        }
    }
}

/// Normalizes raw model arguments: null → `{}`, root-like keys removed,
/// then validated against the descriptor.
fn prepare_arguments(
    descriptor: &ToolDescriptor,
    input: &Value,
) -> Result<Map<String, Value>, ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments {
        tool: descriptor.name.to_string(),
        reason,
    };

    let mut args = match input {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        other => return Err(invalid(format!("expected an object, got {other}"))),
    };

    for key in ROOT_ARGUMENTS {
        if args.remove(*key).is_some() {
            warn!(
                "Ignoring model-supplied {key} for {}; using the configured root",
                descriptor.name
            );
        }
    }

    descriptor.validate(&args).map_err(invalid)?;
    Ok(args)
}
