use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::llm::{LlmClient, ToolCall};
use crate::sandbox::WorkingRoot;
use crate::tools::{ToolRegistry, ToolResult};

use super::conversation::Conversation;
use super::state::{LoopState, RunStatus};

/// Default ceiling on backend round-trips per run
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful AI coding agent.

When a user asks a question or makes a request, make a function call plan. \
You can perform the following operations:

- List files and directories (get_files_info)
- Read file contents (get_file_content)
- Execute scripts with optional arguments (run_script)
- Write or overwrite files (write_file)

All paths you provide should be relative to the working directory. You do not \
need to specify the working directory in your function calls as it is \
automatically injected for security reasons.

When you are done, answer with a short summary of what you found or changed.";

/// Everything a run needs, built once at startup.
pub struct RunContext {
    pub root: WorkingRoot,
    pub registry: ToolRegistry,
    pub llm: Box<dyn LlmClient>,
}

/// Tokens reported by the backend, summed over all iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Final result of [`AgentRuntime::run`].
#[derive(Debug)]
pub struct RunOutcome {
    pub state: LoopState,
    /// Final answer, set when `Succeeded`
    pub output: Option<String>,
    /// Reason, set when `Failed` or `Exhausted`
    pub error: Option<String>,
    pub usage: TokenUsage,
    pub conversation: Conversation,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.state.status == RunStatus::Succeeded
    }
}

/// The agentic loop: model → tool calls → results → model, until a final
/// answer, a failure, or the iteration ceiling.
///
/// Strictly sequential: one backend call at a time, and tool calls run one
/// after another in the order the model listed them.
pub struct AgentRuntime {
    ctx: RunContext,
    system_prompt: String,
    max_iterations: u32,
    verbose: bool,
}

impl AgentRuntime {
    pub fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            verbose: false,
        }
    }

    /// Sets the iteration ceiling. Values below 1 are raised to 1.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Echo every tool call and its result to stdout.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub fn root(&self) -> &WorkingRoot {
        &self.ctx.root
    }

    /// Runs one request to completion. Never returns an error: backend and
    /// orchestration failures end the run in `Failed`.
    pub async fn run(&self, prompt: &str) -> RunOutcome {
        let definitions = self.ctx.registry.definitions();
        if self.ctx.registry.is_empty() {
            warn!("No tools registered; the model can only answer in text");
        }
        let mut conversation = Conversation::new();
        conversation.push_user(prompt);

        let mut state = LoopState::new();
        let mut usage = TokenUsage::default();
        let mut output = None;
        let mut failure = None;

        debug!(
            "Agent run started with {} ({} tools, max {} iterations)",
            self.ctx.llm.description(),
            definitions.len(),
            self.max_iterations
        );

        while state.is_running() {
            state.begin();
            debug!("Iteration {}", state.iteration);

            let response = match self
                .ctx
                .llm
                .complete(
                    &self.system_prompt,
                    &conversation.to_messages(),
                    Some(definitions.as_slice()),
                )
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    error!("Reasoning backend error: {e:#}");
                    failure = Some(format!("Reasoning backend error: {e:#}"));
                    state.finish(RunStatus::Failed);
                    break;
                }
            };

            usage.input_tokens += u64::from(response.input_tokens);
            usage.output_tokens += u64::from(response.output_tokens);

            let text = response.text.trim();

            if !response.tool_calls.is_empty() {
                let calls = response.tool_calls;
                let preamble = (!text.is_empty()).then(|| text.to_string());
                conversation.push_tool_calls(preamble, calls.clone());

                for call in &calls {
                    match self.execute_call(call).await {
                        Ok(result) => conversation.push_tool_result(call, result),
                        Err(panic_msg) => {
                            error!("Tool {} produced no result: {panic_msg}", call.name);
                            failure = Some(format!(
                                "Tool {} did not produce a result: {panic_msg}",
                                call.name
                            ));
                            state.finish(RunStatus::Failed);
                            break;
                        }
                    }
                }
            } else if !text.is_empty() {
                conversation.push_assistant_text(text);
                output = Some(text.to_string());
                state.finish(RunStatus::Succeeded);
            } else {
                warn!(
                    "Backend returned neither text nor tool calls (stop reason: {:?})",
                    response.stop_reason
                );
                failure = Some(
                    "Reasoning backend returned neither text nor tool calls".to_string(),
                );
                state.finish(RunStatus::Failed);
            }

            state.advance(self.max_iterations);
        }

        if state.status == RunStatus::Exhausted {
            warn!("Maximum iterations ({}) reached", self.max_iterations);
            failure = Some(format!(
                "Maximum iterations ({}) reached without a final answer",
                self.max_iterations
            ));
        }

        info!(
            "Agent run ended: {:?} after {} iteration(s), {} turns, {} in / {} out tokens",
            state.status,
            state.iteration,
            conversation.len(),
            usage.input_tokens,
            usage.output_tokens
        );

        RunOutcome {
            state,
            output,
            error: failure,
            usage,
            conversation,
        }
    }

    /// Dispatches one call. `Err` carries the panic message when no result
    /// could be produced at all; ordinary tool failures are `Ok` error text.
    async fn execute_call(&self, call: &ToolCall) -> Result<ToolResult, String> {
        info!("Calling function: {}({})", call.name, call.input);
        if self.verbose {
            println!(" - Calling function: {}({})", call.name, call.input);
        }

        let result = AssertUnwindSafe(self.ctx.registry.dispatch(&self.ctx.root, call))
            .catch_unwind()
            .await
            .map_err(|payload| {
                payload
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| payload.downcast_ref::<&str>().copied())
                    .unwrap_or("unknown panic")
                    .to_string()
            })?;

        if result.is_error {
            warn!("{} → {}", call.name, result.content);
        } else {
            debug!("{} → {} chars", call.name, result.content.len());
        }
        if self.verbose {
            println!("-> {}", result.content);
        }
        Ok(result)
    }
}
