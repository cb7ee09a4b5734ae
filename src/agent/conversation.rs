//! Append-only conversation log for one agent run.
//!
//! Turns are never edited or removed. [`Conversation::to_messages`]
//! renders them into the shared LLM message shape: consecutive tool
//! results are folded into a single `user` message of `tool_result`
//! blocks, as the Messages API expects.

use crate::llm::{InputContentBlock, Message, MessageContent, ToolCall};
use crate::tools::ToolResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnContent {
    Text(String),
    /// Assistant reply that requested tools, with any accompanying text
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolCall>,
    },
    ToolResult {
        call_id: String,
        name: String,
        result: ToolResult,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            content: TurnContent::Text(text.into()),
        });
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: TurnContent::Text(text.into()),
        });
    }

    pub fn push_tool_calls(&mut self, text: Option<String>, calls: Vec<ToolCall>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: TurnContent::ToolCalls { text, calls },
        });
    }

    pub fn push_tool_result(&mut self, call: &ToolCall, result: ToolResult) {
        self.turns.push(Turn {
            role: Role::Tool,
            content: TurnContent::ToolResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                result,
            },
        });
    }

    /// Renders the log as backend messages.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages: Vec<Message> = Vec::with_capacity(self.turns.len());
        let mut pending_results: Vec<InputContentBlock> = Vec::new();

        for turn in &self.turns {
            let content = match &turn.content {
                TurnContent::ToolResult {
                    call_id, result, ..
                } => {
                    pending_results.push(InputContentBlock::ToolResult {
                        tool_use_id: call_id.clone(),
                        content: result.content.clone(),
                        is_error: result.is_error,
                    });
                    continue;
                }
                TurnContent::Text(text) => MessageContent::Text(text.clone()),
                TurnContent::ToolCalls { text, calls } => {
                    let mut blocks = Vec::with_capacity(calls.len() + 1);
                    if let Some(text) = text {
                        blocks.push(InputContentBlock::Text { text: text.clone() });
                    }
                    blocks.extend(calls.iter().map(|call| InputContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input: call.input.clone(),
                    }));
                    MessageContent::Blocks(blocks)
                }
            };

            flush_results(&mut pending_results, &mut messages);

            let role = match turn.role {
                Role::Assistant => "assistant",
                Role::User | Role::Tool => "user",
            };
            messages.push(Message {
                role: role.to_string(),
                content,
            });
        }

        flush_results(&mut pending_results, &mut messages);
        messages
    }
}

fn flush_results(pending: &mut Vec<InputContentBlock>, messages: &mut Vec<Message>) {
    if pending.is_empty() {
        return;
    }
    messages.push(Message {
        role: "user".to_string(),
        content: MessageContent::Blocks(std::mem::take(pending)),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            input: json!({}),
        }
    }

    #[test]
    fn test_append_only_order() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());
        conv.push_user("fix the bug");
        conv.push_tool_calls(None, vec![call("t1", "get_files_info")]);
        conv.push_tool_result(&call("t1", "get_files_info"), ToolResult::success("- a.py"));
        conv.push_assistant_text("done");

        assert_eq!(conv.len(), 4);
        let roles: Vec<Role> = conv.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
    }

    #[test]
    fn test_to_messages_groups_consecutive_results() {
        let mut conv = Conversation::new();
        conv.push_user("hi");
        conv.push_tool_calls(
            Some("Checking.".to_string()),
            vec![call("t1", "get_files_info"), call("t2", "get_file_content")],
        );
        conv.push_tool_result(&call("t1", "get_files_info"), ToolResult::success("a"));
        conv.push_tool_result(
            &call("t2", "get_file_content"),
            ToolResult {
                content: "Error: nope".to_string(),
                is_error: true,
            },
        );

        let messages = conv.to_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, MessageContent::Text("hi".to_string()));

        assert_eq!(messages[1].role, "assistant");
        let MessageContent::Blocks(blocks) = &messages[1].content else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], InputContentBlock::Text { text } if text == "Checking."));
        assert!(matches!(&blocks[2], InputContentBlock::ToolUse { id, .. } if id == "t2"));

        assert_eq!(messages[2].role, "user");
        let MessageContent::Blocks(results) = &messages[2].content else {
            panic!("expected blocks");
        };
        assert_eq!(results.len(), 2);
        assert!(matches!(
            &results[1],
            InputContentBlock::ToolResult { tool_use_id, is_error: true, .. } if tool_use_id == "t2"
        ));
    }

    #[test]
    fn test_results_flushed_before_next_assistant_turn() {
        let mut conv = Conversation::new();
        conv.push_user("go");
        conv.push_tool_calls(None, vec![call("t1", "write_file")]);
        conv.push_tool_result(&call("t1", "write_file"), ToolResult::success("ok"));
        conv.push_tool_calls(None, vec![call("t2", "run_script")]);
        conv.push_tool_result(&call("t2", "run_script"), ToolResult::success("ok"));

        let roles: Vec<String> = conv.to_messages().into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant", "user"]);
    }

    #[test]
    fn test_tool_calls_without_text_have_no_text_block() {
        let mut conv = Conversation::new();
        conv.push_tool_calls(None, vec![call("t1", "get_files_info")]);
        let messages = conv.to_messages();
        let MessageContent::Blocks(blocks) = &messages[0].content else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], InputContentBlock::ToolUse { .. }));
    }
}
