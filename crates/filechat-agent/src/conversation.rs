//! Conversation management for the AI agent
//!
//! A [`Conversation`] is an append-only list of [`Turn`]s. The only way to add a
//! tool-result turn is [`Conversation::push_tool_results`], which checks that
//! the results answer the invocations of the assistant turn right before it.

use crate::tools::{ToolInvocation, ToolResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a message sender on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message (also carries tool results)
    User,
    /// Assistant (AI) message
    Assistant,
}

/// One unit of content within an assistant turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text shown to the user
    Text { text: String },
    /// A request to run a tool
    ToolInvocation(ToolInvocation),
}

impl Segment {
    /// Create a text segment
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text { text: text.into() }
    }

    /// Create a tool invocation segment
    pub fn invocation(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Segment::ToolInvocation(ToolInvocation::new(id, tool_name, arguments))
    }

    /// Get the invocation if this is a tool invocation segment
    pub fn as_invocation(&self) -> Option<&ToolInvocation> {
        match self {
            Segment::Text { .. } => None,
            Segment::ToolInvocation(invocation) => Some(invocation),
        }
    }
}

/// One party's contribution to the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    /// Text typed by the human
    User { text: String },
    /// A model response, possibly empty
    Assistant { segments: Vec<Segment> },
    /// Results answering the previous assistant turn's invocations
    ToolResults { results: Vec<ToolResult> },
}

impl Turn {
    /// Wire role of this turn. Tool results travel as user messages.
    pub fn role(&self) -> Role {
        match self {
            Turn::Assistant { .. } => Role::Assistant,
            Turn::User { .. } | Turn::ToolResults { .. } => Role::User,
        }
    }

    /// Tool invocations in this turn, in order. Empty for non-assistant turns.
    pub fn invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        let segments: &[Segment] = match self {
            Turn::Assistant { segments } => segments.as_slice(),
            _ => &[],
        };
        segments.iter().filter_map(Segment::as_invocation)
    }
}

/// Errors raised when an append would break tool-result correlation
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConversationError {
    /// Tool results appended without an assistant turn right before them
    #[error("Tool results must directly follow an assistant turn")]
    NoPrecedingAssistant,

    /// Result ids do not match the invocation ids one-to-one and in order
    #[error("Tool results {actual:?} do not answer invocations {expected:?}")]
    ResultMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// A conversation with the AI agent
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// System prompt
    pub system_prompt: Option<String>,
    /// Turns in order; only ever appended to
    turns: Vec<Turn>,
}

impl Conversation {
    /// Create a new empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation with a system prompt
    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            turns: Vec::new(),
        }
    }

    /// Append a user turn
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn::User { text: text.into() });
    }

    /// Append an assistant turn. An empty segment list is recorded as-is.
    pub fn push_assistant(&mut self, segments: Vec<Segment>) {
        self.turns.push(Turn::Assistant { segments });
    }

    /// Append the results answering the last assistant turn.
    ///
    /// There must be exactly one result per invocation, in invocation order.
    pub fn push_tool_results(&mut self, results: Vec<ToolResult>) -> Result<(), ConversationError> {
        let last = self
            .turns
            .last()
            .filter(|turn| matches!(turn, Turn::Assistant { .. }))
            .ok_or(ConversationError::NoPrecedingAssistant)?;

        let expected: Vec<String> = last.invocations().map(|inv| inv.id.clone()).collect();
        let actual: Vec<String> = results.iter().map(|r| r.invocation_id.clone()).collect();
        if expected.is_empty() || expected != actual {
            return Err(ConversationError::ResultMismatch { expected, actual });
        }

        self.turns.push(Turn::ToolResults { results });
        Ok(())
    }

    /// Get all turns
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Get the most recent turn
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Get the number of turns in the conversation
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assistant_with_two_calls() -> Vec<Segment> {
        vec![
            Segment::text("Let me look."),
            Segment::invocation("toolu_1", "read_file", json!({"path": "a.txt"})),
            Segment::invocation("toolu_2", "list_files", json!({})),
        ]
    }

    #[test]
    fn test_conversation_basics() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());

        conv.push_user("Hello");
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.turns()[0].role(), Role::User);

        conv.push_assistant(vec![Segment::text("Hi!")]);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.turns()[1].role(), Role::Assistant);
    }

    #[test]
    fn test_conversation_with_system_prompt() {
        let conv = Conversation::with_system_prompt("You are helpful");
        assert_eq!(conv.system_prompt, Some("You are helpful".to_string()));
        assert!(conv.is_empty());
    }

    #[test]
    fn test_empty_assistant_turn_is_recorded() {
        let mut conv = Conversation::new();
        conv.push_user("Hello");
        conv.push_assistant(Vec::new());

        assert_eq!(conv.len(), 2);
        assert_eq!(conv.last(), Some(&Turn::Assistant { segments: Vec::new() }));
    }

    #[test]
    fn test_tool_results_in_order_are_accepted() {
        let mut conv = Conversation::new();
        conv.push_user("Look around");
        conv.push_assistant(assistant_with_two_calls());

        conv.push_tool_results(vec![
            ToolResult::success("toolu_1", "contents"),
            ToolResult::success("toolu_2", "[]"),
        ])
        .unwrap();

        assert_eq!(conv.len(), 3);
        assert_eq!(conv.last().unwrap().role(), Role::User);
    }

    #[test]
    fn test_tool_results_out_of_order_are_rejected() {
        let mut conv = Conversation::new();
        conv.push_user("Look around");
        conv.push_assistant(assistant_with_two_calls());

        let err = conv
            .push_tool_results(vec![
                ToolResult::success("toolu_2", "[]"),
                ToolResult::success("toolu_1", "contents"),
            ])
            .unwrap_err();

        assert!(matches!(err, ConversationError::ResultMismatch { .. }));
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn test_tool_results_with_omission_are_rejected() {
        let mut conv = Conversation::new();
        conv.push_user("Look around");
        conv.push_assistant(assistant_with_two_calls());

        let result = conv.push_tool_results(vec![ToolResult::success("toolu_1", "contents")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_tool_results_need_preceding_assistant() {
        let mut conv = Conversation::new();
        conv.push_user("Hello");

        let result = conv.push_tool_results(vec![ToolResult::success("toolu_1", "x")]);
        assert_eq!(result, Err(ConversationError::NoPrecedingAssistant));
    }

    #[test]
    fn test_tool_results_for_text_only_turn_are_rejected() {
        let mut conv = Conversation::new();
        conv.push_user("Hello");
        conv.push_assistant(vec![Segment::text("Hi")]);

        let result = conv.push_tool_results(Vec::new());
        assert!(matches!(result, Err(ConversationError::ResultMismatch { .. })));
    }

    #[test]
    fn test_turn_invocations() {
        let turn = Turn::Assistant {
            segments: assistant_with_two_calls(),
        };
        let names: Vec<&str> = turn.invocations().map(|i| i.tool_name.as_str()).collect();
        assert_eq!(names, vec!["read_file", "list_files"]);

        let user = Turn::User { text: "hi".to_string() };
        assert_eq!(user.invocations().count(), 0);
    }

    #[test]
    fn test_segment_serialization() {
        let segment = Segment::invocation("toolu_9", "new_file", json!({"path": "x"}));
        let value = serde_json::to_value(&segment).unwrap();
        assert_eq!(value["type"], "tool_invocation");
        assert_eq!(value["id"], "toolu_9");
        assert_eq!(value["tool_name"], "new_file");

        let back: Segment = serde_json::from_value(value).unwrap();
        assert_eq!(back, segment);
    }
}
