//! Conversation Messages
//!
//! The message sequence is append-only within a run and every message is
//! immutable once created. Roles are a closed set, so dispatch on them is
//! exhaustive.

use serde::{Deserialize, Serialize};

/// A model-issued request to invoke a tool with an argument payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id, echoed back in the matching tool result
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Argument payload as free-form JSON
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a call with a generated correlation id
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    /// Replace the generated id with a provider-supplied one
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// A single message in a conversation.
///
/// Internally tagged so the serialized form carries an explicit role tag
/// (`human` / `ai` / `tool`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    /// User input
    Human { content: String },

    /// Model response: terminal text, or one or more tool-call requests
    /// (content may be empty in that case)
    Ai {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },

    /// Tool output, correlated to the request that produced it
    Tool {
        content: String,
        tool_call_id: String,
        name: String,
    },
}

impl Message {
    /// Create a human message
    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    /// Create a terminal AI message (no tool calls)
    pub fn ai(content: impl Into<String>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an AI message carrying tool-call requests
    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Ai {
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool result message
    pub fn tool(
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
            name: name.into(),
        }
    }

    /// Role tag, as used in the persisted form
    pub fn role(&self) -> &'static str {
        match self {
            Message::Human { .. } => "human",
            Message::Ai { .. } => "ai",
            Message::Tool { .. } => "tool",
        }
    }

    /// Text content of the message
    pub fn content(&self) -> &str {
        match self {
            Message::Human { content }
            | Message::Ai { content, .. }
            | Message::Tool { content, .. } => content,
        }
    }

    /// Tool calls carried by an AI message; empty for every other role
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Ai { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.role(), self.content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::human("Hello");
        assert_eq!(msg.role(), "human");
        assert_eq!(msg.content(), "Hello");
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn test_ai_message_with_tool_calls() {
        let call = ToolCall::new("datetime", serde_json::json!({"format": "iso"}));
        let msg = Message::ai_with_tool_calls("", vec![call.clone()]);
        assert_eq!(msg.role(), "ai");
        assert_eq!(msg.tool_calls(), &[call]);
    }

    #[test]
    fn test_serialized_form_is_role_tagged() {
        let value = serde_json::to_value(Message::human("hi")).unwrap();
        assert_eq!(value["type"], "human");
        assert_eq!(value["content"], "hi");

        let value = serde_json::to_value(Message::ai("hello")).unwrap();
        assert_eq!(value["type"], "ai");
        // A terminal answer serializes without a tool_calls field at all
        assert!(value.get("tool_calls").is_none());
    }

    #[test]
    fn test_tool_call_id_generated() {
        let a = ToolCall::new("echo", serde_json::Value::Null);
        let b = ToolCall::new("echo", serde_json::Value::Null);
        assert_ne!(a.id, b.id);
        assert_eq!(a.with_id("call_1").id, "call_1");
    }
}
