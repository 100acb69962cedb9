//! OpenAI-Compatible Chat Model
//!
//! Implementation of `ChatModel` over the chat-completions wire format.
//! Tool calls use native function calling; the adapter only maps between
//! the wire schema and the core `Message` type, no agent logic lives here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use toolgraph_core::{
    error::{AgentError, Result},
    message::{Message, ToolCall},
    provider::ChatModel,
    tool::ToolSpec,
};

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API key
    pub api_key: String,

    /// Model identifier (e.g. "gpt-4o")
    pub model: String,

    /// API base URL (any chat-completions-compatible endpoint)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature; 0.0 keeps tool selection deterministic
    pub temperature: f32,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 120,
            temperature: 0.0,
        }
    }

    /// Read configuration from `OPENAI_API_KEY`, `OPENAI_MODEL` and
    /// `OPENAI_BASE_URL`. A missing key is a startup failure.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY is not set".into()))?;
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());

        let mut config = Self::new(api_key, model);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

/// OpenAI-compatible chat model provider
pub struct OpenAiChatModel {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiChatModel {
    /// Create from configuration
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: to_wire(system_prompt, messages),
            temperature: self.config.temperature,
            tools: tools.iter().map(wire_tool).collect(),
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(model = %self.config.model, messages = messages.len(), "chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::Model(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Model(format!(
                "provider returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Model(format!("malformed response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Model("response contained no choices".into()))?;

        Ok(from_wire(choice.message))
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object, per the wire format
    arguments: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

fn wire_tool(spec: &ToolSpec) -> WireTool<'_> {
    WireTool {
        kind: "function",
        function: WireFunction {
            name: &spec.name,
            description: &spec.description,
            parameters: &spec.parameters,
        },
    }
}

/// Map the conversation to wire messages, system prompt first
fn to_wire(system_prompt: &str, messages: &[Message]) -> Vec<WireMessage> {
    let mut wire = Vec::with_capacity(messages.len() + 1);
    wire.push(WireMessage {
        role: "system".into(),
        content: Some(system_prompt.to_string()),
        tool_calls: None,
        tool_call_id: None,
        name: None,
    });

    for message in messages {
        wire.push(match message {
            Message::Human { content } => WireMessage {
                role: "user".into(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: None,
                name: None,
            },
            Message::Ai {
                content,
                tool_calls,
            } => WireMessage {
                role: "assistant".into(),
                content: Some(content.clone()),
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls.iter().map(wire_tool_call).collect())
                },
                tool_call_id: None,
                name: None,
            },
            Message::Tool {
                content,
                tool_call_id,
                name,
            } => WireMessage {
                role: "tool".into(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(tool_call_id.clone()),
                name: Some(name.clone()),
            },
        });
    }

    wire
}

fn wire_tool_call(call: &ToolCall) -> WireToolCall {
    WireToolCall {
        id: call.id.clone(),
        kind: "function".into(),
        function: WireFunctionCall {
            name: call.name.clone(),
            arguments: serde_json::to_string(&call.arguments)
                .unwrap_or_else(|_| "{}".into()),
        },
    }
}

/// Map a wire response message back to a core AI message
fn from_wire(message: WireMessage) -> Message {
    let content = message.content.unwrap_or_default();

    match message.tool_calls {
        Some(calls) if !calls.is_empty() => {
            let tool_calls = calls
                .into_iter()
                .map(|c| {
                    let arguments = serde_json::from_str(&c.function.arguments)
                        .unwrap_or(serde_json::Value::Null);
                    ToolCall::new(c.function.name, arguments).with_id(c.id)
                })
                .collect();
            Message::ai_with_tool_calls(content, tool_calls)
        }
        _ => Message::ai(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_wire_prepends_system_prompt() {
        let wire = to_wire("be helpful", &[Message::human("hi")]);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[0].content.as_deref(), Some("be helpful"));
        assert_eq!(wire[1].role, "user");
    }

    #[test]
    fn test_to_wire_maps_tool_messages() {
        let wire = to_wire("", &[Message::tool("12:00", "call_1", "datetime")]);
        let msg = &wire[1];
        assert_eq!(msg.role, "tool");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.name.as_deref(), Some("datetime"));
    }

    #[test]
    fn test_to_wire_encodes_tool_call_arguments_as_string() {
        let call = ToolCall::new("echo", serde_json::json!({"text": "hi"})).with_id("call_1");
        let wire = to_wire("", &[Message::ai_with_tool_calls("", vec![call])]);

        let calls = wire[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.arguments, r#"{"text":"hi"}"#);
    }

    #[test]
    fn test_from_wire_terminal_answer() {
        let msg = from_wire(WireMessage {
            role: "assistant".into(),
            content: Some("hi there".into()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        });
        assert_eq!(msg, Message::ai("hi there"));
    }

    #[test]
    fn test_from_wire_tool_calls() {
        let msg = from_wire(WireMessage {
            role: "assistant".into(),
            content: None,
            tool_calls: Some(vec![WireToolCall {
                id: "call_1".into(),
                kind: "function".into(),
                function: WireFunctionCall {
                    name: "datetime".into(),
                    arguments: r#"{"format":"iso"}"#.into(),
                },
            }]),
            tool_call_id: None,
            name: None,
        });

        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "datetime");
        assert_eq!(calls[0].arguments, serde_json::json!({"format": "iso"}));
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("sk-test", "gpt-4o");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.temperature, 0.0);
    }
}
