//! Model Client Abstraction
//!
//! Defines the single capability boundary to the language model. The graph
//! works exclusively through this interface, so providers can be swapped
//! without touching agent logic.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::tool::ToolSpec;

/// Strategy trait for chat model providers.
///
/// One call produces exactly one AI message: either a terminal text answer
/// or a batch of tool-call requests. No branching and no retries happen at
/// this layer; provider failures surface as [`AgentError::Model`].
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate the next AI message for the given conversation
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message>;
}

/// Scripted model (for development/testing).
///
/// Returns queued responses in order and fails once the script is
/// exhausted, which also makes runaway loops visible in tests.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<Message>>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<Message>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
        }
    }

    /// Script of plain AI answers
    pub fn answers<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            contents
                .into_iter()
                .map(|c| Ok(Message::ai(c)))
                .collect(),
        )
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(
        &self,
        _system_prompt: &str,
        _messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<Message> {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::Model("scripted model exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_plays_in_order() {
        let model = ScriptedModel::answers(["first", "second"]);

        let one = model.complete("", &[], &[]).await.unwrap();
        let two = model.complete("", &[], &[]).await.unwrap();
        assert_eq!(one.content(), "first");
        assert_eq!(two.content(), "second");

        let err = model.complete("", &[], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Model(_)));
    }
}
