//! # toolgraph-runtime
//!
//! Runtime integrations for the toolgraph system.
//!
//! ## Contents
//!
//! - **OpenAI-compatible provider**: `ChatModel` over the chat-completions
//!   wire format with native function calling
//! - **JSON file store**: `DocumentStore` keeping one checkpoint document
//!   per user on disk
//! - **Prompt loading**: system prompt override from a text file
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use toolgraph_core::{Checkpointer, GraphConfig, ToolCallingGraph, ToolRegistry};
//! use toolgraph_runtime::{JsonFileStore, OpenAiChatModel};
//!
//! let model = Arc::new(OpenAiChatModel::from_env()?);
//! let store = Arc::new(JsonFileStore::new("./checkpoints")?);
//! let graph = ToolCallingGraph::new(
//!     model,
//!     Arc::new(ToolRegistry::new()),
//!     Some(Checkpointer::new(store)),
//!     GraphConfig::default(),
//! );
//! ```

pub mod openai;
pub mod prompt;
pub mod store;

pub use openai::{OpenAiChatModel, OpenAiConfig};
pub use prompt::load_system_prompt;
pub use store::JsonFileStore;

// Re-export core types for convenience
pub use toolgraph_core::{
    AgentError, ChatModel, Checkpointer, DocumentStore, GraphConfig, Message, Result, Tool,
    ToolCallingGraph, ToolRegistry,
};
