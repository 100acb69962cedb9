//! # toolgraph-core
//!
//! Stateful tool-calling agent orchestration with per-user checkpoints.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ToolCallingGraph                          │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐   │
//! │  │ AGENT⇄TOOLS │  │    Tool     │  │     ChatModel       │   │
//! │  │   machine   │──│   Registry  │──│    (adapter)        │   │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘   │
//! │         │                                                    │
//! │  ┌──────┴──────┐                                             │
//! │  │ Checkpointer│──── DocumentStore (pluggable backend)       │
//! │  └─────────────┘                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A run loads the user's checkpoint, appends the new input, then alternates
//! between the model (AGENT) and tool dispatch (TOOLS) until the model
//! answers without tool calls. The final sequence is written back as the
//! user's new checkpoint. The `ChatModel` trait keeps the graph independent
//! of any particular provider.

pub mod checkpoint;
pub mod error;
pub mod graph;
pub mod message;
pub mod provider;
pub mod tool;

pub use checkpoint::{CheckpointDocument, Checkpointer, DocumentStore, MemoryStore, PersistedMessage};
pub use error::{AgentError, Result};
pub use graph::{AgentState, GraphConfig, GraphEvent, GraphNode, GraphStream, ToolCallingGraph};
pub use message::{Message, ToolCall};
pub use provider::{ChatModel, ScriptedModel};
pub use tool::{Tool, ToolRegistry, ToolResult, ToolSpec};
