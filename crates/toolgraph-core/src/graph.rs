//! Agent Orchestration Graph
//!
//! Drives the AGENT ⇄ TOOLS state machine: invoke the model, dispatch any
//! tool calls it requested, feed the results back, repeat until the model
//! answers without tool calls. Wraps the cycle with the checkpoint
//! load/save lifecycle when a checkpointer and user id are supplied.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::checkpoint::Checkpointer;
use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::ChatModel;
use crate::tool::{ToolRegistry, ToolSpec};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Respond to the user's request. \
     You have access to the following tools: {tool_names}. \
     Only use the tools if necessary. If the question can be answered \
     without tools, do so. If the user asks a greeting, just greet back.";

/// Orchestrator configuration
#[derive(Clone, Debug)]
pub struct GraphConfig {
    /// System prompt template; `{tool_names}` expands to the catalog names
    pub system_prompt: String,

    /// Maximum AGENT steps before a run is aborted
    pub max_iterations: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
        }
    }
}

impl GraphConfig {
    /// Override the default system prompt template
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }
}

/// Transient per-run state: the growing message sequence
#[derive(Clone, Debug, Default)]
pub struct AgentState {
    pub messages: Vec<Message>,
}

/// Node that just executed, for stream consumers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphNode {
    Agent,
    Tools,
}

/// Snapshot emitted after each state transition
#[derive(Clone, Debug)]
pub struct GraphEvent {
    pub node: GraphNode,
    pub messages: Vec<Message>,
}

/// Finite, single-pass stream of transition events
pub type GraphStream = Pin<Box<dyn Stream<Item = Result<GraphEvent>> + Send>>;

/// The tool-calling agent orchestrator.
///
/// Construction wires in every collaborator explicitly: the model client,
/// the tool registry and (optionally) the checkpointer. The tool catalog
/// and rendered system prompt are fixed at construction time.
#[derive(Clone)]
pub struct ToolCallingGraph {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    checkpointer: Option<Checkpointer>,
    config: GraphConfig,
    system_prompt: String,
    tool_specs: Vec<ToolSpec>,
}

impl ToolCallingGraph {
    /// Create a new graph
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        checkpointer: Option<Checkpointer>,
        config: GraphConfig,
    ) -> Self {
        let system_prompt = config
            .system_prompt
            .replace("{tool_names}", &tools.names_joined());
        let tool_specs = tools.specs();

        Self {
            model,
            tools,
            checkpointer,
            config,
            system_prompt,
            tool_specs,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(model: Arc<dyn ChatModel>, tools: Arc<ToolRegistry>) -> Self {
        Self::new(model, tools, None, GraphConfig::default())
    }

    /// Run the graph to completion and return the final message sequence.
    ///
    /// With a checkpointer and user id, prior history is loaded first and
    /// the final sequence is persisted after END; otherwise the run is
    /// stateless. An aborted run (model failure, iteration limit) persists
    /// nothing.
    pub async fn run(&self, user_input: &str, user_id: Option<&str>) -> Result<Vec<Message>> {
        let mut state = self.initial_state(user_input, user_id).await;

        let mut iterations = 0;
        loop {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(AgentError::IterationLimit(self.config.max_iterations));
            }

            let pending = self.agent_step(&mut state).await?;
            if !pending {
                break;
            }
            self.tools_step(&mut state).await;
        }

        self.persist(user_id, &state.messages).await;
        Ok(state.messages)
    }

    /// Run the graph as a lazy stream of transition events.
    ///
    /// Nothing executes until the stream is polled. One event is emitted
    /// after every AGENT and TOOLS transition; the final sequence is the
    /// payload of the last event, and persistence happens while the
    /// stream drains, before it yields `None`. The stream is finite and
    /// single-pass; dropping it cancels the run without saving.
    pub fn stream(&self, user_input: &str, user_id: Option<&str>) -> GraphStream {
        #[derive(Clone, Copy)]
        enum Step {
            Agent,
            Tools,
            Save,
            Done,
        }

        struct Drive {
            graph: ToolCallingGraph,
            input: String,
            user: Option<String>,
            state: AgentState,
            started: bool,
            iterations: usize,
            step: Step,
        }

        let drive = Drive {
            graph: self.clone(),
            input: user_input.to_string(),
            user: user_id.map(str::to_string),
            state: AgentState::default(),
            started: false,
            iterations: 0,
            step: Step::Agent,
        };

        Box::pin(futures::stream::unfold(drive, |mut drive| async move {
            loop {
                match drive.step {
                    Step::Agent => {
                        // History is loaded on the first poll, not at
                        // construction time
                        if !drive.started {
                            drive.state = drive
                                .graph
                                .initial_state(&drive.input, drive.user.as_deref())
                                .await;
                            drive.started = true;
                        }

                        drive.iterations += 1;
                        if drive.iterations > drive.graph.config.max_iterations {
                            drive.step = Step::Done;
                            let err =
                                AgentError::IterationLimit(drive.graph.config.max_iterations);
                            return Some((Err(err), drive));
                        }

                        match drive.graph.agent_step(&mut drive.state).await {
                            Ok(pending) => {
                                drive.step = if pending { Step::Tools } else { Step::Save };
                                let event = GraphEvent {
                                    node: GraphNode::Agent,
                                    messages: drive.state.messages.clone(),
                                };
                                return Some((Ok(event), drive));
                            }
                            Err(e) => {
                                drive.step = Step::Done;
                                return Some((Err(e), drive));
                            }
                        }
                    }
                    Step::Tools => {
                        drive.graph.tools_step(&mut drive.state).await;
                        drive.step = Step::Agent;
                        let event = GraphEvent {
                            node: GraphNode::Tools,
                            messages: drive.state.messages.clone(),
                        };
                        return Some((Ok(event), drive));
                    }
                    Step::Save => {
                        drive
                            .graph
                            .persist(drive.user.as_deref(), &drive.state.messages)
                            .await;
                        drive.step = Step::Done;
                    }
                    Step::Done => return None,
                }
            }
        }))
    }

    /// Delete the stored history for a user.
    ///
    /// Returns `false` when no checkpointer is configured or no checkpoint
    /// existed.
    pub async fn clear_history(&self, user_id: &str) -> bool {
        match &self.checkpointer {
            Some(checkpointer) => checkpointer.clear(user_id).await,
            None => false,
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the rendered system prompt
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    async fn initial_state(&self, user_input: &str, user_id: Option<&str>) -> AgentState {
        let mut messages = match (&self.checkpointer, user_id) {
            (Some(checkpointer), Some(user_id)) => checkpointer.load(user_id).await,
            _ => Vec::new(),
        };
        messages.push(Message::human(user_input));
        AgentState { messages }
    }

    /// AGENT step: one model invocation. Returns whether tool calls are
    /// pending.
    async fn agent_step(&self, state: &mut AgentState) -> Result<bool> {
        let response = self
            .model
            .complete(&self.system_prompt, &state.messages, &self.tool_specs)
            .await?;

        let pending = !response.tool_calls().is_empty();
        if pending {
            tracing::debug!(
                count = response.tool_calls().len(),
                "tool calls detected, continuing to tools"
            );
        }

        state.messages.push(response);
        Ok(pending)
    }

    /// TOOLS step: dispatch every call from the last AI message.
    ///
    /// Calls share no state, so they run concurrently; results are
    /// appended in request order regardless of completion order.
    async fn tools_step(&self, state: &mut AgentState) {
        let calls = state
            .messages
            .last()
            .map(|m| m.tool_calls().to_vec())
            .unwrap_or_default();

        let results =
            futures::future::join_all(calls.iter().map(|call| self.tools.dispatch(call))).await;

        for result in results {
            state
                .messages
                .push(Message::tool(result.output, result.id, result.name));
        }
    }

    async fn persist(&self, user_id: Option<&str>, messages: &[Message]) {
        if let (Some(checkpointer), Some(user_id)) = (&self.checkpointer, user_id) {
            checkpointer.save(user_id, messages).await;
        }
    }
}
