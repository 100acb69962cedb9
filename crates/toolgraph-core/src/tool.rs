//! Tool System
//!
//! Tools are registered once at startup and dispatched by name from the
//! graph's TOOLS step. A tool never raises: I/O failures come back as
//! descriptive output text, so the loop sees a uniform result type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::ToolCall;

/// Result from dispatching a single tool call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Correlation id from the originating request
    pub id: String,

    /// Output text (success payload or error description)
    pub output: String,
}

/// Catalog entry handed to the model client for function calling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// JSON Schema for the argument payload
    pub parameters: serde_json::Value,
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool identifier
    fn name(&self) -> &str;

    /// Human-readable description (shown to the model)
    fn description(&self) -> &str;

    /// JSON Schema for the argument payload
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    /// Execute the tool. Failures are reported as output text, never raised.
    async fn invoke(&self, arguments: &serde_json::Value) -> String;
}

/// Registry for available tools.
///
/// Registration order is preserved, so the catalog sent to the model is
/// deterministic. Names must be unique; a duplicate is a configuration
/// error at startup, not at call time.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::Config(format!(
                "duplicate tool name: {name}"
            )));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    /// Dispatch a single tool call.
    ///
    /// An unknown tool name yields an error-text result rather than a
    /// failure, so one bad call cannot halt a run.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        match self.get(&call.name) {
            Some(tool) => {
                tracing::debug!(tool = %call.name, id = %call.id, "dispatching tool call");
                let output = tool.invoke(&call.arguments).await;
                ToolResult {
                    name: call.name.clone(),
                    id: call.id.clone(),
                    output,
                }
            }
            None => ToolResult {
                name: call.name.clone(),
                id: call.id.clone(),
                output: format!("Error: tool '{}' is not registered", call.name),
            },
        }
    }

    /// Catalog specs in registration order (for the model client)
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Comma-joined tool names (for prompt construction)
    pub fn names_joined(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// Built-in Tools
// ============================================================================

/// DateTime tool - returns current time
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "Output format",
                    "enum": ["iso", "human", "unix"]
                }
            }
        })
    }

    async fn invoke(&self, arguments: &serde_json::Value) -> String {
        let format = arguments
            .get("format")
            .and_then(|v| v.as_str())
            .unwrap_or("human");

        let now = chrono::Utc::now();

        match format {
            "iso" => now.to_rfc3339(),
            "unix" => now.timestamp().to_string(),
            _ => now.format("%A, %B %d, %Y at %H:%M:%S UTC").to_string(),
        }
    }
}

/// Application data tool - returns the contents of the data file named by
/// the `APP_DATA_FILE` environment variable
pub struct AppDataTool;

#[async_trait]
impl Tool for AppDataTool {
    fn name(&self) -> &str {
        "app_data"
    }

    fn description(&self) -> &str {
        "Fetch the application data from the configured data file"
    }

    async fn invoke(&self, _arguments: &serde_json::Value) -> String {
        let path = std::path::PathBuf::from(
            std::env::var("APP_DATA_FILE").unwrap_or_else(|_| "tool.txt".into()),
        );

        if !path.exists() {
            return format!(
                "Error: application data file not found at {}",
                path.display()
            );
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let content = content.trim();
                if content.is_empty() {
                    "Error: application data file is empty.".into()
                } else {
                    format!("Application Data:\n{content}")
                }
            }
            Err(e) => format!("Error reading application data: {e}"),
        }
    }
}
