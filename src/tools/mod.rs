//! Tools module - business capabilities the model can call
//!
//! Every tool declares its arguments as [`ArgSpec`]s; the registry
//! normalizes raw model arguments against them before a tool runs, so tool
//! bodies only ever see validated [`ToolArgs`].

pub mod args;
mod catalog;
mod lodging;
mod meeting;
mod quote;
mod registry;

pub use args::{ArgError, ArgKind, ArgSpec, ToolArgs};
pub use catalog::{GetItemDetailsTool, SearchCatalogTool};
pub use lodging::{CheckAvailabilityTool, CreateReservationTool, GetCabinInfoTool, GetCabinServicesTool};
pub use meeting::ScheduleMeetingTool;
pub use quote::{CreateQuoteTool, NegotiationState, UpdateNegotiationStatusTool};
pub use registry::{ToolDefinition, ToolRegistry};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::agent::{Document, ToolCallRequest};
use crate::Result;

/// Per-request context handed to every tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Stable client handle (phone number)
    pub session_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// What a successful tool run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Structured data returned to the model
    pub payload: Value,
    /// Image URLs to deliver alongside the reply
    pub images: Vec<String>,
    pub documents: Vec<Document>,
}

impl ToolOutput {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }
}

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// Declared arguments
    fn args(&self) -> &[ArgSpec];

    /// Run with normalized arguments.
    ///
    /// `Error::Tool` is a conversational failure the model should react to;
    /// any other error is a collaborator fault.
    async fn execute(&self, args: ToolArgs, session: &SessionContext) -> Result<ToolOutput>;

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: args::schema(self.args()),
        }
    }
}

/// Outcome of one tool call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(Value),
    Failure(String),
}

/// The result of executing exactly one [`ToolCallRequest`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub call_id: String,
    pub call_name: String,
    pub outcome: ToolOutcome,

    /// Artifacts travel to the envelope, not back to the model
    #[serde(skip)]
    pub images: Vec<String>,
    #[serde(skip)]
    pub documents: Vec<Document>,
}

impl ToolResult {
    pub fn success(call: &ToolCallRequest, output: ToolOutput) -> Self {
        Self {
            call_id: call.id.clone(),
            call_name: call.name.clone(),
            outcome: ToolOutcome::Success(output.payload),
            images: output.images,
            documents: output.documents,
        }
    }

    pub fn failure(call: &ToolCallRequest, message: impl Into<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            call_name: call.name.clone(),
            outcome: ToolOutcome::Failure(message.into()),
            images: vec![],
            documents: vec![],
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Failure(msg) => Some(msg),
            ToolOutcome::Success(_) => None,
        }
    }

    /// The `functionResponse.response` body sent back to the model.
    pub fn response_value(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success(Value::Object(map)) => {
                let mut body = map.clone();
                body.insert("success".to_string(), Value::Bool(true));
                Value::Object(body)
            }
            ToolOutcome::Success(other) => json!({"success": true, "result": other}),
            ToolOutcome::Failure(msg) => json!({"success": false, "error": msg}),
        }
    }
}

/// Dummy tool for testing
#[cfg(test)]
pub struct DummyTool {
    pub name: String,
    pub result: Value,
}

#[cfg(test)]
#[async_trait]
impl Tool for DummyTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { "Dummy tool for testing" }
    fn args(&self) -> &[ArgSpec] { &[] }

    async fn execute(&self, _args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
        Ok(ToolOutput::new(self.result.clone()))
    }
}
