//! Message types for agent communication

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::tools::ToolResult;

/// Message role in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation sent to the provider
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    /// Tool calls made by assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,

    /// Every result of one tool turn, sent back as a single message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolResult>>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_results: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create an assistant message with tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Create the batched follow-up carrying all results of one turn
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            tool_results: Some(results),
            ..Self::plain(Role::Tool, String::new())
        }
    }
}

/// A tool call request from the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Role of a stored conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Model,
}

/// One prior turn as kept by the conversation store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: HistoryRole::User, content: content.into() }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self { role: HistoryRole::Model, content: content.into() }
    }

    pub fn to_message(&self) -> Message {
        match self.role {
            HistoryRole::User => Message::user(&self.content),
            HistoryRole::Model => Message::assistant(&self.content),
        }
    }
}

/// Inbound customer message for one orchestration run
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Stable client handle, e.g. a phone number
    pub session_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(session_id: &str, content: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// A generated document attached to a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub filename: String,
}

impl Document {
    /// Build from a URL, naming the file after its last path segment.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let filename = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("quote.pdf")
            .to_string();
        Self { url, filename }
    }
}

/// Everything handed back to the outbound messaging layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub text: String,
    pub images: Vec<String>,
    pub documents: Vec<Document>,
}

impl ResponseEnvelope {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.tool_calls.is_none());
    }

    #[test]
    fn test_history_entry_maps_roles() {
        assert_eq!(HistoryEntry::user("hi").to_message().role, Role::User);
        assert_eq!(HistoryEntry::model("hello").to_message().role, Role::Assistant);
    }

    #[test]
    fn test_document_filename_from_url() {
        let doc = Document::from_url("https://files.example.com/quotes/Q-20261018-ABC123.pdf");
        assert_eq!(doc.filename, "Q-20261018-ABC123.pdf");

        let doc = Document::from_url("https://files.example.com/quotes/");
        assert_eq!(doc.filename, "quote.pdf");
    }

    #[test]
    fn test_history_entry_json_shape() {
        let entry: HistoryEntry = serde_json::from_str(r#"{"role":"model","content":"ok"}"#).unwrap();
        assert_eq!(entry, HistoryEntry::model("ok"));
    }
}
