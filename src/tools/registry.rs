//! Tool registry - declares tools and dispatches model calls to them

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::ToolCallRequest;
use crate::error::Error;
use crate::services::Services;

use super::args::normalize;
use super::{
    CheckAvailabilityTool, CreateQuoteTool, CreateReservationTool, GetCabinInfoTool, GetCabinServicesTool,
    GetItemDetailsTool, ScheduleMeetingTool, SearchCatalogTool, SessionContext, Tool, ToolResult,
    UpdateNegotiationStatusTool,
};

/// Tool definition for LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Registry of callable tools, in declaration order
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// The dealer's sales tool set
    pub fn sales_tools(services: &Services) -> Self {
        let mut registry = Self::new();

        registry.register(SearchCatalogTool::new(services.catalog.clone()));
        registry.register(GetItemDetailsTool::new(services.catalog.clone()));
        registry.register(CreateQuoteTool::new(
            services.catalog.clone(),
            services.documents.clone(),
            services.quotes.clone(),
        ));
        registry.register(UpdateNegotiationStatusTool::new(services.quotes.clone()));
        registry.register(ScheduleMeetingTool::new(services.meetings.clone()));

        registry
    }

    /// The cabin reservation tool set
    pub fn reservation_tools(services: &Services) -> Self {
        let mut registry = Self::new();

        registry.register(CheckAvailabilityTool::new(services.lodging.clone()));
        registry.register(GetCabinInfoTool::new(services.lodging.clone()));
        registry.register(CreateReservationTool::new(
            services.lodging.clone(),
            services.reservations.clone(),
        ));
        registry.register(GetCabinServicesTool::new(services.lodging.clone()));

        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(Arc::new(tool));
    }

    /// Get tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Execute one call. Never fails: every problem becomes a failed result.
    pub async fn dispatch(&self, call: &ToolCallRequest, session: &SessionContext) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            warn!("Model called unknown tool '{}'", call.name);
            return ToolResult::failure(call, "unrecognized tool");
        };

        let args = match normalize(tool.args(), &call.arguments) {
            Ok(args) => args,
            Err(e) => {
                debug!("Rejected arguments for {}: {}", call.name, e);
                return ToolResult::failure(call, e.to_string());
            }
        };

        debug!("Executing tool: {} with args: {}", call.name, call.arguments);

        let run = AssertUnwindSafe(tool.execute(args, session)).catch_unwind().await;
        match run {
            Ok(Ok(output)) => {
                debug!("Tool {} succeeded", call.name);
                ToolResult::success(call, output)
            }
            Ok(Err(Error::Tool(msg))) => {
                debug!("Tool {} declined: {}", call.name, msg);
                ToolResult::failure(call, msg)
            }
            Ok(Err(e)) => {
                warn!("Tool {} failed: {}", call.name, e);
                ToolResult::failure(call, format!("{} failed: {}", call.name, e))
            }
            Err(_) => {
                warn!("Tool {} panicked", call.name);
                ToolResult::failure(call, format!("{} failed unexpectedly", call.name))
            }
        }
    }

    /// Execute every call of one model turn concurrently.
    ///
    /// Returns exactly one result per call, in call order.
    pub async fn dispatch_batch(&self, calls: &[ToolCallRequest], session: &SessionContext) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.dispatch(call, session))).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ArgSpec, DummyTool, ToolArgs, ToolOutput};
    use crate::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str { "failing" }
        fn description(&self) -> &str { "Always fails" }
        fn args(&self) -> &[ArgSpec] { &[] }

        async fn execute(&self, _args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
            Err(Error::Collaborator("catalog backend unreachable".into()))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str { "panicking" }
        fn description(&self) -> &str { "Always panics" }
        fn args(&self) -> &[ArgSpec] { &[] }

        async fn execute(&self, _args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
            panic!("boom")
        }
    }

    struct EchoTool;

    const ECHO_ARGS: &[ArgSpec] = &[ArgSpec::text("query", "Text to echo")];

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes the query" }
        fn args(&self) -> &[ArgSpec] { ECHO_ARGS }

        async fn execute(&self, args: ToolArgs, session: &SessionContext) -> Result<ToolOutput> {
            Ok(ToolOutput::new(json!({
                "query": args.text("query"),
                "session": session.session_id,
            })))
        }
    }

    fn session() -> SessionContext {
        SessionContext::new("+56912345678")
    }

    #[tokio::test]
    async fn test_registry_register_and_dispatch() {
        let mut registry = ToolRegistry::new();
        registry.register(DummyTool {
            name: "test_tool".to_string(),
            result: json!({"ok": 1}),
        });

        assert!(registry.has("test_tool"));

        let call = ToolCallRequest::new("tc_0", "test_tool", json!({}));
        let result = registry.dispatch(&call, &session()).await;
        assert!(result.is_success());
        assert_eq!(result.call_name, "test_tool");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCallRequest::new("tc_0", "launch_rocket", json!({}));
        let result = registry.dispatch(&call, &session()).await;
        assert_eq!(result.error_message(), Some("unrecognized tool"));
    }

    #[tokio::test]
    async fn test_missing_argument_skips_execution() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let call = ToolCallRequest::new("tc_0", "echo", json!({"other": "x"}));
        let result = registry.dispatch(&call, &session()).await;
        assert_eq!(result.error_message(), Some("missing query"));
    }

    #[tokio::test]
    async fn test_session_context_threaded_through() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);

        let call = ToolCallRequest::new("tc_0", "echo", json!({"query": "  tractor "}));
        let result = registry.dispatch(&call, &session()).await;
        assert_eq!(
            result.response_value(),
            json!({"query": "tractor", "session": "+56912345678", "success": true})
        );
    }

    #[tokio::test]
    async fn test_collaborator_error_and_panic_are_captured() {
        let mut registry = ToolRegistry::new();
        registry.register(FailingTool);
        registry.register(PanickingTool);

        let failed = registry
            .dispatch(&ToolCallRequest::new("tc_0", "failing", json!({})), &session())
            .await;
        assert!(failed.error_message().unwrap().contains("catalog backend unreachable"));

        let panicked = registry
            .dispatch(&ToolCallRequest::new("tc_1", "panicking", json!({})), &session())
            .await;
        assert_eq!(panicked.error_message(), Some("panicking failed unexpectedly"));
    }

    #[tokio::test]
    async fn test_batch_returns_one_result_per_call_in_order() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        registry.register(FailingTool);

        let calls = vec![
            ToolCallRequest::new("tc_0", "echo", json!({"query": "a"})),
            ToolCallRequest::new("tc_1", "failing", json!({})),
            ToolCallRequest::new("tc_2", "nope", json!({})),
            ToolCallRequest::new("tc_3", "echo", json!({"query": "b"})),
        ];
        let results = registry.dispatch_batch(&calls, &session()).await;

        assert_eq!(results.len(), 4);
        let ids: Vec<&str> = results.iter().map(|r| r.call_id.as_str()).collect();
        assert_eq!(ids, vec!["tc_0", "tc_1", "tc_2", "tc_3"]);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(!results[2].is_success());
        assert!(results[3].is_success());
    }

    #[test]
    fn test_tool_sets() {
        let dir = tempfile::tempdir().unwrap();
        let services = Services::from_workspace(dir.path()).unwrap();

        assert_eq!(
            ToolRegistry::sales_tools(&services).tool_names(),
            vec![
                "search_catalog",
                "get_item_details",
                "create_quote",
                "update_negotiation_status",
                "schedule_meeting"
            ]
        );
        assert_eq!(
            ToolRegistry::reservation_tools(&services).tool_names(),
            vec!["check_availability", "get_cabin_info", "create_reservation", "get_cabin_services"]
        );
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(DummyTool { name: "x".into(), result: json!(1) });
        registry.register(DummyTool { name: "x".into(), result: json!(2) });
        assert_eq!(registry.tool_names(), vec!["x"]);
    }
}
