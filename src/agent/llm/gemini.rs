//! Gemini LLM client implementation (API key authentication).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::{GeminiResponse, GenerationParams, LlmClient, ModelResponse};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client using API key authentication.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with API key.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: Client::new(),
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            GEMINI_API_URL, self.model, self.api_key
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| match m.role {
                // One turn's results travel together: N functionResponse parts
                Role::Tool => {
                    let parts: Vec<Value> = m
                        .tool_results
                        .iter()
                        .flatten()
                        .map(|r| {
                            json!({
                                "functionResponse": {
                                    "name": r.call_name,
                                    "response": r.response_value()
                                }
                            })
                        })
                        .collect();
                    json!({"role": "function", "parts": parts})
                }
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !m.content.is_empty() {
                        parts.push(json!({"text": m.content}));
                    }
                    for tc in m.tool_calls.iter().flatten() {
                        parts.push(json!({
                            "functionCall": {
                                "name": tc.name,
                                "args": tc.arguments
                            }
                        }));
                    }
                    json!({"role": "model", "parts": parts})
                }
                Role::User | Role::System => json!({
                    "role": "user",
                    "parts": [{"text": m.content}]
                }),
            })
            .collect()
    }

    fn get_system_instruction(messages: &[Message]) -> Option<String> {
        messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let function_declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters
                })
            })
            .collect();

        Some(json!([{
            "functionDeclarations": function_declarations
        }]))
    }

    fn build_request(messages: &[Message], tools: &[ToolDefinition], params: &GenerationParams) -> Value {
        let mut request = json!({
            "contents": Self::convert_messages(messages),
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_output_tokens
            }
        });

        if let Some(system) = Self::get_system_instruction(messages) {
            request["systemInstruction"] = json!({
                "parts": [{"text": system}]
            });
        }

        if let Some(tool_config) = Self::convert_tools(tools) {
            request["tools"] = tool_config;
        }

        request
    }

    /// Map a non-success HTTP reply to the gateway's error classes.
    fn classify_error(status: StatusCode, body: &str) -> Error {
        if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
            Error::QuotaExceeded(format!("Gemini API {status}"))
        } else {
            Error::Llm(format!("Gemini API error ({status}): {body}"))
        }
    }

    fn parse_response(response: &GeminiResponse) -> ModelResponse {
        if let Some(reason) = response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
            info!("Gemini blocked the prompt: {}", reason);
            return ModelResponse::SafetyFiltered;
        }

        let Some(content) = response.candidates.first().and_then(|c| c.content.as_ref()) else {
            info!("Gemini returned no usable candidates");
            return ModelResponse::SafetyFiltered;
        };

        let mut text = String::new();
        let mut calls = Vec::new();

        for part in &content.parts {
            if let Some(ref t) = part.text {
                text.push_str(t);
            }

            if let Some(ref fc) = part.function_call {
                calls.push(ToolCallRequest::new(
                    format!("tc_{}", calls.len()),
                    fc.name.clone(),
                    fc.args.clone(),
                ));
            }
        }

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Gemini usage: prompt={} completion={} total={}",
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
                usage.total_token_count.unwrap_or(0)
            );
        }

        if calls.is_empty() {
            ModelResponse::Text(text)
        } else {
            let text = Some(text).filter(|t| !t.trim().is_empty());
            ModelResponse::FunctionCalls { text, calls }
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        params: &GenerationParams,
    ) -> Result<ModelResponse> {
        let request = Self::build_request(messages, tools, params);

        let response = self.client.post(self.build_url()).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(Self::classify_error(status, &error_text));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        Ok(Self::parse_response(&gemini_response))
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolOutput, ToolResult};

    fn parse(body: Value) -> ModelResponse {
        let response: GeminiResponse = serde_json::from_value(body).unwrap();
        GeminiClient::parse_response(&response)
    }

    #[test]
    fn test_parse_text() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "Hola"}, {"text": "!"}]}}]});
        assert_eq!(parse(body), ModelResponse::Text("Hola!".into()));
    }

    #[test]
    fn test_parse_function_calls_keep_text() {
        let body = json!({"candidates": [{"content": {"parts": [
            {"text": "Let me check."},
            {"functionCall": {"name": "search_catalog", "args": {"query": "harrow"}}},
            {"functionCall": {"name": "schedule_meeting", "args": {}}}
        ]}}]});

        match parse(body) {
            ModelResponse::FunctionCalls { text, calls } => {
                assert_eq!(text.as_deref(), Some("Let me check."));
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[1].id, "tc_1");
                assert_eq!(calls[0].arguments, json!({"query": "harrow"}));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_safety_filtered() {
        assert_eq!(parse(json!({"candidates": []})), ModelResponse::SafetyFiltered);
        assert_eq!(
            parse(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
            ModelResponse::SafetyFiltered
        );
        assert_eq!(
            parse(json!({"candidates": [{"finishReason": "SAFETY"}]})),
            ModelResponse::SafetyFiltered
        );
    }

    #[test]
    fn test_classify_error() {
        assert!(GeminiClient::classify_error(StatusCode::TOO_MANY_REQUESTS, "").is_transient_quota());
        assert!(GeminiClient::classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"error": {"status": "RESOURCE_EXHAUSTED"}}"#
        )
        .is_transient_quota());
        assert!(!GeminiClient::classify_error(StatusCode::INTERNAL_SERVER_ERROR, "boom").is_transient_quota());
    }

    #[test]
    fn test_tool_results_batched_into_one_content() {
        let a = ToolCallRequest::new("tc_0", "search_catalog", json!({}));
        let b = ToolCallRequest::new("tc_1", "schedule_meeting", json!({}));
        let messages = vec![
            Message::system("be nice"),
            Message::user("hi"),
            Message::assistant_with_tools("", vec![a.clone(), b.clone()]),
            Message::tool_results(vec![
                ToolResult::success(&a, ToolOutput::new(json!({"items": []}))),
                ToolResult::failure(&b, "missing customer_email"),
            ]),
        ];

        let request = GeminiClient::build_request(&messages, &[], &GenerationParams::default());
        let contents = request["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(request["systemInstruction"]["parts"][0]["text"], "be nice");
        assert_eq!(contents[1]["parts"].as_array().unwrap().len(), 2);
        assert_eq!(contents[2]["role"], "function");
        let parts = contents[2]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["functionResponse"]["response"]["error"], "missing customer_email");
    }
}
