//! Agent module — core agent logic.
//!
//! This module contains:
//! - Message types (InboundMessage, ResponseEnvelope, history entries)
//! - Prompt builder with a validated placeholder map
//! - LLM client trait, Gemini implementation and the quota-aware gateway
//! - Context builder for the opening prompt
//! - Agent loop (turn loop) and response assembler
//!
//! # Adding a New LLM Provider
//!
//! See [`llm::ProviderRegistry`] for instructions.

mod assembler;
mod context;
mod gateway;
mod loop_impl;
mod message;
mod prompt;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use assembler::{assemble, ResponseAssembler, EMPTY_REPLY};
pub use context::Context;
pub use gateway::{Generation, ModelGateway, RetryPolicy};
pub use llm::{GeminiClient, GenerationParams, LlmClient, ModelResponse, ProviderRegistry};
pub use loop_impl::{
    AgentLoop, AgentStrategy, Briefing, Exit, RunReport, REFUSAL_REPLY, SATURATED_REPLY, STUCK_REPLY, TECHNICAL_FAILURE_REPLY,
};
pub use message::{
    Document, HistoryEntry, HistoryRole, InboundMessage, Message, ResponseEnvelope, Role, ToolCallRequest,
};
pub use prompt::{Placeholder, PromptBuilder, PromptTemplate};
