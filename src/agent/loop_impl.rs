//! Agent loop - core message processing
//!
//! One run: build the prompt once, then alternate model calls and tool
//! batches until the model answers in text, the provider refuses, or the
//! turn budget is spent. The run never fails: every exit is an envelope.

use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::services::Services;
use crate::tools::{SessionContext, ToolRegistry};
use crate::Result;

use super::assembler::ResponseAssembler;
use super::context::Context;
use super::gateway::{Generation, ModelGateway, RetryPolicy};
use super::llm::{GenerationParams, LlmClient, ModelResponse};
use super::message::{InboundMessage, Message, ResponseEnvelope};
use super::prompt::{PromptBuilder, PromptTemplate};

/// Turn budget exhausted, or the model went quiet
pub const STUCK_REPLY: &str = "I got stuck on that one. Could you simplify your request or split it into parts?";

/// Provider throttled every attempt
pub const SATURATED_REPLY: &str = "The system is saturated right now. Please try again in a few seconds.";

/// Provider withheld its answer
pub const REFUSAL_REPLY: &str = "Sorry, I can't help with that message.";

/// Unexpected failure anywhere in the run
pub const TECHNICAL_FAILURE_REPLY: &str = "I ran into a technical error. Could you repeat that?";

/// What the opening messages tell the model about the business
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Briefing {
    /// Catalog categories, previous quotes and the inventory hint
    Sales,
    /// Cabin list and previous reservations
    Lodging,
}

/// Everything that varies between assistants
pub struct AgentStrategy {
    pub prompt: PromptBuilder,
    pub tools: ToolRegistry,
    pub briefing: Briefing,
    /// Falls back to the bot settings' `max_tool_turns`
    pub max_turns: Option<usize>,
    pub generation: GenerationParams,
    pub history_limit: usize,
}

impl AgentStrategy {
    /// The dealer's sales assistant
    pub fn sales(services: &Services, config: &Config) -> Self {
        Self {
            prompt: PromptBuilder::default(),
            tools: ToolRegistry::sales_tools(services),
            briefing: Briefing::Sales,
            max_turns: config.max_tool_turns,
            generation: GenerationParams::from_config(config),
            history_limit: config.history_limit,
        }
    }

    /// The lodge's cabin reservations assistant
    pub fn reservations(services: &Services, config: &Config) -> Self {
        Self {
            prompt: PromptBuilder::new(PromptTemplate::reservations_agent()),
            tools: ToolRegistry::reservation_tools(services),
            briefing: Briefing::Lodging,
            ..Self::sales(services, config)
        }
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Answered,
    TurnLimit,
    SafetyFiltered,
    Saturated,
    Failed,
}

/// A finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub envelope: ResponseEnvelope,
    /// Tool batches executed
    pub tool_turns: usize,
    pub exit: Exit,
}

/// The agent loop processes messages through LLM and tool execution
pub struct AgentLoop<C: LlmClient> {
    gateway: ModelGateway<C>,
    strategy: AgentStrategy,
    services: Services,
}

impl<C: LlmClient> AgentLoop<C> {
    /// Create a new agent loop
    pub fn new(client: C, strategy: AgentStrategy, services: Services) -> Self {
        Self {
            gateway: ModelGateway::new(client),
            strategy,
            services,
        }
    }

    pub fn with_retry_policy(self, policy: RetryPolicy) -> Self {
        let Self { gateway, strategy, services } = self;
        let client = gateway.into_client();
        Self {
            gateway: ModelGateway::with_policy(client, policy),
            strategy,
            services,
        }
    }

    pub fn strategy(&self) -> &AgentStrategy {
        &self.strategy
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Run the agent loop for a single message
    pub async fn run(&self, inbound: &InboundMessage) -> ResponseEnvelope {
        self.run_report(inbound).await.envelope
    }

    /// Same as [`run`](Self::run), with how the run ended.
    pub async fn run_report(&self, inbound: &InboundMessage) -> RunReport {
        let span = info_span!(
            "turn_loop",
            session = %inbound.session_id,
            request_id = %Uuid::new_v4()
        );

        async {
            info!("Processing message ({} chars)", inbound.content.chars().count());
            let report = match self.run_turns(inbound).await {
                Ok(report) => report,
                Err(e) => {
                    error!("Turn loop failed: {:?}", e);
                    RunReport {
                        envelope: ResponseEnvelope::text(TECHNICAL_FAILURE_REPLY),
                        tool_turns: 0,
                        exit: Exit::Failed,
                    }
                }
            };
            info!(
                "Run finished: {:?} after {} tool turn(s), {} image(s), {} document(s)",
                report.exit,
                report.tool_turns,
                report.envelope.images.len(),
                report.envelope.documents.len()
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn run_turns(&self, inbound: &InboundMessage) -> Result<RunReport> {
        let strategy = &self.strategy;
        let ctx = Context::load(&self.services, &inbound.session_id, strategy.history_limit).await?;
        let max_turns = strategy.max_turns.unwrap_or(ctx.config.max_tool_turns);

        let services = &self.services;
        let (overview, previous, hint) = match strategy.briefing {
            Briefing::Sales => (
                Context::catalog_overview(services.catalog.as_ref()).await,
                ctx.previous_quotes(services.quotes.as_ref()).await,
                ctx.inventory_hint(&inbound.content, services.catalog.as_ref()).await,
            ),
            Briefing::Lodging => (
                Context::cabin_overview(services.lodging.as_ref()).await,
                ctx.previous_reservations(services.reservations.as_ref()).await,
                None,
            ),
        };

        let date = inbound.timestamp.format("%d/%m/%Y").to_string();
        let system_prompt = strategy.prompt.build(&ctx.config, overview.as_deref(), &date);
        let user_prompt = Context::user_prompt(&date, previous.as_deref(), hint.as_deref(), &inbound.content);

        let mut messages = ctx.build_messages(system_prompt, user_prompt, strategy.history_limit);
        let tools = strategy.tools.definitions();
        let session = SessionContext::new(inbound.session_id.clone());
        let mut assembler = ResponseAssembler::new();
        let mut turn = 0;

        let exit = loop {
            debug!("Model call {} (tool turns used {}/{})", turn + 1, turn, max_turns);

            let response = match self.gateway.generate(&messages, &tools, &strategy.generation).await? {
                Generation::Response(response) => response,
                Generation::Saturated => {
                    warn!("Provider saturated, giving up on this request");
                    assembler.push_text(SATURATED_REPLY);
                    break Exit::Saturated;
                }
            };

            let (text, calls) = match response {
                ModelResponse::SafetyFiltered => {
                    info!("Provider returned no candidates (safety filter)");
                    assembler.push_text(REFUSAL_REPLY);
                    break Exit::SafetyFiltered;
                }
                ModelResponse::Text(text) => (text, vec![]),
                ModelResponse::FunctionCalls { text, calls } => (text.unwrap_or_default(), calls),
            };

            if calls.is_empty() {
                assembler.push_text(text);
                if !assembler.has_text() {
                    warn!("Model finished without any text");
                    assembler.push_text(STUCK_REPLY);
                }
                break Exit::Answered;
            }

            // The fallback stands alone; earlier narration is dropped, artifacts stay
            if turn >= max_turns {
                warn!("Model still requesting tools after {} turns; stopping", turn);
                assembler.replace_text(STUCK_REPLY);
                break Exit::TurnLimit;
            }

            assembler.push_text(text.clone());

            let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
            debug!("Dispatching {} call(s): {:?}", calls.len(), names);

            let results = strategy.tools.dispatch_batch(&calls, &session).await;
            for result in &results {
                assembler.collect(result);
            }

            messages.push(Message::assistant_with_tools(text, calls));
            messages.push(Message::tool_results(results));
            turn += 1;
        };

        Ok(RunReport {
            envelope: assembler.finish(),
            tool_turns: turn,
            exit,
        })
    }
}
