//! CLI adapter — interactive and single-message command line interface.
//!
//! The channel owns the caller-side concerns of a run: the timeout around
//! the whole orchestration and recording both turns in the conversation
//! store once a reply exists.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use colored::*;
use tracing::warn;

use crate::agent::{AgentLoop, HistoryEntry, InboundMessage, LlmClient, ResponseEnvelope};
use crate::error::Error;
use crate::ui;
use crate::Result;

use super::Channel;

/// CLI channel for interactive agent sessions.
pub struct CliChannel<C: LlmClient> {
    agent: AgentLoop<C>,
    session_id: String,
    timeout: Duration,
    json: bool,
}

impl<C: LlmClient> CliChannel<C> {
    /// Create a new CLI channel.
    pub fn new(agent: AgentLoop<C>, session_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent,
            session_id: session_id.into(),
            timeout,
            json: false,
        }
    }

    /// Print envelopes as JSON instead of formatted text.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Run a single message and return the response.
    pub async fn run_once(&self, message: &str) -> Result<ResponseEnvelope> {
        let inbound = InboundMessage::new(&self.session_id, message);

        let envelope = tokio::time::timeout(self.timeout, self.agent.run(&inbound))
            .await
            .map_err(|_| Error::Other(format!("No reply within {}s", self.timeout.as_secs())))?;

        let store = &self.agent.services().store;
        store.append(&self.session_id, HistoryEntry::user(message)).await?;
        store.append(&self.session_id, HistoryEntry::model(&envelope.text)).await?;

        Ok(envelope)
    }

    /// Print one envelope in the configured format.
    pub fn print(&self, envelope: &ResponseEnvelope) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(envelope)?);
        } else {
            ui::print_envelope(envelope);
        }
        Ok(())
    }

    /// Run interactive REPL loop.
    pub async fn run_interactive(&self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("{}: ", "You".blue().bold());
            stdout.flush()?;

            // Read input
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                // EOF
                break;
            }

            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            // Check for exit commands
            if matches!(input.to_lowercase().as_str(), "exit" | "quit" | "q") {
                println!("Goodbye! 👋");
                break;
            }

            match self.run_once(input).await {
                Ok(envelope) => self.print(&envelope)?,
                Err(e) => {
                    warn!("CLI turn failed: {}", e);
                    ui::print_error(&e.to_string());
                }
            }
        }

        Ok(())
    }
}

impl<C: LlmClient> Channel for CliChannel<C> {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<()> {
        self.run_interactive().await
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agent::llm::FakeLlmClient;
    use crate::agent::{AgentStrategy, HistoryRole};
    use crate::config::Config;
    use crate::services::{
        FileDocumentGenerator, InMemoryConversationStore, JsonCatalog, JsonLodging, JsonMeetingBook, JsonQuoteStore,
        JsonReservationBook, Services,
    };

    fn channel(client: FakeLlmClient, dir: &std::path::Path) -> CliChannel<FakeLlmClient> {
        let services = Services {
            store: Arc::new(InMemoryConversationStore::new()),
            catalog: Arc::new(JsonCatalog::new(vec![])),
            quotes: Arc::new(JsonQuoteStore::in_memory()),
            documents: Arc::new(FileDocumentGenerator::new(dir.join("quotes"))),
            meetings: Arc::new(JsonMeetingBook::new(dir.join("meetings.jsonl"))),
            lodging: Arc::new(JsonLodging::new(vec![])),
            reservations: Arc::new(JsonReservationBook::in_memory()),
        };
        let strategy = AgentStrategy::sales(&services, &Config::default());
        CliChannel::new(AgentLoop::new(client, strategy, services), "cli:test", Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_run_once_records_both_turns() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(FakeLlmClient::new(vec!["Hello!", "Sure."]), dir.path());

        channel.run_once("hi").await.unwrap();
        let envelope = channel.run_once("and now?").await.unwrap();
        assert_eq!(envelope.text, "Sure.");

        let history = channel.agent.services().store.history("cli:test", 10).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], HistoryEntry::user("hi"));
        assert_eq!(history[1].role, HistoryRole::Model);
        assert_eq!(history[1].content, "Hello!");
    }

    #[tokio::test]
    async fn test_channel_name() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(FakeLlmClient::new(vec![]), dir.path());
        assert_eq!(channel.name(), "cli");
        assert!(channel.stop().await.is_ok());
    }
}
