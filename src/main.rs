//! Fieldhand CLI entry point

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use fieldhand::adapters::{cli::CliChannel, Channel};
use fieldhand::agent::{AgentLoop, AgentStrategy, ProviderRegistry};
use fieldhand::config::Config;
use fieldhand::services::Services;
use fieldhand::ui;

#[derive(Parser)]
#[command(name = "fieldhand")]
#[command(about = "🚜 Fieldhand - sales and reservations assistant over a tool-calling model")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which assistant answers
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Assistant {
    /// Machinery sales
    Sales,
    /// Cabin availability and pre-reservations
    Reservations,
}

impl Assistant {
    fn strategy(self, services: &Services, config: &Config) -> AgentStrategy {
        match self {
            Assistant::Sales => AgentStrategy::sales(services, config),
            Assistant::Reservations => AgentStrategy::reservations(services, config),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace
    Onboard,

    /// Chat with the sales agent
    Chat {
        /// Message to send to the agent
        #[arg(short, long)]
        message: Option<String>,

        /// Session ID (the customer's phone number on messaging channels)
        #[arg(short, long, default_value = "cli:default")]
        session: String,

        /// Print replies as JSON envelopes
        #[arg(long)]
        json: bool,

        #[arg(short, long, value_enum, default_value_t = Assistant::Sales)]
        assistant: Assistant,
    },

    /// List the tools the model can call
    Tools {
        #[arg(short, long, value_enum, default_value_t = Assistant::Sales)]
        assistant: Assistant,
    },

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            println!("🚜 Initializing Fieldhand...");
            fieldhand::config::onboard()?;
            ui::print_success("Fieldhand is ready!");
            println!("\nNext steps:");
            println!("  1. Add your Gemini API key to ~/.fieldhand/config.json (or set GEMINI_API_KEY)");
            println!("  2. Put your stock list in <workspace>/catalog.json");
            println!("  3. Chat: fieldhand chat -m \"Do you have tractors?\"");
        }

        Commands::Chat { message, session, json, assistant } => {
            let config = fieldhand::config::load()?;
            let channel = build_channel(&config, &session, assistant)?.with_json(json);

            if let Some(msg) = message {
                // Single message mode
                let envelope = channel.run_once(&msg).await?;
                channel.print(&envelope)?;
            } else {
                // Interactive mode
                ui::print_header(&config.model, &session);
                println!("Interactive mode (type 'exit' to quit)\n");
                channel.start().await?;
            }
        }

        Commands::Tools { assistant } => {
            let config = fieldhand::config::load()?;
            let services = Services::from_workspace(&config.workspace)?;
            let registry = assistant.strategy(&services, &config).tools;
            ui::print_header("Tools", &format!("{} registered", registry.tool_names().len()));
            ui::print_tools(&registry.definitions());
        }

        Commands::Status => {
            let config = fieldhand::config::load()?;
            ui::print_header("Status", &config.provider);
            println!("Workspace: {:?}", config.workspace);
            println!("Model: {}", config.model);
            println!(
                "Provider: {} (available: {})",
                config.provider,
                ProviderRegistry::available().join(", ")
            );
            println!(
                "Gemini API: {}",
                if config.gemini_api_key.is_empty() { "not set" } else { "✓" }
            );
            println!("History window: {} entries", config.history_limit);
            println!("Request timeout: {}s", config.request_timeout_secs);
            match config.max_tool_turns {
                Some(turns) => println!("Tool turns: {}", turns),
                None => println!("Tool turns: unbounded"),
            }
            if !config.workspace.join("catalog.json").exists() {
                ui::print_warning("No catalog.json in the workspace; searches will find nothing");
            }
            if !config.workspace.join("cabins.json").exists() {
                ui::print_warning("No cabins.json in the workspace; the reservations assistant has no cabins");
            }
        }
    }

    Ok(())
}

fn build_channel(
    config: &Config,
    session: &str,
    assistant: Assistant,
) -> Result<CliChannel<Box<dyn fieldhand::agent::LlmClient>>> {
    let services = Services::from_workspace(&config.workspace)?;
    let client = ProviderRegistry::create(config)?;
    let strategy = assistant.strategy(&services, config);
    let agent = AgentLoop::new(client, strategy, services);

    Ok(CliChannel::new(
        agent,
        session,
        Duration::from_secs(config.request_timeout_secs),
    ))
}
