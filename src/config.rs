//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::Result;
use crate::error::Error;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory path (catalog, conversations, quotes)
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// LLM provider to use
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Gemini API key
    #[serde(default)]
    pub gemini_api_key: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Prior turns included in each prompt
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Caller-side timeout around one orchestration run
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Overrides the bot settings' `max_tool_turns` when set
    #[serde(default)]
    pub max_tool_turns: Option<usize>,
}

fn default_workspace() -> PathBuf {
    config_dir().join("workspace")
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_history_limit() -> usize {
    40
}

fn default_request_timeout_secs() -> u64 {
    90
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_output_tokens() -> u32 {
    8192
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            provider: default_provider(),
            gemini_api_key: String::new(),
            model: default_model(),
            history_limit: default_history_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            max_tool_turns: None,
        }
    }
}

impl Config {
    /// Apply `GEMINI_API_KEY`, `MODEL_NAME`, `HISTORY_LIMIT` and `MAX_TOOL_TURNS` overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|v| !v.is_empty()) {
            self.gemini_api_key = key;
        }
        if let Some(model) = lookup("MODEL_NAME").filter(|v| !v.is_empty()) {
            self.model = model;
        }
        if let Some(limit) = lookup("HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
            self.history_limit = limit;
        }
        if let Some(turns) = lookup("MAX_TOOL_TURNS").and_then(|v| v.parse().ok()) {
            self.max_tool_turns = Some(turns);
        }
    }
}

/// Conversational tone of the assistant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Enthusiastic,
}

impl Tone {
    pub fn description(&self) -> &'static str {
        match self {
            Tone::Professional => "professional, serious, efficient and formal. You prioritise clarity.",
            Tone::Friendly => "friendly, warm, empathetic and helpful. You use emojis sparingly for warmth.",
            Tone::Enthusiastic => "very enthusiastic, cheerful and energetic, with emojis and exclamation marks.",
        }
    }
}

/// How long and how structured replies should be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStyle {
    #[default]
    Concise,
    Detailed,
    Humanized,
}

impl ResponseStyle {
    pub fn description(&self) -> &'static str {
        match self {
            ResponseStyle::Concise => "short, direct and to the point. Avoid long explanations.",
            ResponseStyle::Detailed => "complete and detailed. Explain each point and give context.",
            ResponseStyle::Humanized => "natural and conversational, like a real person rather than a bot.",
        }
    }
}

/// Default reply language when the customer's language is unclear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
    Pt,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Es => "Spanish (Español)",
            Language::En => "English",
            Language::Pt => "Portuguese (Português)",
        }
    }
}

/// Optional behaviours toggled by the admin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "default_true")]
    pub use_emojis: bool,

    #[serde(default = "default_true")]
    pub mention_prices: bool,

    #[serde(default = "default_true")]
    pub collect_client_info: bool,

    /// Pre-search the catalog for product mentions on a fresh conversation
    #[serde(default = "default_true")]
    pub inventory_hint: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_emojis: true,
            mention_prices: true,
            collect_client_info: true,
            inventory_hint: true,
        }
    }
}

/// Per-request bot settings, owned by the conversation store.
///
/// Every field has a default so a partial settings document merges over
/// the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfiguration {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    #[serde(default)]
    pub tone: Tone,

    #[serde(default)]
    pub response_style: ResponseStyle,

    #[serde(default)]
    pub language: Language,

    /// Highest discount (percent) the assistant may offer
    #[serde(default = "default_max_discount")]
    pub max_discount: u8,

    #[serde(default = "default_max_tool_turns")]
    pub max_tool_turns: usize,

    #[serde(default = "default_max_response_length")]
    pub max_response_length: usize,

    #[serde(default = "default_business_context")]
    pub business_context: String,

    #[serde(default)]
    pub custom_instructions: String,

    #[serde(default = "default_greeting")]
    pub greeting: String,

    #[serde(default = "default_farewell")]
    pub farewell: String,

    #[serde(default = "default_unavailable_message")]
    pub unavailable_message: String,

    /// Use `system_prompt` verbatim (placeholders still substituted)
    #[serde(default)]
    pub advanced_mode: bool,

    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Words that mark a message as a product enquiry
    #[serde(default = "default_product_keywords")]
    pub product_keywords: Vec<String>,

    #[serde(default)]
    pub features: FeatureFlags,
}

fn default_bot_name() -> String {
    "Field Advisor".to_string()
}

fn default_max_discount() -> u8 {
    10
}

fn default_max_tool_turns() -> usize {
    5
}

fn default_max_response_length() -> usize {
    500
}

fn default_business_context() -> String {
    "We are a family-run dealer of agricultural machinery and implements. \
     We sell tractors, soil preparation gear, sprayers, harvest equipment and trailers, \
     and we help farmers pick the right machine for the job."
        .to_string()
}

fn default_greeting() -> String {
    "Hi! I'm {bot_name}. How can I help you today?".to_string()
}

fn default_farewell() -> String {
    "Thanks for reaching out!".to_string()
}

fn default_unavailable_message() -> String {
    "Sorry, we don't have that in stock right now.".to_string()
}

fn default_product_keywords() -> Vec<String> {
    [
        "tractor", "plow", "plough", "harrow", "sprayer", "harvester", "seeder",
        "cultivator", "subsoiler", "trailer", "shredder", "spreader", "mower",
        "machine", "implement", "arado", "rastra", "carro", "sembradora",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for BotConfiguration {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            tone: Tone::default(),
            response_style: ResponseStyle::default(),
            language: Language::default(),
            max_discount: default_max_discount(),
            max_tool_turns: default_max_tool_turns(),
            max_response_length: default_max_response_length(),
            business_context: default_business_context(),
            custom_instructions: String::new(),
            greeting: default_greeting(),
            farewell: default_farewell(),
            unavailable_message: default_unavailable_message(),
            advanced_mode: false,
            system_prompt: None,
            product_keywords: default_product_keywords(),
            features: FeatureFlags::default(),
        }
    }
}

impl BotConfiguration {
    /// The admin template, when passthrough mode is active.
    pub fn passthrough_template(&self) -> Option<&str> {
        if !self.advanced_mode {
            return None;
        }
        self.system_prompt
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fieldhand")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from file, then apply environment overrides
pub fn load() -> Result<Config> {
    let path = config_path();

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config not found at {:?}. Run 'fieldhand onboard' first.",
            path
        )));
    }

    let content = std::fs::read_to_string(&path)?;
    let mut config: Config = serde_json::from_str(&content)?;
    config.apply_env();
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    let path = config_path();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

/// Initialize configuration and workspace
pub fn onboard() -> Result<()> {
    use crate::ui;
    use inquire::{Confirm, Text};

    ui::print_header("Setup Wizard", "local");
    println!("  Let's get the sales assistant configured.\n");

    let mut config = Config::default();

    let key = Text::new("Enter your Gemini API Key:").prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
    config.gemini_api_key = key;

    ui::print_step(&format!("Default workspace is at {:?}", config.workspace));
    let keep_path = Confirm::new("Use default workspace path?").with_default(true).prompt()
        .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;

    if !keep_path {
        let new_path = Text::new("Enter custom workspace path:").prompt()
            .map_err(|e| Error::Config(format!("Prompt failed: {}", e)))?;
        config.workspace = PathBuf::from(new_path);
    }

    ui::print_thinking("Creating directories");
    std::fs::create_dir_all(&config.workspace)?;
    std::fs::create_dir_all(config.workspace.join("conversations"))?;
    std::fs::create_dir_all(config.workspace.join("quotes"))?;
    crate::templates::bootstrap_workspace(&config.workspace)?;

    let settings_path = config.workspace.join("bot_settings.json");
    if !settings_path.exists() {
        ui::print_thinking("Writing default bot_settings.json");
        let content = serde_json::to_string_pretty(&BotConfiguration::default())?;
        std::fs::write(&settings_path, content)?;
    }

    ui::print_thinking("Saving configuration");
    save(&config)?;

    println!();
    ui::print_success("Setup complete!");
    ui::print_step(&format!(
        "Put your inventory in {:?}, then run 'fieldhand chat'.",
        config.workspace.join("catalog.json")
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.history_limit, 40);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, config.model);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "MODEL_NAME" => Some("gemini-2.0-flash".to_string()),
            "HISTORY_LIMIT" => Some("12".to_string()),
            "MAX_TOOL_TURNS" => Some("3".to_string()),
            "GEMINI_API_KEY" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.history_limit, 12);
        assert_eq!(config.max_tool_turns, Some(3));
        assert!(config.gemini_api_key.is_empty());
    }

    #[test]
    fn test_partial_bot_settings_merge_over_defaults() {
        let json = r#"{"tone": "friendly", "max_discount": 15, "features": {"use_emojis": false}}"#;
        let bot: BotConfiguration = serde_json::from_str(json).unwrap();

        assert_eq!(bot.tone, Tone::Friendly);
        assert_eq!(bot.max_discount, 15);
        assert_eq!(bot.max_tool_turns, 5);
        assert!(!bot.features.use_emojis);
        assert!(bot.features.mention_prices);
        assert_eq!(bot.bot_name, "Field Advisor");
    }

    #[test]
    fn test_passthrough_requires_advanced_mode_and_text() {
        let mut bot = BotConfiguration::default();
        bot.system_prompt = Some("You are {bot_name}.".to_string());
        assert!(bot.passthrough_template().is_none());

        bot.advanced_mode = true;
        assert_eq!(bot.passthrough_template(), Some("You are {bot_name}."));

        bot.system_prompt = Some("   ".to_string());
        assert!(bot.passthrough_template().is_none());
    }
}
