//! Prompt builder - bot settings to system instruction.
//!
//! Templates reference settings through `{name}` placeholders. The set of
//! names is closed ([`Placeholder`]); anything else is left as literal text
//! and reported, so a typo in an admin template shows up in the logs instead
//! of silently reaching the model.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::warn;

use crate::config::BotConfiguration;
use crate::templates;

/// Every placeholder a template may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    BotName,
    Tone,
    Style,
    Language,
    BusinessContext,
    CustomInstructions,
    MaxDiscount,
    MaxResponseLength,
    Greeting,
    Farewell,
    UnavailableMessage,
    FeatureRules,
    Catalog,
    Date,
}

impl Placeholder {
    pub const ALL: [Placeholder; 14] = [
        Placeholder::BotName,
        Placeholder::Tone,
        Placeholder::Style,
        Placeholder::Language,
        Placeholder::BusinessContext,
        Placeholder::CustomInstructions,
        Placeholder::MaxDiscount,
        Placeholder::MaxResponseLength,
        Placeholder::Greeting,
        Placeholder::Farewell,
        Placeholder::UnavailableMessage,
        Placeholder::FeatureRules,
        Placeholder::Catalog,
        Placeholder::Date,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Placeholder::BotName => "bot_name",
            Placeholder::Tone => "tone",
            Placeholder::Style => "style",
            Placeholder::Language => "language",
            Placeholder::BusinessContext => "business_context",
            Placeholder::CustomInstructions => "custom_instructions",
            Placeholder::MaxDiscount => "max_discount",
            Placeholder::MaxResponseLength => "max_response_length",
            Placeholder::Greeting => "greeting",
            Placeholder::Farewell => "farewell",
            Placeholder::UnavailableMessage => "unavailable_message",
            Placeholder::FeatureRules => "feature_rules",
            Placeholder::Catalog => "catalog",
            Placeholder::Date => "date",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid"))
}

/// A system instruction template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// The embedded sales assistant template
    pub fn sales_agent() -> Self {
        Self::new(templates::SALES_AGENT)
    }

    /// The embedded cabin reservations template
    pub fn reservations_agent() -> Self {
        Self::new(templates::RESERVATIONS_AGENT)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names that are not part of [`Placeholder`], sorted.
    pub fn unknown_placeholders(&self) -> Vec<String> {
        placeholder_pattern()
            .captures_iter(&self.source)
            .map(|c| c[1].to_string())
            .filter(|key| Placeholder::from_key(key).is_none())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Substitute known placeholders in one pass; substituted values are
    /// never rescanned.
    pub fn render(&self, value_of: impl Fn(Placeholder) -> String) -> String {
        let unknown = self.unknown_placeholders();
        if !unknown.is_empty() {
            warn!("Prompt template uses unknown placeholders, left as is: {}", unknown.join(", "));
        }

        placeholder_pattern()
            .replace_all(&self.source, |caps: &Captures| match Placeholder::from_key(&caps[1]) {
                Some(placeholder) => value_of(placeholder),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::sales_agent()
    }
}

/// Builds the system instruction for one request
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    template: PromptTemplate,
}

impl PromptBuilder {
    pub fn new(template: PromptTemplate) -> Self {
        Self { template }
    }

    /// Deterministic for a given configuration, catalog context and date.
    ///
    /// An advanced-mode admin template replaces the builder's own template
    /// (passthrough); substitution works the same in both modes.
    pub fn build(&self, config: &BotConfiguration, catalog: Option<&str>, date: &str) -> String {
        let passthrough = config.passthrough_template().map(PromptTemplate::new);
        let template = passthrough.as_ref().unwrap_or(&self.template);

        template.render(|placeholder| Self::value(placeholder, config, catalog, date))
    }

    fn value(placeholder: Placeholder, config: &BotConfiguration, catalog: Option<&str>, date: &str) -> String {
        match placeholder {
            Placeholder::BotName => config.bot_name.clone(),
            Placeholder::Tone => config.tone.description().to_string(),
            Placeholder::Style => config.response_style.description().to_string(),
            Placeholder::Language => config.language.display_name().to_string(),
            Placeholder::BusinessContext => config.business_context.clone(),
            Placeholder::CustomInstructions => {
                if config.custom_instructions.trim().is_empty() {
                    "None.".to_string()
                } else {
                    config.custom_instructions.clone()
                }
            }
            Placeholder::MaxDiscount => config.max_discount.to_string(),
            Placeholder::MaxResponseLength => config.max_response_length.to_string(),
            Placeholder::Greeting => config.greeting.replace("{bot_name}", &config.bot_name),
            Placeholder::Farewell => config.farewell.clone(),
            Placeholder::UnavailableMessage => config.unavailable_message.clone(),
            Placeholder::FeatureRules => Self::feature_rules(config),
            Placeholder::Catalog => catalog
                .filter(|c| !c.trim().is_empty())
                .unwrap_or("No overview available. Use your tools to find out what is on offer.")
                .to_string(),
            Placeholder::Date => date.to_string(),
        }
    }

    fn feature_rules(config: &BotConfiguration) -> String {
        let features = &config.features;
        let rules = [
            if features.use_emojis {
                "- Use fitting emojis to keep the conversation friendly."
            } else {
                "- Do not use emojis."
            },
            if features.mention_prices {
                "- Mention reference prices (net, plus VAT) when relevant."
            } else {
                "- Mention prices only when the customer explicitly asks."
            },
            if features.collect_client_info {
                "- Ask for full name, email and phone before quoting or booking."
            } else {
                "- Ask only for the minimum information needed."
            },
        ];
        rules.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeatureFlags, Tone};

    #[test]
    fn test_shipped_template_is_clean() {
        let template = PromptTemplate::sales_agent();
        assert!(template.unknown_placeholders().is_empty());

        let prompt = PromptBuilder::default().build(&BotConfiguration::default(), None, "18/10/2026");
        assert!(!placeholder_pattern().is_match(&prompt), "unresolved placeholder in:\n{prompt}");
    }

    #[test]
    fn test_reservations_template_is_clean() {
        let template = PromptTemplate::reservations_agent();
        assert!(template.unknown_placeholders().is_empty());

        let builder = PromptBuilder::new(template);
        let prompt = builder.build(&BotConfiguration::default(), Some("Our cabins: Laurel (sleeps 6)."), "18/10/2026");
        assert!(!placeholder_pattern().is_match(&prompt), "unresolved placeholder in:\n{prompt}");
        assert!(prompt.contains("check_availability"));
        assert!(prompt.contains("Our cabins: Laurel (sleeps 6)."));
        assert!(!prompt.contains("search_catalog"));
    }

    #[test]
    fn test_templated_mode_substitutes_settings() {
        let config = BotConfiguration {
            bot_name: "Rosa".into(),
            tone: Tone::Friendly,
            max_discount: 7,
            ..BotConfiguration::default()
        };

        let prompt = PromptBuilder::default().build(&config, Some("Harrows, Sprayers"), "18/10/2026");

        assert!(prompt.contains("You are Rosa"));
        assert!(prompt.contains(Tone::Friendly.description()));
        assert!(prompt.contains("at most 7% discount"));
        assert!(prompt.contains("Hi! I'm Rosa."));
        assert!(prompt.contains("Harrows, Sprayers"));
        assert!(prompt.contains("Today is 18/10/2026."));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::default();
        let config = BotConfiguration::default();
        assert_eq!(
            builder.build(&config, None, "01/01/2026"),
            builder.build(&config, None, "01/01/2026")
        );
    }

    #[test]
    fn test_passthrough_mode() {
        let config = BotConfiguration {
            advanced_mode: true,
            system_prompt: Some("I am {bot_name}. Budget {max_discount}%. {mystery} {catalog}".into()),
            ..BotConfiguration::default()
        };

        let prompt = PromptBuilder::default().build(&config, Some("Trailers"), "today");
        assert_eq!(prompt, "I am Field Advisor. Budget 10%. {mystery} Trailers");
    }

    #[test]
    fn test_blank_passthrough_falls_back_to_template() {
        let config = BotConfiguration {
            advanced_mode: true,
            system_prompt: Some("   ".into()),
            ..BotConfiguration::default()
        };
        let prompt = PromptBuilder::default().build(&config, None, "today");
        assert!(prompt.contains("# ROLE"));
    }

    #[test]
    fn test_unknown_placeholders_reported() {
        let template = PromptTemplate::new("{bot_name} {botName} {fecha_actual} {botName}");
        assert_eq!(template.unknown_placeholders(), vec!["botName", "fecha_actual"]);
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let config = BotConfiguration {
            custom_instructions: "Literal {date} stays".into(),
            ..BotConfiguration::default()
        };
        let prompt = PromptBuilder::new(PromptTemplate::new("{custom_instructions}")).build(&config, None, "X");
        assert_eq!(prompt, "Literal {date} stays");
    }

    #[test]
    fn test_feature_rules_follow_flags() {
        let config = BotConfiguration {
            features: FeatureFlags {
                use_emojis: false,
                mention_prices: false,
                ..FeatureFlags::default()
            },
            ..BotConfiguration::default()
        };
        let prompt = PromptBuilder::new(PromptTemplate::new("{feature_rules}")).build(&config, None, "X");
        assert!(prompt.contains("Do not use emojis."));
        assert!(prompt.contains("only when the customer explicitly asks"));
    }

    #[test]
    fn test_placeholder_keys_round_trip() {
        for placeholder in Placeholder::ALL {
            assert_eq!(Placeholder::from_key(placeholder.key()), Some(placeholder));
        }
    }
}
