//! Context builder for agent prompts.
//!
//! Gathers the per-request snapshot (bot settings and history window) and
//! assembles the opening user message: today's date, what the customer
//! already has with us (quotes or reservations), an optional inventory hint,
//! then what the customer said.

use tracing::{debug, warn};

use crate::config::BotConfiguration;
use crate::services::catalog::normalize_text;
use crate::services::{
    format_price, CatalogService, LodgingService, QuoteRecord, QuoteStore, Reservation, ReservationBook, Services,
};
use crate::Result;

use super::message::{HistoryEntry, Message};

/// Previous quotes or reservations listed for the model's memory
const MAX_PREVIOUS_QUOTES: usize = 5;
const MAX_PREVIOUS_RESERVATIONS: usize = 5;

/// Items searched, and items named, by the inventory hint
const HINT_SEARCH_LIMIT: usize = 6;
const HINT_NAMES_SHOWN: usize = 3;

/// Phrases that refer to something already on the table; no pre-search.
const FOLLOW_UP_PHRASES: &[&str] = &[
    "how much", "price", "cost", "show me", "photo", "picture", "image", "quote", "discount",
    "cuanto cuesta", "precio", "muestrame", "fotos", "imagenes", "cotizacion", "descuento",
];

/// Filler stripped from a message before it is used as a search term.
const FILLER: &[&str] = &[
    "i need", "i'm looking for", "looking for", "i want", "interested in", "something for",
    "do you have", "necesito", "busco", "quiero", "me interesa", "algo para", "tienen",
];

/// Snapshot of everything one orchestration run reads up front
#[derive(Debug, Clone)]
pub struct Context {
    pub session_id: String,
    pub config: BotConfiguration,
    pub history: Vec<HistoryEntry>,
}

impl Context {
    pub fn new(session_id: impl Into<String>, config: BotConfiguration, history: Vec<HistoryEntry>) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            history,
        }
    }

    /// Read bot settings and the last `history_limit` turns from the store.
    pub async fn load(services: &Services, session_id: &str, history_limit: usize) -> Result<Self> {
        let config = services.store.bot_config().await?;
        let history = services.store.history(session_id, history_limit).await?;
        debug!("Loaded {} history entries for {}", history.len(), session_id);
        Ok(Self::new(session_id, config, history))
    }

    /// Build messages list for LLM call with history windowing.
    pub fn build_messages(&self, system_prompt: String, current: String, history_limit: usize) -> Vec<Message> {
        let windowed_history = if self.history.len() > history_limit {
            &self.history[self.history.len() - history_limit..]
        } else {
            &self.history[..]
        };

        let mut messages = Vec::with_capacity(windowed_history.len() + 2);
        messages.push(Message::system(system_prompt));
        messages.extend(windowed_history.iter().map(HistoryEntry::to_message));
        messages.push(Message::user(current));
        messages
    }

    /// Category overview for the system prompt.
    pub async fn catalog_overview(catalog: &dyn CatalogService) -> Option<String> {
        match catalog.categories().await {
            Ok(categories) if !categories.is_empty() => {
                Some(format!("We stock these categories: {}.", categories.join(", ")))
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Could not load catalog categories: {}", e);
                None
            }
        }
    }

    /// Cabin list for the system prompt.
    pub async fn cabin_overview(lodging: &dyn LodgingService) -> Option<String> {
        match lodging.cabins().await {
            Ok(cabins) if !cabins.is_empty() => {
                let names: Vec<String> = cabins
                    .iter()
                    .map(|c| format!("{} (sleeps {})", c.name, c.capacity))
                    .collect();
                Some(format!("Our cabins: {}.", names.join(", ")))
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Could not load cabins: {}", e);
                None
            }
        }
    }

    /// The guest's most recent reservations, newest first.
    pub async fn previous_reservations(&self, book: &dyn ReservationBook) -> Option<String> {
        let recent = match book.recent_for(&self.session_id, MAX_PREVIOUS_RESERVATIONS).await {
            Ok(recent) => recent,
            Err(e) => {
                warn!("Could not load previous reservations for {}: {}", self.session_id, e);
                return None;
            }
        };
        if recent.is_empty() {
            return None;
        }

        let lines: Vec<String> = recent.iter().map(describe_reservation).collect();
        Some(format!(
            "[PREVIOUS RESERVATIONS for this guest, do not book them again unless asked:\n{}]",
            lines.join("\n")
        ))
    }

    /// The customer's most recent quotes, newest first.
    pub async fn previous_quotes(&self, quotes: &dyn QuoteStore) -> Option<String> {
        let recent = match quotes.recent_for(&self.session_id, MAX_PREVIOUS_QUOTES).await {
            Ok(recent) => recent,
            Err(e) => {
                warn!("Could not load previous quotes for {}: {}", self.session_id, e);
                return None;
            }
        };
        if recent.is_empty() {
            return None;
        }

        let lines: Vec<String> = recent.iter().map(describe_quote).collect();
        Some(format!(
            "[PREVIOUS QUOTES for this customer, do not issue them again unless asked:\n{}]",
            lines.join("\n")
        ))
    }

    /// Pre-search the catalog when a fresh conversation opens with a
    /// product enquiry, so the model cannot claim stock it does not have.
    pub async fn inventory_hint(&self, message: &str, catalog: &dyn CatalogService) -> Option<String> {
        if !self.config.features.inventory_hint || !self.history.is_empty() {
            return None;
        }

        let normalized = normalize_text(message);
        let mentions_product = self
            .config
            .product_keywords
            .iter()
            .any(|k| normalized.contains(&normalize_text(k)));
        let is_follow_up = FOLLOW_UP_PHRASES.iter().any(|p| normalized.contains(p));
        if !mentions_product || is_follow_up {
            return None;
        }

        let term = search_term(&normalized);
        let found = match catalog.search(&term, HINT_SEARCH_LIMIT).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Inventory pre-search for '{}' failed: {}", term, e);
                return None;
            }
        };
        debug!("Inventory pre-search for '{}' found {} items", term, found.len());

        if found.is_empty() {
            return Some(format!(
                "[INVENTORY: NO items in stock match '{}'. Do not claim to have them.]",
                term
            ));
        }

        let names: Vec<&str> = found.iter().take(HINT_NAMES_SHOWN).map(|i| i.name.as_str()).collect();
        Some(format!(
            "[INVENTORY: found {} item(s) for '{}': {:?}. Use this information.]",
            found.len(),
            term,
            names
        ))
    }

    /// The opening user message sent to the model.
    pub fn user_prompt(date: &str, previous: Option<&str>, hint: Option<&str>, message: &str) -> String {
        let mut parts = vec![format!("[SYSTEM: Today is {}.]", date)];
        parts.extend(previous.map(str::to_string));
        parts.extend(hint.map(str::to_string));
        parts.push(format!("[Customer says:] {}", message));
        parts.join("\n")
    }
}

fn describe_quote(quote: &QuoteRecord) -> String {
    format!(
        "- {} on {}: {} for {} ({:?})",
        quote.code,
        quote.created_at.format("%d/%m/%Y"),
        quote.item_names.join(", "),
        format_price(quote.total_price),
        quote.status
    )
}

fn describe_reservation(reservation: &Reservation) -> String {
    format!(
        "- {}: {}, {} ({:?})",
        reservation.code,
        reservation.cabin,
        reservation.stay.describe(),
        reservation.status
    )
}

fn search_term(normalized: &str) -> String {
    let mut term = format!(" {} ", normalized);
    for filler in FILLER {
        term = term.replace(filler, " ");
    }
    let term: Vec<&str> = term
        .split_whitespace()
        .filter(|w| !matches!(*w, "a" | "an" | "the" | "un" | "una" | "el" | "la"))
        .collect();
    term.join(" ").trim_matches(|c: char| c.is_ascii_punctuation()).to_string()
}
