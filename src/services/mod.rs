//! External collaborators of the orchestrator.
//!
//! The agent only talks to the outside world through the traits below:
//! - [`ConversationStore`] — history snapshots and per-request bot settings
//! - [`CatalogService`] — inventory lookups
//! - [`DocumentGenerator`] — quote documents
//! - [`QuoteStore`] — quote persistence and negotiation status
//! - [`MeetingScheduler`] — meeting bookings
//! - [`LodgingService`] — cabins, nightly prices and availability
//! - [`ReservationBook`] — cabin pre-reservations
//!
//! File-backed implementations live next to each trait so the CLI works
//! against a plain workspace directory; in-memory variants back the tests.

pub mod catalog;
pub mod conversation;
pub mod lodging;
pub mod meetings;
pub mod quotes;
pub mod reservations;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agent::HistoryEntry;
use crate::config::BotConfiguration;
use crate::Result;

pub use catalog::JsonCatalog;
pub use conversation::{FileConversationStore, InMemoryConversationStore};
pub use lodging::{Cabin, CabinAvailability, Extra, JsonLodging, Stay};
pub use meetings::{JsonMeetingBook, MeetingRequest, MeetingType};
pub use quotes::{FileDocumentGenerator, JsonQuoteStore, QuoteDocument, QuoteRecord, QuoteStatus};
pub use reservations::{Booking, JsonReservationBook, Reservation, ReservationRequest, ReservationStatus};

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,

    /// Reference price in whole currency units
    #[serde(default)]
    pub price: u64,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub image_urls: Vec<String>,

    #[serde(default)]
    pub spec_sheet_url: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Item {
    pub fn new(name: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            price,
            description: String::new(),
            image_urls: vec![],
            spec_sheet_url: None,
            category: None,
            tags: vec![],
            active: true,
        }
    }
}

/// Contact details collected for a quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Conversation history and bot settings
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// The most recent `limit` turns of a session, oldest first.
    async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;

    async fn bot_config(&self) -> Result<BotConfiguration>;

    /// Record a turn. Called by channels, never by the turn loop.
    async fn append(&self, session_id: &str, entry: HistoryEntry) -> Result<()>;
}

/// Inventory lookups
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Item>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<Item>>;

    async fn categories(&self) -> Result<Vec<String>>;
}

/// Renders quote documents and returns where they can be fetched
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn generate_quote(&self, quote: &QuoteDocument) -> Result<Option<String>>;
}

/// Quote persistence.
///
/// `recent_duplicate` followed by `create` is not atomic: two concurrent
/// requests for the same session can both pass the check.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn recent_duplicate(&self, phone: &str, item_names: &[String]) -> Result<Option<QuoteRecord>>;

    async fn create(&self, record: QuoteRecord) -> Result<()>;

    /// Update the customer's latest open quote. `false` when there is none.
    async fn update_status(&self, phone: &str, status: QuoteStatus) -> Result<bool>;

    /// Newest first.
    async fn recent_for(&self, phone: &str, limit: usize) -> Result<Vec<QuoteRecord>>;
}

/// Books meetings with the sales team
#[async_trait]
pub trait MeetingScheduler: Send + Sync {
    async fn schedule(&self, request: &MeetingRequest) -> Result<bool>;
}

/// Cabin inventory and pricing
#[async_trait]
pub trait LodgingService: Send + Sync {
    async fn cabins(&self) -> Result<Vec<Cabin>>;

    /// Best cabin for a free-text reference ("the dome", "laurel").
    async fn find_cabin(&self, query: &str) -> Result<Option<Cabin>>;

    async fn availability(&self, stay: &Stay) -> Result<Vec<CabinAvailability>>;
}

/// Pre-reservation persistence.
///
/// `reserve` applies the recent-duplicate window itself. Processes sharing
/// one backing file can still race past it.
#[async_trait]
pub trait ReservationBook: Send + Sync {
    async fn reserve(&self, request: ReservationRequest) -> Result<Booking>;

    /// Newest first.
    async fn recent_for(&self, phone: &str, limit: usize) -> Result<Vec<Reservation>>;
}

/// Every collaborator the agent and its tools need
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn ConversationStore>,
    pub catalog: Arc<dyn CatalogService>,
    pub quotes: Arc<dyn QuoteStore>,
    pub documents: Arc<dyn DocumentGenerator>,
    pub meetings: Arc<dyn MeetingScheduler>,
    pub lodging: Arc<dyn LodgingService>,
    pub reservations: Arc<dyn ReservationBook>,
}

impl Services {
    /// Wire the file-backed collaborators over a workspace directory.
    pub fn from_workspace(workspace: &Path) -> Result<Self> {
        Ok(Self {
            store: Arc::new(FileConversationStore::new(workspace)),
            catalog: Arc::new(JsonCatalog::load(&workspace.join("catalog.json"))?),
            quotes: Arc::new(JsonQuoteStore::open(&workspace.join("quotes.json"))?),
            documents: Arc::new(FileDocumentGenerator::new(workspace.join("quotes"))),
            meetings: Arc::new(JsonMeetingBook::new(workspace.join("meetings.jsonl"))),
            lodging: Arc::new(JsonLodging::load(&workspace.join("cabins.json"))?),
            reservations: Arc::new(JsonReservationBook::open(&workspace.join("reservations.json"))?),
        })
    }
}

/// Format a price with dot thousands separators, e.g. `$1.250.000`.
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    format!("${}", out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "$0");
        assert_eq!(format_price(950), "$950");
        assert_eq!(format_price(1_250_000), "$1.250.000");
        assert_eq!(format_price(12_500), "$12.500");
    }

    #[test]
    fn test_item_defaults_from_partial_json() {
        let item: Item = serde_json::from_str(r#"{"name": "Disc Harrow 24"}"#).unwrap();
        assert_eq!(item.price, 0);
        assert!(item.active);
        assert!(item.image_urls.is_empty());
    }
}
