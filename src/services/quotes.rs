//! Quote persistence and quote documents

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Error;
use crate::Result;

use super::{format_price, Customer, DocumentGenerator, Item, QuoteStore};

/// Sales pipeline status of a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    /// Quote sent, no answer yet
    Contacted,
    Negotiating,
    Sold,
    Lost,
}

impl QuoteStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, QuoteStatus::Sold | QuoteStatus::Lost)
    }
}

/// A persisted quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub code: String,
    pub customer: Customer,
    pub item_names: Vec<String>,
    pub total_price: u64,
    pub document_url: String,
    pub status: QuoteStatus,
    pub created_at: DateTime<Utc>,
}

impl QuoteRecord {
    /// Quote codes look like `Q-20261018-3F9A1C`.
    pub fn new_code(now: DateTime<Utc>) -> String {
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(6)
            .collect();
        format!("Q-{}-{}", now.format("%Y%m%d"), suffix.to_uppercase())
    }

    fn same_items(&self, item_names: &[String]) -> bool {
        let mut ours: Vec<String> = self.item_names.iter().map(|n| n.to_lowercase()).collect();
        let mut theirs: Vec<String> = item_names.iter().map(|n| n.to_lowercase()).collect();
        ours.sort();
        theirs.sort();
        ours == theirs
    }
}

/// Input for rendering one quote document
#[derive(Debug, Clone)]
pub struct QuoteDocument {
    pub code: String,
    pub customer: Customer,
    pub items: Vec<Item>,
    pub total_price: u64,
    pub issued_at: DateTime<Utc>,
}

/// Quote store kept in memory, optionally mirrored to a JSON file
pub struct JsonQuoteStore {
    path: Option<PathBuf>,
    quotes: Mutex<Vec<QuoteRecord>>,
    duplicate_window: Duration,
}

impl JsonQuoteStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            quotes: Mutex::new(vec![]),
            duplicate_window: Duration::minutes(10),
        }
    }

    /// Open (or start) the quote file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let quotes = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            vec![]
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            quotes: Mutex::new(quotes),
            ..Self::in_memory()
        })
    }

    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.duplicate_window = window;
        self
    }

    async fn persist(&self, quotes: &[QuoteRecord]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_string_pretty(quotes)?).await?;
        Ok(())
    }
}

#[async_trait]
impl QuoteStore for JsonQuoteStore {
    async fn recent_duplicate(&self, phone: &str, item_names: &[String]) -> Result<Option<QuoteRecord>> {
        let cutoff = Utc::now() - self.duplicate_window;
        let quotes = self.quotes.lock().await;
        Ok(quotes
            .iter()
            .rev()
            .find(|q| q.customer.phone == phone && q.created_at >= cutoff && q.same_items(item_names))
            .cloned())
    }

    async fn create(&self, record: QuoteRecord) -> Result<()> {
        let mut quotes = self.quotes.lock().await;
        debug!("Saving quote {} for {}", record.code, record.customer.phone);
        quotes.push(record);
        self.persist(&quotes).await
    }

    async fn update_status(&self, phone: &str, status: QuoteStatus) -> Result<bool> {
        let mut quotes = self.quotes.lock().await;
        let latest_open = quotes
            .iter_mut()
            .filter(|q| q.customer.phone == phone && !q.status.is_closed())
            .max_by_key(|q| q.created_at);

        let Some(quote) = latest_open else {
            return Ok(false);
        };
        quote.status = status;
        self.persist(&quotes).await?;
        Ok(true)
    }

    async fn recent_for(&self, phone: &str, limit: usize) -> Result<Vec<QuoteRecord>> {
        let quotes = self.quotes.lock().await;
        let mut mine: Vec<QuoteRecord> = quotes
            .iter()
            .filter(|q| q.customer.phone == phone)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }
}

/// Writes quotes as markdown files and hands back `file://` URLs.
pub struct FileDocumentGenerator {
    dir: PathBuf,
}

impl FileDocumentGenerator {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn render(quote: &QuoteDocument) -> String {
        let mut out = format!(
            "# Quote {}\n\nIssued: {}\n\n## Customer\n\n- Name: {}\n- Email: {}\n- Phone: {}\n\n## Items\n\n",
            quote.code,
            quote.issued_at.format("%d/%m/%Y"),
            quote.customer.name,
            quote.customer.email,
            quote.customer.phone,
        );
        for item in &quote.items {
            out.push_str(&format!("- {}: {}\n", item.name, format_price(item.price)));
        }
        out.push_str(&format!("\n**Net total: {} + VAT**\n", format_price(quote.total_price)));
        out
    }
}

#[async_trait]
impl DocumentGenerator for FileDocumentGenerator {
    async fn generate_quote(&self, quote: &QuoteDocument) -> Result<Option<String>> {
        if quote.items.is_empty() {
            return Ok(None);
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.md", quote.code));
        tokio::fs::write(&path, Self::render(quote)).await?;

        let absolute = tokio::fs::canonicalize(&path).await?;
        let url = absolute
            .to_str()
            .map(|p| format!("file://{}", p))
            .ok_or_else(|| Error::Collaborator(format!("Non UTF-8 quote path: {:?}", absolute)))?;
        Ok(Some(url))
    }
}
