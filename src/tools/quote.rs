//! Quote tools - issue quotes and track the negotiation

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::agent::Document;
use crate::error::Error;
use crate::services::{
    CatalogService, Customer, DocumentGenerator, Item, QuoteDocument, QuoteRecord, QuoteStatus, QuoteStore,
};
use crate::Result;

use super::{ArgSpec, SessionContext, Tool, ToolArgs, ToolOutput};

/// Generate a quote document and register it in the sales pipeline
pub struct CreateQuoteTool {
    catalog: Arc<dyn CatalogService>,
    documents: Arc<dyn DocumentGenerator>,
    quotes: Arc<dyn QuoteStore>,
}

impl CreateQuoteTool {
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        documents: Arc<dyn DocumentGenerator>,
        quotes: Arc<dyn QuoteStore>,
    ) -> Self {
        Self {
            catalog,
            documents,
            quotes,
        }
    }
}

const QUOTE_ARGS: &[ArgSpec] = &[
    ArgSpec::list("item_names", "Exact item names to quote").aliases(&["item_name"]),
    ArgSpec::text("customer_name", "Customer full name"),
    ArgSpec::text("customer_email", "Customer email"),
    ArgSpec::text("customer_phone", "Customer phone number"),
];

#[async_trait]
impl Tool for CreateQuoteTool {
    fn name(&self) -> &str {
        "create_quote"
    }

    fn description(&self) -> &str {
        "Create a formal quote document for one or more items. Only call once the customer \
         has confirmed the items and given name, email and phone."
    }

    fn args(&self) -> &[ArgSpec] {
        QUOTE_ARGS
    }

    async fn execute(&self, args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
        let mut items: Vec<Item> = Vec::new();
        for name in args.list("item_names") {
            if let Some(item) = self.catalog.get_by_name(name).await? {
                if !items.iter().any(|i| i.name == item.name) {
                    items.push(item);
                }
            }
        }
        if items.is_empty() {
            return Err(Error::Tool("none of the requested items were found".to_string()));
        }

        let customer = Customer {
            name: args.text("customer_name").unwrap_or_default().to_string(),
            email: args.text("customer_email").unwrap_or_default().to_string(),
            phone: args.text("customer_phone").unwrap_or_default().to_string(),
        };
        let item_names: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
        let total_price: u64 = items.iter().map(|i| i.price).sum();

        // Check-then-create is not atomic; see QuoteStore
        if let Some(existing) = self.quotes.recent_duplicate(&customer.phone, &item_names).await? {
            info!("Reusing recent quote {} for {}", existing.code, customer.phone);
            let document = Document::from_url(existing.document_url.clone());
            return Ok(ToolOutput::new(json!({
                "code": existing.code,
                "document_url": existing.document_url,
                "items": existing.item_names,
                "total_price": existing.total_price,
                "already_sent": true,
            }))
            .with_document(document));
        }

        let now = Utc::now();
        let quote = QuoteDocument {
            code: QuoteRecord::new_code(now),
            customer: customer.clone(),
            items,
            total_price,
            issued_at: now,
        };

        let Some(url) = self.documents.generate_quote(&quote).await? else {
            return Err(Error::Tool("the quote document could not be generated".to_string()));
        };

        self.quotes
            .create(QuoteRecord {
                code: quote.code.clone(),
                customer,
                item_names: item_names.clone(),
                total_price,
                document_url: url.clone(),
                status: QuoteStatus::Contacted,
                created_at: now,
            })
            .await?;

        info!("Created quote {} ({} items)", quote.code, item_names.len());

        Ok(ToolOutput::new(json!({
            "code": quote.code,
            "document_url": url,
            "items": item_names,
            "total_price": total_price,
        }))
        .with_document(Document::from_url(url)))
    }
}

/// Where the customer stands after receiving a quote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Negotiating,
    Sold,
    Lost,
}

impl NegotiationState {
    /// Canonical names plus the legacy Spanish ones.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "NEGOTIATING" | "NEGOCIANDO" => Some(NegotiationState::Negotiating),
            "SOLD" | "VENDIDA" => Some(NegotiationState::Sold),
            "LOST" | "PERDIDA" => Some(NegotiationState::Lost),
            _ => None,
        }
    }

    pub fn status(&self) -> QuoteStatus {
        match self {
            NegotiationState::Negotiating => QuoteStatus::Negotiating,
            NegotiationState::Sold => QuoteStatus::Sold,
            NegotiationState::Lost => QuoteStatus::Lost,
        }
    }

    /// What the customer is told once the status is recorded
    pub fn customer_message(&self) -> &'static str {
        match self {
            NegotiationState::Negotiating => "Great, I'll apply the special discount so we can move forward. 🤝",
            NegotiationState::Sold => "Excellent decision! 🎉 Welcome to the family.",
            NegotiationState::Lost => "Understood. Thank you for requesting a quote with us. 🙏",
        }
    }
}

/// Move the customer's latest open quote along the pipeline
pub struct UpdateNegotiationStatusTool {
    quotes: Arc<dyn QuoteStore>,
}

impl UpdateNegotiationStatusTool {
    pub fn new(quotes: Arc<dyn QuoteStore>) -> Self {
        Self { quotes }
    }
}

const STATUS_ARGS: &[ArgSpec] = &[
    ArgSpec::text("customer_phone", "Customer phone; defaults to the current customer").optional(),
    ArgSpec::choice(
        "new_state",
        &["NEGOTIATING", "SOLD", "LOST"],
        "NEGOTIATING when a discount is requested, SOLD when the customer accepts, LOST when they decline",
    )
    .aliases(&["nuevo_estado"]),
];

#[async_trait]
impl Tool for UpdateNegotiationStatusTool {
    fn name(&self) -> &str {
        "update_negotiation_status"
    }

    fn description(&self) -> &str {
        "Record how the negotiation of the customer's latest quote is going."
    }

    fn args(&self) -> &[ArgSpec] {
        STATUS_ARGS
    }

    async fn execute(&self, args: ToolArgs, session: &SessionContext) -> Result<ToolOutput> {
        let raw_state = args.text("new_state").unwrap_or_default();
        let state = NegotiationState::parse(raw_state)
            .ok_or_else(|| Error::Tool(format!("unknown negotiation state '{}'", raw_state)))?;
        let phone = args.text("customer_phone").unwrap_or(&session.session_id);

        if !self.quotes.update_status(phone, state.status()).await? {
            return Err(Error::Tool("no active quote found to update".to_string()));
        }

        info!("Quote for {} moved to {:?}", phone, state.status());
        Ok(ToolOutput::new(json!({ "message": state.customer_message() })))
    }
}
