//! Catalog tools - search and item details

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::Error;
use crate::services::CatalogService;
use crate::Result;

use super::{ArgSpec, SessionContext, Tool, ToolArgs, ToolOutput};

/// Max items returned by one search
const SEARCH_LIMIT: usize = 6;

/// Max images delivered per item
const MAX_IMAGES_PER_ITEM: usize = 3;

/// Search the dealer's inventory
pub struct SearchCatalogTool {
    catalog: Arc<dyn CatalogService>,
}

impl SearchCatalogTool {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }
}

const SEARCH_ARGS: &[ArgSpec] = &[ArgSpec::text(
    "query",
    "What the customer is looking for, e.g. 'disc harrow' or 'sprayer 2000 l'",
)
.aliases(&["consulta"])];

#[async_trait]
impl Tool for SearchCatalogTool {
    fn name(&self) -> &str {
        "search_catalog"
    }

    fn description(&self) -> &str {
        "Search the machinery catalog. Returns matching items with reference price, \
         description and spec sheet. Always call this before mentioning any item."
    }

    fn args(&self) -> &[ArgSpec] {
        SEARCH_ARGS
    }

    async fn execute(&self, args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
        let query = args.text("query").unwrap_or_default();
        let items = self.catalog.search(query, SEARCH_LIMIT).await?;

        if items.is_empty() {
            return Err(Error::Tool(format!("no items matched '{}'", query)));
        }

        let items: Vec<_> = items
            .iter()
            .map(|item| {
                json!({
                    "name": item.name,
                    "price": item.price,
                    "description": item.description,
                    "spec_sheet_url": item.spec_sheet_url,
                })
            })
            .collect();

        Ok(ToolOutput::new(json!({ "items": items })))
    }
}

/// Show descriptions and photos of named items
pub struct GetItemDetailsTool {
    catalog: Arc<dyn CatalogService>,
}

impl GetItemDetailsTool {
    pub fn new(catalog: Arc<dyn CatalogService>) -> Self {
        Self { catalog }
    }
}

const DETAILS_ARGS: &[ArgSpec] = &[ArgSpec::list(
    "item_names",
    "Exact item names as returned by search_catalog",
)
.aliases(&["name", "item_name"])];

#[async_trait]
impl Tool for GetItemDetailsTool {
    fn name(&self) -> &str {
        "get_item_details"
    }

    fn description(&self) -> &str {
        "Get descriptions and photos for one or more items. Photos are sent to the customer automatically."
    }

    fn args(&self) -> &[ArgSpec] {
        DETAILS_ARGS
    }

    async fn execute(&self, args: ToolArgs, _session: &SessionContext) -> Result<ToolOutput> {
        let mut found = Vec::new();
        let mut images = Vec::new();

        for name in args.list("item_names") {
            let Some(item) = self.catalog.get_by_name(name).await? else {
                continue;
            };
            let shown: Vec<String> = item.image_urls.iter().take(MAX_IMAGES_PER_ITEM).cloned().collect();
            found.push(json!({
                "name": item.name,
                "description": item.description,
                "spec_sheet_url": item.spec_sheet_url,
                "images_sent": shown.len(),
            }));
            images.extend(shown);
        }

        if found.is_empty() {
            return Err(Error::Tool("no photos or matching item found".to_string()));
        }

        Ok(ToolOutput::new(json!({ "items": found })).with_images(images))
    }
}
