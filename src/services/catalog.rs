//! JSON-backed catalog with accent-insensitive, synonym-aware search

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::Result;

use super::{CatalogService, Item};

/// Query words mapped to the term the catalog actually uses.
const SYNONYMS: &[(&str, &str)] = &[
    ("fertilizer", "spreader"),
    ("fertilizador", "spreader"),
    ("fumigator", "sprayer"),
    ("atomizer", "sprayer"),
    ("mister", "sprayer"),
    ("nebulizador", "sprayer"),
    ("rastra", "harrow"),
    ("grada", "harrow"),
    ("arado", "plow"),
    ("plough", "plow"),
    ("sembradora", "seeder"),
    ("carro", "trailer"),
    ("triturador", "shredder"),
];

/// Queries that ask for the whole catalog.
const GENERIC_KEYWORDS: &[&str] = &[
    "all", "everything", "catalog", "catalogue", "available", "list",
    "todas", "todo", "catalogo", "disponibles",
];

/// Catalog loaded once from a JSON array of items
pub struct JsonCatalog {
    items: Vec<Item>,
}

impl JsonCatalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Load `catalog.json`. A missing file yields an empty catalog.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("No catalog at {:?}; every search will come back empty", path);
            return Ok(Self::new(vec![]));
        }
        let content = std::fs::read_to_string(path)?;
        let items: Vec<Item> = serde_json::from_str(&content)?;
        debug!("Loaded {} catalog items from {:?}", items.len(), path);
        Ok(Self::new(items))
    }

    fn active(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.active)
    }

    fn score(item: &Item, terms: &HashSet<String>, words: &[String]) -> u32 {
        let name = normalize_text(&item.name);
        let category = item.category.as_deref().map(normalize_text).unwrap_or_default();
        let tags: Vec<String> = item.tags.iter().map(|t| normalize_text(t)).collect();

        let mut score = 0;
        for term in terms {
            if name.contains(term.as_str()) {
                score += 3;
            }
            if !category.is_empty() && category.contains(term.as_str()) {
                score += 2;
            }
            if tags.iter().any(|t| t.contains(term.as_str())) {
                score += 1;
            }
        }
        // Partial credit for individual words on multi-word queries
        if score == 0 {
            score += words.iter().filter(|w| name.contains(w.as_str())).count() as u32;
        }
        score
    }
}

#[async_trait]
impl CatalogService for JsonCatalog {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Item>> {
        let query = normalize_text(query);

        let is_generic = query.chars().count() < 3
            || GENERIC_KEYWORDS.iter().any(|k| query.split_whitespace().any(|w| w == *k));
        if is_generic {
            return Ok(self.active().take(limit).cloned().collect());
        }

        let words: Vec<String> = query
            .split_whitespace()
            .filter(|w| w.chars().count() >= 3)
            .map(str::to_string)
            .collect();

        let mut terms: HashSet<String> = HashSet::from([query.clone()]);
        for word in &words {
            if let Some((_, target)) = SYNONYMS.iter().find(|(from, _)| from == word) {
                terms.insert(target.to_string());
            }
        }

        let mut scored: Vec<(u32, &Item)> = self
            .active()
            .map(|item| (Self::score(item, &terms, &words), item))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored.into_iter().take(limit).map(|(_, item)| item.clone()).collect())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Item>> {
        let wanted = normalize_text(name);
        if wanted.is_empty() {
            return Ok(None);
        }

        if let Some(item) = self.active().find(|i| normalize_text(&i.name) == wanted) {
            return Ok(Some(item.clone()));
        }
        if let Some(item) = self.active().find(|i| normalize_text(&i.name).contains(&wanted)) {
            return Ok(Some(item.clone()));
        }
        Ok(self.search(name, 1).await?.into_iter().next())
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .active()
            .filter_map(|i| i.category.clone())
            .filter(|c| seen.insert(c.clone()))
            .collect())
    }
}

/// Lowercase, trim and strip Latin diacritics.
pub fn normalize_text(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}
