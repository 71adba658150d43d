use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{CatalogError, ConfigurationError};

/// One candidate price fact from the external catalog. Consumed, never
/// owned: this engine only reads what retrieval hands back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub item_name: String,
    pub unit_price: Decimal,
    pub unit: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    pub source_document_id: String,
    /// When the source document entered the catalog. Breaks exact
    /// unit-price ties: the most recently ingested entry wins.
    pub ingested_at: DateTime<Utc>,
}

/// The retrieval seam. One call per completed traversal; failures and
/// timeouts come back as [`CatalogError::Unavailable`] and retry policy
/// stays with the caller.
#[async_trait]
pub trait PriceCatalogPort: Send + Sync {
    async fn query(&self, text: &str) -> Result<Vec<PriceEntry>, CatalogError>;
}

/// Substitutes `{question_id}` placeholders with collected answers. An
/// unresolved placeholder is a configuration fault; it is never replaced
/// with an empty string or a guess.
pub fn substitute_template(
    template: &str,
    variables: &BTreeMap<String, String>,
) -> Result<String, ConfigurationError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            output.push(ch);
            continue;
        }

        let mut placeholder = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(next) => placeholder.push(next),
                None => {
                    return Err(ConfigurationError::UnterminatedPlaceholder {
                        template: template.to_owned(),
                    });
                }
            }
        }

        match variables.get(&placeholder) {
            Some(value) => output.push_str(value),
            None => return Err(ConfigurationError::UnresolvedPlaceholder { placeholder }),
        }
    }

    Ok(output)
}

/// Lists the `{placeholder}` names a template references, for eager
/// validation against the question graph.
pub fn template_placeholders(template: &str) -> Result<Vec<String>, ConfigurationError> {
    let mut placeholders = Vec::new();
    let mut chars = template.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            continue;
        }
        let mut placeholder = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(next) => placeholder.push(next),
                None => {
                    return Err(ConfigurationError::UnterminatedPlaceholder {
                        template: template.to_owned(),
                    });
                }
            }
        }
        placeholders.push(placeholder);
    }

    Ok(placeholders)
}

/// In-process catalog double with naive token-overlap matching. Stands in
/// for the real retrieval service in tests and the CLI; relevance quality
/// is explicitly not this crate's problem.
#[derive(Clone, Debug)]
pub struct InMemoryCatalog {
    entries: Vec<PriceEntry>,
    search_limit: usize,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<PriceEntry>) -> Self {
        Self { entries, search_limit: 10 }
    }

    pub fn with_search_limit(mut self, search_limit: usize) -> Self {
        self.search_limit = search_limit.max(1);
        self
    }

    fn overlap(query_tokens: &[String], item_name: &str) -> usize {
        item_name
            .to_lowercase()
            .split_whitespace()
            .filter(|token| query_tokens.iter().any(|query_token| query_token == token))
            .count()
    }
}

#[async_trait]
impl PriceCatalogPort for InMemoryCatalog {
    async fn query(&self, text: &str) -> Result<Vec<PriceEntry>, CatalogError> {
        let query_tokens: Vec<String> =
            text.to_lowercase().split_whitespace().map(str::to_owned).collect();

        let mut scored: Vec<(usize, &PriceEntry)> = self
            .entries
            .iter()
            .map(|entry| (Self::overlap(&query_tokens, &entry.item_name), entry))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Deterministic ordering: overlap desc, then source id.
        scored.sort_by(|(score_a, entry_a), (score_b, entry_b)| {
            score_b
                .cmp(score_a)
                .then_with(|| entry_a.source_document_id.cmp(&entry_b.source_document_id))
        });

        Ok(scored.into_iter().take(self.search_limit).map(|(_, entry)| entry.clone()).collect())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::PriceEntry;

    pub fn entry(item_name: &str, unit_price: Decimal, source_document_id: &str) -> PriceEntry {
        PriceEntry {
            item_name: item_name.to_owned(),
            unit_price,
            unit: "per sqm".to_owned(),
            conditions: Vec::new(),
            source_document_id: source_document_id.to_owned(),
            ingested_at: Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
        }
    }
}
