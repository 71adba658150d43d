use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::catalog::{substitute_template, PriceCatalogPort, PriceEntry};
use crate::errors::{CatalogError, ConfigurationError, EngineError};
use crate::graph::QuestionId;
use crate::pricing::{self, Adjustment};
use crate::quote::{Quote, QuoteId, QuoteStatus};
use crate::session::AnswerStore;

/// How a selected unit price turns into a base price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    /// The catalog price is the base price as-is.
    #[default]
    Fixed,
    PerUnit,
    PerMeter,
    PerSqft,
    PerSqm,
}

impl CalculationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::PerUnit => "per_unit",
            Self::PerMeter => "per_meter",
            Self::PerSqft => "per_sqft",
            Self::PerSqm => "per_sqm",
        }
    }

    /// Whether the base price is `unit_price * quantity`.
    pub fn scales_by_quantity(&self) -> bool {
        !matches!(self, Self::Fixed)
    }
}

/// Authored recipe for turning a finished session into a quote: what to
/// call the line item, what to ask the catalog, and how to scale the price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuotePlan {
    pub item_template: String,
    pub query_template: String,
    pub quantity_question: Option<QuestionId>,
    pub calculation: CalculationType,
    pub unit: String,
}

/// Assembles immutable quotes from finalized answers, catalog results, and
/// the adjustment catalog. Holds only read-only configuration, so one
/// builder serves concurrent sessions.
#[derive(Clone, Debug)]
pub struct QuoteBuilder<'a> {
    plan: &'a QuotePlan,
    adjustments: &'a [Adjustment],
}

impl<'a> QuoteBuilder<'a> {
    pub fn new(plan: &'a QuotePlan, adjustments: &'a [Adjustment]) -> Self {
        Self { plan, adjustments }
    }

    /// The catalog query for a finished session, with every `{placeholder}`
    /// substituted from collected answers.
    pub fn query_text(&self, answers: &AnswerStore) -> Result<String, ConfigurationError> {
        substitute_template(&self.plan.query_template, &answers.variables())
    }

    /// Builds a quote from already-fetched catalog results.
    ///
    /// Selection follows the highest-price rule: the maximum `unit_price`
    /// wins; exact ties fall to the most recently ingested entry, then the
    /// greatest source document id, so the pick is never arbitrary.
    pub fn build(
        &self,
        answers: &AnswerStore,
        entries: &[PriceEntry],
    ) -> Result<Quote, EngineError> {
        let query = self.query_text(answers)?;
        let selected = select_entry(entries)
            .ok_or_else(|| CatalogError::NoPriceFound { query: query.clone() })?;

        let quantity = self.quantity(answers)?;
        let base_price = if self.plan.calculation.scales_by_quantity() {
            (selected.unit_price * quantity).round_dp(2)
        } else {
            selected.unit_price
        };

        let outcome = pricing::apply(base_price, answers, self.adjustments);

        // Re-walk the adjustment list for traceability fields; predicates
        // are pure, so this matches exactly what the pipeline applied.
        let matched: Vec<&Adjustment> = self
            .adjustments
            .iter()
            .filter(|adjustment| adjustment.applies_when.evaluate(answers))
            .collect();

        let mut conditions: Vec<String> = Vec::new();
        for condition in selected
            .conditions
            .iter()
            .chain(matched.iter().flat_map(|adjustment| adjustment.conditions.iter()))
        {
            if !conditions.contains(condition) {
                conditions.push(condition.clone());
            }
        }

        let mut source_trace = vec![selected.source_document_id.clone()];
        for adjustment in &matched {
            if let Some(source) = &adjustment.source_document_id {
                if !source_trace.contains(source) {
                    source_trace.push(source.clone());
                }
            }
        }

        let unit = if selected.unit.is_empty() {
            self.plan.unit.clone()
        } else {
            selected.unit.clone()
        };
        let item_name = substitute_template(&self.plan.item_template, &answers.variables())?;

        tracing::info!(
            event_name = "quote.built",
            item_name = %item_name,
            base_price = %base_price,
            total_price = %outcome.total,
            source_count = source_trace.len(),
            "quote assembled"
        );

        Ok(Quote {
            id: QuoteId::generate(),
            item_name,
            quantity,
            unit,
            base_price,
            adjustments: outcome.applied,
            total_price: outcome.total,
            conditions,
            source_trace,
            status: QuoteStatus::Draft,
            revision_of: None,
            created_at: chrono::Utc::now(),
        })
    }

    /// Substitutes the query template, performs the single catalog call,
    /// and builds. Catalog failures propagate untouched; retrying is the
    /// caller's decision.
    pub async fn build_via_port<P>(
        &self,
        answers: &AnswerStore,
        port: &P,
    ) -> Result<Quote, EngineError>
    where
        P: PriceCatalogPort,
    {
        let query = self.query_text(answers)?;
        let entries = port.query(&query).await?;
        self.build(answers, &entries)
    }

    /// Same as [`build`](Self::build) but records the outcome on the given
    /// audit sink.
    pub fn build_with_audit<S>(
        &self,
        answers: &AnswerStore,
        entries: &[PriceEntry],
        sink: &S,
        audit: &AuditContext,
    ) -> Result<Quote, EngineError>
    where
        S: AuditSink,
    {
        let result = self.build(answers, entries);
        match &result {
            Ok(quote) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "quote.built",
                        AuditCategory::Quote,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("quote_id", quote.id.0.clone())
                    .with_metadata("total_price", quote.total_price.to_string()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "quote.build_failed",
                        AuditCategory::Quote,
                        audit.actor.clone(),
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn quantity(&self, answers: &AnswerStore) -> Result<Decimal, ConfigurationError> {
        let Some(question) = &self.plan.quantity_question else {
            return Ok(Decimal::ONE);
        };

        let raw = answers.normalized(question).ok_or_else(|| {
            ConfigurationError::MissingQuantityAnswer { question: question.clone() }
        })?;
        raw.parse::<Decimal>().map_err(|_| ConfigurationError::UnparsableQuantity {
            question: question.clone(),
            given: raw.to_owned(),
        })
    }
}

/// Highest unit price wins; ties resolved by ingestion recency, then by
/// source document id. Total ordering, so selection is deterministic for
/// any input permutation.
fn select_entry(entries: &[PriceEntry]) -> Option<&PriceEntry> {
    entries.iter().max_by(|a, b| {
        a.unit_price
            .cmp(&b.unit_price)
            .then_with(|| a.ingested_at.cmp(&b.ingested_at))
            .then_with(|| a.source_document_id.cmp(&b.source_document_id))
    })
}
