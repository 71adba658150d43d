use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;
use crate::pricing::AppliedAdjustment;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("Q-{}", Uuid::new_v4()))
    }
}

/// Approval lifecycle owned by the external review workflow. The engine
/// emits quotes in `Draft` and exposes the legal transitions; it never
/// walks them itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    PendingAdmin,
    Approved,
    Rejected,
    SentToCustomer,
}

/// An itemized, fully traceable quotation. Immutable once built: review
/// edits go through [`Quote::revise`], which produces a new version linked
/// back to this one, never an in-place overwrite.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub base_price: Decimal,
    pub adjustments: Vec<AppliedAdjustment>,
    pub total_price: Decimal,
    /// De-duplicated union of entry and adjustment conditions, in order of
    /// first occurrence.
    pub conditions: Vec<String>,
    /// Every source document that contributed to the price or an applied
    /// adjustment, in consultation order.
    pub source_trace: Vec<String>,
    pub status: QuoteStatus,
    pub revision_of: Option<QuoteId>,
    pub created_at: DateTime<Utc>,
}

impl Quote {
    pub fn can_transition_to(&self, next: QuoteStatus) -> bool {
        matches!(
            (self.status, next),
            (QuoteStatus::Draft, QuoteStatus::PendingAdmin)
                | (QuoteStatus::PendingAdmin, QuoteStatus::Approved)
                | (QuoteStatus::PendingAdmin, QuoteStatus::Rejected)
                | (QuoteStatus::Approved, QuoteStatus::SentToCustomer)
        )
    }

    /// Returns a copy in the next status. By-value so existing references
    /// keep seeing the version they were built from.
    pub fn with_status(&self, next: QuoteStatus) -> Result<Quote, DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition { from: self.status, to: next });
        }
        let mut updated = self.clone();
        updated.status = next;
        Ok(updated)
    }

    /// New draft version of this quote, linked back to it. The original is
    /// untouched.
    pub fn revise(&self) -> Quote {
        let mut revision = self.clone();
        revision.id = QuoteId::generate();
        revision.status = QuoteStatus::Draft;
        revision.revision_of = Some(self.id.clone());
        revision.created_at = Utc::now();
        revision
    }
}
