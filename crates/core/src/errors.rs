use thiserror::Error;

use crate::graph::QuestionId;
use crate::quote::QuoteStatus;

/// Structural defects in an authored question graph. Detected eagerly at
/// load time; a graph that fails here must never reach a session.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthoringError {
    #[error("graph declares no questions")]
    EmptyGraph,
    #[error("duplicate question id `{0}`")]
    DuplicateQuestionId(QuestionId),
    #[error("start question `{0}` is not defined in the graph")]
    UnknownStartQuestion(QuestionId),
    #[error("question `{question}` routes answer `{answer_key}` to missing question `{target}`")]
    DanglingTransition { question: QuestionId, answer_key: String, target: QuestionId },
    #[error("choice question `{0}` declares no choices")]
    EmptyChoices(QuestionId),
    #[error(
        "question `{question}` declares transition key `{answer_key}` which is not one of its choices"
    )]
    TransitionKeyNotAChoice { question: QuestionId, answer_key: String },
    #[error(
        "boolean question `{question}` transition key `{answer_key}` must be `true`, `false`, or `default`"
    )]
    InvalidBooleanTransitionKey { question: QuestionId, answer_key: String },
    #[error(
        "question `{question}` of type {answer_type} may only declare a `default` transition, found `{answer_key}`"
    )]
    NonDefaultTransitionKey { question: QuestionId, answer_type: String, answer_key: String },
    #[error("question `{0}` is unreachable from the start question")]
    UnreachableQuestion(QuestionId),
    #[error("invalid quote plan: {0}")]
    InvalidQuotePlan(String),
}

/// Bad answer for the current question. Recoverable: the caller re-prompts
/// the same question and the answer store is left untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("question `{question}` requires an answer")]
    MissingRequiredAnswer { question: QuestionId },
    #[error("answer `{given}` is not one of the choices for question `{question}`")]
    InvalidChoice { question: QuestionId, given: String },
    #[error("answer `{given}` for question `{question}` is not a number")]
    UnparsableNumber { question: QuestionId, given: String },
    #[error("answer `{given}` for question `{question}` is not a yes/no value")]
    UnparsableBoolean { question: QuestionId, given: String },
    #[error("question `{question}` routes to `{target}` which is not in the graph")]
    UnknownQuestionId { question: QuestionId, target: QuestionId },
    #[error("transition revisits question `{question}` already answered in this session")]
    QuestionRevisited { question: QuestionId },
    #[error("traversal is already complete; no further answers are accepted")]
    SessionComplete,
}

/// Failures talking to, or getting nothing useful out of, the price catalog.
/// Never recovered by inventing a price.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("no catalog entry matched the pricing query `{query}`")]
    NoPriceFound { query: String },
    #[error("price catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    /// Customer-safe phrasing. The numeric details stay in logs; the end
    /// user only ever learns that the request could not be priced.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoPriceFound { .. } => {
                "We are unable to price this request from our records. A team member will follow up."
            }
            Self::Unavailable(_) => {
                "Pricing is temporarily unavailable. Please try again shortly."
            }
        }
    }
}

/// Broken operator-supplied configuration (adjustment catalogs, templates).
/// Fatal: surfaced immediately, never silently skipped.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unrecognized adjustment kind `{0}`")]
    UnknownAdjustmentKind(String),
    #[error("template references `{{{placeholder}}}` but no answer was collected for it")]
    UnresolvedPlaceholder { placeholder: String },
    #[error("unterminated `{{` placeholder in template `{template}`")]
    UnterminatedPlaceholder { template: String },
    #[error("quantity question `{question}` was not answered in this session")]
    MissingQuantityAnswer { question: QuestionId },
    #[error("quantity answer `{given}` for question `{question}` is not a number")]
    UnparsableQuantity { question: QuestionId, given: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid quote status transition from {from:?} to {to:?}")]
    InvalidStatusTransition { from: QuoteStatus, to: QuoteStatus },
}

/// Umbrella for callers that drive a whole session end to end.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl EngineError {
    /// Whether the caller can re-prompt and continue the same session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Catalog(_))
    }
}
