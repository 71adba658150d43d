use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::ConfigurationError;
use crate::graph::QuestionId;
use crate::session::AnswerStore;

/// Pure boolean predicate over the finalized answers of one session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    Always,
    AnswerEquals { question: String, value: String },
    AnswerTrue { question: String },
    All { all: Vec<Predicate> },
    Any { any: Vec<Predicate> },
}

impl Predicate {
    pub fn evaluate(&self, answers: &AnswerStore) -> bool {
        match self {
            Self::Always => true,
            Self::AnswerEquals { question, value } => {
                answers.normalized(&QuestionId(question.clone())) == Some(value.as_str())
            }
            Self::AnswerTrue { question } => {
                answers.normalized(&QuestionId(question.clone())) == Some("true")
            }
            Self::All { all } => all.iter().all(|predicate| predicate.evaluate(answers)),
            Self::Any { any } => any.iter().any(|predicate| predicate.evaluate(answers)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustmentKind {
    FixedAmount,
    /// Percentage of the base price. Non-compounding percentages are
    /// computed against the original base; compounding ones against the
    /// running total at the time they apply.
    PercentageOfBase {
        compounding: bool,
    },
}

/// One conditional, ordered price modifier. The declared order of a list of
/// adjustments is significant and preserved for reproducibility.
#[derive(Clone, Debug, PartialEq)]
pub struct Adjustment {
    pub description: String,
    pub kind: AdjustmentKind,
    pub value: Decimal,
    pub applies_when: Predicate,
    pub conditions: Vec<String>,
    pub source_document_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum AdjustmentLoadError {
    #[error("could not read adjustments file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse adjustments document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

#[derive(Clone, Debug, Deserialize)]
struct AdjustmentDocument {
    description: String,
    kind: String,
    value: Decimal,
    #[serde(default = "default_applies_when")]
    applies_when: Predicate,
    #[serde(default)]
    conditions: Vec<String>,
    #[serde(default)]
    source_document_id: Option<String>,
}

fn default_applies_when() -> Predicate {
    Predicate::Always
}

/// Parses an authored adjustment list (a JSON array, in declared order).
/// An unrecognized `kind` fails the whole load; a silently skipped
/// adjustment would corrupt every quote after it.
pub fn parse_adjustments(json: &str) -> Result<Vec<Adjustment>, AdjustmentLoadError> {
    let documents: Vec<AdjustmentDocument> = serde_json::from_str(json)?;
    documents
        .into_iter()
        .map(|document| {
            let kind = parse_kind(&document.kind)?;
            Ok(Adjustment {
                description: document.description,
                kind,
                value: document.value,
                applies_when: document.applies_when,
                conditions: document.conditions,
                source_document_id: document.source_document_id,
            })
        })
        .collect()
}

pub fn load_adjustments(path: &Path) -> Result<Vec<Adjustment>, AdjustmentLoadError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| AdjustmentLoadError::ReadFile { path: path.to_path_buf(), source })?;
    parse_adjustments(&raw)
}

fn parse_kind(raw: &str) -> Result<AdjustmentKind, ConfigurationError> {
    match raw {
        "fixed_amount" => Ok(AdjustmentKind::FixedAmount),
        "percentage_of_base" => Ok(AdjustmentKind::PercentageOfBase { compounding: false }),
        "compounding_percentage" => Ok(AdjustmentKind::PercentageOfBase { compounding: true }),
        other => Err(ConfigurationError::UnknownAdjustmentKind(other.to_owned())),
    }
}
