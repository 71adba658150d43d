//! Serde-facing authoring format for service definitions.
//!
//! A service definition is a single JSON document carrying the question
//! graph plus an optional quote plan, equivalent to the admin-authored
//! `tree_config` payload this engine consumes:
//!
//! ```json
//! {
//!   "service_name": "court_markings",
//!   "start_question": "court_type",
//!   "questions": [
//!     { "id": "court_type", "question": "Which court?", "type": "choice",
//!       "choices": ["Basketball", "Tennis"],
//!       "next": { "Basketball": "full_half" } }
//!   ],
//!   "quote": { "item_template": "{court_type} Court Markings",
//!              "query_template": "{court_type} court markings",
//!              "calculation": "fixed", "unit": "per court" }
//! }
//! ```
//!
//! Absence of `next` on every question means a linear flow: the loader
//! chains each question to the next in declared order. Absence of
//! `start_question` means "first question in the list".

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::builder::{CalculationType, QuotePlan};
use crate::catalog::template_placeholders;
use crate::errors::AuthoringError;
use crate::graph::{AnswerType, Question, QuestionGraph, QuestionId};

#[derive(Debug, Error)]
pub enum GraphLoadError {
    #[error("could not read graph file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse graph document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] AuthoringError),
}

#[derive(Clone, Debug, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub start_question: Option<String>,
    pub questions: Vec<QuestionDocument>,
    #[serde(default)]
    pub quote: Option<QuotePlanDocument>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuestionDocument {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub answer_type: AnswerType,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub next: Option<BTreeMap<String, String>>,
}

fn default_required() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuotePlanDocument {
    pub item_template: String,
    pub query_template: String,
    #[serde(default)]
    pub quantity_question: Option<String>,
    #[serde(default)]
    pub calculation: CalculationType,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    "per unit".to_owned()
}

/// A validated, ready-to-serve service: the read-only graph plus the quote
/// plan used once traversal completes.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceDefinition {
    pub service_name: Option<String>,
    pub display_name: Option<String>,
    pub graph: QuestionGraph,
    pub quote_plan: Option<QuotePlan>,
}

pub fn parse_service_definition(json: &str) -> Result<ServiceDefinition, GraphLoadError> {
    let document: GraphDocument = serde_json::from_str(json)?;
    let definition = build_service_definition(document)?;
    Ok(definition)
}

pub fn load_service_definition(path: &Path) -> Result<ServiceDefinition, GraphLoadError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| GraphLoadError::ReadFile { path: path.to_path_buf(), source })?;
    parse_service_definition(&raw)
}

fn build_service_definition(document: GraphDocument) -> Result<ServiceDefinition, AuthoringError> {
    let linear = document.questions.iter().all(|q| q.next.is_none());

    let mut questions = Vec::with_capacity(document.questions.len());
    for (index, doc) in document.questions.iter().enumerate() {
        let transitions = match &doc.next {
            Some(next) => next
                .iter()
                .map(|(key, target)| (key.clone(), QuestionId(target.clone())))
                .collect(),
            None if linear => {
                // Linear flow: chain to the next declared question.
                match document.questions.get(index + 1) {
                    Some(successor) => BTreeMap::from([(
                        super::DEFAULT_TRANSITION_KEY.to_owned(),
                        QuestionId(successor.id.clone()),
                    )]),
                    None => BTreeMap::new(),
                }
            }
            None => BTreeMap::new(),
        };

        questions.push(Question {
            id: QuestionId(doc.id.clone()),
            prompt: doc.question.clone(),
            answer_type: doc.answer_type,
            required: doc.required,
            choices: doc.choices.clone(),
            transitions,
        });
    }

    let start_id = document.start_question.as_deref().map(QuestionId::from);
    let graph = QuestionGraph::new(questions, start_id)?;

    let quote_plan = match document.quote {
        Some(doc) => Some(build_quote_plan(doc, &graph)?),
        None => None,
    };

    Ok(ServiceDefinition {
        service_name: document.service_name,
        display_name: document.display_name,
        graph,
        quote_plan,
    })
}

fn build_quote_plan(
    document: QuotePlanDocument,
    graph: &QuestionGraph,
) -> Result<QuotePlan, AuthoringError> {
    let quantity_question = match document.quantity_question {
        Some(id) => {
            let id = QuestionId(id);
            let question = graph.question(&id).ok_or_else(|| {
                AuthoringError::InvalidQuotePlan(format!(
                    "quantity question `{id}` is not defined in the graph"
                ))
            })?;
            if question.answer_type != AnswerType::Number {
                return Err(AuthoringError::InvalidQuotePlan(format!(
                    "quantity question `{id}` must be of type number, found {}",
                    question.answer_type.as_str()
                )));
            }
            Some(id)
        }
        None => None,
    };

    if document.calculation != CalculationType::Fixed && quantity_question.is_none() {
        return Err(AuthoringError::InvalidQuotePlan(format!(
            "calculation `{}` requires a quantity_question",
            document.calculation.as_str()
        )));
    }

    for template in [&document.item_template, &document.query_template] {
        let placeholders = template_placeholders(template).map_err(|error| {
            AuthoringError::InvalidQuotePlan(error.to_string())
        })?;
        for placeholder in placeholders {
            let id = QuestionId(placeholder);
            if graph.question(&id).is_none() {
                return Err(AuthoringError::InvalidQuotePlan(format!(
                    "template placeholder `{{{id}}}` does not match any question"
                )));
            }
        }
    }

    Ok(QuotePlan {
        item_template: document.item_template,
        query_template: document.query_template,
        quantity_question,
        calculation: document.calculation,
        unit: document.unit,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::builder::CalculationType;
    use crate::errors::AuthoringError;
    use crate::graph::QuestionId;

    use super::{load_service_definition, parse_service_definition, GraphLoadError};

    const COURT_MARKINGS: &str = r#"{
        "service_name": "court_markings",
        "display_name": "Court Markings",
        "start_question": "court_type",
        "questions": [
            {
                "id": "court_type",
                "question": "What type of court?",
                "type": "choice",
                "choices": ["Basketball", "Pickleball", "Tennis"],
                "next": { "Basketball": "full_half" }
            },
            {
                "id": "full_half",
                "question": "Full or half court?",
                "type": "choice",
                "choices": ["Full", "Half"]
            }
        ],
        "quote": {
            "item_template": "{court_type} Court Markings",
            "query_template": "{court_type} court markings {full_half}",
            "calculation": "fixed",
            "unit": "per court"
        }
    }"#;

    #[test]
    fn parses_branching_document_with_quote_plan() {
        let definition = parse_service_definition(COURT_MARKINGS).expect("valid document");

        assert_eq!(definition.service_name.as_deref(), Some("court_markings"));
        assert_eq!(definition.graph.start().id, QuestionId::from("court_type"));
        let plan = definition.quote_plan.expect("quote plan present");
        assert_eq!(plan.calculation, CalculationType::Fixed);
        assert_eq!(plan.unit, "per court");
    }

    #[test]
    fn questions_without_next_form_a_linear_chain() {
        let json = r#"{
            "questions": [
                { "id": "area_service_type", "question": "Service?", "type": "text" },
                { "id": "total_area", "question": "Area in sqm?", "type": "number" },
                { "id": "location", "question": "Where?", "type": "text" }
            ]
        }"#;

        let definition = parse_service_definition(json).expect("linear document loads");
        let graph = &definition.graph;

        let first = graph.start();
        assert_eq!(first.next_for("anything"), Some(&QuestionId::from("total_area")));
        let second = graph.question(&QuestionId::from("total_area")).expect("second question");
        assert_eq!(second.next_for("20"), Some(&QuestionId::from("location")));
        let last = graph.question(&QuestionId::from("location")).expect("last question");
        assert!(last.is_terminal_for("Bedok"));
    }

    #[test]
    fn required_defaults_to_true() {
        let json = r#"{
            "questions": [ { "id": "q", "question": "Q?", "type": "text" } ]
        }"#;
        let definition = parse_service_definition(json).expect("document loads");
        assert!(definition.graph.start().required);
    }

    #[test]
    fn quantity_question_must_be_a_number() {
        let json = r#"{
            "questions": [ { "id": "total_area", "question": "Area?", "type": "text" } ],
            "quote": {
                "item_template": "Parquet",
                "query_template": "parquet",
                "quantity_question": "total_area",
                "calculation": "per_sqm"
            }
        }"#;

        let error = parse_service_definition(json).expect_err("text quantity rejected");
        assert!(matches!(
            error,
            GraphLoadError::Invalid(AuthoringError::InvalidQuotePlan(ref message))
                if message.contains("must be of type number")
        ));
    }

    #[test]
    fn per_unit_calculation_requires_quantity_question() {
        let json = r#"{
            "questions": [ { "id": "q", "question": "Q?", "type": "text" } ],
            "quote": {
                "item_template": "Job",
                "query_template": "job",
                "calculation": "per_sqm"
            }
        }"#;

        let error = parse_service_definition(json).expect_err("missing quantity rejected");
        assert!(matches!(
            error,
            GraphLoadError::Invalid(AuthoringError::InvalidQuotePlan(ref message))
                if message.contains("requires a quantity_question")
        ));
    }

    #[test]
    fn template_placeholders_must_reference_questions() {
        let json = r#"{
            "questions": [ { "id": "q", "question": "Q?", "type": "text" } ],
            "quote": {
                "item_template": "{typo} Job",
                "query_template": "job",
                "calculation": "fixed"
            }
        }"#;

        let error = parse_service_definition(json).expect_err("unknown placeholder rejected");
        assert!(matches!(
            error,
            GraphLoadError::Invalid(AuthoringError::InvalidQuotePlan(ref message))
                if message.contains("{typo}")
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let error = parse_service_definition("{ not json").expect_err("parse failure");
        assert!(matches!(error, GraphLoadError::Parse(_)));
    }

    #[test]
    fn loads_definition_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(COURT_MARKINGS.as_bytes()).expect("write fixture");

        let definition = load_service_definition(file.path()).expect("file loads");
        assert_eq!(definition.graph.len(), 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let error = load_service_definition(std::path::Path::new("/nonexistent/graph.json"))
            .expect_err("read failure");
        assert!(matches!(error, GraphLoadError::ReadFile { .. }));
    }
}
