use rust_decimal::Decimal;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::errors::ValidationError;
use crate::graph::{AnswerType, Question, QuestionGraph};
use crate::session::{AnswerRecord, AnswerStore};

/// Where a session currently stands. These are the only two states; all
/// other session knowledge lives in the answer store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraversalState<'g> {
    AwaitingAnswer(&'g Question),
    Done,
}

impl<'g> TraversalState<'g> {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn question(&self) -> Option<&'g Question> {
        match self {
            Self::AwaitingAnswer(question) => Some(question),
            Self::Done => None,
        }
    }
}

/// Pure traversal over a read-only graph. The engine holds no session state;
/// each call derives the current position from the answer store alone, so a
/// single engine serves any number of concurrent sessions.
#[derive(Clone, Copy, Debug)]
pub struct TraversalEngine<'g> {
    graph: &'g QuestionGraph,
}

impl<'g> TraversalEngine<'g> {
    pub fn new(graph: &'g QuestionGraph) -> Self {
        Self { graph }
    }

    /// Replays the store against the graph to find the question awaiting an
    /// answer, or `Done` when the last answer had no outgoing transition.
    pub fn current_question(
        &self,
        store: &AnswerStore,
    ) -> Result<TraversalState<'g>, ValidationError> {
        let Some(last) = store.last() else {
            return Ok(TraversalState::AwaitingAnswer(self.graph.start()));
        };

        let question = self.graph.question(&last.question_id).ok_or_else(|| {
            ValidationError::UnknownQuestionId {
                question: last.question_id.clone(),
                target: last.question_id.clone(),
            }
        })?;

        match question.next_for(&last.normalized_answer) {
            None => Ok(TraversalState::Done),
            Some(target) => match self.graph.question(target) {
                Some(next) => Ok(TraversalState::AwaitingAnswer(next)),
                // Backstop for graphs built without eager validation.
                None => Err(ValidationError::UnknownQuestionId {
                    question: question.id.clone(),
                    target: target.clone(),
                }),
            },
        }
    }

    pub fn is_complete(&self, store: &AnswerStore) -> bool {
        matches!(self.current_question(store), Ok(TraversalState::Done))
    }

    /// Validates and appends one answer, returning the extended store. On
    /// any error the original store is handed back unchanged so the caller
    /// can re-prompt the same question.
    pub fn submit_answer(
        &self,
        store: AnswerStore,
        raw_answer: &str,
    ) -> Result<AnswerStore, (AnswerStore, ValidationError)> {
        let question = match self.current_question(&store) {
            Ok(TraversalState::AwaitingAnswer(question)) => question,
            Ok(TraversalState::Done) => return Err((store, ValidationError::SessionComplete)),
            Err(error) => return Err((store, error)),
        };

        let normalized = match normalize_answer(question, raw_answer) {
            Ok(normalized) => normalized,
            Err(error) => return Err((store, error)),
        };

        // A transition back onto an already-answered question is an
        // authoring defect, not a loop to follow. The question being
        // answered right now counts as answered, so a self-loop is caught
        // before its record lands in the store.
        if let Some(target) = question.next_for(&normalized) {
            if target == &question.id || store.contains(target) {
                return Err((
                    store,
                    ValidationError::QuestionRevisited { question: target.clone() },
                ));
            }
        }

        tracing::debug!(
            event_name = "traversal.answer_accepted",
            question_id = %question.id,
            normalized = %normalized,
            "answer accepted"
        );

        let mut next_store = store;
        next_store.push(AnswerRecord {
            question_id: question.id.clone(),
            raw_answer: raw_answer.to_owned(),
            normalized_answer: normalized,
            answered_at: chrono::Utc::now(),
        });
        Ok(next_store)
    }

    /// Same as [`submit_answer`](Self::submit_answer) but records the
    /// accept/reject outcome on the given audit sink.
    pub fn submit_answer_with_audit<S>(
        &self,
        store: AnswerStore,
        raw_answer: &str,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<AnswerStore, (AnswerStore, ValidationError)>
    where
        S: AuditSink,
    {
        let question_id = self
            .current_question(&store)
            .ok()
            .and_then(|state| state.question().map(|question| question.id.clone()));

        let result = self.submit_answer(store, raw_answer);
        match &result {
            Ok(next_store) => {
                let answered = next_store.last().map(|record| record.question_id.clone());
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "traversal.answer_accepted",
                        AuditCategory::Traversal,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata(
                        "question_id",
                        answered.map(|id| id.0).unwrap_or_default(),
                    )
                    .with_metadata("answers_collected", next_store.len().to_string()),
                );
            }
            Err((_, error)) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.correlation_id.clone(),
                        "traversal.answer_rejected",
                        AuditCategory::Traversal,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata(
                        "question_id",
                        question_id.map(|id| id.0).unwrap_or_default(),
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

/// Exact, deterministic answer normalization. No fuzzy matching, no typo
/// repair: a near-miss on a choice is rejected, not auto-corrected.
fn normalize_answer(question: &Question, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        if question.required {
            return Err(ValidationError::MissingRequiredAnswer {
                question: question.id.clone(),
            });
        }
        return Ok(String::new());
    }

    match question.answer_type {
        AnswerType::Text => Ok(trimmed.to_owned()),
        AnswerType::Number => trimmed
            .parse::<Decimal>()
            .map(|value| value.normalize().to_string())
            .map_err(|_| ValidationError::UnparsableNumber {
                question: question.id.clone(),
                given: trimmed.to_owned(),
            }),
        AnswerType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok("true".to_owned()),
            "false" | "no" | "n" => Ok("false".to_owned()),
            _ => Err(ValidationError::UnparsableBoolean {
                question: question.id.clone(),
                given: trimmed.to_owned(),
            }),
        },
        AnswerType::Choice => {
            if question.choices.iter().any(|choice| choice == trimmed) {
                Ok(trimmed.to_owned())
            } else {
                Err(ValidationError::InvalidChoice {
                    question: question.id.clone(),
                    given: trimmed.to_owned(),
                })
            }
        }
    }
}
