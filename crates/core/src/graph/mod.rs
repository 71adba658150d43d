pub mod authoring;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AuthoringError;

/// Reserved transition key: taken when no key matches the normalized answer.
pub const DEFAULT_TRANSITION_KEY: &str = "default";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub String);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    Text,
    Number,
    Choice,
    Boolean,
}

impl AnswerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Choice => "choice",
            Self::Boolean => "boolean",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub answer_type: AnswerType,
    pub required: bool,
    /// Only populated for `AnswerType::Choice`; order is the presentation order.
    pub choices: Vec<String>,
    /// Exact-match dispatch from normalized answer to the next question.
    /// Matching is case-sensitive with a `"default"` fallback; no entry for
    /// a given answer means the branch terminates there.
    pub transitions: BTreeMap<String, QuestionId>,
}

impl Question {
    pub fn next_for(&self, normalized_answer: &str) -> Option<&QuestionId> {
        self.transitions
            .get(normalized_answer)
            .or_else(|| self.transitions.get(DEFAULT_TRANSITION_KEY))
    }

    pub fn is_terminal_for(&self, normalized_answer: &str) -> bool {
        self.next_for(normalized_answer).is_none()
    }
}

/// Immutable rooted directed graph of questions. Construction validates all
/// structural invariants up front, so a `QuestionGraph` in hand is known
/// well-formed and can be shared read-only across sessions. Deserialization
/// runs the same validation; there is no way to obtain an unvalidated graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionGraph {
    questions: BTreeMap<QuestionId, Question>,
    order: Vec<QuestionId>,
    start_id: QuestionId,
}

impl<'de> Deserialize<'de> for QuestionGraph {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct RawGraph {
            questions: BTreeMap<QuestionId, Question>,
            order: Vec<QuestionId>,
            start_id: QuestionId,
        }

        let mut raw = RawGraph::deserialize(deserializer)?;
        let questions = raw
            .order
            .iter()
            .map(|id| {
                raw.questions.remove(id).ok_or_else(|| {
                    D::Error::custom(format!("graph order references unknown question `{id}`"))
                })
            })
            .collect::<Result<Vec<Question>, D::Error>>()?;
        if let Some(orphan) = raw.questions.keys().next() {
            return Err(D::Error::custom(format!(
                "question `{orphan}` is missing from the graph order"
            )));
        }

        Self::new(questions, Some(raw.start_id)).map_err(D::Error::custom)
    }
}

impl QuestionGraph {
    /// Builds and eagerly validates a graph. `start_id = None` falls back to
    /// the first question in authoring order.
    pub fn new(
        questions: Vec<Question>,
        start_id: Option<QuestionId>,
    ) -> Result<Self, AuthoringError> {
        if questions.is_empty() {
            return Err(AuthoringError::EmptyGraph);
        }

        let order: Vec<QuestionId> = questions.iter().map(|q| q.id.clone()).collect();
        let mut by_id = BTreeMap::new();
        for question in questions {
            let id = question.id.clone();
            if by_id.insert(id.clone(), question).is_some() {
                return Err(AuthoringError::DuplicateQuestionId(id));
            }
        }

        let start_id = start_id.unwrap_or_else(|| order[0].clone());
        if !by_id.contains_key(&start_id) {
            return Err(AuthoringError::UnknownStartQuestion(start_id));
        }

        let graph = Self { questions: by_id, order, start_id };
        graph.validate()?;
        Ok(graph)
    }

    pub fn start(&self) -> &Question {
        &self.questions[&self.start_id]
    }

    pub fn start_id(&self) -> &QuestionId {
        &self.start_id
    }

    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Questions in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.order.iter().map(|id| &self.questions[id])
    }

    fn validate(&self) -> Result<(), AuthoringError> {
        for question in self.iter() {
            if question.answer_type == AnswerType::Choice && question.choices.is_empty() {
                return Err(AuthoringError::EmptyChoices(question.id.clone()));
            }

            for (key, target) in &question.transitions {
                if !self.questions.contains_key(target) {
                    return Err(AuthoringError::DanglingTransition {
                        question: question.id.clone(),
                        answer_key: key.clone(),
                        target: target.clone(),
                    });
                }

                if key == DEFAULT_TRANSITION_KEY {
                    continue;
                }
                match question.answer_type {
                    AnswerType::Choice => {
                        // Static check: a typo here would otherwise never
                        // match at traversal time.
                        if !question.choices.iter().any(|choice| choice == key) {
                            return Err(AuthoringError::TransitionKeyNotAChoice {
                                question: question.id.clone(),
                                answer_key: key.clone(),
                            });
                        }
                    }
                    AnswerType::Boolean => {
                        if key != "true" && key != "false" {
                            return Err(AuthoringError::InvalidBooleanTransitionKey {
                                question: question.id.clone(),
                                answer_key: key.clone(),
                            });
                        }
                    }
                    AnswerType::Text | AnswerType::Number => {
                        return Err(AuthoringError::NonDefaultTransitionKey {
                            question: question.id.clone(),
                            answer_type: question.answer_type.as_str().to_owned(),
                            answer_key: key.clone(),
                        });
                    }
                }
            }
        }

        self.check_reachability()
    }

    /// Every question must be reachable from the start by some transition
    /// chain. Cycles are permitted here; revisits are rejected per session
    /// at traversal time.
    fn check_reachability(&self) -> Result<(), AuthoringError> {
        let mut seen: BTreeSet<&QuestionId> = BTreeSet::new();
        let mut frontier = VecDeque::from([&self.start_id]);
        while let Some(id) = frontier.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            for target in self.questions[id].transitions.values() {
                frontier.push_back(target);
            }
        }

        for id in &self.order {
            if !seen.contains(id) {
                return Err(AuthoringError::UnreachableQuestion(id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use super::{AnswerType, Question, QuestionId};

    pub fn question(id: &str, answer_type: AnswerType) -> Question {
        Question {
            id: QuestionId::from(id),
            prompt: format!("{id}?"),
            answer_type,
            required: true,
            choices: Vec::new(),
            transitions: BTreeMap::new(),
        }
    }

    pub fn choice_question(id: &str, choices: &[&str], next: &[(&str, &str)]) -> Question {
        Question {
            id: QuestionId::from(id),
            prompt: format!("{id}?"),
            answer_type: AnswerType::Choice,
            required: true,
            choices: choices.iter().map(|c| (*c).to_owned()).collect(),
            transitions: next
                .iter()
                .map(|(key, target)| ((*key).to_owned(), QuestionId::from(*target)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::test_support::{choice_question, question};
    use super::{AnswerType, QuestionGraph, QuestionId};
    use crate::errors::AuthoringError;

    #[test]
    fn start_defaults_to_first_authored_question() {
        let graph = QuestionGraph::new(
            vec![question("area", AnswerType::Number), question("location", AnswerType::Text)],
            None,
        )
        .expect("valid linear graph");

        assert_eq!(graph.start().id, QuestionId::from("area"));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn explicit_start_must_exist() {
        let error = QuestionGraph::new(
            vec![question("area", AnswerType::Number)],
            Some(QuestionId::from("missing")),
        )
        .expect_err("unknown start must be rejected");

        assert_eq!(error, AuthoringError::UnknownStartQuestion(QuestionId::from("missing")));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let error = QuestionGraph::new(
            vec![question("area", AnswerType::Number), question("area", AnswerType::Text)],
            None,
        )
        .expect_err("duplicate id must be rejected");

        assert_eq!(error, AuthoringError::DuplicateQuestionId(QuestionId::from("area")));
    }

    #[test]
    fn dangling_transition_target_is_rejected_at_load() {
        let error = QuestionGraph::new(
            vec![choice_question(
                "court_type",
                &["Basketball", "Tennis"],
                &[("Basketball", "full_half")],
            )],
            None,
        )
        .expect_err("dangling target must be rejected");

        assert!(matches!(error, AuthoringError::DanglingTransition { ref target, .. }
            if target == &QuestionId::from("full_half")));
    }

    #[test]
    fn choice_transition_keys_are_checked_against_choices() {
        let mut q = choice_question("court_type", &["Basketball", "Tennis"], &[]);
        q.transitions.insert("Basketbal".to_owned(), QuestionId::from("court_type"));

        let error =
            QuestionGraph::new(vec![q], None).expect_err("misspelled key must be rejected");
        assert!(matches!(error, AuthoringError::TransitionKeyNotAChoice { ref answer_key, .. }
            if answer_key == "Basketbal"));
    }

    #[test]
    fn boolean_transitions_only_accept_true_false_default() {
        let mut q = question("need_3pt_line", AnswerType::Boolean);
        q.transitions.insert("yes".to_owned(), QuestionId::from("need_3pt_line"));

        let error = QuestionGraph::new(vec![q], None).expect_err("`yes` key must be rejected");
        assert!(matches!(error, AuthoringError::InvalidBooleanTransitionKey { .. }));
    }

    #[test]
    fn number_questions_only_accept_default_transition() {
        let mut q = question("total_area", AnswerType::Number);
        q.transitions.insert("20".to_owned(), QuestionId::from("total_area"));

        let error = QuestionGraph::new(vec![q], None).expect_err("non-default key on number");
        assert!(matches!(error, AuthoringError::NonDefaultTransitionKey { .. }));
    }

    #[test]
    fn unreachable_question_is_rejected() {
        let error = QuestionGraph::new(
            vec![question("area", AnswerType::Number), question("orphan", AnswerType::Text)],
            None,
        )
        .expect_err("orphan must be rejected");

        assert_eq!(error, AuthoringError::UnreachableQuestion(QuestionId::from("orphan")));
    }

    #[test]
    fn cycles_are_structurally_permitted() {
        let a = choice_question("a", &["again", "stop"], &[("again", "b")]);
        let b = choice_question("b", &["back"], &[("back", "a")]);

        let graph = QuestionGraph::new(vec![a, b], None).expect("cyclic graph loads");
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn deserialization_revalidates_the_graph() {
        let graph = QuestionGraph::new(
            vec![question("area", AnswerType::Number), question("location", AnswerType::Text)],
            None,
        )
        .expect("valid linear graph");
        let json = serde_json::to_string(&graph).expect("graph serializes");

        let restored: QuestionGraph =
            serde_json::from_str(&json).expect("well-formed graph deserializes");
        assert_eq!(restored, graph);

        // A payload pointing the start at a question that does not exist
        // must be rejected, not accepted and left to panic later.
        let tampered = json.replace("\"start_id\":\"area\"", "\"start_id\":\"missing\"");
        assert_ne!(tampered, json, "fixture should actually tamper the payload");
        let error = serde_json::from_str::<QuestionGraph>(&tampered)
            .expect_err("unvalidated graph must not deserialize");
        assert!(error.to_string().contains("missing"));
    }

    #[test]
    fn default_fallback_is_used_when_no_exact_match() {
        let mut transitions = BTreeMap::new();
        transitions.insert("default".to_owned(), QuestionId::from("next"));
        let q = super::Question {
            id: QuestionId::from("total_area"),
            prompt: "Total area?".to_owned(),
            answer_type: AnswerType::Number,
            required: true,
            choices: Vec::new(),
            transitions,
        };

        assert_eq!(q.next_for("42"), Some(&QuestionId::from("next")));
        assert!(!q.is_terminal_for("42"));
    }
}
