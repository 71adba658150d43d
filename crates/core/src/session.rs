use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::QuestionId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub raw_answer: String,
    pub normalized_answer: String,
    pub answered_at: DateTime<Utc>,
}

/// Ordered, append-only record of one traversal session. Owned by exactly
/// one session; discarded wholesale when the session ends. Nothing in here
/// is ever mutated or reordered after it is appended.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerStore {
    records: Vec<AnswerRecord>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&AnswerRecord> {
        self.records.last()
    }

    pub fn contains(&self, question_id: &QuestionId) -> bool {
        self.records.iter().any(|record| &record.question_id == question_id)
    }

    pub fn normalized(&self, question_id: &QuestionId) -> Option<&str> {
        self.records
            .iter()
            .find(|record| &record.question_id == question_id)
            .map(|record| record.normalized_answer.as_str())
    }

    /// Collected answers as template variables, keyed by question id.
    pub fn variables(&self) -> BTreeMap<String, String> {
        self.records
            .iter()
            .map(|record| (record.question_id.0.clone(), record.normalized_answer.clone()))
            .collect()
    }

    pub(crate) fn push(&mut self, record: AnswerRecord) {
        self.records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::graph::QuestionId;

    use super::{AnswerRecord, AnswerStore};

    fn record(question_id: &str, normalized: &str) -> AnswerRecord {
        AnswerRecord {
            question_id: QuestionId::from(question_id),
            raw_answer: normalized.to_owned(),
            normalized_answer: normalized.to_owned(),
            answered_at: Utc::now(),
        }
    }

    #[test]
    fn records_keep_append_order() {
        let mut store = AnswerStore::new();
        store.push(record("court_type", "Basketball"));
        store.push(record("full_half", "Full"));

        let ids: Vec<&str> =
            store.records().iter().map(|r| r.question_id.0.as_str()).collect();
        assert_eq!(ids, vec!["court_type", "full_half"]);
        assert_eq!(store.last().map(|r| r.normalized_answer.as_str()), Some("Full"));
    }

    #[test]
    fn lookup_by_question_id() {
        let mut store = AnswerStore::new();
        store.push(record("varnish_type", "oil"));

        assert!(store.contains(&QuestionId::from("varnish_type")));
        assert_eq!(store.normalized(&QuestionId::from("varnish_type")), Some("oil"));
        assert_eq!(store.normalized(&QuestionId::from("missing")), None);
    }

    #[test]
    fn variables_expose_normalized_answers() {
        let mut store = AnswerStore::new();
        store.push(record("court_type", "Basketball"));
        store.push(record("total_area", "20"));

        let variables = store.variables();
        assert_eq!(variables.get("court_type").map(String::as_str), Some("Basketball"));
        assert_eq!(variables.get("total_area").map(String::as_str), Some("20"));
    }
}
