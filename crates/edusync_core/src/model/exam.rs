//! Exam aggregate: an ordered collection of question references.

use crate::model::aggregate::{merge_field, Aggregate, AggregateKind};
use crate::model::identifier::AggregateId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: AggregateId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Member questions in presentation order.
    #[serde(default)]
    pub question_ids: Vec<AggregateId>,
    #[serde(default)]
    pub last_modified_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Appended when not already a member.
    pub add_question: Option<AggregateId>,
    pub remove_question: Option<AggregateId>,
}

impl Exam {
    /// Creates an unsaved exam with a fresh temporary id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: AggregateId::mint_temporary(),
            title: title.into(),
            description: String::new(),
            question_ids: Vec::new(),
            last_modified_at: 0,
        }
    }

    pub fn contains_question(&self, id: &AggregateId) -> bool {
        self.question_ids.contains(id)
    }
}

impl Aggregate for Exam {
    type Patch = ExamPatch;

    const KIND: AggregateKind = AggregateKind::Exam;

    fn id(&self) -> &AggregateId {
        &self.id
    }

    fn set_id(&mut self, id: AggregateId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: ExamPatch) {
        merge_field(&mut self.title, patch.title);
        merge_field(&mut self.description, patch.description);
        if let Some(id) = patch.add_question {
            if !self.contains_question(&id) {
                self.question_ids.push(id);
            }
        }
        if let Some(id) = patch.remove_question {
            self.question_ids.retain(|member| member != &id);
        }
    }

    fn last_modified_at(&self) -> i64 {
        self.last_modified_at
    }

    fn set_last_modified_at(&mut self, at_ms: i64) {
        self.last_modified_at = at_ms;
    }

    fn rewrite_reference(
        &mut self,
        kind: AggregateKind,
        old: &AggregateId,
        new: &AggregateId,
    ) -> bool {
        if kind != AggregateKind::Question {
            return false;
        }
        let mut changed = false;
        for member in self.question_ids.iter_mut().filter(|member| **member == *old) {
            *member = new.clone();
            changed = true;
        }
        if changed {
            // A durable id may already have been added separately.
            let mut seen = Vec::with_capacity(self.question_ids.len());
            self.question_ids.retain(|member| {
                if seen.contains(member) {
                    false
                } else {
                    seen.push(member.clone());
                    true
                }
            });
        }
        changed
    }

    fn drop_reference(&mut self, kind: AggregateKind, id: &AggregateId) -> bool {
        if kind != AggregateKind::Question || !self.contains_question(id) {
            return false;
        }
        self.question_ids.retain(|member| member != id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{Exam, ExamPatch};
    use crate::model::aggregate::{Aggregate, AggregateKind};
    use crate::model::identifier::AggregateId;

    #[test]
    fn membership_rewrite_replaces_temporary_question_id() {
        let temp = AggregateId::mint_temporary();
        let mut exam = Exam::new("Midterm");
        exam.apply_patch(ExamPatch {
            add_question: Some(temp.clone()),
            ..ExamPatch::default()
        });

        let durable = AggregateId::durable("101");
        assert!(exam.rewrite_reference(AggregateKind::Question, &temp, &durable));
        assert_eq!(exam.question_ids, vec![durable.clone()]);
        assert!(!exam.rewrite_reference(AggregateKind::Question, &temp, &durable));
    }

    #[test]
    fn rewrite_ignores_other_kinds_and_deduplicates() {
        let temp = AggregateId::mint_temporary();
        let durable = AggregateId::durable("7");
        let mut exam = Exam::new("Final");
        exam.question_ids = vec![temp.clone(), durable.clone()];

        assert!(!exam.rewrite_reference(AggregateKind::Exam, &temp, &durable));
        assert!(exam.rewrite_reference(AggregateKind::Question, &temp, &durable));
        assert_eq!(exam.question_ids, vec![durable]);
    }
}
