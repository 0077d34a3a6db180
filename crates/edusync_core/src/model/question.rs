//! Question aggregate for the exam authoring flow.
//!
//! # Responsibility
//! - Hold one authored question and its workflow status.
//! - Define the structural gates for `UnderReview` and `Finalized`.
//!
//! # Invariants
//! - `exam_id` is the parent reference; remote writes require it durable.
//! - Multiple-choice questions keep option order stable.

use crate::model::aggregate::{merge_field, Aggregate, AggregateKind, ValidationError};
use crate::model::identifier::AggregateId;
use crate::model::status::WorkflowStatus;
use serde::{Deserialize, Serialize};

const MIN_CHOICE_OPTIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    Essay,
}

/// One selectable answer of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl ChoiceOption {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            text: text.into(),
            is_correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: AggregateId,
    /// Owning exam.
    pub exam_id: Option<AggregateId>,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
    /// Model answer for short-answer and essay questions.
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default)]
    pub last_modified_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionPatch {
    pub exam_id: Option<AggregateId>,
    pub question_type: Option<QuestionType>,
    pub prompt: Option<String>,
    pub options: Option<Vec<ChoiceOption>>,
    pub answer: Option<String>,
    pub explanation: Option<String>,
    pub points: Option<i64>,
}

impl Question {
    /// Creates an unsaved draft question with a fresh temporary id.
    pub fn new(question_type: QuestionType) -> Self {
        Self {
            id: AggregateId::mint_temporary(),
            exam_id: None,
            question_type,
            prompt: String::new(),
            options: Vec::new(),
            answer: String::new(),
            explanation: String::new(),
            points: 0,
            status: WorkflowStatus::Draft,
            last_modified_at: 0,
        }
    }

    fn validate_structure(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::MissingField("prompt"));
        }
        if self.points <= 0 {
            return Err(ValidationError::OutOfRange {
                field: "points",
                value: self.points,
            });
        }

        match self.question_type {
            QuestionType::MultipleChoice => {
                if self.options.len() < MIN_CHOICE_OPTIONS {
                    return Err(ValidationError::TooFewOptions {
                        found: self.options.len(),
                        required: MIN_CHOICE_OPTIONS,
                    });
                }
                if let Some(index) = self
                    .options
                    .iter()
                    .position(|option| option.text.trim().is_empty())
                {
                    return Err(ValidationError::EmptyOption { index });
                }
                if !self.options.iter().any(|option| option.is_correct) {
                    return Err(ValidationError::NoCorrectOption);
                }
            }
            QuestionType::ShortAnswer => {
                if self.answer.trim().is_empty() {
                    return Err(ValidationError::MissingField("answer"));
                }
            }
            QuestionType::Essay => {}
        }

        Ok(())
    }
}

impl Aggregate for Question {
    type Patch = QuestionPatch;

    const KIND: AggregateKind = AggregateKind::Question;
    const REQUIRES_PARENT: bool = true;

    fn id(&self) -> &AggregateId {
        &self.id
    }

    fn set_id(&mut self, id: AggregateId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: QuestionPatch) {
        if patch.exam_id.is_some() {
            self.exam_id = patch.exam_id;
        }
        merge_field(&mut self.question_type, patch.question_type);
        merge_field(&mut self.prompt, patch.prompt);
        merge_field(&mut self.options, patch.options);
        merge_field(&mut self.answer, patch.answer);
        merge_field(&mut self.explanation, patch.explanation);
        merge_field(&mut self.points, patch.points);
    }

    fn last_modified_at(&self) -> i64 {
        self.last_modified_at
    }

    fn set_last_modified_at(&mut self, at_ms: i64) {
        self.last_modified_at = at_ms;
    }

    fn status(&self) -> Option<WorkflowStatus> {
        Some(self.status)
    }

    fn set_status(&mut self, status: WorkflowStatus) {
        self.status = status;
    }

    fn parent_reference(&self) -> Option<&AggregateId> {
        self.exam_id.as_ref()
    }

    fn validate_for(&self, target: WorkflowStatus) -> Result<(), ValidationError> {
        if target == WorkflowStatus::Draft {
            return Ok(());
        }
        self.validate_structure()?;
        if target == WorkflowStatus::Finalized && self.explanation.trim().is_empty() {
            return Err(ValidationError::MissingField("explanation"));
        }
        Ok(())
    }

    fn rewrite_reference(
        &mut self,
        kind: AggregateKind,
        old: &AggregateId,
        new: &AggregateId,
    ) -> bool {
        if kind == AggregateKind::Exam && self.exam_id.as_ref() == Some(old) {
            self.exam_id = Some(new.clone());
            return true;
        }
        false
    }

    fn drop_reference(&mut self, kind: AggregateKind, id: &AggregateId) -> bool {
        if kind == AggregateKind::Exam && self.exam_id.as_ref() == Some(id) {
            self.exam_id = None;
            return true;
        }
        false
    }
}
