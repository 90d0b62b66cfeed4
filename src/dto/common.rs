use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::phase::VisiblePhase,
    state::{QuizPhase, game::Question},
};

/// Question as shown to clients. The correct answer is only revealed once scored.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct QuestionView {
    /// 1-based position in the bank.
    pub number: usize,
    /// Stable question identifier, echoed back when submitting.
    pub id: u32,
    /// Prompt text.
    pub question: String,
    /// Correct percentage, present in the results and final phases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<u8>,
}

impl QuestionView {
    /// Project a question, hiding the answer unless `reveal` is set.
    pub fn new(number: usize, question: &Question, reveal: bool) -> Self {
        Self {
            number,
            id: question.id,
            question: question.prompt.clone(),
            answer: reveal.then_some(question.answer),
        }
    }
}

/// Shared snapshot describing the current quiz phase and related context.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PhaseSnapshot {
    pub phase: VisiblePhase,
    /// 1-based number of the active or last scored question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_number: Option<usize>,
    /// Number of questions in the bank.
    pub question_count: usize,
    /// Present during question and results phases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// State machine version.
    pub version: usize,
    /// True when the backend operates in degraded mode (no connection to the database).
    pub degraded: bool,
}

/// Which question a phase refers to, and whether its answer may be shown.
pub fn question_for_phase(
    phase: QuizPhase,
    lookup: impl Fn(usize) -> Option<Question>,
) -> Option<QuestionView> {
    let number = phase.question_number()?;
    let question = lookup(number)?;
    let reveal = matches!(phase, QuizPhase::Results { .. });
    Some(QuestionView::new(number, &question, reveal))
}
