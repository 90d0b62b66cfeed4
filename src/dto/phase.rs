use serde::Serialize;
use utoipa::ToSchema;

use crate::state::QuizPhase;

/// Publicly visible quiz phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// Participants may register.
    Registration,
    /// A question is open for predictions.
    Question,
    /// Results of the current question are displayed.
    Results,
    /// Final standings are displayed.
    Final,
}

impl From<QuizPhase> for VisiblePhase {
    fn from(value: QuizPhase) -> Self {
        match value {
            QuizPhase::Registration => VisiblePhase::Registration,
            QuizPhase::Question { .. } => VisiblePhase::Question,
            QuizPhase::Results { .. } => VisiblePhase::Results,
            QuizPhase::Final => VisiblePhase::Final,
        }
    }
}
