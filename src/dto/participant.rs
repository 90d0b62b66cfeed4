use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{common::PhaseSnapshot, format_system_time, validation::validate_participant_name},
    state::{
        game::Participant,
        scoring::{DiffBand, format_diff},
    },
};

/// Payload used to join the quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Display name; surrounding whitespace is ignored.
    #[validate(custom(function = "validate_participant_name"))]
    pub name: String,
}

/// Payload carrying one prediction for the active question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Predicted percentage.
    #[validate(range(min = 0, max = 100))]
    pub prediction: i32,
    /// Question the client believes is active; rejected when stale.
    #[serde(default)]
    pub question_id: Option<u32>,
}

/// One signed prediction error ready for display.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct DiffBadge {
    /// Signed error, prediction minus correct answer.
    pub diff: i32,
    /// Signed label such as `+15%`.
    pub label: String,
    /// CSS colour of the band the diff falls in.
    pub color: String,
}

impl From<i32> for DiffBadge {
    fn from(diff: i32) -> Self {
        Self {
            diff,
            label: format_diff(diff),
            color: DiffBand::of(diff).color().to_owned(),
        }
    }
}

/// Participant record as returned to clients.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct ParticipantSummary {
    /// Identifier the client stores to resume its session.
    pub id: Uuid,
    /// Trimmed display name.
    pub name: String,
    /// Whether a prediction was sent for the open question.
    pub submitted: bool,
    /// Absolute error of the last scored round.
    pub current_score: u32,
    /// Sum of absolute errors over all scored rounds.
    pub total_score: u32,
    /// Predictions keyed by question id.
    pub answers: BTreeMap<u32, u8>,
    /// Signed errors in scoring order.
    pub prediction_diffs: Vec<i32>,
    /// Signed errors sorted ascending with their display band.
    pub diff_badges: Vec<DiffBadge>,
    /// RFC 3339 registration time.
    pub created_at: String,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
}

impl From<&Participant> for ParticipantSummary {
    fn from(value: &Participant) -> Self {
        let mut sorted = value.prediction_diffs.clone();
        sorted.sort_unstable();
        Self {
            id: value.id,
            name: value.name.clone(),
            submitted: value.submitted,
            current_score: value.current_score,
            total_score: value.total_score,
            answers: value.answers.clone(),
            prediction_diffs: value.prediction_diffs.clone(),
            diff_badges: sorted.into_iter().map(DiffBadge::from).collect(),
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Everything a client needs to resume a stored session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub participant: ParticipantSummary,
    pub phase: PhaseSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badges_are_sorted_and_coloured() {
        let mut participant = Participant::new("Ada".into());
        participant.prediction_diffs = vec![15, -15, 0];

        let summary = ParticipantSummary::from(&participant);

        assert_eq!(summary.prediction_diffs, vec![15, -15, 0]);
        let labels: Vec<_> = summary.diff_badges.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["-15%", "0%", "+15%"]);
        assert_eq!(summary.diff_badges[0].color, DiffBand::StrongNegative.color());
        assert_eq!(summary.diff_badges[2].color, DiffBand::StrongPositive.color());
    }

    #[test]
    fn request_validation() {
        assert!(RegisterRequest { name: " ".into() }.validate().is_err());
        assert!(RegisterRequest { name: "Ada".into() }.validate().is_ok());

        let too_high = SubmitAnswerRequest {
            prediction: 101,
            question_id: None,
        };
        let negative = SubmitAnswerRequest {
            prediction: -1,
            question_id: None,
        };
        let edge = SubmitAnswerRequest {
            prediction: 0,
            question_id: Some(1),
        };
        assert!(too_high.validate().is_err());
        assert!(negative.validate().is_err());
        assert!(edge.validate().is_ok());
    }
}
