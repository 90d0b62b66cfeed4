use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{common::QuestionView, phase::VisiblePhase},
    state::{game::Participant, scoring::HistogramBin},
};

/// Rejects any query string on read-only endpoints.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoQuery {}

/// One row of the standings table.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct StandingEntry {
    /// 1-based rank; tied scores share a rank.
    pub rank: usize,
    pub id: Uuid,
    pub name: String,
    pub current_score: u32,
    pub total_score: u32,
}

/// Standings sorted ascending, lower is better.
#[derive(Debug, Serialize, ToSchema)]
pub struct StandingsResponse {
    pub phase: VisiblePhase,
    /// Score the table is ordered by (`current_score` or `total_score`).
    pub sorted_by: String,
    pub standings: Vec<StandingEntry>,
}

/// One bucket of the response distribution.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct HistogramBinDto {
    pub label: String,
    pub count: usize,
    pub contains_answer: bool,
}

impl From<HistogramBin> for HistogramBinDto {
    fn from(value: HistogramBin) -> Self {
        Self {
            label: value.label,
            count: value.count,
            contains_answer: value.contains_answer,
        }
    }
}

/// Response distribution for a scored question.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistogramResponse {
    pub question: QuestionView,
    /// Number of participants who actually answered.
    pub responses: usize,
    pub bins: Vec<HistogramBinDto>,
}

/// Participant reference used by the winner view.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct WinnerEntry {
    pub id: Uuid,
    pub name: String,
    pub total_score: u32,
}

impl From<&Participant> for WinnerEntry {
    fn from(value: &Participant) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            total_score: value.total_score,
        }
    }
}

/// Winner of a finished quiz.
#[derive(Debug, Serialize, ToSchema)]
pub struct WinnerResponse {
    pub winner: WinnerEntry,
    /// Other participants sharing the winning total, in registration order.
    pub tied_with: Vec<WinnerEntry>,
}
