//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::{
    common::{PhaseSnapshot, QuestionView},
    participant::ParticipantSummary,
    phase::VisiblePhase,
};

/// Reset needs an explicit confirmation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Response returned by start/next transitions.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransitionResponse {
    pub phase: PhaseSnapshot,
}

/// Response returned after a round has been scored.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundResultsResponse {
    pub question: QuestionView,
    /// Participants scored by this call.
    pub scored: usize,
    /// Participants who did not answer and were scored at the default prediction.
    pub defaulted: usize,
    /// Participants skipped because the round was already folded into their totals.
    pub already_scored: usize,
}

/// Response returned after a reset.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResetResponse {
    pub deleted_participants: u64,
    pub phase: PhaseSnapshot,
}

/// Admin view of one participant.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterEntry {
    pub participant: ParticipantSummary,
    /// `registered`, `submitted`/`waiting`, or `answered: N%`/`n/a`.
    pub status: String,
}

/// Full roster with per-participant status.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterResponse {
    pub phase: VisiblePhase,
    pub submitted: usize,
    pub participants: Vec<RosterEntry>,
}
