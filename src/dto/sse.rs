use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::{
    common::{PhaseSnapshot, QuestionView},
    participant::ParticipantSummary,
    public::StandingEntry,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Plain text event.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Token handed to the single admin stream subscriber.
pub struct AdminHandshake {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the quiz phase changes.
pub struct PhaseChangedEvent(pub PhaseSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Public notice that someone joined; admins receive the full record.
pub struct ParticipantRegisteredEvent {
    pub id: Uuid,
    pub name: String,
    pub participant_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent on a participant's own stream (and to admins) whenever the record changes.
pub struct ParticipantUpdatedEvent {
    pub participant: ParticipantSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Last event of a participant stream after the record was removed.
pub struct ParticipantDeletedEvent {
    pub participant_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
/// Progress of the open question. Predictions themselves are never broadcast.
pub struct AnswerSubmittedEvent {
    pub participant_id: Uuid,
    pub question_id: u32,
    pub submitted_count: usize,
    pub participant_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once a question has been scored.
pub struct RoundScoredEvent {
    pub question: QuestionView,
    pub standings: Vec<StandingEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after an admin reset.
pub struct GameResetEvent {
    pub deleted_participants: u64,
}
