use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        common::QuestionView,
        participant::ParticipantSummary,
        public::StandingEntry,
        sse::{
            AnswerSubmittedEvent, GameResetEvent, ParticipantDeletedEvent,
            ParticipantRegisteredEvent, ParticipantUpdatedEvent, PhaseChangedEvent,
            RoundScoredEvent, ServerEvent, SystemStatus,
        },
    },
    services::game_service,
    state::{QuizPhase, SharedState, game::Participant},
};

const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_PARTICIPANT_REGISTERED: &str = "participant.registered";
const EVENT_PARTICIPANT_UPDATED: &str = "participant.updated";
const EVENT_PARTICIPANT_DELETED: &str = "participant.deleted";
const EVENT_ANSWER_SUBMITTED: &str = "answer.submitted";
const EVENT_ROUND_SCORED: &str = "round.scored";
const EVENT_GAME_RESET: &str = "game.reset";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast a quiz phase change notification.
pub async fn broadcast_phase_changed(state: &SharedState, phase: QuizPhase) {
    let version = state.snapshot().await.version;
    let payload = PhaseChangedEvent(game_service::snapshot_for(state, phase, version));
    send_public_event(state, EVENT_PHASE_CHANGED, &payload);
    send_admin_event(state, EVENT_PHASE_CHANGED, &payload);
}

/// Announce a new participant.
pub fn broadcast_participant_registered(
    state: &SharedState,
    participant: &Participant,
    participant_count: usize,
) {
    let payload = ParticipantRegisteredEvent {
        id: participant.id,
        name: participant.name.clone(),
        participant_count,
    };
    send_public_event(state, EVENT_PARTICIPANT_REGISTERED, &payload);
    send_admin_event(state, EVENT_PARTICIPANT_REGISTERED, &payload);
}

/// Push the new state of a participant record to its owner and to admins.
pub fn broadcast_participant_updated(state: &SharedState, participant: &Participant) {
    let payload = ParticipantUpdatedEvent {
        participant: ParticipantSummary::from(participant),
    };
    send_participant_event(state, participant.id, EVENT_PARTICIPANT_UPDATED, &payload);
    send_admin_event(state, EVENT_PARTICIPANT_UPDATED, &payload);
}

/// Report submission progress for the open question.
pub fn broadcast_answer_submitted(
    state: &SharedState,
    participant_id: Uuid,
    question_id: u32,
    submitted_count: usize,
    participant_count: usize,
) {
    let payload = AnswerSubmittedEvent {
        participant_id,
        question_id,
        submitted_count,
        participant_count,
    };
    send_public_event(state, EVENT_ANSWER_SUBMITTED, &payload);
    send_admin_event(state, EVENT_ANSWER_SUBMITTED, &payload);
}

/// Broadcast the standings of a freshly scored round.
pub fn broadcast_round_scored(
    state: &SharedState,
    question: QuestionView,
    standings: Vec<StandingEntry>,
) {
    let payload = RoundScoredEvent {
        question,
        standings,
    };
    send_public_event(state, EVENT_ROUND_SCORED, &payload);
    send_admin_event(state, EVENT_ROUND_SCORED, &payload);
}

/// Tell every participant stream its record is gone and close them, then announce the reset.
pub fn broadcast_game_reset(state: &SharedState, deleted_participants: u64) {
    let closed = state.sse().close_participants(|participant_id| {
        encode(
            EVENT_PARTICIPANT_DELETED,
            &ParticipantDeletedEvent { participant_id },
        )
    });
    tracing::debug!(closed, "participant streams closed after reset");

    let payload = GameResetEvent {
        deleted_participants,
    };
    send_public_event(state, EVENT_GAME_RESET, &payload);
    send_admin_event(state, EVENT_GAME_RESET, &payload);
}

/// Broadcast degraded-mode changes to both streams.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    send_public_event(state, EVENT_SYSTEM_STATUS, &payload);
    send_admin_event(state, EVENT_SYSTEM_STATUS, &payload);
}

fn encode(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    if let Some(event) = encode(event, payload) {
        state.public_sse().broadcast(event);
    }
}

fn send_admin_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    if let Some(event) = encode(event, payload) {
        state.admin_sse().broadcast(event);
    }
}

fn send_participant_event(
    state: &SharedState,
    participant_id: Uuid,
    event: &str,
    payload: &impl Serialize,
) {
    if let Some(event) = encode(event, payload) {
        state.sse().send_participant(participant_id, event);
    }
}
