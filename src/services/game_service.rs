//! Core quiz plumbing shared by the admin and participant services: loading persisted
//! state, projecting phases, and writing participant records back with revision checks.

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, info, warn};

use crate::{
    dao::{
        game_store::QuizStore,
        models::{GameStateEntity, PhaseEntity},
        storage::WriteOutcome,
    },
    dto::common::{PhaseSnapshot, question_for_phase},
    error::ServiceError,
    services::sse_events,
    state::{QuizPhase, SharedState, game::{Participant, QuizSession}},
};

/// Project a phase and version into the persisted game-state document.
pub fn phase_to_entity(phase: QuizPhase, version: usize, question_count: usize) -> GameStateEntity {
    let (phase, current_question) = match phase {
        QuizPhase::Registration => (PhaseEntity::Registration, 1),
        QuizPhase::Question { number } => (PhaseEntity::Question, number),
        QuizPhase::Results { number } => (PhaseEntity::Results, number),
        QuizPhase::Final => (PhaseEntity::Final, question_count.max(1)),
    };

    GameStateEntity {
        phase,
        current_question,
        version,
        updated_at: SystemTime::now(),
    }
}

/// Rebuild the in-memory phase from the persisted document.
pub fn phase_from_entity(entity: &GameStateEntity) -> QuizPhase {
    let number = entity.current_question.max(1);
    match entity.phase {
        PhaseEntity::Registration => QuizPhase::Registration,
        PhaseEntity::Question => QuizPhase::Question { number },
        PhaseEntity::Results => QuizPhase::Results { number },
        PhaseEntity::Final => QuizPhase::Final,
    }
}

/// Load the persisted game state and roster into memory, creating the initial
/// document when none exists yet.
pub async fn bootstrap(state: &SharedState, store: Arc<dyn QuizStore>) -> Result<(), ServiceError> {
    let gate = state.lock_mutations().await;

    let persisted = match store.load_game_state().await? {
        Some(entity) => entity,
        None => {
            let initial = GameStateEntity::initial(0);
            store.save_game_state(initial.clone()).await?;
            info!("created initial game state document");
            initial
        }
    };

    let participants: Vec<Participant> = store
        .list_participants()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let participant_count = participants.len();

    let phase = phase_from_entity(&persisted);
    state
        .restore(
            phase,
            persisted.version,
            QuizSession::from_participants(participants),
        )
        .await;
    let restored = state.phase().await;
    if restored != phase {
        warn!(
            persisted = ?phase,
            restored = ?restored,
            "persisted question is outside the bank; falling back to registration"
        );
    }

    info!(phase = ?restored, participants = participant_count, "quiz state restored from storage");
    drop(gate);

    sse_events::broadcast_phase_changed(state, restored).await;
    Ok(())
}

/// Build the phase snapshot shared by REST responses and `phase_changed` events.
pub async fn phase_snapshot(state: &SharedState) -> PhaseSnapshot {
    let snapshot = state.snapshot().await;
    snapshot_for(state, snapshot.phase, snapshot.version)
}

/// Snapshot for an explicit phase, used right after a transition is applied.
pub fn snapshot_for(state: &SharedState, phase: QuizPhase, version: usize) -> PhaseSnapshot {
    let config = state.config();
    PhaseSnapshot {
        phase: phase.into(),
        question_number: phase.question_number(),
        question_count: config.questions().len(),
        question: question_for_phase(phase, |number| config.question(number).cloned()),
        version,
        degraded: state.is_degraded(),
    }
}

/// Persist the document describing `phase` at `version`.
pub async fn persist_phase(
    state: &SharedState,
    store: &Arc<dyn QuizStore>,
    phase: QuizPhase,
    version: usize,
) -> Result<(), ServiceError> {
    let entity = phase_to_entity(phase, version, state.config().questions().len());
    store.save_game_state(entity).await?;
    Ok(())
}

/// Write a modified participant with a revision check, then commit it to the live roster.
///
/// `updated` must carry the changes but still hold the revision it was read at.
pub async fn commit_participant(
    state: &SharedState,
    store: &Arc<dyn QuizStore>,
    mut updated: Participant,
) -> Result<Participant, ServiceError> {
    let expected = updated.revision;
    updated.revision = expected + 1;

    match store
        .update_participant(updated.clone().into(), expected)
        .await?
    {
        WriteOutcome::Written => {
            debug!(participant_id = %updated.id, revision = updated.revision, "participant written");
            let mut session = state.session().write().await;
            session.participants.insert(updated.id, updated.clone());
            Ok(updated)
        }
        WriteOutcome::Conflict => {
            warn!(participant_id = %updated.id, expected, "participant revision conflict");
            Err(ServiceError::Conflict(format!(
                "participant {} was modified concurrently",
                updated.id
            )))
        }
    }
}

/// Apply `change` to every participant it modifies, committing each one as it is written.
///
/// Returns the committed records. Stops at the first failed write; participants written
/// before it stay committed in both the store and memory.
pub async fn update_all_participants<F>(
    state: &SharedState,
    store: &Arc<dyn QuizStore>,
    mut change: F,
) -> Result<Vec<Participant>, ServiceError>
where
    F: FnMut(&mut Participant) -> bool,
{
    let candidates: Vec<Participant> = {
        let session = state.session().read().await;
        session.roster().cloned().collect()
    };

    let mut committed = Vec::new();
    for mut participant in candidates {
        if !change(&mut participant) {
            continue;
        }
        committed.push(commit_participant(state, store, participant).await?);
    }

    Ok(committed)
}
