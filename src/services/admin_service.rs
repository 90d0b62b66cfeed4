//! Admin controller: drives the quiz through its phases, scores rounds and resets the game.

use tracing::info;

use crate::{
    dto::{
        admin::{
            ResetRequest, ResetResponse, RosterEntry, RosterResponse, RoundResultsResponse,
            TransitionResponse,
        },
        common::QuestionView,
        participant::ParticipantSummary,
    },
    error::ServiceError,
    services::{game_service, public_service, sse_events},
    state::{
        QuizEvent, QuizPhase, SharedState, game::Participant, transitions::run_transition_with_broadcast,
    },
};

/// Open the first question. Requires at least one registered participant.
pub async fn start_quiz(state: &SharedState) -> Result<TransitionResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let changed = run_transition_with_broadcast(state, QuizEvent::StartQuiz, |plan| async move {
        if state.session().read().await.participants.is_empty() {
            return Err(ServiceError::InvalidState(
                "cannot start without participants".into(),
            ));
        }

        let changed =
            game_service::update_all_participants(state, &store, Participant::reset_submission)
                .await?;
        game_service::persist_phase(state, &store, plan.to, plan.version_next).await?;
        Ok(changed)
    })
    .await?;

    for participant in &changed {
        sse_events::broadcast_participant_updated(state, participant);
    }
    info!("quiz started");

    Ok(TransitionResponse {
        phase: game_service::phase_snapshot(state).await,
    })
}

/// Close the open question and fold every prediction into the participants' scores.
pub async fn show_results(state: &SharedState) -> Result<RoundResultsResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let default_prediction = state.config().default_prediction();

    let (question, number, scored, defaulted, already_scored) =
        run_transition_with_broadcast(state, QuizEvent::ShowResults, |plan| async move {
            let QuizPhase::Results { number } = plan.to else {
                return Err(ServiceError::InvalidState(
                    "results can only follow a question".into(),
                ));
            };
            let question = state
                .config()
                .question(number)
                .cloned()
                .ok_or_else(|| {
                    ServiceError::InvalidState(format!("question {number} is not in the bank"))
                })?;

            let mut defaulted = 0;
            let mut already_scored = 0;
            let scored = game_service::update_all_participants(state, &store, |participant| {
                match participant.score_round(&question, default_prediction) {
                    Some(outcome) => {
                        if outcome.defaulted {
                            defaulted += 1;
                        }
                        true
                    }
                    None => {
                        already_scored += 1;
                        false
                    }
                }
            })
            .await?;

            game_service::persist_phase(state, &store, plan.to, plan.version_next).await?;
            Ok((question, number, scored, defaulted, already_scored))
        })
        .await?;

    for participant in &scored {
        sse_events::broadcast_participant_updated(state, participant);
    }

    let view = QuestionView::new(number, &question, true);
    let standings = public_service::standings_for(state, QuizPhase::Results { number }).await;
    sse_events::broadcast_round_scored(state, view.clone(), standings);
    info!(
        question = question.id,
        scored = scored.len(),
        defaulted,
        already_scored,
        "round scored"
    );

    Ok(RoundResultsResponse {
        question: view,
        scored: scored.len(),
        defaulted,
        already_scored,
    })
}

/// Open the next question, or move to the final standings after the last one.
pub async fn next_question(state: &SharedState) -> Result<TransitionResponse, ServiceError> {
    let store = state.require_game_store().await?;

    let event = match state.phase().await {
        QuizPhase::Results { number } if number >= state.config().questions().len() => {
            QuizEvent::Finish
        }
        _ => QuizEvent::NextQuestion,
    };

    let changed = run_transition_with_broadcast(state, event, |plan| async move {
        let changed = match plan.to {
            QuizPhase::Question { .. } => {
                game_service::update_all_participants(
                    state,
                    &store,
                    Participant::reset_submission,
                )
                .await?
            }
            _ => Vec::new(),
        };
        game_service::persist_phase(state, &store, plan.to, plan.version_next).await?;
        Ok(changed)
    })
    .await?;

    for participant in &changed {
        sse_events::broadcast_participant_updated(state, participant);
    }

    let phase = game_service::phase_snapshot(state).await;
    info!(event = ?event, phase = ?phase.phase, "quiz advanced");
    Ok(TransitionResponse { phase })
}

/// Delete every participant and return to registration. Requires `confirm: true`.
pub async fn reset_game(
    state: &SharedState,
    request: ResetRequest,
) -> Result<ResetResponse, ServiceError> {
    if !request.confirm {
        return Err(ServiceError::InvalidInput(
            "reset must be confirmed with `confirm: true`".into(),
        ));
    }

    let store = state.require_game_store().await?;

    let deleted = run_transition_with_broadcast(state, QuizEvent::Reset, |plan| async move {
        let deleted = store.delete_all_participants().await?;

        // Store records are gone; drop them from the live roster before the game-state write.
        {
            let mut session = state.session().write().await;
            session.participants.clear();
            sse_events::broadcast_game_reset(state, deleted);
        }

        game_service::persist_phase(state, &store, plan.to, plan.version_next).await?;
        Ok(deleted)
    })
    .await?;

    info!(deleted, "quiz reset");
    Ok(ResetResponse {
        deleted_participants: deleted,
        phase: game_service::phase_snapshot(state).await,
    })
}

/// Full roster with each participant's status for the current phase.
pub async fn roster(state: &SharedState) -> RosterResponse {
    let phase = state.phase().await;
    let config = state.config();
    let question = phase
        .question_number()
        .or_else(|| (phase == QuizPhase::Final).then(|| config.questions().len()))
        .and_then(|number| config.question(number));

    let session = state.session().read().await;
    let participants: Vec<RosterEntry> = session
        .roster()
        .map(|participant| RosterEntry {
            participant: ParticipantSummary::from(participant),
            status: roster_status(phase, participant, question.map(|q| q.id)),
        })
        .collect();
    let submitted = session.roster().filter(|p| p.submitted).count();

    RosterResponse {
        phase: phase.into(),
        submitted,
        participants,
    }
}

fn roster_status(phase: QuizPhase, participant: &Participant, question_id: Option<u32>) -> String {
    match phase {
        QuizPhase::Registration => "registered".into(),
        QuizPhase::Question { .. } if participant.submitted => "submitted".into(),
        QuizPhase::Question { .. } => "waiting".into(),
        QuizPhase::Results { .. } | QuizPhase::Final => {
            match question_id.and_then(|id| participant.answer_for(id)) {
                Some(prediction) => format!("answered: {prediction}%"),
                None => "n/a".into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_status_follows_phase() {
        let mut participant = Participant::new("Ada".into());
        assert_eq!(
            roster_status(QuizPhase::Registration, &participant, None),
            "registered"
        );
        assert_eq!(
            roster_status(QuizPhase::Question { number: 1 }, &participant, Some(1)),
            "waiting"
        );

        participant.record_answer(1, 42);
        assert_eq!(
            roster_status(QuizPhase::Question { number: 1 }, &participant, Some(1)),
            "submitted"
        );
        assert_eq!(
            roster_status(QuizPhase::Results { number: 1 }, &participant, Some(1)),
            "answered: 42%"
        );
        assert_eq!(
            roster_status(QuizPhase::Results { number: 2 }, &participant, Some(2)),
            "n/a"
        );
    }
}
