//! Participant-facing operations: joining, resuming a stored session and submitting predictions.

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::storage::WriteOutcome,
    dto::{
        participant::{ParticipantSummary, RegisterRequest, SessionResponse, SubmitAnswerRequest},
        validation::validate_participant_name,
    },
    error::ServiceError,
    services::{game_service, sse_events},
    state::{QuizPhase, SharedState, game::Participant},
};

/// Register a participant while the quiz is still accepting sign-ups.
pub async fn register(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<ParticipantSummary, ServiceError> {
    validate_participant_name(&request.name)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let name = request.name.trim().to_owned();

    let store = state.require_game_store().await?;
    let _gate = state.lock_mutations().await;

    if state.phase().await != QuizPhase::Registration {
        return Err(ServiceError::InvalidState("registration is closed".into()));
    }

    if state.session().read().await.find_by_name(&name).is_some() {
        return Err(ServiceError::Conflict(format!("name `{name}` is already taken")));
    }

    let participant = Participant::new(name);
    match store.insert_participant(participant.clone().into()).await? {
        WriteOutcome::Written => {}
        WriteOutcome::Conflict => {
            return Err(ServiceError::Conflict(format!(
                "name `{}` is already taken",
                participant.name
            )));
        }
    }

    let participant_count = {
        let mut session = state.session().write().await;
        session
            .participants
            .insert(participant.id, participant.clone());
        session.participants.len()
    };

    info!(participant_id = %participant.id, name = %participant.name, "participant registered");
    sse_events::broadcast_participant_registered(state, &participant, participant_count);

    Ok(ParticipantSummary::from(&participant))
}

/// Look up a stored session so a returning client can pick up where it left off.
pub async fn resume(state: &SharedState, id: Uuid) -> Result<SessionResponse, ServiceError> {
    let participant = {
        let session = state.session().read().await;
        session
            .participants
            .get(&id)
            .map(ParticipantSummary::from)
            .ok_or_else(|| ServiceError::NotFound(format!("participant {id} not found")))?
    };

    Ok(SessionResponse {
        participant,
        phase: game_service::phase_snapshot(state).await,
    })
}

/// Record one prediction for the open question.
pub async fn submit_answer(
    state: &SharedState,
    id: Uuid,
    request: SubmitAnswerRequest,
) -> Result<ParticipantSummary, ServiceError> {
    request.validate()?;
    let prediction = u8::try_from(request.prediction)
        .map_err(|_| ServiceError::InvalidInput("prediction must be between 0 and 100".into()))?;

    let store = state.require_game_store().await?;
    let _gate = state.lock_mutations().await;

    let QuizPhase::Question { number } = state.phase().await else {
        return Err(ServiceError::InvalidState(
            "no question is open for answers".into(),
        ));
    };
    let question = state
        .config()
        .question(number)
        .ok_or_else(|| ServiceError::InvalidState(format!("question {number} is not in the bank")))?
        .clone();

    if let Some(requested) = request.question_id {
        if requested != question.id {
            return Err(ServiceError::InvalidState(format!(
                "question {requested} is not the active question"
            )));
        }
    }

    let mut participant = state
        .session()
        .read()
        .await
        .participants
        .get(&id)
        .cloned()
        .ok_or_else(|| ServiceError::NotFound(format!("participant {id} not found")))?;

    if participant.is_scored(question.id) {
        return Err(ServiceError::InvalidState(format!(
            "question {} was already scored for this participant",
            question.id
        )));
    }

    if !participant.record_answer(question.id, prediction) {
        return Err(ServiceError::Conflict(format!(
            "an answer for question {} was already submitted",
            question.id
        )));
    }

    let committed = game_service::commit_participant(state, &store, participant).await?;
    debug!(participant_id = %id, question = question.id, prediction, "answer recorded");

    let (submitted_count, participant_count) = {
        let session = state.session().read().await;
        let submitted = session
            .roster()
            .filter(|participant| participant.answer_for(question.id).is_some())
            .count();
        (submitted, session.participants.len())
    };

    sse_events::broadcast_participant_updated(state, &committed);
    sse_events::broadcast_answer_submitted(
        state,
        id,
        question.id,
        submitted_count,
        participant_count,
    );

    Ok(ParticipantSummary::from(&committed))
}
