use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::participant::{
        ParticipantSummary, RegisterRequest, SessionResponse, SubmitAnswerRequest,
    },
    error::AppError,
    services::participant_service,
    state::SharedState,
};

/// Endpoints used by participant devices.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/participants", post(register))
        .route("/participants/{id}", get(resume_session))
        .route("/participants/{id}/answers", post(submit_answer))
}

#[utoipa::path(
    post,
    path = "/participants",
    tag = "participants",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Participant registered", body = ParticipantSummary),
        (status = 400, description = "Invalid name"),
        (status = 409, description = "Name taken or registration closed"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Join the quiz while registration is open.
pub async fn register(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterRequest>>,
) -> Result<(StatusCode, Json<ParticipantSummary>), AppError> {
    let participant = participant_service::register(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

#[utoipa::path(
    get,
    path = "/participants/{id}",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier stored by the client")),
    responses(
        (status = 200, description = "Stored session", body = SessionResponse),
        (status = 404, description = "Participant no longer exists")
    )
)]
/// Resume a stored session.
pub async fn resume_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(participant_service::resume(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/participants/{id}/answers",
    tag = "participants",
    params(("id" = String, Path, description = "Participant identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Prediction recorded", body = ParticipantSummary),
        (status = 400, description = "Prediction out of range"),
        (status = 404, description = "Unknown participant"),
        (status = 409, description = "No open question or already answered"),
        (status = 503, description = "Storage unavailable")
    )
)]
/// Submit one prediction for the active question.
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SubmitAnswerRequest>>,
) -> Result<Json<ParticipantSummary>, AppError> {
    Ok(Json(
        participant_service::submit_answer(&state, id, payload).await?,
    ))
}
