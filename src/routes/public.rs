use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::{
        common::{PhaseSnapshot, QuestionView},
        public::{HistogramResponse, NoQuery, StandingsResponse, WinnerResponse},
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints for the shared display.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/phase", get(get_phase))
        .route("/public/question", get(get_current_question))
        .route("/public/standings", get(get_standings))
        .route("/public/histogram", get(get_histogram))
        .route("/public/winner", get(get_winner))
}

#[utoipa::path(
    get,
    path = "/public/phase",
    tag = "public",
    responses((status = 200, description = "Current quiz phase", body = PhaseSnapshot))
)]
/// Return the phase the quiz is currently in.
pub async fn get_phase(
    State(state): State<SharedState>,
    Query(_no_query): Query<NoQuery>,
) -> Json<PhaseSnapshot> {
    Json(public_service::get_phase(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/question",
    tag = "public",
    responses(
        (status = 200, description = "Question on display", body = QuestionView),
        (status = 404, description = "No question is active")
    )
)]
/// Return the question on display; the answer is included once scored.
pub async fn get_current_question(
    State(state): State<SharedState>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<QuestionView>, AppError> {
    Ok(Json(public_service::get_current_question(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/standings",
    tag = "public",
    responses((status = 200, description = "Standings, lower is better", body = StandingsResponse))
)]
/// Return the standings sorted for the current phase.
pub async fn get_standings(
    State(state): State<SharedState>,
    Query(_no_query): Query<NoQuery>,
) -> Json<StandingsResponse> {
    Json(public_service::get_standings(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/histogram",
    tag = "public",
    responses(
        (status = 200, description = "Prediction distribution", body = HistogramResponse),
        (status = 409, description = "Round not scored yet")
    )
)]
/// Return the distribution of predictions for the scored question.
pub async fn get_histogram(
    State(state): State<SharedState>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<HistogramResponse>, AppError> {
    Ok(Json(public_service::get_histogram(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/winner",
    tag = "public",
    responses(
        (status = 200, description = "Winner of the quiz", body = WinnerResponse),
        (status = 404, description = "No participants"),
        (status = 409, description = "Quiz not finished")
    )
)]
/// Return the winner once the final standings are displayed.
pub async fn get_winner(
    State(state): State<SharedState>,
    Query(_no_query): Query<NoQuery>,
) -> Result<Json<WinnerResponse>, AppError> {
    Ok(Json(public_service::get_winner(&state).await?))
}
