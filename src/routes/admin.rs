use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};

use crate::{
    dto::admin::{
        ResetRequest, ResetResponse, RosterResponse, RoundResultsResponse, TransitionResponse,
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Admin-only endpoints driving the quiz.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/participants", get(list_participants))
        .route("/admin/game/start", post(start_quiz))
        .route("/admin/game/results", post(show_results))
        .route("/admin/game/next", post(next_question))
        .route("/admin/game/reset", post(reset_game))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Full roster with answers, diffs and per-phase status.
#[utoipa::path(
    get,
    path = "/admin/participants",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Participant roster", body = RosterResponse))
)]
pub async fn list_participants(State(state): State<SharedState>) -> Json<RosterResponse> {
    Json(admin_service::roster(&state).await)
}

/// Open the first question.
#[utoipa::path(
    post,
    path = "/admin/game/start",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses(
        (status = 200, description = "First question opened", body = TransitionResponse),
        (status = 409, description = "Quiz already started or no participants"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn start_quiz(
    State(state): State<SharedState>,
) -> Result<Json<TransitionResponse>, AppError> {
    Ok(Json(admin_service::start_quiz(&state).await?))
}

/// Close the active question and score it.
#[utoipa::path(
    post,
    path = "/admin/game/results",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses(
        (status = 200, description = "Round scored", body = RoundResultsResponse),
        (status = 409, description = "No question is open"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn show_results(
    State(state): State<SharedState>,
) -> Result<Json<RoundResultsResponse>, AppError> {
    Ok(Json(admin_service::show_results(&state).await?))
}

/// Open the next question, or show the final standings after the last one.
#[utoipa::path(
    post,
    path = "/admin/game/next",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses(
        (status = 200, description = "Quiz advanced", body = TransitionResponse),
        (status = 409, description = "Results are not displayed"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn next_question(
    State(state): State<SharedState>,
) -> Result<Json<TransitionResponse>, AppError> {
    Ok(Json(admin_service::next_question(&state).await?))
}

/// Delete every participant and return to registration.
#[utoipa::path(
    post,
    path = "/admin/game/reset",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Quiz reset", body = ResetResponse),
        (status = 400, description = "Reset not confirmed"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn reset_game(
    State(state): State<SharedState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, AppError> {
    Ok(Json(admin_service::reset_game(&state, payload).await?))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    let expected = {
        let guard = state.admin_token().lock().await;
        guard.clone()
    };

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "no admin stream is connected".into(),
        )),
    }
}
