use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the forecast quiz backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_phase,
        crate::routes::public::get_current_question,
        crate::routes::public::get_standings,
        crate::routes::public::get_histogram,
        crate::routes::public::get_winner,
        crate::routes::participant::register,
        crate::routes::participant::resume_session,
        crate::routes::participant::submit_answer,
        crate::routes::admin::list_participants,
        crate::routes::admin::start_quiz,
        crate::routes::admin::show_results,
        crate::routes::admin::next_question,
        crate::routes::admin::reset_game,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::sse::participant_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::phase::VisiblePhase,
            crate::dto::common::PhaseSnapshot,
            crate::dto::common::QuestionView,
            crate::dto::participant::RegisterRequest,
            crate::dto::participant::SubmitAnswerRequest,
            crate::dto::participant::ParticipantSummary,
            crate::dto::participant::DiffBadge,
            crate::dto::participant::SessionResponse,
            crate::dto::public::StandingEntry,
            crate::dto::public::StandingsResponse,
            crate::dto::public::HistogramBinDto,
            crate::dto::public::HistogramResponse,
            crate::dto::public::WinnerEntry,
            crate::dto::public::WinnerResponse,
            crate::dto::admin::ResetRequest,
            crate::dto::admin::TransitionResponse,
            crate::dto::admin::RoundResultsResponse,
            crate::dto::admin::ResetResponse,
            crate::dto::admin::RosterEntry,
            crate::dto::admin::RosterResponse,
            crate::dto::sse::AdminHandshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::ParticipantRegisteredEvent,
            crate::dto::sse::ParticipantUpdatedEvent,
            crate::dto::sse::ParticipantDeletedEvent,
            crate::dto::sse::AnswerSubmittedEvent,
            crate::dto::sse::RoundScoredEvent,
            crate::dto::sse::GameResetEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only views for the shared display"),
        (name = "participants", description = "Registration and prediction submission"),
        (name = "admin", description = "Quiz control, requires the admin token"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
