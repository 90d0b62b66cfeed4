use std::future::Future;

use crate::{
    error::ServiceError,
    services::sse_events::broadcast_phase_changed,
    state::{Plan, QuizEvent, SharedState},
};

/// Execute a planned state-machine transition, then broadcast the resulting phase change.
pub async fn run_transition_with_broadcast<F, Fut, T>(
    state: &SharedState,
    event: QuizEvent,
    work: F,
) -> Result<T, ServiceError>
where
    F: FnOnce(Plan) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let (res, next) = state.run_transition(event, work).await?;
    broadcast_phase_changed(state, next).await;
    Ok(res)
}
