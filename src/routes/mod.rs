use axum::Router;

use crate::state::SharedState;

pub mod admin;
pub mod docs;
pub mod health;
pub mod participant;
pub mod public;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(public::router())
        .merge(participant::router())
        .merge(admin::router(state.clone()))
        .merge(sse::router())
        .merge(docs::router())
        .with_state(state)
}
