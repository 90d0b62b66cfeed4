use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the quiz can currently persist writes, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    if state.is_degraded() {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::game_store::memory::MemoryQuizStore, state::AppState,
    };

    #[tokio::test]
    async fn degraded_until_store_installed() {
        let state = AppState::new(AppConfig::default());
        assert_eq!(health_status(&state).await, HealthResponse::degraded());

        state
            .set_game_store(Arc::new(MemoryQuizStore::default()))
            .await;
        assert_eq!(health_status(&state).await, HealthResponse::ok());
    }
}
