use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::QuizStore, storage::StorageError},
    services::{game_service, sse_events},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the storage backend, restore the quiz from it and keep watching its health.
///
/// The shared state stays in degraded mode until a store is installed and bootstrapped.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn QuizStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                continue;
            }
        };

        if let Err(err) = game_service::bootstrap(&state, store.clone()).await {
            warn!(error = %err, "failed to restore quiz state from storage");
            sleep(delay).await;
            delay = (delay * 2).min(MAX_DELAY);
            continue;
        }

        state.set_game_store(store.clone()).await;
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        if !watch_health(&state, store.as_ref()).await {
            warn!("exhausted storage reconnect attempts; staying in degraded mode");
            state.clear_game_store().await;
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Poll the store until it fails and cannot be reconnected. Returns `false` in that case.
async fn watch_health(state: &SharedState, store: &dyn QuizStore) -> bool {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.update_degraded(false) {
                    info!("storage healthy again; leaving degraded mode");
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                if !reconnect(state, store).await {
                    return false;
                }
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}

async fn reconnect(state: &SharedState, store: &dyn QuizStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}

/// Forward degraded-mode changes to the public and admin streams.
pub async fn watch_degraded(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        info!(degraded, "system status changed");
        sse_events::broadcast_system_status(&state, degraded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::memory::MemoryQuizStore,
        state::{AppState, QuizPhase},
    };

    #[tokio::test]
    async fn supervisor_installs_store_and_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());

        let store: Arc<dyn QuizStore> = Arc::new(MemoryQuizStore::default());
        let handle = tokio::spawn(run(state.clone(), move || {
            let store = store.clone();
            async move { Ok(store) }
        }));

        let mut watcher = state.degraded_watcher();
        tokio::time::timeout(Duration::from_secs(2), watcher.wait_for(|degraded| !degraded))
            .await
            .expect("supervisor did not leave degraded mode")
            .unwrap();

        assert!(state.game_store().await.is_some());
        assert_eq!(state.phase().await, QuizPhase::Registration);
        handle.abort();
    }

    #[tokio::test]
    async fn degraded_changes_reach_public_stream() {
        let state = AppState::new(AppConfig::default());
        let mut rx = state.public_sse().subscribe();
        let handle = tokio::spawn(watch_degraded(state.clone()));
        tokio::task::yield_now().await;

        state.update_degraded(false);

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event.as_deref(), Some("system_status"));
        assert!(event.data.contains("false"));
        handle.abort();
    }
}
