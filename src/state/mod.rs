pub mod game;
pub mod scoring;
mod sse;
pub mod state_machine;
pub mod transitions;

use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::game_store::QuizStore,
    error::ServiceError,
    state::game::QuizSession,
};

pub use self::sse::{SseHub, SseState};
pub use self::state_machine::{
    AbortError, ApplyError, Plan, PlanError, PlanId, QuizEvent, QuizPhase, Snapshot,
};
use self::state_machine::GameStateMachine;

pub type SharedState = Arc<AppState>;
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

/// Central application state: storage handle, SSE hubs, the phase machine and the live roster.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn QuizStore>>>,
    sse: SseState,
    game: RwLock<GameStateMachine>,
    session: RwLock<QuizSession>,
    config: Arc<AppConfig>,
    degraded: watch::Sender<bool>,
    transition_gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_transition_timeout(config, Some(DEFAULT_TRANSITION_TIMEOUT))
    }

    /// Same as [`AppState::new`] with an explicit bound on transition work.
    pub fn with_transition_timeout(config: AppConfig, limit: Option<Duration>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let question_count = config.questions().len();
        Arc::new(Self {
            game_store: RwLock::new(None),
            sse: SseState::new(64, 64),
            game: RwLock::new(GameStateMachine::new(question_count)),
            session: RwLock::new(QuizSession::default()),
            config: Arc::new(config),
            degraded: degraded_tx,
            transition_gate: Mutex::new(()),
            transition_timeout: limit,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Store handle, or [`ServiceError::Degraded`] while none is installed or it is unhealthy.
    pub async fn require_game_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        if *self.degraded.borrow() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when it changes.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the admin SSE stream.
    pub fn admin_sse(&self) -> &SseHub {
        self.sse.admin().hub()
    }

    /// Token guard that ensures a single admin SSE subscriber at a time.
    pub fn admin_token(&self) -> &Mutex<Option<String>> {
        self.sse.admin().token()
    }

    /// SSE sub-state, including the per-participant channels.
    pub fn sse(&self) -> &SseState {
        &self.sse
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Live roster of the running quiz.
    pub fn session(&self) -> &RwLock<QuizSession> {
        &self.session
    }

    /// Current phase of the shared state machine.
    pub async fn phase(&self) -> QuizPhase {
        self.game.read().await.phase()
    }

    pub async fn snapshot(&self) -> Snapshot {
        let sm = self.game.read().await;
        sm.snapshot()
    }

    /// Replace the phase machine and roster with persisted values.
    pub async fn restore(&self, phase: QuizPhase, version: usize, session: QuizSession) {
        let question_count = self.config.questions().len();
        *self.game.write().await = GameStateMachine::restore(question_count, phase, version);
        *self.session.write().await = session;
    }

    /// Serialize a mutation that is not a phase transition (registration, submission)
    /// against every other mutation.
    pub async fn lock_mutations(&self) -> MutexGuard<'_, ()> {
        self.transition_gate.lock().await
    }

    async fn plan_transition(&self, event: QuizEvent) -> Result<Plan, PlanError> {
        let mut sm = self.game.write().await;
        sm.plan(event)
    }

    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<QuizPhase, ApplyError> {
        let mut sm = self.game.write().await;
        sm.apply(plan_id)
    }

    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.game.write().await;
        sm.abort(plan_id)
    }

    /// Plan `event`, run `work` with the plan, then apply on success or abort on failure.
    ///
    /// The work is bounded by the transition timeout; on expiry the plan is aborted and
    /// [`ServiceError::Timeout`] returned with the phase unchanged.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: QuizEvent,
        work: F,
    ) -> Result<(T, QuizPhase), ServiceError>
    where
        F: FnOnce(Plan) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.transition_gate.lock().await;
        let plan = self.plan_transition(event).await?;
        let plan_id = plan.id;

        let work_future = work(plan);
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{game_store::memory::MemoryQuizStore, models::QuestionEntity};

    fn state() -> SharedState {
        let config = AppConfig::with_questions(
            vec![QuestionEntity {
                id: 1,
                question: "Q".into(),
                answer: 80,
            }],
            50,
        )
        .unwrap();
        AppState::with_transition_timeout(config, Some(Duration::from_millis(50)))
    }

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = state();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state.set_game_store(Arc::new(MemoryQuizStore::new())).await;

        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(state.require_game_store().await.is_ok());
        assert!(!state.update_degraded(false));
    }

    #[tokio::test]
    async fn failed_work_aborts_the_plan() {
        let state = state();
        let result = state
            .run_transition(QuizEvent::StartQuiz, |_plan| async {
                Err::<(), _>(ServiceError::InvalidState("nope".into()))
            })
            .await;

        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.phase, QuizPhase::Registration);
        assert_eq!(snapshot.pending, None);
    }

    #[tokio::test]
    async fn slow_work_times_out_and_leaves_phase() {
        let state = state();
        let result = state
            .run_transition(QuizEvent::StartQuiz, |_plan| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Timeout)));
        assert_eq!(state.phase().await, QuizPhase::Registration);
        assert_eq!(state.snapshot().await.pending, None);
    }

    #[tokio::test]
    async fn successful_work_applies_planned_phase() {
        let state = state();
        let (target, next) = state
            .run_transition(QuizEvent::StartQuiz, |plan| async move { Ok(plan.to) })
            .await
            .unwrap();

        assert_eq!(target, QuizPhase::Question { number: 1 });
        assert_eq!(next, target);
        assert_eq!(state.snapshot().await.version, 1);
    }
}
