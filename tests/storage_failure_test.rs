use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use forecast_quiz_back::{
    config::AppConfig,
    dao::{
        game_store::{QuizStore, memory::MemoryQuizStore},
        models::{GameStateEntity, ParticipantEntity, QuestionEntity},
        storage::{StorageError, StorageResult, WriteOutcome},
    },
    dto::{
        admin::ResetRequest,
        participant::{RegisterRequest, SubmitAnswerRequest},
    },
    error::ServiceError,
    services::{admin_service, game_service, participant_service},
    state::{AppState, QuizPhase, SharedState},
};
use futures::future::{BoxFuture, FutureExt};
use uuid::Uuid;

/// Memory store whose game-state and participant writes can be made to fail.
#[derive(Clone)]
struct FailingStore {
    inner: MemoryQuizStore,
    fail_game_state: Arc<AtomicBool>,
    participant_writes_left: Arc<AtomicUsize>,
}

impl FailingStore {
    fn new() -> Self {
        Self {
            inner: MemoryQuizStore::new(),
            fail_game_state: Arc::new(AtomicBool::new(false)),
            participant_writes_left: Arc::new(AtomicUsize::new(usize::MAX)),
        }
    }

    fn fail_game_state_writes(&self, fail: bool) {
        self.fail_game_state.store(fail, Ordering::SeqCst);
    }

    fn allow_participant_writes(&self, count: usize) {
        self.participant_writes_left.store(count, Ordering::SeqCst);
    }

    fn take_participant_write(&self) -> bool {
        self.participant_writes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

fn outage<T: Send + 'static>(what: &str) -> BoxFuture<'static, StorageResult<T>> {
    let error = StorageError::unavailable(
        format!("{what} failed"),
        std::io::Error::other("connection reset"),
    );
    async move { Err(error) }.boxed()
}

impl QuizStore for FailingStore {
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        self.inner.load_game_state()
    }

    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        if self.fail_game_state.load(Ordering::SeqCst) {
            return outage("save game state");
        }
        self.inner.save_game_state(state)
    }

    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        self.inner.list_participants()
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        self.inner.find_participant(id)
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        self.inner.insert_participant(participant)
    }

    fn update_participant(
        &self,
        participant: ParticipantEntity,
        expected_revision: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        if !self.take_participant_write() {
            return outage("update participant");
        }
        self.inner.update_participant(participant, expected_revision)
    }

    fn delete_all_participants(&self) -> BoxFuture<'static, StorageResult<u64>> {
        self.inner.delete_all_participants()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

fn one_question_config() -> AppConfig {
    AppConfig::with_questions(
        vec![QuestionEntity {
            id: 1,
            question: "Share of households owning a bicycle?".into(),
            answer: 80,
        }],
        50,
    )
    .expect("valid question bank")
}

async fn ready_state() -> (SharedState, FailingStore) {
    let state = AppState::new(one_question_config());
    let store = FailingStore::new();
    game_service::bootstrap(&state, Arc::new(store.clone()))
        .await
        .unwrap();
    state.set_game_store(Arc::new(store.clone())).await;
    (state, store)
}

async fn register(state: &SharedState, name: &str) -> Uuid {
    participant_service::register(state, RegisterRequest { name: name.into() })
        .await
        .unwrap()
        .id
}

async fn submit(state: &SharedState, id: Uuid, prediction: i32) -> Result<(), ServiceError> {
    participant_service::submit_answer(
        state,
        id,
        SubmitAnswerRequest {
            prediction,
            question_id: None,
        },
    )
    .await
    .map(|_| ())
}

#[tokio::test]
async fn failed_game_state_write_after_reset_still_drops_roster() {
    let (state, store) = ready_state().await;
    let ada = register(&state, "Ada").await;
    admin_service::start_quiz(&state).await.unwrap();

    store.fail_game_state_writes(true);
    assert!(matches!(
        admin_service::reset_game(&state, ResetRequest { confirm: true }).await,
        Err(ServiceError::Unavailable(_))
    ));

    assert!(store.list_participants().await.unwrap().is_empty());
    assert!(state.session().read().await.participants.is_empty());
    assert!(matches!(
        participant_service::resume(&state, ada).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        submit(&state, ada, 40).await,
        Err(ServiceError::NotFound(_))
    ));

    store.fail_game_state_writes(false);
    let reset = admin_service::reset_game(&state, ResetRequest { confirm: true })
        .await
        .unwrap();
    assert_eq!(reset.deleted_participants, 0);
    assert_eq!(state.phase().await, QuizPhase::Registration);
    assert!(matches!(
        admin_service::start_quiz(&state).await,
        Err(ServiceError::InvalidState(_))
    ));
}

#[tokio::test]
async fn retrying_partially_failed_scoring_keeps_scores_consistent() {
    let (state, store) = ready_state().await;
    let ada = register(&state, "Ada").await;
    let bob = register(&state, "Bob").await;
    admin_service::start_quiz(&state).await.unwrap();
    submit(&state, bob, 95).await.unwrap();

    // Ada is scored at the default, then Bob's write fails.
    store.allow_participant_writes(1);
    assert!(matches!(
        admin_service::show_results(&state).await,
        Err(ServiceError::Unavailable(_))
    ));
    assert_eq!(state.phase().await, QuizPhase::Question { number: 1 });

    assert!(matches!(
        submit(&state, ada, 80).await,
        Err(ServiceError::InvalidState(_))
    ));

    store.allow_participant_writes(usize::MAX);
    let round = admin_service::show_results(&state).await.unwrap();
    assert_eq!(round.scored, 1);
    assert_eq!(round.already_scored, 1);
    assert_eq!(round.defaulted, 0);
    assert_eq!(state.phase().await, QuizPhase::Results { number: 1 });

    let session = state.session().read().await;
    let ada_record = &session.participants[&ada];
    assert_eq!(ada_record.answer_for(1), None);
    assert_eq!(ada_record.current_score, 30);
    assert_eq!(ada_record.total_score, 30);
    assert_eq!(ada_record.prediction_diffs, vec![-30]);

    let bob_record = &session.participants[&bob];
    assert_eq!(bob_record.answer_for(1), Some(95));
    assert_eq!(bob_record.total_score, 15);
    assert_eq!(bob_record.prediction_diffs, vec![15]);
}
