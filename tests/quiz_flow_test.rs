use std::{sync::Arc, time::Duration};

use forecast_quiz_back::{
    config::AppConfig,
    dao::{
        game_store::{QuizStore, memory::MemoryQuizStore},
        models::{PhaseEntity, QuestionEntity},
    },
    dto::{
        admin::ResetRequest,
        participant::{RegisterRequest, SubmitAnswerRequest},
    },
    error::ServiceError,
    services::{admin_service, game_service, participant_service, public_service, sse_service},
    state::{AppState, QuizPhase, SharedState},
};
use uuid::Uuid;

fn two_question_config() -> AppConfig {
    AppConfig::with_questions(
        vec![
            QuestionEntity {
                id: 1,
                question: "Share of households owning a bicycle?".into(),
                answer: 80,
            },
            QuestionEntity {
                id: 2,
                question: "Share of commuters working remotely?".into(),
                answer: 30,
            },
        ],
        50,
    )
    .expect("valid question bank")
}

async fn ready_state() -> (SharedState, MemoryQuizStore) {
    let state = AppState::new(two_question_config());
    let store = MemoryQuizStore::new();
    game_service::bootstrap(&state, Arc::new(store.clone()))
        .await
        .unwrap();
    state.set_game_store(Arc::new(store.clone())).await;
    (state, store)
}

async fn register(state: &SharedState, name: &str) -> Result<Uuid, ServiceError> {
    participant_service::register(state, RegisterRequest { name: name.into() })
        .await
        .map(|summary| summary.id)
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
async fn writes_are_rejected_while_degraded() {
    let state = AppState::new(two_question_config());
    assert!(matches!(
        register(&state, "Ada").await,
        Err(ServiceError::Degraded)
    ));
    assert!(matches!(
        admin_service::start_quiz(&state).await,
        Err(ServiceError::Degraded)
    ));
}

#[tokio::test]
async fn registration_rules() {
    let (state, store) = ready_state().await;

    register(&state, "Ada").await.unwrap();
    assert!(matches!(
        register(&state, "  Ada ").await,
        Err(ServiceError::Conflict(_))
    ));
    assert!(register(&state, "ada").await.is_ok());
    assert!(matches!(
        register(&state, "   ").await,
        Err(ServiceError::InvalidInput(_))
    ));

    admin_service::start_quiz(&state).await.unwrap();
    assert!(matches!(
        register(&state, "Late").await,
        Err(ServiceError::InvalidState(_))
    ));

    assert_eq!(store.list_participants().await.unwrap().len(), 2);
}

#[tokio::test]
async fn quiz_cannot_start_without_participants() {
    let (state, _store) = ready_state().await;
    assert!(matches!(
        admin_service::start_quiz(&state).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert_eq!(state.phase().await, QuizPhase::Registration);
}

#[tokio::test]
async fn full_quiz_scores_and_picks_winner() {
    let (state, store) = ready_state().await;
    let ada = register(&state, "Ada").await.unwrap();
    let bob = register(&state, "Bob").await.unwrap();

    assert!(matches!(
        submit(&state, ada, 40).await,
        Err(ServiceError::InvalidState(_))
    ));

    admin_service::start_quiz(&state).await.unwrap();
    assert_eq!(state.phase().await, QuizPhase::Question { number: 1 });

    submit(&state, ada, 65).await.unwrap();
    submit(&state, bob, 95).await.unwrap();
    assert!(matches!(
        submit(&state, ada, 70).await,
        Err(ServiceError::Conflict(_))
    ));
    assert!(matches!(
        submit(&state, Uuid::new_v4(), 70).await,
        Err(ServiceError::NotFound(_))
    ));

    let stale = participant_service::submit_answer(
        &state,
        bob,
        SubmitAnswerRequest {
            prediction: 10,
            question_id: Some(2),
        },
    )
    .await;
    assert!(matches!(stale, Err(ServiceError::InvalidState(_))));

    let round = admin_service::show_results(&state).await.unwrap();
    assert_eq!(round.scored, 2);
    assert_eq!(round.defaulted, 0);
    assert_eq!(round.question.answer, Some(80));

    {
        let session = state.session().read().await;
        let ada_record = &session.participants[&ada];
        let bob_record = &session.participants[&bob];
        assert_eq!(ada_record.answer_for(1), Some(65));
        assert!(ada_record.submitted);
        assert_eq!(ada_record.current_score, 15);
        assert_eq!(ada_record.prediction_diffs, vec![-15]);
        assert_eq!(bob_record.current_score, 15);
        assert_eq!(bob_record.prediction_diffs, vec![15]);
    }

    let summary = participant_service::resume(&state, ada).await.unwrap();
    assert_eq!(summary.participant.diff_badges[0].label, "-15%");

    // A second scoring request for the same round is refused and changes nothing.
    assert!(matches!(
        admin_service::show_results(&state).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert_eq!(
        state.session().read().await.participants[&ada].total_score,
        15
    );

    let histogram = public_service::get_histogram(&state).await.unwrap();
    assert_eq!(histogram.responses, 2);
    assert!(histogram.bins[8].contains_answer);

    admin_service::next_question(&state).await.unwrap();
    assert_eq!(state.phase().await, QuizPhase::Question { number: 2 });
    assert!(!state.session().read().await.participants[&ada].submitted);

    submit(&state, ada, 30).await.unwrap();
    let round = admin_service::show_results(&state).await.unwrap();
    assert_eq!(round.scored, 2);
    assert_eq!(round.defaulted, 1);

    let standings = public_service::get_standings(&state).await;
    assert_eq!(standings.sorted_by, "current_score");
    assert_eq!(standings.standings[0].id, ada);
    assert_eq!(standings.standings[1].current_score, 20);

    let finished = admin_service::next_question(&state).await.unwrap();
    assert_eq!(state.phase().await, QuizPhase::Final);
    assert_eq!(finished.phase.question_count, 2);

    let winner = public_service::get_winner(&state).await.unwrap();
    assert_eq!(winner.winner.id, ada);
    assert_eq!(winner.winner.total_score, 15);
    assert!(winner.tied_with.is_empty());

    let persisted = store.load_game_state().await.unwrap().unwrap();
    assert_eq!(persisted.phase, PhaseEntity::Final);
    assert_eq!(persisted.current_question, 2);

    let stored_bob = store.find_participant(bob).await.unwrap().unwrap();
    assert_eq!(stored_bob.total_score, 35);
    assert_eq!(stored_bob.prediction_diffs, vec![15, 20]);
}

#[tokio::test]
async fn reset_clears_everything_and_closes_participant_streams() {
    let (state, store) = ready_state().await;
    let ada = register(&state, "Ada").await.unwrap();
    admin_service::start_quiz(&state).await.unwrap();
    submit(&state, ada, 50).await.unwrap();

    let mut stream = sse_service::subscribe_participant(&state, ada)
        .await
        .unwrap();

    assert!(matches!(
        admin_service::reset_game(&state, ResetRequest { confirm: false }).await,
        Err(ServiceError::InvalidInput(_))
    ));
    assert_eq!(state.phase().await, QuizPhase::Question { number: 1 });

    let reset = admin_service::reset_game(&state, ResetRequest { confirm: true })
        .await
        .unwrap();
    assert_eq!(reset.deleted_participants, 1);
    assert_eq!(state.phase().await, QuizPhase::Registration);
    assert!(state.session().read().await.participants.is_empty());
    assert!(store.list_participants().await.unwrap().is_empty());

    let persisted = store.load_game_state().await.unwrap().unwrap();
    assert_eq!(persisted.phase, PhaseEntity::Registration);
    assert_eq!(persisted.current_question, 1);

    let farewell = tokio::time::timeout(Duration::from_secs(1), stream.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(farewell.event.as_deref(), Some("participant.deleted"));
    assert!(stream.recv().await.is_err());

    assert!(matches!(
        participant_service::resume(&state, ada).await,
        Err(ServiceError::NotFound(_))
    ));
    register(&state, "Ada").await.unwrap();
}

#[tokio::test]
async fn restart_restores_persisted_progress() {
    let (state, store) = ready_state().await;
    let ada = register(&state, "Ada").await.unwrap();
    admin_service::start_quiz(&state).await.unwrap();
    submit(&state, ada, 70).await.unwrap();
    admin_service::show_results(&state).await.unwrap();

    let restarted = AppState::new(two_question_config());
    game_service::bootstrap(&restarted, Arc::new(store.clone()))
        .await
        .unwrap();

    assert_eq!(restarted.phase().await, QuizPhase::Results { number: 1 });
    let session = restarted.session().read().await;
    assert_eq!(session.participants[&ada].total_score, 10);
    assert!(session.participants[&ada].is_scored(1));
}
