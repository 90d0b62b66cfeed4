//! Process-local store used for development and tests. Nothing survives a restart.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    game_store::QuizStore,
    models::{GameStateEntity, ParticipantEntity},
    storage::{StorageResult, WriteOutcome},
};

/// In-memory [`QuizStore`] backed by a [`DashMap`].
#[derive(Clone, Default)]
pub struct MemoryQuizStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    game_state: RwLock<Option<GameStateEntity>>,
    participants: DashMap<Uuid, ParticipantEntity>,
}

impl MemoryQuizStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, participant: ParticipantEntity) -> WriteOutcome {
        let participants = &self.inner.participants;
        if participants.contains_key(&participant.id)
            || participants
                .iter()
                .any(|entry| entry.value().name == participant.name)
        {
            return WriteOutcome::Conflict;
        }

        participants.insert(participant.id, participant);
        WriteOutcome::Written
    }

    fn update(&self, participant: ParticipantEntity, expected_revision: u64) -> WriteOutcome {
        match self.inner.participants.get_mut(&participant.id) {
            Some(mut stored) if stored.revision == expected_revision => {
                *stored = participant;
                WriteOutcome::Written
            }
            _ => WriteOutcome::Conflict,
        }
    }
}

impl QuizStore for MemoryQuizStore {
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.game_state.read().await.clone()) })
    }

    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            *store.inner.game_state.write().await = Some(state);
            Ok(())
        })
    }

    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .participants
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .participants
                .get(&id)
                .map(|entry| entry.value().clone()))
        })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.insert(participant)) })
    }

    fn update_participant(
        &self,
        participant: ParticipantEntity,
        expected_revision: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.update(participant, expected_revision)) })
    }

    fn delete_all_participants(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let removed = store.inner.participants.len() as u64;
            store.inner.participants.clear();
            Ok(removed)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::SystemTime};

    use super::*;

    fn entity(name: &str) -> ParticipantEntity {
        ParticipantEntity {
            id: Uuid::new_v4(),
            name: name.into(),
            answers: BTreeMap::new(),
            submitted: false,
            current_score: 0,
            total_score: 0,
            prediction_diffs: Vec::new(),
            scored_questions: Vec::new(),
            revision: 0,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_names() {
        let store = MemoryQuizStore::new();

        let first = store.insert_participant(entity("Ada")).await.unwrap();
        let second = store.insert_participant(entity("Ada")).await.unwrap();
        let other_case = store.insert_participant(entity("ada")).await.unwrap();

        assert_eq!(first, WriteOutcome::Written);
        assert_eq!(second, WriteOutcome::Conflict);
        assert_eq!(other_case, WriteOutcome::Written);
    }

    #[tokio::test]
    async fn update_is_revision_checked() {
        let store = MemoryQuizStore::new();
        let mut record = entity("Ada");
        store.insert_participant(record.clone()).await.unwrap();

        record.total_score = 15;
        record.revision = 1;
        assert_eq!(
            store.update_participant(record.clone(), 0).await.unwrap(),
            WriteOutcome::Written
        );

        record.total_score = 30;
        record.revision = 2;
        assert_eq!(
            store.update_participant(record.clone(), 0).await.unwrap(),
            WriteOutcome::Conflict
        );

        let stored = store.find_participant(record.id).await.unwrap().unwrap();
        assert_eq!(stored.total_score, 15);
    }

    #[tokio::test]
    async fn delete_all_clears_roster() {
        let store = MemoryQuizStore::new();
        store.insert_participant(entity("Ada")).await.unwrap();
        store.insert_participant(entity("Grace")).await.unwrap();

        assert_eq!(store.delete_all_participants().await.unwrap(), 2);
        assert!(store.list_participants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn game_state_round_trips() {
        let store = MemoryQuizStore::new();
        assert!(store.load_game_state().await.unwrap().is_none());

        let state = GameStateEntity::initial(4);
        store.save_game_state(state.clone()).await.unwrap();
        assert_eq!(store.load_game_state().await.unwrap(), Some(state));
    }
}
