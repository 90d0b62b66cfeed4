use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        GAME_STATE_ID, MongoGameStateDocument, MongoParticipantDocument, participant_filter,
        revision_filter,
    },
};
use crate::dao::{
    game_store::QuizStore,
    models::{GameStateEntity, ParticipantEntity},
    storage::{StorageResult, WriteOutcome},
};

const PARTICIPANT_COLLECTION_NAME: &str = "students";
const GAME_STATE_COLLECTION_NAME: &str = "game_states";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// [`QuizStore`] persisting into MongoDB.
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.participants().await;
        let index = IndexModel::builder()
            .keys(doc! {"name": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("student_name_unique_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION_NAME,
                index: "name",
                source,
            })?;

        Ok(())
    }

    async fn participants(&self) -> Collection<MongoParticipantDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoParticipantDocument>(PARTICIPANT_COLLECTION_NAME)
    }

    async fn game_states(&self) -> Collection<MongoGameStateDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoGameStateDocument>(GAME_STATE_COLLECTION_NAME)
    }

    async fn load_game_state(&self) -> MongoResult<Option<GameStateEntity>> {
        let collection = self.game_states().await;
        let document = collection
            .find_one(doc! {"_id": GAME_STATE_ID})
            .await
            .map_err(|source| MongoDaoError::LoadGameState { source })?;
        Ok(document.map(Into::into))
    }

    async fn save_game_state(&self, state: GameStateEntity) -> MongoResult<()> {
        let document: MongoGameStateDocument = state.into();
        let collection = self.game_states().await;
        collection
            .replace_one(doc! {"_id": GAME_STATE_ID}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGameState { source })?;
        Ok(())
    }

    async fn list_participants(&self) -> MongoResult<Vec<ParticipantEntity>> {
        let collection = self.participants().await;
        let documents: Vec<MongoParticipantDocument> = collection
            .find(doc! {})
            .sort(doc! {"created_at": 1})
            .await
            .map_err(|source| MongoDaoError::ListParticipants { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListParticipants { source })?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_participant(&self, id: Uuid) -> MongoResult<Option<ParticipantEntity>> {
        let collection = self.participants().await;
        collection
            .find_one(participant_filter(id))
            .await
            .map_err(|source| MongoDaoError::LoadParticipant { id, source })?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> MongoResult<WriteOutcome> {
        let id = participant.id;
        let document: MongoParticipantDocument = participant.into();
        let collection = self.participants().await;
        match collection.insert_one(&document).await {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(err) if is_duplicate_key(&err) => {
                debug!(participant_id = %id, "duplicate participant rejected by unique index");
                Ok(WriteOutcome::Conflict)
            }
            Err(source) => Err(MongoDaoError::InsertParticipant { id, source }),
        }
    }

    async fn update_participant(
        &self,
        participant: ParticipantEntity,
        expected_revision: u64,
    ) -> MongoResult<WriteOutcome> {
        let id = participant.id;
        let document: MongoParticipantDocument = participant.into();
        let collection = self.participants().await;
        let result = collection
            .replace_one(revision_filter(id, expected_revision), &document)
            .await
            .map_err(|source| MongoDaoError::UpdateParticipant { id, source })?;

        if result.matched_count == 0 {
            Ok(WriteOutcome::Conflict)
        } else {
            Ok(WriteOutcome::Written)
        }
    }

    async fn delete_all_participants(&self) -> MongoResult<u64> {
        let collection = self.participants().await;
        let result = collection
            .delete_many(doc! {})
            .await
            .map_err(|source| MongoDaoError::DeleteParticipants { source })?;
        Ok(result.deleted_count)
    }
}

impl QuizStore for MongoQuizStore {
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.load_game_state().await.map_err(Into::into) })
    }

    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game_state(state).await.map_err(Into::into) })
    }

    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_participants().await.map_err(Into::into) })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_participant(id).await.map_err(Into::into) })
    }

    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_participant(participant)
                .await
                .map_err(Into::into)
        })
    }

    fn update_participant(
        &self,
        participant: ParticipantEntity,
        expected_revision: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_participant(participant, expected_revision)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_all_participants(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.delete_all_participants().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
