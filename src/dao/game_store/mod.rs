#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{GameStateEntity, ParticipantEntity};
use crate::dao::storage::{StorageResult, WriteOutcome};
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for the game-state document and participant records.
pub trait QuizStore: Send + Sync {
    /// Read the singleton game-state document.
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    /// Overwrite the singleton game-state document.
    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// List every participant record.
    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Point read of a participant record.
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    /// Create a participant; reports a conflict when the id or name is already taken.
    fn insert_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>>;
    /// Replace a participant only if the stored revision equals `expected_revision`.
    fn update_participant(
        &self,
        participant: ParticipantEntity,
        expected_revision: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>>;
    /// Delete every participant record, returning how many were removed.
    fn delete_all_participants(&self) -> BoxFuture<'static, StorageResult<u64>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
