use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load the game state")]
    LoadGameState {
        #[source]
        source: MongoError,
    },
    #[error("failed to save the game state")]
    SaveGameState {
        #[source]
        source: MongoError,
    },
    #[error("failed to list participants")]
    ListParticipants {
        #[source]
        source: MongoError,
    },
    #[error("failed to load participant `{id}`")]
    LoadParticipant {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to insert participant `{id}`")]
    InsertParticipant {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to update participant `{id}`")]
    UpdateParticipant {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete participants")]
    DeleteParticipants {
        #[source]
        source: MongoError,
    },
    #[error("stored participant `{id}` is malformed: {reason}")]
    MalformedParticipant { id: String, reason: String },
}
