use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::debug;
use uuid::Uuid;

use crate::dao::{
    game_store::QuizStore,
    models::{GameStateEntity, ParticipantEntity},
    storage::{StorageResult, WriteOutcome},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, BulkDocsRequest, CouchGameStateDocument, CouchParticipantDocument,
        DeletedDocument, END_SUFFIX, GAME_STATE_DOC_ID, PARTICIPANT_PREFIX, participant_doc_id,
    },
};

/// [`QuizStore`] talking to CouchDB over its HTTP API.
#[derive(Clone)]
pub struct CouchQuizStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchQuizStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.with_auth(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means another instance created it first.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// PUT a document; a 409 from CouchDB is reported as [`WriteOutcome::Conflict`].
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<WriteOutcome>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(WriteOutcome::Conflict),
            status if status.is_success() => Ok(WriteOutcome::Written),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| {
                from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: ALL_DOCS.to_string(),
                    source,
                })
            })
            .collect()
    }

    async fn save_game_state(&self, state: GameStateEntity) -> CouchResult<()> {
        let mut doc = CouchGameStateDocument::from_entity(state);
        if let Some(existing) = self
            .get_document::<CouchGameStateDocument>(GAME_STATE_DOC_ID)
            .await?
        {
            doc.rev = existing.rev;
        }

        match self.put_document(GAME_STATE_DOC_ID, &doc).await? {
            WriteOutcome::Written => Ok(()),
            WriteOutcome::Conflict => Err(CouchDaoError::RequestStatus {
                path: GAME_STATE_DOC_ID.to_string(),
                status: StatusCode::CONFLICT,
            }),
        }
    }

    async fn list_participants(&self) -> CouchResult<Vec<CouchParticipantDocument>> {
        self.list_documents::<CouchParticipantDocument>(PARTICIPANT_PREFIX)
            .await
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> CouchResult<WriteOutcome> {
        // CouchDB has no unique secondary index, so names are checked against the roster.
        let taken = self
            .list_participants()
            .await?
            .iter()
            .any(|doc| doc.participant.name == participant.name);
        if taken {
            debug!(name = %participant.name, "participant name already stored");
            return Ok(WriteOutcome::Conflict);
        }

        let doc_id = participant_doc_id(participant.id);
        let doc = CouchParticipantDocument::from_entity(participant, None);
        self.put_document(&doc_id, &doc).await
    }

    async fn update_participant(
        &self,
        participant: ParticipantEntity,
        expected_revision: u64,
    ) -> CouchResult<WriteOutcome> {
        let doc_id = participant_doc_id(participant.id);
        let Some(existing) = self
            .get_document::<CouchParticipantDocument>(&doc_id)
            .await?
        else {
            return Ok(WriteOutcome::Conflict);
        };

        if existing.participant.revision != expected_revision {
            return Ok(WriteOutcome::Conflict);
        }

        let doc = CouchParticipantDocument::from_entity(participant, existing.rev);
        self.put_document(&doc_id, &doc).await
    }

    async fn delete_all_participants(&self) -> CouchResult<u64> {
        const BULK_DOCS: &str = "_bulk_docs";
        let docs: Vec<DeletedDocument> = self
            .list_participants()
            .await?
            .into_iter()
            .filter_map(|doc| {
                doc.rev.map(|rev| DeletedDocument {
                    id: doc.id,
                    rev,
                    deleted: true,
                })
            })
            .collect();

        if docs.is_empty() {
            return Ok(0);
        }

        let count = docs.len() as u64;
        let response = self
            .request(Method::POST, BULK_DOCS)
            .json(&BulkDocsRequest { docs })
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: BULK_DOCS.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(count)
        } else {
            Err(CouchDaoError::RequestStatus {
                path: BULK_DOCS.to_string(),
                status: response.status(),
            })
        }
    }

    async fn ping(&self) -> CouchResult<()> {
        let url = self.database_url();
        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: url.clone(),
                source,
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: url,
                status: response.status(),
            })
        }
    }
}

impl QuizStore for CouchQuizStore {
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchGameStateDocument>(GAME_STATE_DOC_ID)
                .await?;
            Ok(doc.map(|doc| doc.state))
        })
    }

    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game_state(state).await.map_err(Into::into) })
    }

    fn list_participants(&self) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store.list_participants().await?;
            Ok(docs.into_iter().map(|doc| doc.participant).collect())
        })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchParticipantDocument>(&participant_doc_id(id))
                .await?;
            Ok(doc.map(|doc| doc.participant))
        })
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
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
