use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::{GameStateEntity, ParticipantEntity};

pub const PARTICIPANT_PREFIX: &str = "student::";
pub const GAME_STATE_DOC_ID: &str = "game_state::current";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Tombstone entry sent through `_bulk_docs`.
#[derive(Debug, Serialize)]
pub struct DeletedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct BulkDocsRequest {
    pub docs: Vec<DeletedDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameStateDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub state: GameStateEntity,
}

impl CouchGameStateDocument {
    pub fn from_entity(state: GameStateEntity) -> Self {
        Self {
            id: GAME_STATE_DOC_ID.to_owned(),
            rev: None,
            state,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchParticipantDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub participant: ParticipantEntity,
}

impl CouchParticipantDocument {
    pub fn from_entity(participant: ParticipantEntity, rev: Option<String>) -> Self {
        Self {
            id: participant_doc_id(participant.id),
            rev,
            participant,
        }
    }
}

pub fn participant_doc_id(id: Uuid) -> String {
    format!("{PARTICIPANT_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::BTreeMap, time::SystemTime};

    #[test]
    fn participant_document_flattens_entity_fields() {
        let id = Uuid::new_v4();
        let participant = ParticipantEntity {
            id,
            name: "Ada".into(),
            answers: BTreeMap::from([("1".to_owned(), 40)]),
            submitted: true,
            current_score: 0,
            total_score: 0,
            prediction_diffs: Vec::new(),
            scored_questions: Vec::new(),
            revision: 3,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        };

        let doc = CouchParticipantDocument::from_entity(participant, Some("2-abc".into()));
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["_id"], format!("student::{id}"));
        assert_eq!(json["_rev"], "2-abc");
        assert_eq!(json["name"], "Ada");
        assert_eq!(json["answers"]["1"], 40);
        assert_eq!(json["revision"], 3);
    }

    #[test]
    fn new_documents_omit_rev() {
        let doc = CouchGameStateDocument::from_entity(GameStateEntity::initial(0));
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["_id"], GAME_STATE_DOC_ID);
        assert!(json.get("_rev").is_none());
        assert_eq!(json["phase"], "registration");
    }
}
