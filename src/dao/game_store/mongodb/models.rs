use std::collections::BTreeMap;

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{GameStateEntity, ParticipantEntity, PhaseEntity};

/// Fixed `_id` of the singleton game-state document.
pub(super) const GAME_STATE_ID: &str = "current";

/// Shape of a document in the `game_states` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoGameStateDocument {
    #[serde(rename = "_id")]
    id: String,
    phase: PhaseEntity,
    current_question: i64,
    version: i64,
    updated_at: DateTime,
}

impl From<GameStateEntity> for MongoGameStateDocument {
    fn from(value: GameStateEntity) -> Self {
        Self {
            id: GAME_STATE_ID.to_owned(),
            phase: value.phase,
            current_question: value.current_question as i64,
            version: value.version as i64,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoGameStateDocument> for GameStateEntity {
    fn from(value: MongoGameStateDocument) -> Self {
        Self {
            phase: value.phase,
            current_question: value.current_question.max(1) as usize,
            version: value.version.max(0) as usize,
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Shape of a document in the `students` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    answers: BTreeMap<String, i32>,
    #[serde(default)]
    submitted: bool,
    #[serde(default)]
    current_score: i64,
    #[serde(default)]
    total_score: i64,
    #[serde(default)]
    prediction_diffs: Vec<i32>,
    #[serde(default)]
    scored_questions: Vec<i64>,
    #[serde(default)]
    revision: i64,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            answers: value
                .answers
                .into_iter()
                .map(|(question, prediction)| (question, i32::from(prediction)))
                .collect(),
            submitted: value.submitted,
            current_score: i64::from(value.current_score),
            total_score: i64::from(value.total_score),
            prediction_diffs: value.prediction_diffs,
            scored_questions: value.scored_questions.into_iter().map(i64::from).collect(),
            revision: value.revision as i64,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoParticipantDocument> for ParticipantEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoParticipantDocument) -> Result<Self, Self::Error> {
        let malformed = |reason: &str| MongoDaoError::MalformedParticipant {
            id: value.id.clone(),
            reason: reason.to_owned(),
        };

        let id = Uuid::parse_str(&value.id).map_err(|_| malformed("_id is not a UUID"))?;
        let answers = value
            .answers
            .iter()
            .map(|(question, prediction)| {
                u8::try_from(*prediction)
                    .ok()
                    .filter(|prediction| *prediction <= 100)
                    .map(|prediction| (question.clone(), prediction))
                    .ok_or_else(|| malformed("prediction out of range"))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        let scored_questions = value
            .scored_questions
            .iter()
            .map(|question| u32::try_from(*question).map_err(|_| malformed("bad question id")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            name: value.name,
            answers,
            submitted: value.submitted,
            current_score: clamp_score(value.current_score),
            total_score: clamp_score(value.total_score),
            prediction_diffs: value.prediction_diffs,
            scored_questions,
            revision: value.revision.max(0) as u64,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

fn clamp_score(raw: i64) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

pub(super) fn participant_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

pub(super) fn revision_filter(id: Uuid, expected_revision: u64) -> Document {
    doc! { "_id": id.to_string(), "revision": expected_revision as i64 }
}
