use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::SystemTime};
use uuid::Uuid;

/// Question definition as stored in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable question identifier.
    pub id: u32,
    /// Prompt text.
    pub question: String,
    /// Correct answer percentage (0–100).
    pub answer: u8,
}

/// Persisted phase vocabulary of the shared game-state document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEntity {
    /// Participants may register.
    Registration,
    /// A question is open.
    Question,
    /// Results of the current question are displayed.
    Results,
    /// Final standings are displayed.
    Final,
}

/// Singleton document describing where the quiz currently is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameStateEntity {
    /// Current phase.
    pub phase: PhaseEntity,
    /// 1-based number of the current question.
    pub current_question: usize,
    /// State machine version at the time of the write.
    pub version: usize,
    /// Last time the document was written.
    pub updated_at: SystemTime,
}

impl GameStateEntity {
    /// Initial document written on first start and on reset.
    pub fn initial(version: usize) -> Self {
        Self {
            phase: PhaseEntity::Registration,
            current_question: 1,
            version,
            updated_at: SystemTime::now(),
        }
    }
}

/// Participant document persisted in the `students` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Stable identifier for the participant.
    pub id: Uuid,
    /// Trimmed display name.
    pub name: String,
    /// Predictions keyed by question id rendered as a string.
    pub answers: BTreeMap<String, u8>,
    /// Whether the active question was answered.
    pub submitted: bool,
    /// Absolute error of the last scored question.
    pub current_score: u32,
    /// Sum of absolute errors.
    pub total_score: u32,
    /// Signed errors, one per scored question.
    pub prediction_diffs: Vec<i32>,
    /// Question ids already scored.
    #[serde(default)]
    pub scored_questions: Vec<u32>,
    /// Compare-and-swap counter.
    #[serde(default)]
    pub revision: u64,
    /// Registration timestamp.
    pub created_at: SystemTime,
    /// Last time this participant was updated.
    pub updated_at: SystemTime,
}
