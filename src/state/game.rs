use std::{collections::BTreeMap, time::SystemTime};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{ParticipantEntity, QuestionEntity},
    state::scoring::{self, RoundScore},
};

/// A question from the static bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Stable identifier used as key in participant answers.
    pub id: u32,
    /// Prompt shown to participants.
    pub prompt: String,
    /// Ground-truth percentage (0–100) used for scoring.
    pub answer: u8,
}

/// Participant record tracked during a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Server-generated identifier, also used by clients to resume a session.
    pub id: Uuid,
    /// Trimmed display name, unique within a game.
    pub name: String,
    /// Submitted predictions keyed by question id.
    pub answers: BTreeMap<u32, u8>,
    /// Whether a prediction was submitted for the active question.
    pub submitted: bool,
    /// Absolute error for the most recently scored question.
    pub current_score: u32,
    /// Running sum of absolute errors.
    pub total_score: u32,
    /// Signed errors in scoring order, one per scored question.
    pub prediction_diffs: Vec<i32>,
    /// Question ids already folded into the totals.
    pub scored_questions: Vec<u32>,
    /// Revision of the persisted record, bumped on every write.
    pub revision: u64,
    /// Registration timestamp.
    pub created_at: SystemTime,
    /// Last time the record changed.
    pub updated_at: SystemTime,
}

impl Participant {
    /// Build a fresh participant with zero scores and no answers.
    pub fn new(name: String) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            name,
            answers: BTreeMap::new(),
            submitted: false,
            current_score: 0,
            total_score: 0,
            prediction_diffs: Vec::new(),
            scored_questions: Vec::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Prediction stored for the given question, if any.
    pub fn answer_for(&self, question_id: u32) -> Option<u8> {
        self.answers.get(&question_id).copied()
    }

    /// Whether the given question was already scored for this participant.
    pub fn is_scored(&self, question_id: u32) -> bool {
        self.scored_questions.contains(&question_id)
    }

    /// Store a prediction for the question and mark the round as submitted.
    ///
    /// Returns `false` without touching the record when the question was already answered.
    pub fn record_answer(&mut self, question_id: u32, prediction: u8) -> bool {
        if self.answers.contains_key(&question_id) {
            return false;
        }

        self.answers.insert(question_id, prediction);
        self.submitted = true;
        self.touch();
        true
    }

    /// Fold the question into the participant's scores.
    ///
    /// Missing predictions count as `default_prediction`. Returns `None` when the
    /// question was already scored so repeated calls leave totals untouched.
    pub fn score_round(&mut self, question: &Question, default_prediction: u8) -> Option<RoundScore> {
        if self.is_scored(question.id) {
            return None;
        }

        let (prediction, defaulted) = match self.answer_for(question.id) {
            Some(value) => (value, false),
            None => (default_prediction, true),
        };
        let outcome = scoring::score_prediction(prediction, question.answer, defaulted);

        self.current_score = outcome.score;
        self.total_score += outcome.score;
        self.prediction_diffs.push(outcome.diff);
        self.scored_questions.push(question.id);
        self.touch();

        Some(outcome)
    }

    /// Clear the submitted flag ahead of a new round.
    pub fn reset_submission(&mut self) -> bool {
        if !self.submitted {
            return false;
        }
        self.submitted = false;
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = SystemTime::now();
    }
}

/// In-memory roster of the running quiz, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    /// Registered participants keyed by id.
    pub participants: IndexMap<Uuid, Participant>,
}

impl QuizSession {
    /// Rebuild a session from persisted participants, ordered by registration time.
    pub fn from_participants(mut participants: Vec<Participant>) -> Self {
        participants.sort_by_key(|participant| participant.created_at);
        Self {
            participants: participants
                .into_iter()
                .map(|participant| (participant.id, participant))
                .collect(),
        }
    }

    /// Look up a participant by exact (already trimmed) name.
    pub fn find_by_name(&self, name: &str) -> Option<&Participant> {
        self.participants
            .values()
            .find(|participant| participant.name == name)
    }

    /// Participants in registration order.
    pub fn roster(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }
}

impl From<QuestionEntity> for Question {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id,
            prompt: value.question,
            answer: value.answer,
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            answers: value
                .answers
                .into_iter()
                .filter_map(|(key, prediction)| {
                    key.parse::<u32>().ok().map(|question_id| (question_id, prediction))
                })
                .collect(),
            submitted: value.submitted,
            current_score: value.current_score,
            total_score: value.total_score,
            prediction_diffs: value.prediction_diffs,
            scored_questions: value.scored_questions,
            revision: value.revision,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<Participant> for ParticipantEntity {
    fn from(value: Participant) -> Self {
        Self {
            id: value.id,
            name: value.name,
            answers: value
                .answers
                .into_iter()
                .map(|(question_id, prediction)| (question_id.to_string(), prediction))
                .collect(),
            submitted: value.submitted,
            current_score: value.current_score,
            total_score: value.total_score,
            prediction_diffs: value.prediction_diffs,
            scored_questions: value.scored_questions,
            revision: value.revision,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u32, answer: u8) -> Question {
        Question {
            id,
            prompt: format!("question {id}"),
            answer,
        }
    }

    #[test]
    fn answers_are_accepted_once_per_question() {
        let mut participant = Participant::new("Ada".into());

        assert!(participant.record_answer(1, 65));
        assert!(participant.submitted);
        assert!(!participant.record_answer(1, 90));
        assert_eq!(participant.answer_for(1), Some(65));
    }

    #[test]
    fn scoring_uses_absolute_and_signed_error() {
        let mut under = Participant::new("under".into());
        let mut over = Participant::new("over".into());
        under.record_answer(1, 65);
        over.record_answer(1, 95);

        let under_score = under.score_round(&question(1, 80), 50).unwrap();
        let over_score = over.score_round(&question(1, 80), 50).unwrap();

        assert_eq!((under_score.score, under_score.diff), (15, -15));
        assert_eq!((over_score.score, over_score.diff), (15, 15));
        assert_eq!(under.total_score, over.total_score);
    }

    #[test]
    fn scoring_twice_does_not_double_count() {
        let mut participant = Participant::new("Ada".into());
        participant.record_answer(1, 70);

        assert!(participant.score_round(&question(1, 80), 50).is_some());
        assert!(participant.score_round(&question(1, 80), 50).is_none());
        assert_eq!(participant.total_score, 10);
        assert_eq!(participant.prediction_diffs, vec![-10]);
    }

    #[test]
    fn missing_answer_defaults_to_midpoint() {
        let mut participant = Participant::new("Ada".into());
        let outcome = participant.score_round(&question(4, 65), 50).unwrap();

        assert!(outcome.defaulted);
        assert_eq!(outcome.prediction, 50);
        assert_eq!(participant.current_score, 15);
        assert_eq!(participant.prediction_diffs, vec![-15]);
    }

    #[test]
    fn zero_is_a_real_prediction() {
        let mut participant = Participant::new("Ada".into());
        participant.record_answer(9, 0);
        let outcome = participant.score_round(&question(9, 20), 50).unwrap();

        assert!(!outcome.defaulted);
        assert_eq!(outcome.diff, -20);
    }

    #[test]
    fn totals_accumulate_over_rounds() {
        let mut participant = Participant::new("Ada".into());
        let bank = [question(1, 80), question(2, 43), question(3, 52)];
        participant.record_answer(1, 70);
        participant.record_answer(3, 60);

        for q in &bank {
            participant.score_round(q, 50);
        }

        assert_eq!(participant.total_score, 10 + 7 + 8);
        assert_eq!(participant.prediction_diffs, vec![-10, 7, 8]);
        assert_eq!(participant.current_score, 8);
    }

    #[test]
    fn entity_round_trip_keeps_numeric_answer_keys() {
        let mut participant = Participant::new("Ada".into());
        participant.record_answer(12, 33);

        let entity: ParticipantEntity = participant.clone().into();
        assert_eq!(entity.answers.get("12"), Some(&33));

        let restored: Participant = entity.into();
        assert_eq!(restored, participant);
    }

    #[test]
    fn session_restores_registration_order() {
        let mut first = Participant::new("first".into());
        let mut second = Participant::new("second".into());
        first.created_at = SystemTime::UNIX_EPOCH;
        second.created_at = SystemTime::now();

        let session = QuizSession::from_participants(vec![second, first]);
        let names: Vec<_> = session.roster().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(session.find_by_name("second").is_some());
        assert!(session.find_by_name("Second").is_none());
    }
}
