//! Application-level configuration loading, including the question bank.

use std::{collections::HashSet, env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::{dao::models::QuestionEntity, state::game::Question};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FORECAST_QUIZ_CONFIG_PATH";
/// Prediction counted for participants who did not answer a question.
pub const DEFAULT_PREDICTION: u8 = 50;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    questions: Vec<Question>,
    default_prediction: u8,
}

/// Reasons a configuration file is refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Two questions share the same id.
    #[error("duplicate question id {0}")]
    DuplicateQuestionId(u32),
    /// A correct answer lies outside 0–100.
    #[error("question {id} has answer {answer} outside 0-100")]
    AnswerOutOfRange { id: u32, answer: u8 },
    /// A question has an empty prompt.
    #[error("question {0} has an empty prompt")]
    EmptyPrompt(u32),
    /// The default prediction lies outside 0–100.
    #[error("default prediction {0} is outside 0-100")]
    DefaultOutOfRange(u8),
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the built-in question bank.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        questions = app_config.questions.len(),
                        default_prediction = app_config.default_prediction,
                        "loaded question bank from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to load config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let raw = serde_json::from_str::<RawConfig>(contents)?;
        Ok(Self::try_from(raw)?)
    }

    /// Build a configuration from an explicit question list.
    pub fn with_questions(
        questions: Vec<QuestionEntity>,
        default_prediction: u8,
    ) -> Result<Self, ConfigError> {
        Self::try_from(RawConfig {
            questions: Some(questions),
            default_prediction: Some(default_prediction),
        })
    }

    /// Ordered question bank.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Question at the given 1-based position.
    pub fn question(&self, number: usize) -> Option<&Question> {
        number
            .checked_sub(1)
            .and_then(|index| self.questions.get(index))
    }

    /// Prediction used for participants who skipped a question.
    pub fn default_prediction(&self) -> u8 {
        self.default_prediction
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions: default_questions().into_iter().map(Into::into).collect(),
            default_prediction: DEFAULT_PREDICTION,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    questions: Option<Vec<QuestionEntity>>,
    #[serde(default)]
    default_prediction: Option<u8>,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        let default_prediction = value.default_prediction.unwrap_or(DEFAULT_PREDICTION);
        if default_prediction > 100 {
            return Err(ConfigError::DefaultOutOfRange(default_prediction));
        }

        let questions = value.questions.unwrap_or_else(default_questions);
        validate_questions(&questions)?;

        Ok(Self {
            questions: questions.into_iter().map(Into::into).collect(),
            default_prediction,
        })
    }
}

fn validate_questions(questions: &[QuestionEntity]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for question in questions {
        if !seen.insert(question.id) {
            return Err(ConfigError::DuplicateQuestionId(question.id));
        }
        if question.answer > 100 {
            return Err(ConfigError::AnswerOutOfRange {
                id: question.id,
                answer: question.answer,
            });
        }
        if question.question.trim().is_empty() {
            return Err(ConfigError::EmptyPrompt(question.id));
        }
    }
    Ok(())
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn question(id: u32, prompt: &str, answer: u8) -> QuestionEntity {
    QuestionEntity {
        id,
        question: prompt.to_owned(),
        answer,
    }
}

/// Built-in question bank shipped with the binary.
fn default_questions() -> Vec<QuestionEntity> {
    vec![
        question(
            1,
            "Will an AI solve any important mathematical conjecture before January 1st, 2030?",
            80,
        ),
        question(
            2,
            "In 2028, will an AI be able to generate a full high-quality movie to a prompt?",
            43,
        ),
        question(
            3,
            "Will there be a song created by an AI system in the year-end top 100 Billboards chart by 2026?",
            52,
        ),
        question(
            4,
            "Will a book written by a language model make the NY Times Best Seller list before 2030?",
            65,
        ),
        question(
            5,
            "Will a large language model beat a super grandmaster playing chess by 2028?",
            69,
        ),
        question(6, "Will we get AGI before 2030?", 57),
        question(
            7,
            "Will there be a positive transition to a world with radically smarter-than-human artificial intelligence?",
            51,
        ),
        question(
            8,
            "Will AI NOT cause mass unemployment by 2030? (<25% unemployment)",
            80,
        ),
        question(
            9,
            "Before 2032, will AI NOT cause at least 100 deaths or $1B in economic damage?",
            20,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bank_has_nine_questions() {
        let config = AppConfig::default();
        assert_eq!(config.questions().len(), 9);
        assert_eq!(config.default_prediction(), 50);
        assert_eq!(config.question(1).map(|q| q.answer), Some(80));
        assert_eq!(config.question(9).map(|q| q.answer), Some(20));
        assert!(config.question(0).is_none());
        assert!(config.question(10).is_none());
    }

    #[test]
    fn parses_custom_bank() {
        let config = AppConfig::from_json(
            r#"{"questions": [{"id": 7, "question": "Rain tomorrow?", "answer": 30}], "default_prediction": 40}"#,
        )
        .unwrap();

        assert_eq!(config.questions().len(), 1);
        assert_eq!(config.question(1).unwrap().id, 7);
        assert_eq!(config.default_prediction(), 40);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.questions().len(), 9);
        assert_eq!(config.default_prediction(), DEFAULT_PREDICTION);
    }

    #[test]
    fn rejects_invalid_banks() {
        let duplicate = AppConfig::with_questions(
            vec![question(1, "a", 10), question(1, "b", 20)],
            50,
        );
        assert_eq!(duplicate.unwrap_err(), ConfigError::DuplicateQuestionId(1));

        let out_of_range = AppConfig::with_questions(vec![question(2, "a", 101)], 50);
        assert_eq!(
            out_of_range.unwrap_err(),
            ConfigError::AnswerOutOfRange { id: 2, answer: 101 }
        );

        let empty = AppConfig::with_questions(vec![question(3, "  ", 10)], 50);
        assert_eq!(empty.unwrap_err(), ConfigError::EmptyPrompt(3));

        let bad_default = AppConfig::with_questions(vec![question(4, "a", 10)], 120);
        assert_eq!(bad_default.unwrap_err(), ConfigError::DefaultOutOfRange(120));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(AppConfig::from_json("{not json").is_err());
    }
}
