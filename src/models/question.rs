// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::config::{DEFAULT_QUESTION_POINTS, DEFAULT_TIME_LIMIT_SECS, OPTIONS_PER_QUESTION};

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// The text content of the question.
    pub text: String,

    /// The four answer options, stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Index into `options` of the correct answer.
    pub correct_answer: i32,

    /// Seconds a student has to answer.
    pub time_limit: i32,

    pub points: i32,

    /// Position within the quiz, starting at 0.
    pub order_index: i32,
}

/// DTO for sending a question to students (excludes the correct answer).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub time_limit: i32,
    pub points: i32,
    pub order_index: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.0.clone(),
            time_limit: q.time_limit,
            points: q.points,
            order_index: q.order_index,
        }
    }
}

/// DTO for one question inside a create-quiz request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewQuestion {
    #[validate(
        length(min = 1, max = 1000, message = "Question text must be between 1 and 1000 characters."),
        custom(function = crate::utils::validate::not_blank)
    )]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(range(min = 0, max = 3, message = "Correct answer must be an option index between 0 and 3."))]
    pub correct_answer: i32,
    #[serde(default = "default_time_limit")]
    #[validate(range(min = 5, max = 300, message = "Time limit must be between 5 and 300 seconds."))]
    pub time_limit: i32,
    #[serde(default = "default_points")]
    #[validate(range(min = 1, max = 100, message = "Points must be between 1 and 100."))]
    pub points: i32,
}

impl NewQuestion {
    /// Trims the text and every option.
    pub fn normalized(&self) -> Self {
        Self {
            text: self.text.trim().to_string(),
            options: self.options.iter().map(|o| o.trim().to_string()).collect(),
            ..self.clone()
        }
    }
}

fn default_time_limit() -> i32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn default_points() -> i32 {
    DEFAULT_QUESTION_POINTS
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(validator::ValidationError::new("exactly_four_options")
            .with_message("Every question needs exactly 4 options.".into()));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_blank")
                .with_message("All options are required.".into()));
        }
        if opt.chars().count() > 200 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> NewQuestion {
        NewQuestion {
            text: "What is 2 + 2?".to_string(),
            options: vec!["3".into(), "4".into(), "5".into(), "22".into()],
            correct_answer: 1,
            time_limit: 30,
            points: 1,
        }
    }

    #[test]
    fn test_valid_question_passes() {
        assert!(question().validate().is_ok());
    }

    #[test]
    fn test_three_options_rejected() {
        let mut q = question();
        q.options.pop();
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_blank_option_rejected() {
        let mut q = question();
        q.options[2] = "   ".into();
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_time_limit_bounds() {
        let mut q = question();
        q.time_limit = 4;
        assert!(q.validate().is_err());
        q.time_limit = 5;
        assert!(q.validate().is_ok());
        q.time_limit = 300;
        assert!(q.validate().is_ok());
        q.time_limit = 301;
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_correct_answer_must_index_an_option() {
        let mut q = question();
        q.correct_answer = 4;
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_defaults_applied_on_deserialize() {
        let q: NewQuestion = serde_json::from_value(serde_json::json!({
            "text": "Q",
            "options": ["a", "b", "c", "d"],
            "correct_answer": 0
        }))
        .unwrap();
        assert_eq!(q.time_limit, DEFAULT_TIME_LIMIT_SECS);
        assert_eq!(q.points, DEFAULT_QUESTION_POINTS);
    }
}
