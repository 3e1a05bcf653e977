// src/models/quiz.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::{error::AppError, models::question::NewQuestion};

/// Lifecycle of a quiz: authored as a draft, hosted live, then completed.
/// A completed quiz may be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Draft,
    Active,
    Completed,
}

impl QuizStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Draft => "draft",
            QuizStatus::Active => "active",
            QuizStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown quiz status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for QuizStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(QuizStatus::Draft),
            "active" => Ok(QuizStatus::Active),
            "completed" => Ok(QuizStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for QuizStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub teacher_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Six-character code students type to join.
    pub join_code: String,
    pub total_questions: i32,
    #[sqlx(try_from = "String")]
    pub status: QuizStatus,
    /// Index of the question the host is currently showing.
    pub current_question: i32,
    /// Whether the host has revealed results for the current question.
    pub reveal_results: bool,
    pub question_started_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The mutable, host-driven part of a quiz row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveState {
    pub status: QuizStatus,
    pub current_question: i32,
    pub reveal_results: bool,
    pub question_started_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Result of asking the host to move on.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The quiz moved to the next question.
    Next(LiveState),
    /// There was no next question; the quiz ended.
    Finished(LiveState),
}

impl Quiz {
    pub fn live_state(&self) -> LiveState {
        LiveState {
            status: self.status,
            current_question: self.current_question,
            reveal_results: self.reveal_results,
            question_started_at: self.question_started_at,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    pub fn apply(&mut self, state: &LiveState) {
        self.status = state.status;
        self.current_question = state.current_question;
        self.reveal_results = state.reveal_results;
        self.question_started_at = state.question_started_at;
        self.started_at = state.started_at;
        self.ended_at = state.ended_at;
    }

    pub fn is_live(&self) -> bool {
        self.status == QuizStatus::Active
    }

    fn require_live(&self) -> Result<(), AppError> {
        if !self.is_live() {
            return Err(AppError::Conflict(format!(
                "Quiz is not live (status: {})",
                self.status
            )));
        }
        Ok(())
    }

    /// Starts (or restarts) the quiz at its first question.
    pub fn start(&self, now: DateTime<Utc>) -> Result<LiveState, AppError> {
        if self.is_live() {
            return Err(AppError::Conflict("Quiz is already live".to_string()));
        }
        if self.total_questions == 0 {
            return Err(AppError::Conflict("Quiz has no questions".to_string()));
        }
        Ok(LiveState {
            status: QuizStatus::Active,
            current_question: 0,
            reveal_results: false,
            question_started_at: Some(now),
            started_at: Some(now),
            ended_at: None,
        })
    }

    /// Moves to the next question, or ends the quiz after the last one.
    pub fn advance(&self, now: DateTime<Utc>) -> Result<Advance, AppError> {
        self.require_live()?;
        let next = self.current_question + 1;
        if next >= self.total_questions {
            return self.end(now).map(Advance::Finished);
        }
        Ok(Advance::Next(LiveState {
            current_question: next,
            reveal_results: false,
            question_started_at: Some(now),
            ..self.live_state()
        }))
    }

    /// Reveals results for the current question, closing it for answers.
    pub fn reveal(&self) -> Result<LiveState, AppError> {
        self.require_live()?;
        Ok(LiveState {
            reveal_results: true,
            ..self.live_state()
        })
    }

    pub fn end(&self, now: DateTime<Utc>) -> Result<LiveState, AppError> {
        self.require_live()?;
        Ok(LiveState {
            status: QuizStatus::Completed,
            ended_at: Some(now),
            ..self.live_state()
        })
    }

    /// Seconds since the current question was shown, if it has been.
    pub fn elapsed_on_question(&self, now: DateTime<Utc>) -> Option<i64> {
        self.question_started_at
            .map(|started| (now - started).num_seconds().max(0))
    }
}

/// DTO for creating a new quiz with its questions.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(
        length(min = 1, max = 200, message = "Quiz title is required (at most 200 characters)."),
        custom(function = crate::utils::validate::not_blank)
    )]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(
        length(min = 1, max = 100, message = "A quiz needs between 1 and 100 questions."),
        nested
    )]
    pub questions: Vec<NewQuestion>,
}

/// Cleaned-up quiz content ready to be stored.
#[derive(Debug, Clone)]
pub struct QuizDraft {
    pub title: String,
    pub description: Option<String>,
    pub questions: Vec<NewQuestion>,
}

/// Row for the teacher's quiz list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub join_code: String,
    #[sqlx(try_from = "String")]
    pub status: QuizStatus,
    pub total_questions: i32,
    pub sessions_count: i64,
    pub created_at: DateTime<Utc>,
}

/// What a student sees before joining.
#[derive(Debug, Clone, Serialize)]
pub struct QuizPreview {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub total_questions: i32,
}

impl From<&Quiz> for QuizPreview {
    fn from(q: &Quiz) -> Self {
        Self {
            id: q.id,
            title: q.title.clone(),
            description: q.description.clone(),
            total_questions: q.total_questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizWithQuestions {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<crate::models::question::Question>,
}
