// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub session_id: i64,
    pub question_id: i64,
    /// Chosen option index; `None` when the student ran out of time.
    pub answer: Option<i32>,
    pub is_correct: bool,
    /// Arrived after the time limit (plus grace), or no option was chosen.
    pub timed_out: bool,
    pub points_earned: i32,
    pub time_taken: i32,
    pub answered_at: DateTime<Utc>,
}

/// DTO for submitting an answer to the current question.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    /// Missing or negative means the countdown ran out.
    pub answer: Option<i32>,
}

/// An answer after grading, before it is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub answer: Option<i32>,
    pub is_correct: bool,
    pub timed_out: bool,
    pub points_earned: i32,
    pub time_taken: i32,
}

#[derive(Debug, Serialize)]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub timed_out: bool,
    pub points_earned: i32,
    pub score: i32,
    pub total_points: i32,
    pub current_question: i32,
    pub completed: bool,
}

/// Aggregated answers to one question, shown when the host reveals results.
#[derive(Debug, Serialize)]
pub struct QuestionResults {
    pub question_index: i32,
    pub question: crate::models::question::Question,
    /// One count per option.
    pub option_counts: Vec<i64>,
    pub no_answer_count: i64,
    pub correct_count: i64,
    pub total_participants: i64,
}
