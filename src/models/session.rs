// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{leaderboard::LeaderboardEntry, question::PublicQuestion, quiz::QuizStatus};

/// Represents the 'quiz_sessions' table: one student's run through a live quiz.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: String,
    pub nickname: String,
    /// Number of correct answers.
    pub score: i32,
    /// Sum of points of correctly answered questions.
    pub total_points: i32,
    pub total_questions: i32,
    /// Index of the next question this student has to answer.
    pub current_question: i32,
    /// Seconds spent answering, summed over all answers.
    pub time_taken: i32,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl QuizSession {
    /// Percentage of correct answers.
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.total_questions)
    }
}

pub fn percentage(score: i32, total_questions: i32) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }
    (score as f64 / total_questions as f64) * 100.0
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub quiz_id: i64,
    pub student_id: String,
    pub nickname: String,
    pub total_questions: i32,
    pub current_question: i32,
    pub started_at: DateTime<Utc>,
}

/// DTO for joining a quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct JoinRequest {
    #[validate(length(min = 1, max = 16, message = "Please enter a valid quiz code."))]
    pub code: String,
    #[validate(custom(function = crate::utils::validate::nickname))]
    pub nickname: String,
}

/// Where a student is within the live quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// The current question is open and not yet answered.
    Answering,
    /// Answered; waiting for the host to reveal or advance.
    Submitted,
    /// The host revealed the correct answer.
    Revealed,
    /// The session is over.
    Finished,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizBrief {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: QuizStatus,
}

/// Polled by students every `poll_interval_ms`.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session: QuizSession,
    pub quiz: QuizBrief,
    pub phase: SessionPhase,
    pub question_index: i32,
    pub total_questions: i32,
    pub question: Option<PublicQuestion>,
    pub seconds_remaining: Option<i64>,
    pub correct_answer: Option<i32>,
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
    pub poll_interval_ms: u64,
}

/// A participant as shown to the host.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub session_id: i64,
    pub nickname: String,
    pub score: i32,
    pub total_points: i32,
    pub current_question: i32,
    pub is_active: bool,
    pub last_activity: DateTime<Utc>,
}

impl From<&QuizSession> for Participant {
    fn from(s: &QuizSession) -> Self {
        Self {
            session_id: s.id,
            nickname: s.nickname.clone(),
            score: s.score,
            total_points: s.total_points,
            current_question: s.current_question,
            is_active: s.is_active,
            last_activity: s.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_handles_empty_quiz() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 4), 75.0);
    }

    #[test]
    fn test_join_request_rejects_blank_nickname() {
        let req = JoinRequest {
            code: "ABC234".into(),
            nickname: "   ".into(),
        };
        assert!(req.validate().is_err());
    }
}
