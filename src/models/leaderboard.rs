// src/models/leaderboard.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Row of the `leaderboard` view for one quiz.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub session_id: i64,
    pub nickname: String,
    pub score: i32,
    pub total_points: i32,
    pub total_questions: i32,
    pub time_taken: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Cross-quiz leaderboard row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GlobalLeaderboardEntry {
    pub quiz_id: i64,
    pub quiz_title: String,
    pub nickname: String,
    pub score: i32,
    pub total_questions: i32,
    pub time_taken: i32,
    pub completed_at: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub percentage: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct GlobalLeaderboardParams {
    /// Case-insensitive substring of the quiz title.
    pub quiz: Option<String>,
    pub limit: Option<i64>,
}

/// A student's finished session, for their results page.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentResult {
    pub session_id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub quiz_description: Option<String>,
    pub score: i32,
    pub total_points: i32,
    pub total_questions: i32,
    pub time_taken: i32,
    pub completed_at: Option<DateTime<Utc>>,
}
