// src/store/mod.rs

//! Persistence for profiles, quizzes, sessions and answers.
//!
//! Handlers only talk to [`QuizStore`]; the state machine rules live above
//! it, so the Postgres and in-memory backends behave the same.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        answer::{Answer, GradedAnswer},
        leaderboard::{GlobalLeaderboardEntry, LeaderboardEntry, StudentResult},
        profile::{NewProfile, Profile, Role},
        question::Question,
        quiz::{LiveState, Quiz, QuizDraft, QuizSummary},
        session::{NewSession, QuizSession},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

pub type DynStore = Arc<dyn QuizStore>;

#[async_trait]
pub trait QuizStore: Send + Sync {
    // --- profiles ---

    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError>;

    /// Inserts the profile unless one with the same id exists.
    /// Returns the stored profile and whether it was created.
    async fn ensure_profile(&self, profile: NewProfile) -> Result<(Profile, bool), AppError>;

    /// Newest first.
    async fn list_profiles(&self, role: Option<Role>, pending_only: bool) -> Result<Vec<Profile>, AppError>;

    async fn set_approval(&self, id: &str, approved: bool) -> Result<Option<Profile>, AppError>;

    /// `None` when the profile does not exist.
    async fn update_display_name(&self, id: &str, display_name: &str) -> Result<Option<Profile>, AppError>;

    // --- quizzes ---

    /// Stores a quiz and its questions atomically.
    /// Fails with `Conflict` when the join code is already taken.
    async fn create_quiz(&self, teacher_id: &str, join_code: &str, draft: &QuizDraft) -> Result<Quiz, AppError>;

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError>;

    async fn find_quiz_by_code(&self, join_code: &str) -> Result<Option<Quiz>, AppError>;

    /// Newest first.
    async fn list_quizzes_by_teacher(&self, teacher_id: &str) -> Result<Vec<QuizSummary>, AppError>;

    /// Ordered by `order_index`.
    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<Question>, AppError>;

    /// Removes the quiz with its questions, sessions and answers.
    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError>;

    async fn save_live_state(&self, quiz_id: i64, state: &LiveState) -> Result<(), AppError>;

    /// Moves active sessions that are behind `index` forward to it.
    async fn advance_sessions(&self, quiz_id: i64, index: i32) -> Result<u64, AppError>;

    /// Completes every active session of the quiz.
    async fn close_sessions(&self, quiz_id: i64, at: DateTime<Utc>) -> Result<u64, AppError>;

    // --- sessions & answers ---

    async fn find_active_session(&self, quiz_id: i64, student_id: &str) -> Result<Option<QuizSession>, AppError>;

    async fn create_session(&self, session: NewSession) -> Result<QuizSession, AppError>;

    async fn get_session(&self, id: i64) -> Result<Option<QuizSession>, AppError>;

    /// Sessions started at or after `since`, highest score first.
    async fn list_sessions(&self, quiz_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<QuizSession>, AppError>;

    /// Stores the answer and applies it to the session in one step.
    ///
    /// The session must still be active and at `expected_index`; otherwise,
    /// or when the question was already answered, this is a `Conflict`.
    async fn record_answer(
        &self,
        session_id: i64,
        expected_index: i32,
        graded: &GradedAnswer,
        completes: bool,
        at: DateTime<Utc>,
    ) -> Result<QuizSession, AppError>;

    /// Answers given at or after `since`.
    async fn list_answers_for_question(&self, question_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<Answer>, AppError>;

    async fn list_answers_by_session(&self, session_id: i64) -> Result<Vec<Answer>, AppError>;

    // --- leaderboards ---

    /// Completed sessions of one quiz, ranked.
    async fn quiz_leaderboard(&self, quiz_id: i64, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError>;

    /// Completed sessions across quizzes, most recent first.
    async fn global_leaderboard(&self, title_filter: Option<&str>, limit: i64) -> Result<Vec<GlobalLeaderboardEntry>, AppError>;

    async fn student_results(&self, student_id: &str) -> Result<Vec<StudentResult>, AppError>;
}
