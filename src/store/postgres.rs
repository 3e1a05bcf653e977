// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        answer::{Answer, GradedAnswer},
        leaderboard::{GlobalLeaderboardEntry, LeaderboardEntry, StudentResult},
        profile::{NewProfile, Profile, Role},
        question::Question,
        quiz::{LiveState, Quiz, QuizDraft, QuizSummary},
        session::{NewSession, QuizSession, percentage},
    },
    store::QuizStore,
};

/// `QuizStore` backed by a Postgres pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl QuizStore for PostgresStore {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    async fn ensure_profile(&self, profile: NewProfile) -> Result<(Profile, bool), AppError> {
        let inserted = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, display_name, role, is_approved)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.role.as_str())
        .bind(profile.is_approved)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert profile: {:?}", e);
            AppError::from(e)
        })?;

        if let Some(created) = inserted {
            return Ok((created, true));
        }

        let existing = self
            .get_profile(&profile.id)
            .await?
            .ok_or(AppError::InternalServerError("Profile vanished after insert".to_string()))?;

        Ok((existing, false))
    }

    async fn list_profiles(&self, role: Option<Role>, pending_only: bool) -> Result<Vec<Profile>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM profiles WHERE TRUE");

        if let Some(role) = role {
            builder.push(" AND role = ");
            builder.push_bind(role.as_str());
        }
        if pending_only {
            builder.push(" AND NOT is_approved");
        }
        builder.push(" ORDER BY created_at DESC");

        let profiles = builder
            .build_query_as::<Profile>()
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    async fn set_approval(&self, id: &str, approved: bool) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET is_approved = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(approved)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn update_display_name(&self, id: &str, display_name: &str) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET display_name = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(display_name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn create_quiz(&self, teacher_id: &str, join_code: &str, draft: &QuizDraft) -> Result<Quiz, AppError> {
        let mut tx = self.pool.begin().await?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (teacher_id, title, description, join_code, total_questions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(teacher_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(join_code)
        .bind(draft.questions.len() as i32)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Join code '{}' is already taken", join_code))
            } else {
                tracing::error!("Failed to create quiz: {:?}", e);
                AppError::from(e)
            }
        })?;

        for (index, q) in draft.questions.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO questions (quiz_id, text, options, correct_answer, time_limit, points, order_index)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(quiz.id)
            .bind(&q.text)
            .bind(Json(&q.options))
            .bind(q.correct_answer)
            .bind(q.time_limit)
            .bind(q.points)
            .bind(index as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert question: {:?}", e);
                AppError::from(e)
            })?;
        }

        tx.commit().await?;

        Ok(quiz)
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(quiz)
    }

    async fn find_quiz_by_code(&self, join_code: &str) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE join_code = $1")
            .bind(join_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(quiz)
    }

    async fn list_quizzes_by_teacher(&self, teacher_id: &str) -> Result<Vec<QuizSummary>, AppError> {
        let quizzes = sqlx::query_as::<_, QuizSummary>(
            r#"
            SELECT
                q.id, q.title, q.description, q.join_code, q.status, q.total_questions,
                (SELECT COUNT(*) FROM quiz_sessions s WHERE s.quiz_id = q.id) AS sessions_count,
                q.created_at
            FROM quizzes q
            WHERE q.teacher_id = $1
            ORDER BY q.created_at DESC, q.id DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(quizzes)
    }

    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT * FROM questions WHERE quiz_id = $1 ORDER BY order_index",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        // Questions, sessions and answers go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_live_state(&self, quiz_id: i64, state: &LiveState) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quizzes SET
                status = $1,
                current_question = $2,
                reveal_results = $3,
                question_started_at = $4,
                started_at = $5,
                ended_at = $6
            WHERE id = $7
            "#,
        )
        .bind(state.status.as_str())
        .bind(state.current_question)
        .bind(state.reveal_results)
        .bind(state.question_started_at)
        .bind(state.started_at)
        .bind(state.ended_at)
        .bind(quiz_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save live state: {:?}", e);
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        Ok(())
    }

    async fn advance_sessions(&self, quiz_id: i64, index: i32) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quiz_sessions SET current_question = $1, updated_at = NOW()
            WHERE quiz_id = $2 AND is_active AND current_question < $1
            "#,
        )
        .bind(index)
        .bind(quiz_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn close_sessions(&self, quiz_id: i64, at: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE quiz_sessions SET is_active = FALSE, completed_at = $1, updated_at = $1
            WHERE quiz_id = $2 AND is_active
            "#,
        )
        .bind(at)
        .bind(quiz_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_active_session(&self, quiz_id: i64, student_id: &str) -> Result<Option<QuizSession>, AppError> {
        let session = sqlx::query_as::<_, QuizSession>(
            "SELECT * FROM quiz_sessions WHERE quiz_id = $1 AND student_id = $2 AND is_active",
        )
        .bind(quiz_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn create_session(&self, session: NewSession) -> Result<QuizSession, AppError> {
        let created = sqlx::query_as::<_, QuizSession>(
            r#"
            INSERT INTO quiz_sessions
                (quiz_id, student_id, nickname, total_questions, current_question, started_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(session.quiz_id)
        .bind(&session.student_id)
        .bind(&session.nickname)
        .bind(session.total_questions)
        .bind(session.current_question)
        .bind(session.started_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Student already has an active session for this quiz".to_string())
            } else {
                tracing::error!("Failed to create session: {:?}", e);
                AppError::from(e)
            }
        })?;

        Ok(created)
    }

    async fn get_session(&self, id: i64) -> Result<Option<QuizSession>, AppError> {
        let session = sqlx::query_as::<_, QuizSession>("SELECT * FROM quiz_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    async fn list_sessions(&self, quiz_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<QuizSession>, AppError> {
        let sessions = sqlx::query_as::<_, QuizSession>(
            r#"
            SELECT * FROM quiz_sessions
            WHERE quiz_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR started_at >= $2)
            ORDER BY score DESC, time_taken ASC, id ASC
            "#,
        )
        .bind(quiz_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn record_answer(
        &self,
        session_id: i64,
        expected_index: i32,
        graded: &GradedAnswer,
        completes: bool,
        at: DateTime<Utc>,
    ) -> Result<QuizSession, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO answers
                (session_id, question_id, answer, is_correct, timed_out, points_earned, time_taken, answered_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session_id)
        .bind(graded.question_id)
        .bind(graded.answer)
        .bind(graded.is_correct)
        .bind(graded.timed_out)
        .bind(graded.points_earned)
        .bind(graded.time_taken)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Question already answered".to_string())
            } else {
                tracing::error!("Failed to insert answer: {:?}", e);
                AppError::from(e)
            }
        })?;

        // Guarded on the index so a concurrent submit or host advance loses cleanly.
        let updated = sqlx::query_as::<_, QuizSession>(
            r#"
            UPDATE quiz_sessions SET
                score = score + $1,
                total_points = total_points + $2,
                time_taken = time_taken + $3,
                current_question = current_question + 1,
                is_active = CASE WHEN $4 THEN FALSE ELSE is_active END,
                completed_at = CASE WHEN $4 THEN $5 ELSE completed_at END,
                updated_at = $5
            WHERE id = $6 AND is_active AND current_question = $7
            RETURNING *
            "#,
        )
        .bind(if graded.is_correct { 1 } else { 0 })
        .bind(graded.points_earned)
        .bind(graded.time_taken)
        .bind(completes)
        .bind(at)
        .bind(session_id)
        .bind(expected_index)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::Conflict("Session moved on before the answer was recorded".to_string()))?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn list_answers_for_question(&self, question_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<Answer>, AppError> {
        let answers = sqlx::query_as::<_, Answer>(
            r#"
            SELECT * FROM answers
            WHERE question_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR answered_at >= $2)
            ORDER BY answered_at
            "#,
        )
        .bind(question_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    async fn list_answers_by_session(&self, session_id: i64) -> Result<Vec<Answer>, AppError> {
        let answers = sqlx::query_as::<_, Answer>(
            "SELECT * FROM answers WHERE session_id = $1 ORDER BY answered_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    async fn quiz_leaderboard(&self, quiz_id: i64, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT rank, session_id, nickname, score, total_points, total_questions, time_taken, completed_at
            FROM leaderboard
            WHERE quiz_id = $1
            ORDER BY rank, completed_at, session_id
            LIMIT $2
            "#,
        )
        .bind(quiz_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch leaderboard: {:?}", e);
            AppError::from(e)
        })?;

        Ok(entries)
    }

    async fn global_leaderboard(&self, title_filter: Option<&str>, limit: i64) -> Result<Vec<GlobalLeaderboardEntry>, AppError> {
        let pattern = title_filter.map(|f| format!("%{}%", escape_like(f)));

        let mut entries = sqlx::query_as::<_, GlobalLeaderboardEntry>(
            r#"
            SELECT
                s.quiz_id, q.title AS quiz_title, s.nickname, s.score,
                s.total_questions, s.time_taken, s.completed_at
            FROM quiz_sessions s
            JOIN quizzes q ON q.id = s.quiz_id
            WHERE s.completed_at IS NOT NULL
              AND ($1::TEXT IS NULL OR q.title ILIKE $1)
            ORDER BY s.completed_at DESC, s.id DESC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        for e in &mut entries {
            e.percentage = percentage(e.score, e.total_questions);
        }

        Ok(entries)
    }

    async fn student_results(&self, student_id: &str) -> Result<Vec<StudentResult>, AppError> {
        let results = sqlx::query_as::<_, StudentResult>(
            r#"
            SELECT
                s.id AS session_id, s.quiz_id, q.title AS quiz_title,
                q.description AS quiz_description, s.score, s.total_points,
                s.total_questions, s.time_taken, s.completed_at
            FROM quiz_sessions s
            JOIN quizzes q ON q.id = s.quiz_id
            WHERE s.student_id = $1 AND s.completed_at IS NOT NULL
            ORDER BY s.completed_at DESC, s.id DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }
}

/// Escapes LIKE wildcards so the filter matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
        assert_eq!(escape_like("Algebra"), "Algebra");
    }
}
