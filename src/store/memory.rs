// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        answer::{Answer, GradedAnswer},
        leaderboard::{GlobalLeaderboardEntry, LeaderboardEntry, StudentResult},
        profile::{NewProfile, Profile, Role},
        question::Question,
        quiz::{LiveState, Quiz, QuizDraft, QuizStatus, QuizSummary},
        session::{NewSession, QuizSession, percentage},
    },
    store::QuizStore,
    utils::scoring::rank_sessions,
};

/// In-process `QuizStore`. Every call takes one lock, so each operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    quizzes: BTreeMap<i64, Quiz>,
    questions: BTreeMap<i64, Question>,
    sessions: BTreeMap<i64, QuizSession>,
    answers: BTreeMap<i64, Answer>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        Ok(self.tables.read().await.profiles.get(id).cloned())
    }

    async fn ensure_profile(&self, profile: NewProfile) -> Result<(Profile, bool), AppError> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.profiles.get(&profile.id) {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let created = Profile {
            id: profile.id.clone(),
            email: profile.email,
            display_name: profile.display_name,
            role: profile.role,
            is_approved: profile.is_approved,
            created_at: now,
            updated_at: now,
        };
        t.profiles.insert(profile.id, created.clone());
        Ok((created, true))
    }

    async fn list_profiles(&self, role: Option<Role>, pending_only: bool) -> Result<Vec<Profile>, AppError> {
        let t = self.tables.read().await;
        let mut profiles: Vec<Profile> = t
            .profiles
            .values()
            .filter(|p| role.is_none_or(|r| p.role == r))
            .filter(|p| !pending_only || !p.is_approved)
            .cloned()
            .collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(profiles)
    }

    async fn set_approval(&self, id: &str, approved: bool) -> Result<Option<Profile>, AppError> {
        let mut t = self.tables.write().await;
        Ok(t.profiles.get_mut(id).map(|p| {
            p.is_approved = approved;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn update_display_name(&self, id: &str, display_name: &str) -> Result<Option<Profile>, AppError> {
        let mut t = self.tables.write().await;
        Ok(t.profiles.get_mut(id).map(|p| {
            p.display_name = display_name.to_string();
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn create_quiz(&self, teacher_id: &str, join_code: &str, draft: &QuizDraft) -> Result<Quiz, AppError> {
        let mut t = self.tables.write().await;
        if t.quizzes.values().any(|q| q.join_code == join_code) {
            return Err(AppError::Conflict(format!("Join code '{}' is already taken", join_code)));
        }

        let quiz = Quiz {
            id: t.next_id(),
            teacher_id: teacher_id.to_string(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            join_code: join_code.to_string(),
            total_questions: draft.questions.len() as i32,
            status: QuizStatus::Draft,
            current_question: 0,
            reveal_results: false,
            question_started_at: None,
            started_at: None,
            ended_at: None,
            created_at: Utc::now(),
        };

        for (index, q) in draft.questions.iter().enumerate() {
            let id = t.next_id();
            t.questions.insert(
                id,
                Question {
                    id,
                    quiz_id: quiz.id,
                    text: q.text.clone(),
                    options: Json(q.options.clone()),
                    correct_answer: q.correct_answer,
                    time_limit: q.time_limit,
                    points: q.points,
                    order_index: index as i32,
                },
            );
        }

        t.quizzes.insert(quiz.id, quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<Quiz>, AppError> {
        Ok(self.tables.read().await.quizzes.get(&id).cloned())
    }

    async fn find_quiz_by_code(&self, join_code: &str) -> Result<Option<Quiz>, AppError> {
        let t = self.tables.read().await;
        Ok(t.quizzes.values().find(|q| q.join_code == join_code).cloned())
    }

    async fn list_quizzes_by_teacher(&self, teacher_id: &str) -> Result<Vec<QuizSummary>, AppError> {
        let t = self.tables.read().await;
        let mut quizzes: Vec<QuizSummary> = t
            .quizzes
            .values()
            .filter(|q| q.teacher_id == teacher_id)
            .map(|q| QuizSummary {
                id: q.id,
                title: q.title.clone(),
                description: q.description.clone(),
                join_code: q.join_code.clone(),
                status: q.status,
                total_questions: q.total_questions,
                sessions_count: t.sessions.values().filter(|s| s.quiz_id == q.id).count() as i64,
                created_at: q.created_at,
            })
            .collect();
        quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(quizzes)
    }

    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<Question>, AppError> {
        let t = self.tables.read().await;
        let mut questions: Vec<Question> = t
            .questions
            .values()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn delete_quiz(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        if t.quizzes.remove(&id).is_none() {
            return Ok(false);
        }
        t.questions.retain(|_, q| q.quiz_id != id);

        let session_ids: Vec<i64> = t
            .sessions
            .values()
            .filter(|s| s.quiz_id == id)
            .map(|s| s.id)
            .collect();
        t.sessions.retain(|_, s| s.quiz_id != id);
        t.answers.retain(|_, a| !session_ids.contains(&a.session_id));
        Ok(true)
    }

    async fn save_live_state(&self, quiz_id: i64, state: &LiveState) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        let quiz = t
            .quizzes
            .get_mut(&quiz_id)
            .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
        quiz.apply(state);
        Ok(())
    }

    async fn advance_sessions(&self, quiz_id: i64, index: i32) -> Result<u64, AppError> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let mut moved = 0;
        for s in t.sessions.values_mut() {
            if s.quiz_id == quiz_id && s.is_active && s.current_question < index {
                s.current_question = index;
                s.updated_at = now;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn close_sessions(&self, quiz_id: i64, at: DateTime<Utc>) -> Result<u64, AppError> {
        let mut t = self.tables.write().await;
        let mut closed = 0;
        for s in t.sessions.values_mut() {
            if s.quiz_id == quiz_id && s.is_active {
                s.is_active = false;
                s.completed_at = Some(at);
                s.updated_at = at;
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn find_active_session(&self, quiz_id: i64, student_id: &str) -> Result<Option<QuizSession>, AppError> {
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .find(|s| s.quiz_id == quiz_id && s.student_id == student_id && s.is_active)
            .cloned())
    }

    async fn create_session(&self, session: NewSession) -> Result<QuizSession, AppError> {
        let mut t = self.tables.write().await;
        let duplicate = t.sessions.values().any(|s| {
            s.quiz_id == session.quiz_id && s.student_id == session.student_id && s.is_active
        });
        if duplicate {
            return Err(AppError::Conflict(
                "Student already has an active session for this quiz".to_string(),
            ));
        }

        let created = QuizSession {
            id: t.next_id(),
            quiz_id: session.quiz_id,
            student_id: session.student_id,
            nickname: session.nickname,
            score: 0,
            total_points: 0,
            total_questions: session.total_questions,
            current_question: session.current_question,
            time_taken: 0,
            is_active: true,
            started_at: session.started_at,
            completed_at: None,
            updated_at: session.started_at,
        };
        t.sessions.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_session(&self, id: i64) -> Result<Option<QuizSession>, AppError> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self, quiz_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<QuizSession>, AppError> {
        let t = self.tables.read().await;
        let mut sessions: Vec<QuizSession> = t
            .sessions
            .values()
            .filter(|s| s.quiz_id == quiz_id)
            .filter(|s| since.is_none_or(|since| s.started_at >= since))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.time_taken.cmp(&b.time_taken))
                .then(a.id.cmp(&b.id))
        });
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
        let mut t = self.tables.write().await;

        let already_answered = t
            .answers
            .values()
            .any(|a| a.session_id == session_id && a.question_id == graded.question_id);
        if already_answered {
            return Err(AppError::Conflict("Question already answered".to_string()));
        }

        let in_step = t
            .sessions
            .get(&session_id)
            .is_some_and(|s| s.is_active && s.current_question == expected_index);
        if !in_step {
            return Err(AppError::Conflict(
                "Session moved on before the answer was recorded".to_string(),
            ));
        }

        let answer_id = t.next_id();
        t.answers.insert(
            answer_id,
            Answer {
                id: answer_id,
                session_id,
                question_id: graded.question_id,
                answer: graded.answer,
                is_correct: graded.is_correct,
                timed_out: graded.timed_out,
                points_earned: graded.points_earned,
                time_taken: graded.time_taken,
                answered_at: at,
            },
        );

        let session = t
            .sessions
            .get_mut(&session_id)
            .ok_or(AppError::NotFound("Session not found".to_string()))?;
        if graded.is_correct {
            session.score += 1;
        }
        session.total_points += graded.points_earned;
        session.time_taken += graded.time_taken;
        session.current_question += 1;
        if completes {
            session.is_active = false;
            session.completed_at = Some(at);
        }
        session.updated_at = at;

        Ok(session.clone())
    }

    async fn list_answers_for_question(&self, question_id: i64, since: Option<DateTime<Utc>>) -> Result<Vec<Answer>, AppError> {
        let t = self.tables.read().await;
        Ok(t.answers
            .values()
            .filter(|a| a.question_id == question_id)
            .filter(|a| since.is_none_or(|since| a.answered_at >= since))
            .cloned()
            .collect())
    }

    async fn list_answers_by_session(&self, session_id: i64) -> Result<Vec<Answer>, AppError> {
        let t = self.tables.read().await;
        Ok(t.answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn quiz_leaderboard(&self, quiz_id: i64, limit: i64) -> Result<Vec<LeaderboardEntry>, AppError> {
        let t = self.tables.read().await;
        let finished: Vec<QuizSession> = t
            .sessions
            .values()
            .filter(|s| s.quiz_id == quiz_id && s.completed_at.is_some())
            .cloned()
            .collect();

        let mut entries = rank_sessions(finished);
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn global_leaderboard(&self, title_filter: Option<&str>, limit: i64) -> Result<Vec<GlobalLeaderboardEntry>, AppError> {
        let t = self.tables.read().await;
        let needle = title_filter.map(str::to_lowercase);

        let mut entries: Vec<(i64, GlobalLeaderboardEntry)> = t
            .sessions
            .values()
            .filter(|s| s.completed_at.is_some())
            .filter_map(|s| t.quizzes.get(&s.quiz_id).map(|q| (s, q)))
            .filter(|(_, q)| {
                needle
                    .as_deref()
                    .is_none_or(|n| q.title.to_lowercase().contains(n))
            })
            .map(|(s, q)| {
                (
                    s.id,
                    GlobalLeaderboardEntry {
                        quiz_id: q.id,
                        quiz_title: q.title.clone(),
                        nickname: s.nickname.clone(),
                        score: s.score,
                        total_questions: s.total_questions,
                        time_taken: s.time_taken,
                        completed_at: s.completed_at,
                        percentage: percentage(s.score, s.total_questions),
                    },
                )
            })
            .collect();

        entries.sort_by(|(a_id, a), (b_id, b)| b.completed_at.cmp(&a.completed_at).then(b_id.cmp(a_id)));
        Ok(entries
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, e)| e)
            .collect())
    }

    async fn student_results(&self, student_id: &str) -> Result<Vec<StudentResult>, AppError> {
        let t = self.tables.read().await;
        let mut results: Vec<StudentResult> = t
            .sessions
            .values()
            .filter(|s| s.student_id == student_id && s.completed_at.is_some())
            .filter_map(|s| {
                t.quizzes.get(&s.quiz_id).map(|q| StudentResult {
                    session_id: s.id,
                    quiz_id: q.id,
                    quiz_title: q.title.clone(),
                    quiz_description: q.description.clone(),
                    score: s.score,
                    total_points: s.total_points,
                    total_questions: s.total_questions,
                    time_taken: s.time_taken,
                    completed_at: s.completed_at,
                })
            })
            .collect();
        results.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then(b.session_id.cmp(&a.session_id))
        });
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::NewQuestion;

    fn draft(n: usize) -> QuizDraft {
        QuizDraft {
            title: "Capitals".into(),
            description: None,
            questions: (0..n)
                .map(|i| NewQuestion {
                    text: format!("Q{}", i),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer: 0,
                    time_limit: 30,
                    points: 2,
                })
                .collect(),
        }
    }

    fn graded(question_id: i64, correct: bool) -> GradedAnswer {
        GradedAnswer {
            question_id,
            answer: Some(if correct { 0 } else { 1 }),
            is_correct: correct,
            timed_out: false,
            points_earned: if correct { 2 } else { 0 },
            time_taken: 3,
        }
    }

    async fn seeded(n: usize) -> (MemoryStore, Quiz, Vec<Question>, QuizSession) {
        let store = MemoryStore::new();
        let quiz = store.create_quiz("t1", "ABC234", &draft(n)).await.unwrap();
        let questions = store.list_questions(quiz.id).await.unwrap();
        let session = store
            .create_session(NewSession {
                quiz_id: quiz.id,
                student_id: "s1".into(),
                nickname: "Sam".into(),
                total_questions: n as i32,
                current_question: 0,
                started_at: Utc::now(),
            })
            .await
            .unwrap();
        (store, quiz, questions, session)
    }

    #[tokio::test]
    async fn test_ensure_profile_is_idempotent() {
        let store = MemoryStore::new();
        let (first, created) = store
            .ensure_profile(NewProfile::new("t1", None, "Teach".into(), Role::Teacher))
            .await
            .unwrap();
        assert!(created);
        assert!(!first.is_approved);

        let (second, created) = store
            .ensure_profile(NewProfile::new("t1", None, "Other".into(), Role::Teacher))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.display_name, "Teach");
    }

    #[tokio::test]
    async fn test_update_display_name() {
        let store = MemoryStore::new();
        assert!(store.update_display_name("s1", "Sam").await.unwrap().is_none());

        store
            .ensure_profile(NewProfile::new("s1", None, "Sam".into(), Role::Student))
            .await
            .unwrap();
        let renamed = store.update_display_name("s1", "Samantha").await.unwrap().unwrap();
        assert_eq!(renamed.display_name, "Samantha");
        assert_eq!(renamed.role, Role::Student);
        assert_eq!(store.get_profile("s1").await.unwrap().unwrap().display_name, "Samantha");
    }

    #[tokio::test]
    async fn test_late_answer_keeps_timeout_flag() {
        let (store, _, questions, session) = seeded(2).await;
        let late = GradedAnswer {
            timed_out: true,
            ..graded(questions[0].id, false)
        };
        store
            .record_answer(session.id, 0, &late, false, Utc::now())
            .await
            .unwrap();

        let answers = store.list_answers_for_question(questions[0].id, None).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert!(answers[0].timed_out);
        assert_eq!(answers[0].answer, Some(1));
    }

    #[tokio::test]
    async fn test_duplicate_join_code_conflicts() {
        let store = MemoryStore::new();
        store.create_quiz("t1", "ABC234", &draft(1)).await.unwrap();
        let err = store.create_quiz("t1", "ABC234", &draft(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_questions_keep_order() {
        let (_, _, questions, _) = seeded(3).await;
        let order: Vec<i32> = questions.iter().map(|q| q.order_index).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_record_answer_updates_score_and_completes() {
        let (store, _, questions, session) = seeded(2).await;

        let after_first = store
            .record_answer(session.id, 0, &graded(questions[0].id, true), false, Utc::now())
            .await
            .unwrap();
        assert_eq!(after_first.score, 1);
        assert_eq!(after_first.total_points, 2);
        assert_eq!(after_first.current_question, 1);
        assert!(after_first.is_active);

        let after_second = store
            .record_answer(session.id, 1, &graded(questions[1].id, false), true, Utc::now())
            .await
            .unwrap();
        assert_eq!(after_second.score, 1);
        assert_eq!(after_second.time_taken, 6);
        assert!(!after_second.is_active);
        assert!(after_second.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_answer_conflicts() {
        let (store, _, questions, session) = seeded(2).await;
        store
            .record_answer(session.id, 0, &graded(questions[0].id, true), false, Utc::now())
            .await
            .unwrap();
        let err = store
            .record_answer(session.id, 1, &graded(questions[0].id, true), false, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.list_answers_by_session(session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_index_conflicts() {
        let (store, quiz, questions, session) = seeded(3).await;
        store.advance_sessions(quiz.id, 1).await.unwrap();
        let err = store
            .record_answer(session.id, 0, &graded(questions[0].id, true), false, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_advance_never_moves_sessions_back() {
        let (store, quiz, _, session) = seeded(3).await;
        assert_eq!(store.advance_sessions(quiz.id, 2).await.unwrap(), 1);
        assert_eq!(store.advance_sessions(quiz.id, 1).await.unwrap(), 0);
        let s = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(s.current_question, 2);
    }

    #[tokio::test]
    async fn test_close_sessions_feeds_leaderboard() {
        let (store, quiz, _, session) = seeded(1).await;
        assert!(store.quiz_leaderboard(quiz.id, 10).await.unwrap().is_empty());

        store.close_sessions(quiz.id, Utc::now()).await.unwrap();
        let board = store.quiz_leaderboard(quiz.id, 10).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].session_id, session.id);
        assert_eq!(board[0].rank, 1);
    }

    #[tokio::test]
    async fn test_delete_quiz_cascades() {
        let (store, quiz, questions, session) = seeded(1).await;
        store
            .record_answer(session.id, 0, &graded(questions[0].id, true), true, Utc::now())
            .await
            .unwrap();

        assert!(store.delete_quiz(quiz.id).await.unwrap());
        assert!(store.get_session(session.id).await.unwrap().is_none());
        assert!(store.list_questions(quiz.id).await.unwrap().is_empty());
        assert!(store.list_answers_by_session(session.id).await.unwrap().is_empty());
        assert!(!store.delete_quiz(quiz.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_global_leaderboard_filters_by_title() {
        let (store, quiz, _, _) = seeded(1).await;
        store.close_sessions(quiz.id, Utc::now()).await.unwrap();

        assert_eq!(store.global_leaderboard(Some("capit"), 100).await.unwrap().len(), 1);
        assert!(store.global_leaderboard(Some("algebra"), 100).await.unwrap().is_empty());
    }
}
