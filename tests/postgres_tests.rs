// tests/postgres_tests.rs
//
// Runs against a real database. Skipped unless DATABASE_URL is set.

use chrono::Utc;
use quizhub::{
    error::AppError,
    models::{
        answer::GradedAnswer,
        profile::{NewProfile, Role},
        question::NewQuestion,
        quiz::{Advance, QuizDraft},
        session::NewSession,
    },
    store::{PostgresStore, QuizStore},
};
use sqlx::postgres::PgPoolOptions;

async fn connect() -> Option<PostgresStore> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping Postgres tests");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    Some(PostgresStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

fn draft(title: &str) -> QuizDraft {
    QuizDraft {
        title: title.to_string(),
        description: Some("Postgres round".to_string()),
        questions: (0..2)
            .map(|i| NewQuestion {
                text: format!("Question {}", i),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: i,
                time_limit: 30,
                points: 2,
            })
            .collect(),
    }
}

fn graded(question_id: i64, correct: bool, time_taken: i32) -> GradedAnswer {
    GradedAnswer {
        question_id,
        answer: Some(0),
        is_correct: correct,
        timed_out: false,
        points_earned: if correct { 2 } else { 0 },
        time_taken,
    }
}

#[tokio::test]
async fn postgres_profiles_and_approval() {
    let Some(store) = connect().await else { return };
    let teacher_id = unique("teacher");

    let (profile, created) = store
        .ensure_profile(NewProfile::new(&teacher_id, None, "Teach".into(), Role::Teacher))
        .await
        .unwrap();
    assert!(created);
    assert!(!profile.is_approved);

    let (_, created) = store
        .ensure_profile(NewProfile::new(&teacher_id, None, "Other".into(), Role::Teacher))
        .await
        .unwrap();
    assert!(!created);

    let pending = store.list_profiles(Some(Role::Teacher), true).await.unwrap();
    assert!(pending.iter().any(|p| p.id == teacher_id));

    let approved = store.set_approval(&teacher_id, true).await.unwrap().unwrap();
    assert!(approved.is_approved);

    assert!(store.set_approval(&unique("ghost"), true).await.unwrap().is_none());

    let renamed = store
        .update_display_name(&teacher_id, "Ms. Teach")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.display_name, "Ms. Teach");
    assert!(renamed.is_approved);
    assert!(store.update_display_name(&unique("ghost"), "x").await.unwrap().is_none());
}

#[tokio::test]
async fn postgres_live_quiz_round_trip() {
    let Some(store) = connect().await else { return };
    let teacher_id = unique("teacher");
    store
        .ensure_profile(NewProfile::new(&teacher_id, None, "Teach".into(), Role::Teacher))
        .await
        .unwrap();

    let title = unique("Pg quiz");
    let code = unique("C")[2..8].to_uppercase();
    let quiz = store.create_quiz(&teacher_id, &code, &draft(&title)).await.unwrap();
    assert_eq!(quiz.total_questions, 2);

    let err = store
        .create_quiz(&teacher_id, &code, &draft(&title))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let questions = store.list_questions(quiz.id).await.unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[1].options.0.len(), 4);

    let now = Utc::now();
    let state = quiz.start(now).unwrap();
    store.save_live_state(quiz.id, &state).await.unwrap();
    let quiz = store.find_quiz_by_code(&code).await.unwrap().unwrap();
    assert!(quiz.is_live());

    let mut sessions = Vec::new();
    for name in ["fast", "slow"] {
        let student_id = unique(name);
        store
            .ensure_profile(NewProfile::new(&student_id, None, name.into(), Role::Student))
            .await
            .unwrap();
        let session = store
            .create_session(NewSession {
                quiz_id: quiz.id,
                student_id: student_id.clone(),
                nickname: name.to_string(),
                total_questions: quiz.total_questions,
                current_question: 0,
                started_at: Utc::now(),
            })
            .await
            .unwrap();

        // One active session per student and quiz.
        let dup = store
            .create_session(NewSession {
                quiz_id: quiz.id,
                student_id,
                nickname: name.to_string(),
                total_questions: quiz.total_questions,
                current_question: 0,
                started_at: Utc::now(),
            })
            .await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        sessions.push(session);
    }

    let (fast, slow) = (&sessions[0], &sessions[1]);
    let at = Utc::now();
    store
        .record_answer(fast.id, 0, &graded(questions[0].id, true, 2), false, at)
        .await
        .unwrap();
    store
        .record_answer(slow.id, 0, &graded(questions[0].id, true, 9), false, at)
        .await
        .unwrap();

    // Same question twice
    let err = store
        .record_answer(fast.id, 0, &graded(questions[0].id, true, 2), false, at)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let answers = store
        .list_answers_for_question(questions[0].id, quiz.started_at)
        .await
        .unwrap();
    assert_eq!(answers.len(), 2);

    let Advance::Next(state) = quiz.advance(Utc::now()).unwrap() else {
        panic!("expected the quiz to move to question 1");
    };
    store.save_live_state(quiz.id, &state).await.unwrap();

    let at = Utc::now();
    let fast_done = store
        .record_answer(fast.id, 1, &graded(questions[1].id, true, 3), true, at)
        .await
        .unwrap();
    assert!(!fast_done.is_active);
    assert_eq!(fast_done.score, 2);
    assert_eq!(fast_done.total_points, 4);

    store
        .record_answer(slow.id, 1, &graded(questions[1].id, true, 3), true, at)
        .await
        .unwrap();

    let board = store.quiz_leaderboard(quiz.id, 10).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].nickname, "fast");
    assert_eq!(board[0].rank, 1);
    assert_eq!(board[1].rank, 2);

    let global = store.global_leaderboard(Some(title.to_uppercase().as_str()), 100).await.unwrap();
    assert_eq!(global.len(), 2);
    assert_eq!(global[0].percentage, 100.0);

    let results = store.student_results(&fast.student_id).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].quiz_title, title);

    let quiz = store.get_quiz(quiz.id).await.unwrap().unwrap();
    let state = quiz.end(Utc::now()).unwrap();
    store.save_live_state(quiz.id, &state).await.unwrap();
    assert_eq!(store.close_sessions(quiz.id, Utc::now()).await.unwrap(), 0);

    assert!(store.delete_quiz(quiz.id).await.unwrap());
    assert!(store.get_quiz(quiz.id).await.unwrap().is_none());
}
