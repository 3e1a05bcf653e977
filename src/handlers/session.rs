// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::{POLL_INTERVAL_MS, QUIZ_LEADERBOARD_LIMIT},
    error::AppError,
    models::{
        answer::{AnswerOutcome, SubmitAnswerRequest},
        profile::NewProfile,
        question::PublicQuestion,
        quiz::{Quiz, QuizPreview},
        session::{JoinRequest, NewSession, QuizBrief, QuizSession, SessionPhase, SessionView},
    },
    store::DynStore,
    utils::{join_code, jwt::Claims, scoring::grade_answer},
};

async fn live_quiz_by_code(store: &DynStore, code: &str) -> Result<Quiz, AppError> {
    store
        .find_quiz_by_code(&join_code::normalize(code))
        .await?
        .filter(Quiz::is_live)
        .ok_or(AppError::NotFound("Quiz not found or not active".to_string()))
}

/// Loads a session owned by the caller.
async fn own_session(store: &DynStore, claims: &Claims, id: i64) -> Result<QuizSession, AppError> {
    let session = store
        .get_session(id)
        .await?
        .ok_or(AppError::NotFound("Session not found".to_string()))?;

    if session.student_id != claims.sub {
        return Err(AppError::Forbidden("Not your session".to_string()));
    }

    Ok(session)
}

/// Looks up an active quiz by join code.
pub async fn lookup_code(
    State(store): State<DynStore>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = live_quiz_by_code(&store, &code).await?;

    Ok(Json(QuizPreview::from(&quiz)))
}

/// Joins a live quiz, or resumes the caller's running session on it.
pub async fn join_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = live_quiz_by_code(&store, &payload.code).await?;
    let nickname = payload.nickname.trim().to_string();

    // Students who never registered get a profile on first join.
    store
        .ensure_profile(NewProfile::new(
            &claims.sub,
            claims.email.clone(),
            nickname.clone(),
            claims.role()?,
        ))
        .await?;

    if let Some(existing) = store.find_active_session(quiz.id, &claims.sub).await? {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let created = store
        .create_session(NewSession {
            quiz_id: quiz.id,
            student_id: claims.sub.clone(),
            nickname,
            total_questions: quiz.total_questions,
            current_question: quiz.current_question,
            started_at: Utc::now(),
        })
        .await;

    let session = match created {
        Ok(session) => session,
        // Lost a race against a parallel join from the same student.
        Err(AppError::Conflict(_)) => {
            let existing = store
                .find_active_session(quiz.id, &claims.sub)
                .await?
                .ok_or(AppError::Conflict("Could not join quiz".to_string()))?;
            return Ok((StatusCode::OK, Json(existing)));
        }
        Err(e) => return Err(e),
    };

    tracing::info!(
        "Session {} joined quiz {} as '{}'",
        session.id,
        quiz.id,
        session.nickname
    );

    Ok((StatusCode::CREATED, Json(session)))
}

/// The student's view of the live quiz, polled every `poll_interval_ms`.
pub async fn session_view(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = own_session(&store, &claims, id).await?;
    let quiz = store
        .get_quiz(session.quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let brief = QuizBrief {
        id: quiz.id,
        title: quiz.title.clone(),
        description: quiz.description.clone(),
        status: quiz.status,
    };

    let mut view = SessionView {
        question_index: session.current_question,
        total_questions: session.total_questions,
        session,
        quiz: brief,
        phase: SessionPhase::Finished,
        question: None,
        seconds_remaining: None,
        correct_answer: None,
        leaderboard: None,
        poll_interval_ms: POLL_INTERVAL_MS,
    };

    if !view.session.is_active || !quiz.is_live() {
        view.leaderboard = Some(store.quiz_leaderboard(quiz.id, QUIZ_LEADERBOARD_LIMIT).await?);
        return Ok(Json(view));
    }

    let questions = store.list_questions(quiz.id).await?;
    let host_question = usize::try_from(quiz.current_question)
        .ok()
        .and_then(|idx| questions.get(idx));

    if view.session.current_question > quiz.current_question {
        // Already answered what the host is showing.
        view.question_index = quiz.current_question;
        view.phase = SessionPhase::Submitted;
    } else {
        view.phase = SessionPhase::Answering;
        if let Some(q) = host_question {
            view.question = Some(PublicQuestion::from(q));
            view.seconds_remaining = quiz
                .elapsed_on_question(Utc::now())
                .map(|elapsed| (q.time_limit as i64 - elapsed).max(0));
        }
    }

    if quiz.reveal_results {
        view.phase = SessionPhase::Revealed;
        view.correct_answer = host_question.map(|q| q.correct_answer);
        view.seconds_remaining = None;
    }

    Ok(Json(view))
}

/// Records the answer to the current question.
///
/// * Timing is measured server-side from when the host showed the question.
/// * A correct answer adds 1 to the score and the question's points.
/// * Answering the last question completes the session.
pub async fn submit_answer(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = own_session(&store, &claims, id).await?;
    if !session.is_active {
        return Err(AppError::Conflict("Session has already finished".to_string()));
    }

    let quiz = store
        .get_quiz(session.quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if !quiz.is_live() {
        return Err(AppError::Conflict("Quiz is not live".to_string()));
    }
    if session.current_question > quiz.current_question {
        return Err(AppError::Conflict(
            "Already answered; waiting for the host".to_string(),
        ));
    }
    // The host moved on and this session has not caught up yet.
    if session.current_question < quiz.current_question {
        return Err(AppError::Conflict(
            "That question is no longer open".to_string(),
        ));
    }
    if quiz.reveal_results {
        return Err(AppError::Conflict(
            "Answers are closed for this question".to_string(),
        ));
    }

    let questions = store.list_questions(quiz.id).await?;
    let question = usize::try_from(session.current_question)
        .ok()
        .and_then(|idx| questions.get(idx))
        .ok_or(AppError::Conflict("No question left to answer".to_string()))?;

    if question.id != req.question_id {
        return Err(AppError::Conflict(
            "That question is no longer open".to_string(),
        ));
    }

    let now = Utc::now();
    let graded = grade_answer(question, req.answer, quiz.elapsed_on_question(now))?;
    let completes = session.current_question + 1 >= session.total_questions;

    let updated = store
        .record_answer(session.id, session.current_question, &graded, completes, now)
        .await?;

    if completes {
        tracing::info!(
            "Session {} completed quiz {} with score {}/{}",
            updated.id,
            quiz.id,
            updated.score,
            updated.total_questions
        );
    }

    Ok(Json(AnswerOutcome {
        is_correct: graded.is_correct,
        timed_out: graded.timed_out,
        points_earned: graded.points_earned,
        score: updated.score,
        total_points: updated.total_points,
        current_question: updated.current_question,
        completed: !updated.is_active,
    }))
}

/// Lists the caller's answers in a session.
pub async fn list_my_answers(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = own_session(&store, &claims, id).await?;
    let answers = store.list_answers_by_session(session.id).await?;

    Ok(Json(answers))
}
