// src/handlers/host.rs

//! Live hosting: the teacher drives the shared question index.
//!
//! Every transition is a read of the quiz row, a pure state change on
//! [`Quiz`], and a write back. Concurrent hosts are last-write-wins.

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;

use crate::{
    config::POLL_INTERVAL_MS,
    error::AppError,
    handlers::quiz::owned_quiz,
    models::{
        answer::QuestionResults,
        question::Question,
        quiz::{Advance, LiveState, Quiz},
        session::Participant,
    },
    store::DynStore,
    utils::{jwt::Claims, scoring::tally_question},
};

/// Returned by every transition.
#[derive(Debug, Serialize)]
pub struct LiveStateResponse {
    pub quiz_id: i64,
    #[serde(flatten)]
    pub state: LiveState,
    pub total_questions: i32,
}

impl LiveStateResponse {
    fn new(quiz: &Quiz, state: LiveState) -> Self {
        Self {
            quiz_id: quiz.id,
            state,
            total_questions: quiz.total_questions,
        }
    }
}

/// Polled by the host every `poll_interval_ms`.
#[derive(Debug, Serialize)]
pub struct HostView {
    pub quiz: Quiz,
    pub current_question: Option<Question>,
    pub answered_count: i64,
    pub participants: Vec<Participant>,
    pub poll_interval_ms: u64,
}

async fn current_question(store: &DynStore, quiz: &Quiz) -> Result<Option<Question>, AppError> {
    let questions = store.list_questions(quiz.id).await?;
    Ok(usize::try_from(quiz.current_question)
        .ok()
        .and_then(|idx| questions.into_iter().nth(idx)))
}

/// Makes the quiz live at its first question.
pub async fn start_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&store, &claims, id).await?;
    let state = quiz.start(Utc::now())?;

    store.save_live_state(quiz.id, &state).await?;
    tracing::info!("Quiz {} started", quiz.id);

    Ok(Json(LiveStateResponse::new(&quiz, state)))
}

/// Moves everyone to the next question; after the last one the quiz ends.
pub async fn next_question(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&store, &claims, id).await?;
    let now = Utc::now();

    let state = match quiz.advance(now)? {
        Advance::Next(state) => {
            store.save_live_state(quiz.id, &state).await?;
            let moved = store
                .advance_sessions(quiz.id, state.current_question)
                .await?;
            tracing::info!(
                "Quiz {} advanced to question {} ({} sessions moved)",
                quiz.id,
                state.current_question,
                moved
            );
            state
        }
        Advance::Finished(state) => {
            store.save_live_state(quiz.id, &state).await?;
            let closed = store.close_sessions(quiz.id, now).await?;
            tracing::info!("Quiz {} finished after last question ({} sessions closed)", quiz.id, closed);
            state
        }
    };

    Ok(Json(LiveStateResponse::new(&quiz, state)))
}

/// Closes answering on the current question and returns its results.
pub async fn reveal_results(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&store, &claims, id).await?;
    let state = quiz.reveal()?;

    let question = current_question(&store, &quiz)
        .await?
        .ok_or(AppError::Conflict("Quiz has no current question".to_string()))?;

    store.save_live_state(quiz.id, &state).await?;

    let answers = store
        .list_answers_for_question(question.id, quiz.started_at)
        .await?;
    let participants = store.list_sessions(quiz.id, quiz.started_at).await?.len() as i64;

    tracing::info!("Quiz {} revealed question {}", quiz.id, quiz.current_question);

    let results: QuestionResults = tally_question(question, quiz.current_question, &answers, participants);
    Ok(Json(results))
}

/// Ends the quiz and completes every running session.
pub async fn end_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&store, &claims, id).await?;
    let now = Utc::now();
    let state = quiz.end(now)?;

    store.save_live_state(quiz.id, &state).await?;
    let closed = store.close_sessions(quiz.id, now).await?;
    tracing::info!("Quiz {} ended ({} sessions closed)", quiz.id, closed);

    Ok(Json(LiveStateResponse::new(&quiz, state)))
}

/// Live dashboard for the host.
pub async fn host_view(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&store, &claims, id).await?;

    let question = if quiz.is_live() {
        current_question(&store, &quiz).await?
    } else {
        None
    };

    let answered_count = match &question {
        Some(q) => store
            .list_answers_for_question(q.id, quiz.started_at)
            .await?
            .len() as i64,
        None => 0,
    };

    let participants = store
        .list_sessions(quiz.id, quiz.started_at)
        .await?
        .iter()
        .map(Participant::from)
        .collect();

    Ok(Json(HostView {
        quiz,
        current_question: question,
        answered_count,
        participants,
        poll_interval_ms: POLL_INTERVAL_MS,
    }))
}
