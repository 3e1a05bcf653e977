// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::JOIN_CODE_ATTEMPTS,
    error::AppError,
    models::{
        profile::{Profile, Role},
        quiz::{CreateQuizRequest, Quiz, QuizDraft, QuizWithQuestions},
    },
    store::DynStore,
    utils::{html::clean_html, join_code, jwt::Claims},
};

/// Loads the caller's profile and checks they may author and host quizzes.
/// Admins always may; teachers only once approved.
pub(crate) async fn require_teacher(store: &DynStore, claims: &Claims) -> Result<Profile, AppError> {
    let profile = store
        .get_profile(&claims.sub)
        .await?
        .ok_or(AppError::Forbidden("Profile not registered".to_string()))?;

    match (profile.role, profile.is_approved) {
        (Role::Admin, _) | (Role::Teacher, true) => Ok(profile),
        (Role::Teacher, false) => Err(AppError::Forbidden(
            "Teacher account is awaiting admin approval".to_string(),
        )),
        (Role::Student, _) => Err(AppError::Forbidden(
            "Only teachers can manage quizzes".to_string(),
        )),
    }
}

/// Loads a quiz the caller owns (admins may act on any quiz).
pub(crate) async fn owned_quiz(store: &DynStore, claims: &Claims, quiz_id: i64) -> Result<Quiz, AppError> {
    let profile = require_teacher(store, claims).await?;

    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if quiz.teacher_id != profile.id && profile.role != Role::Admin {
        return Err(AppError::Forbidden(
            "You are not the host of this quiz".to_string(),
        ));
    }

    Ok(quiz)
}

fn draft_from(req: CreateQuizRequest) -> QuizDraft {
    let description = req
        .description
        .map(|d| clean_html(d.trim()))
        .filter(|d| !d.is_empty());

    QuizDraft {
        title: clean_html(req.title.trim()),
        description,
        questions: req.questions.iter().map(|q| q.normalized()).collect(),
    }
}

/// Creates a quiz with its questions.
///
/// * Validates the payload (title, 4 options per question, time limit 5-300s).
/// * Assigns a fresh join code, retrying on collision.
pub async fn create_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher = require_teacher(&store, &claims).await?;
    let draft = draft_from(payload);

    // Sanitising can leave nothing behind (e.g. a title that was only a <script>).
    if draft.title.is_empty() {
        return Err(AppError::BadRequest("Quiz title is required".to_string()));
    }

    for attempt in 1..=JOIN_CODE_ATTEMPTS {
        let code = join_code::generate();
        match store.create_quiz(&teacher.id, &code, &draft).await {
            Ok(quiz) => {
                tracing::info!(
                    "Quiz {} created by {} with {} questions (code {})",
                    quiz.id,
                    teacher.id,
                    quiz.total_questions,
                    quiz.join_code
                );
                return Ok((StatusCode::CREATED, Json(quiz)));
            }
            Err(AppError::Conflict(_)) => {
                tracing::warn!("Join code collision, retrying... (Attempt {})", attempt);
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::InternalServerError(
        "Could not allocate a unique join code".to_string(),
    ))
}

/// Lists the caller's quizzes, newest first.
pub async fn list_my_quizzes(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let teacher = require_teacher(&store, &claims).await?;
    let quizzes = store.list_quizzes_by_teacher(&teacher.id).await?;

    Ok(Json(quizzes))
}

/// Get a quiz with its questions, answer key included.
pub async fn get_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&store, &claims, id).await?;
    let questions = store.list_questions(quiz.id).await?;

    Ok(Json(QuizWithQuestions { quiz, questions }))
}

/// Deletes a quiz with everything attached to it.
/// A live quiz must be ended first.
pub async fn delete_quiz(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&store, &claims, id).await?;

    if quiz.is_live() {
        return Err(AppError::Conflict(
            "End the quiz before deleting it".to_string(),
        ));
    }

    if !store.delete_quiz(quiz.id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    tracing::info!("Quiz {} deleted by {}", quiz.id, claims.sub);

    Ok(StatusCode::NO_CONTENT)
}
