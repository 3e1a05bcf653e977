// src/utils/scoring.rs

use std::cmp::Ordering;

use crate::{
    config::{ANSWER_GRACE_SECS, OPTIONS_PER_QUESTION},
    error::AppError,
    models::{
        answer::{Answer, GradedAnswer, QuestionResults},
        leaderboard::LeaderboardEntry,
        question::Question,
        session::QuizSession,
    },
};

/// Grades a submission against the question's answer key.
///
/// `elapsed_secs` is measured by the server from the moment the host showed
/// the question. Answers arriving after the time limit (plus grace) are
/// recorded as timeouts regardless of the option chosen.
pub fn grade_answer(
    question: &Question,
    answer: Option<i32>,
    elapsed_secs: Option<i64>,
) -> Result<GradedAnswer, AppError> {
    // Negative answers are the client's timeout sentinel.
    let answer = answer.filter(|a| *a >= 0);

    if let Some(a) = answer {
        if a as usize >= OPTIONS_PER_QUESTION {
            return Err(AppError::BadRequest(format!(
                "Answer must be an option index between 0 and {}",
                OPTIONS_PER_QUESTION - 1
            )));
        }
    }

    let limit = question.time_limit as i64;
    let late = elapsed_secs.is_some_and(|e| e > limit + ANSWER_GRACE_SECS);
    let timed_out = answer.is_none() || late;
    let is_correct = !timed_out && answer == Some(question.correct_answer);

    let time_taken = match (timed_out, elapsed_secs) {
        (true, _) => limit,
        (false, Some(e)) => e.clamp(0, limit),
        (false, None) => 0,
    } as i32;

    Ok(GradedAnswer {
        question_id: question.id,
        answer,
        is_correct,
        timed_out,
        points_earned: if is_correct { question.points } else { 0 },
        time_taken,
    })
}

/// Leaderboard ordering: more correct answers first, then faster, then earlier.
pub fn standing_order(a: &QuizSession, b: &QuizSession) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.time_taken.cmp(&b.time_taken))
        .then(a.completed_at.cmp(&b.completed_at))
        .then(a.id.cmp(&b.id))
}

/// Sorts sessions and assigns competition ranks (1, 1, 3, ...).
/// Sessions tie when both score and time taken are equal.
pub fn rank_sessions(mut sessions: Vec<QuizSession>) -> Vec<LeaderboardEntry> {
    sessions.sort_by(standing_order);

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(sessions.len());
    for (position, s) in sessions.iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.score == s.score && prev.time_taken == s.time_taken => prev.rank,
            _ => position as i64 + 1,
        };
        entries.push(LeaderboardEntry {
            rank,
            session_id: s.id,
            nickname: s.nickname.clone(),
            score: s.score,
            total_points: s.total_points,
            total_questions: s.total_questions,
            time_taken: s.time_taken,
            completed_at: s.completed_at,
        });
    }
    entries
}

/// Tallies the answers given to one question.
pub fn tally_question(
    question: Question,
    question_index: i32,
    answers: &[Answer],
    total_participants: i64,
) -> QuestionResults {
    let mut option_counts = vec![0i64; OPTIONS_PER_QUESTION];
    let mut no_answer_count = 0;
    let mut correct_count = 0;

    for a in answers {
        // Late answers keep the option that was picked but count as blank.
        match a.answer {
            Some(idx) if !a.timed_out && (idx as usize) < OPTIONS_PER_QUESTION => {
                option_counts[idx as usize] += 1
            }
            _ => no_answer_count += 1,
        }
        if a.is_correct {
            correct_count += 1;
        }
    }

    QuestionResults {
        question_index,
        question,
        option_counts,
        no_answer_count,
        correct_count,
        total_participants,
    }
}
