use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{ExamAnswer, ExamAttempt};
use crate::db::types::AttemptStatus;
use crate::services::grading::GradedAnswer;

const COLUMNS: &str = "\
    id, exam_id, user_id, attempt_number, started_at, submitted_at, \
    time_spent_minutes, total_marks, obtained_marks, percentage, is_passed, \
    status, ip_address, user_agent, created_at, updated_at";

const ANSWER_COLUMNS: &str = "\
    id, attempt_id, question_id, selected_option_id, answer_text, is_correct, \
    marks_obtained, instructor_feedback, graded_by, graded_at, answered_at, \
    time_spent_seconds";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Look-up-then-branch, no locking; see the design notes on the start race.
pub(crate) async fn find_in_progress(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "SELECT {COLUMNS} FROM exam_attempts
         WHERE user_id = $1 AND exam_id = $2 AND status = $3
         ORDER BY started_at DESC
         LIMIT 1",
    ))
    .bind(user_id)
    .bind(exam_id)
    .bind(AttemptStatus::InProgress)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn count_for_user(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_attempts WHERE user_id = $1 AND exam_id = $2")
        .bind(user_id)
        .bind(exam_id)
        .fetch_one(pool)
        .await
}

pub(crate) struct CreateAttempt<'a> {
    pub exam_id: &'a str,
    pub user_id: &'a str,
    pub attempt_number: i32,
    pub total_marks: f64,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAttempt<'_>,
    now: PrimitiveDateTime,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (
            id, exam_id, user_id, attempt_number, started_at, total_marks,
            obtained_marks, percentage, is_passed, status, ip_address, user_agent,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,0,0,FALSE,$7,$8,$9,$5,$5)
        RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.exam_id)
    .bind(params.user_id)
    .bind(params.attempt_number)
    .bind(now)
    .bind(params.total_marks)
    .bind(AttemptStatus::InProgress)
    .bind(params.ip_address)
    .bind(params.user_agent)
    .fetch_one(pool)
    .await
}

/// Attempt joined with its exam titles for history views.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttemptListRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) obtained_marks: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) is_passed: bool,
    pub(crate) status: AttemptStatus,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    exam_id: Option<&str>,
) -> Result<Vec<AttemptListRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptListRow>(
        "SELECT a.id, a.exam_id, a.attempt_number, a.started_at, a.submitted_at,
                a.obtained_marks, a.total_marks, a.percentage, a.is_passed, a.status,
                e.title_ar AS exam_title_ar, e.title_en AS exam_title_en
         FROM exam_attempts a
         JOIN exams e ON e.id = a.exam_id
         WHERE a.user_id = $1 AND ($2::text IS NULL OR a.exam_id = $2)
         ORDER BY COALESCE(a.submitted_at, a.started_at) DESC",
    )
    .bind(user_id)
    .bind(exam_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct AnswerWrite<'a> {
    pub attempt_id: &'a str,
    pub question_id: &'a str,
    pub selected_option_id: Option<&'a str>,
    pub answer_text: Option<&'a str>,
    pub time_spent_seconds: i32,
}

/// One row per (attempt, question); re-answering replaces the previous value.
pub(crate) async fn upsert_answer(
    pool: &PgPool,
    params: AnswerWrite<'_>,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO exam_answers (
            id, attempt_id, question_id, selected_option_id, answer_text,
            marks_obtained, answered_at, time_spent_seconds
        ) VALUES ($1,$2,$3,$4,$5,0,$6,$7)
        ON CONFLICT ON CONSTRAINT uq_exam_answers_attempt_question DO UPDATE SET
            selected_option_id = EXCLUDED.selected_option_id,
            answer_text = EXCLUDED.answer_text,
            answered_at = EXCLUDED.answered_at,
            time_spent_seconds = EXCLUDED.time_spent_seconds,
            is_correct = NULL,
            marks_obtained = 0",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(params.attempt_id)
    .bind(params.question_id)
    .bind(params.selected_option_id)
    .bind(params.answer_text)
    .bind(now)
    .bind(params.time_spent_seconds)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn answers_for_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<ExamAnswer>, sqlx::Error> {
    sqlx::query_as::<_, ExamAnswer>(&format!(
        "SELECT {ANSWER_COLUMNS} FROM exam_answers WHERE attempt_id = $1",
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct FinalizeAttempt<'a> {
    pub attempt_id: &'a str,
    pub obtained_marks: f64,
    pub total_marks: f64,
    pub percentage: f64,
    pub is_passed: bool,
    pub time_spent_minutes: i32,
    pub graded: &'a [GradedAnswer],
}

/// Writes per-answer grades and the attempt totals in one transaction and
/// flips the attempt to completed. Everything commits or nothing does.
pub(crate) async fn finalize(
    pool: &PgPool,
    params: FinalizeAttempt<'_>,
    now: PrimitiveDateTime,
) -> Result<ExamAttempt, sqlx::Error> {
    let mut tx = pool.begin().await?;

    for graded in params.graded {
        sqlx::query(
            "UPDATE exam_answers SET is_correct = $1, marks_obtained = $2 WHERE id = $3",
        )
        .bind(graded.is_correct)
        .bind(graded.marks_awarded)
        .bind(&graded.answer_id)
        .execute(&mut *tx)
        .await?;
    }

    let attempt = sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts SET
            status = $1,
            submitted_at = $2,
            time_spent_minutes = $3,
            total_marks = $4,
            obtained_marks = $5,
            percentage = $6,
            is_passed = $7,
            updated_at = $2
         WHERE id = $8
         RETURNING {COLUMNS}",
    ))
    .bind(AttemptStatus::Completed)
    .bind(now)
    .bind(params.time_spent_minutes)
    .bind(params.total_marks)
    .bind(params.obtained_marks)
    .bind(params.percentage)
    .bind(params.is_passed)
    .bind(params.attempt_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(attempt)
}
