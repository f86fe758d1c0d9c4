use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionKind;
use crate::services::grading::QuestionWithOptions;

const COLUMNS: &str = "\
    id, exam_id, kind, text_ar, text_en, image_url, marks, negative_marks, \
    correct_answer, explanation_ar, explanation_en, display_order, \
    is_active, is_deleted, created_at, updated_at";

const OPTION_COLUMNS: &str = "\
    id, question_id, text_ar, text_en, image_url, is_correct, display_order, \
    is_active, created_at";

pub(crate) struct QuestionWrite<'a> {
    pub kind: QuestionKind,
    pub text_ar: &'a str,
    pub text_en: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub marks: f64,
    pub negative_marks: f64,
    pub correct_answer: Option<&'a str>,
    pub explanation_ar: Option<&'a str>,
    pub explanation_en: Option<&'a str>,
    pub display_order: i32,
    pub options: Vec<OptionWrite<'a>>,
}

pub(crate) struct OptionWrite<'a> {
    pub text_ar: &'a str,
    pub text_en: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub is_correct: bool,
    pub display_order: i32,
}

/// Inserts the question and its options in one transaction so a failed option
/// insert never leaves an option-less choice question behind.
pub(crate) async fn create(
    pool: &PgPool,
    exam_id: &str,
    params: QuestionWrite<'_>,
    now: PrimitiveDateTime,
) -> Result<Question, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let question = sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, exam_id, kind, text_ar, text_en, image_url, marks, negative_marks,
            correct_answer, explanation_ar, explanation_en, display_order,
            is_active, is_deleted, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,TRUE,FALSE,$13,$13)
        RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(exam_id)
    .bind(params.kind)
    .bind(params.text_ar)
    .bind(params.text_en)
    .bind(params.image_url)
    .bind(params.marks)
    .bind(params.negative_marks)
    .bind(params.correct_answer)
    .bind(params.explanation_ar)
    .bind(params.explanation_en)
    .bind(params.display_order)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for option in params.options {
        sqlx::query(
            "INSERT INTO question_options (
                id, question_id, text_ar, text_en, image_url, is_correct,
                display_order, is_active, created_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,TRUE,$8)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&question.id)
        .bind(option.text_ar)
        .bind(option.text_en)
        .bind(option.image_url)
        .bind(option.is_correct)
        .bind(option.display_order)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(question)
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE id = $1 AND NOT is_deleted"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn soft_delete(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE questions SET is_deleted = TRUE, updated_at = $1 WHERE id = $2 AND NOT is_deleted",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn options_for_question(
    pool: &PgPool,
    question_id: &str,
    shuffle: bool,
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    let order = if shuffle { "random()" } else { "display_order, id" };
    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options
         WHERE question_id = $1 AND is_active
         ORDER BY {order}",
    ))
    .bind(question_id)
    .fetch_all(pool)
    .await
}

/// Questions with options for taking or grading. Shuffle flags push the
/// ordering into SQL; grading callers pass `false` for both.
pub(crate) async fn list_for_exam(
    pool: &PgPool,
    exam_id: &str,
    shuffle_questions: bool,
    shuffle_options: bool,
) -> Result<Vec<QuestionWithOptions>, sqlx::Error> {
    let order = if shuffle_questions { "random()" } else { "display_order, id" };
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions
         WHERE exam_id = $1 AND NOT is_deleted AND is_active
         ORDER BY {order}",
    ))
    .bind(exam_id)
    .fetch_all(pool)
    .await?;

    let mut loaded = Vec::with_capacity(questions.len());
    for question in questions {
        let options = options_for_question(pool, &question.id, shuffle_options).await?;
        loaded.push(QuestionWithOptions { question, options });
    }

    Ok(loaded)
}

pub(crate) async fn count_for_exam(pool: &PgPool, exam_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE exam_id = $1 AND NOT is_deleted")
        .bind(exam_id)
        .fetch_one(pool)
        .await
}
