use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{Exam, ExamCategory};
use crate::schemas::Bilingual;

pub(crate) const COLUMNS: &str = "\
    id, title_ar, title_en, description_ar, description_en, category_id, course_id, \
    instructor_id, duration_minutes, total_marks, passing_marks, max_attempts, \
    start_date, end_date, is_public, require_password, exam_password, \
    show_results_immediately, show_correct_answers, shuffle_questions, shuffle_options, \
    show_answer_during_exam, show_explanation_during_exam, price, is_active, is_deleted, \
    created_by, created_at, updated_at";

/// Listing row: exam summary plus attempt statistics, one SQL round trip.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamListRow {
    pub(crate) id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) description_ar: Option<String>,
    pub(crate) description_en: Option<String>,
    pub(crate) category_id: Option<String>,
    pub(crate) category_name_ar: Option<String>,
    pub(crate) category_name_en: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) start_date: Option<PrimitiveDateTime>,
    pub(crate) end_date: Option<PrimitiveDateTime>,
    pub(crate) is_public: bool,
    pub(crate) require_password: bool,
    pub(crate) is_active: bool,
    pub(crate) price: f64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) attempts_count: i64,
    pub(crate) unique_students: i64,
    pub(crate) total_count: i64,
}

#[derive(Debug, Default)]
pub(crate) struct ExamListFilter<'a> {
    pub(crate) search: Option<&'a str>,
    pub(crate) category_id: Option<&'a str>,
    pub(crate) instructor_id: Option<&'a str>,
    pub(crate) is_active: Option<bool>,
    pub(crate) is_public: Option<bool>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE id = $1 AND NOT is_deleted"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE id = $1 AND NOT is_deleted"
    ))
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) struct ExamWrite<'a> {
    pub title_ar: &'a str,
    pub title_en: Option<&'a str>,
    pub description_ar: Option<&'a str>,
    pub description_en: Option<&'a str>,
    pub category_id: Option<&'a str>,
    pub course_id: Option<&'a str>,
    pub duration_minutes: i32,
    pub total_marks: f64,
    pub passing_marks: f64,
    pub max_attempts: Option<i32>,
    pub start_date: Option<PrimitiveDateTime>,
    pub end_date: Option<PrimitiveDateTime>,
    pub is_public: bool,
    pub require_password: bool,
    pub exam_password: Option<&'a str>,
    pub show_results_immediately: bool,
    pub show_correct_answers: bool,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub show_answer_during_exam: bool,
    pub show_explanation_during_exam: bool,
    pub price: f64,
}

impl ExamWrite<'_> {
    /// Free exams must be public and unprotected. The schema layer already
    /// normalizes this; the write path enforces it again so no caller can
    /// insert a row the CHECK constraints would reject.
    fn normalized(mut self) -> Self {
        if self.price == 0.0 {
            self.is_public = true;
            self.require_password = false;
            self.exam_password = None;
        }
        self
    }
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    instructor_id: &str,
    params: ExamWrite<'_>,
    now: PrimitiveDateTime,
) -> Result<Exam, sqlx::Error> {
    let params = params.normalized();
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title_ar, title_en, description_ar, description_en, category_id, course_id,
            instructor_id, duration_minutes, total_marks, passing_marks, max_attempts,
            start_date, end_date, is_public, require_password, exam_password,
            show_results_immediately, show_correct_answers, shuffle_questions, shuffle_options,
            show_answer_during_exam, show_explanation_during_exam, price,
            is_active, is_deleted, created_by, created_at, updated_at
        ) VALUES (
            $1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,
            $18,$19,$20,$21,$22,$23,$24,TRUE,FALSE,$25,$26,$26
        )
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(params.title_ar)
    .bind(params.title_en)
    .bind(params.description_ar)
    .bind(params.description_en)
    .bind(params.category_id)
    .bind(params.course_id)
    .bind(instructor_id)
    .bind(params.duration_minutes)
    .bind(params.total_marks)
    .bind(params.passing_marks)
    .bind(params.max_attempts)
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.is_public)
    .bind(params.require_password)
    .bind(params.exam_password)
    .bind(params.show_results_immediately)
    .bind(params.show_correct_answers)
    .bind(params.shuffle_questions)
    .bind(params.shuffle_options)
    .bind(params.show_answer_during_exam)
    .bind(params.show_explanation_during_exam)
    .bind(params.price)
    .bind(instructor_id)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: ExamWrite<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    let params = params.normalized();
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title_ar = $1, title_en = $2, description_ar = $3, description_en = $4,
            category_id = $5, course_id = $6, duration_minutes = $7, total_marks = $8,
            passing_marks = $9, max_attempts = $10, start_date = $11, end_date = $12,
            is_public = $13, require_password = $14, exam_password = $15,
            show_results_immediately = $16, show_correct_answers = $17,
            shuffle_questions = $18, shuffle_options = $19,
            show_answer_during_exam = $20, show_explanation_during_exam = $21,
            price = $22, updated_at = $23
         WHERE id = $24 AND NOT is_deleted
         RETURNING {COLUMNS}",
    ))
    .bind(params.title_ar)
    .bind(params.title_en)
    .bind(params.description_ar)
    .bind(params.description_en)
    .bind(params.category_id)
    .bind(params.course_id)
    .bind(params.duration_minutes)
    .bind(params.total_marks)
    .bind(params.passing_marks)
    .bind(params.max_attempts)
    .bind(params.start_date)
    .bind(params.end_date)
    .bind(params.is_public)
    .bind(params.require_password)
    .bind(params.exam_password)
    .bind(params.show_results_immediately)
    .bind(params.show_correct_answers)
    .bind(params.shuffle_questions)
    .bind(params.shuffle_options)
    .bind(params.show_answer_during_exam)
    .bind(params.show_explanation_during_exam)
    .bind(params.price)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Soft delete; the row stays for attempt and order history.
pub(crate) async fn soft_delete(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exams SET is_deleted = TRUE, is_active = FALSE, updated_at = $1
         WHERE id = $2 AND NOT is_deleted",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: ExamListFilter<'_>,
) -> Result<Vec<ExamListRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT e.id, e.title_ar, e.title_en, e.description_ar, e.description_en,
                e.category_id, c.name_ar AS category_name_ar, c.name_en AS category_name_en,
                e.duration_minutes, e.total_marks, e.passing_marks, e.max_attempts,
                e.start_date, e.end_date, e.is_public, e.require_password, e.is_active,
                e.price, e.created_at, e.updated_at,
                COALESCE(a.attempts_count, 0) AS attempts_count,
                COALESCE(a.unique_students, 0) AS unique_students,
                COUNT(*) OVER() AS total_count
         FROM exams e
         LEFT JOIN exam_categories c ON c.id = e.category_id
         LEFT JOIN (
             SELECT exam_id,
                    COUNT(*) AS attempts_count,
                    COUNT(DISTINCT user_id) AS unique_students
             FROM exam_attempts
             GROUP BY exam_id
         ) a ON a.exam_id = e.id
         WHERE NOT e.is_deleted",
    );

    if let Some(category_id) = filter.category_id {
        builder.push(" AND e.category_id = ");
        builder.push_bind(category_id);
    }

    if let Some(instructor_id) = filter.instructor_id {
        builder.push(" AND e.instructor_id = ");
        builder.push_bind(instructor_id);
    }

    if let Some(is_active) = filter.is_active {
        builder.push(" AND e.is_active = ");
        builder.push_bind(is_active);
    }

    if let Some(is_public) = filter.is_public {
        builder.push(" AND e.is_public = ");
        builder.push_bind(is_public);
    }

    if let Some(search) = filter.search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(" AND (");
        builder.push("e.title_ar ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.title_en ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.description_ar ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.description_en ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR c.name_ar ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR c.name_en ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(" ORDER BY e.updated_at DESC, e.id DESC");
    builder.push(" OFFSET ");
    builder.push_bind(filter.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(filter.limit.clamp(1, 1000));

    builder.build_query_as::<ExamListRow>().fetch_all(pool).await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamStats {
    pub(crate) attempts_count: i64,
    pub(crate) unique_students: i64,
}

pub(crate) async fn stats(pool: &PgPool, exam_id: &str) -> Result<ExamStats, sqlx::Error> {
    sqlx::query_as::<_, ExamStats>(
        "SELECT COUNT(*) AS attempts_count,
                COUNT(DISTINCT user_id) AS unique_students
         FROM exam_attempts
         WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_categories(pool: &PgPool) -> Result<Vec<ExamCategory>, sqlx::Error> {
    sqlx::query_as::<_, ExamCategory>(
        "SELECT id, name_ar, name_en, description, display_order, is_active, created_at, updated_at
         FROM exam_categories
         WHERE is_active
         ORDER BY display_order, id",
    )
    .fetch_all(pool)
    .await
}

/// Translates a database constraint failure into a user-facing message.
/// Anything unrecognized stays an internal error.
pub(crate) fn constraint_message(err: &sqlx::Error) -> Option<Bilingual> {
    let db_err = err.as_database_error()?;
    message_for_constraint(db_err.constraint()?)
}

fn message_for_constraint(name: &str) -> Option<Bilingual> {
    let message = match name {
        "ck_exams_price_non_negative" => {
            Bilingual::new("السعر لا يمكن أن يكون سالباً", "Price cannot be negative")
        }
        "ck_exams_public_when_free" => {
            Bilingual::new("الاختبار المجاني يجب أن يكون عاماً", "A free exam must be public")
        }
        "ck_exams_no_password_when_free" => Bilingual::new(
            "الاختبار المجاني لا يجب أن يطلب كلمة مرور",
            "A free exam cannot require a password",
        ),
        "fk_exams_category" => {
            Bilingual::new("الفئة المحددة غير موجودة", "The selected category does not exist")
        }
        "fk_exams_instructor" | "fk_exams_created_by" => {
            Bilingual::new("المُدرّس المحدد غير موجود", "The selected instructor does not exist")
        }
        _ => return None,
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_constraints_map_to_bilingual_messages() {
        let message = message_for_constraint("ck_exams_public_when_free").expect("mapped");
        assert_eq!(message.en, "A free exam must be public");
        assert!(!message.ar.is_empty());

        assert!(message_for_constraint("ck_exams_no_password_when_free").is_some());
        assert!(message_for_constraint("fk_exams_category").is_some());
        assert!(message_for_constraint("uq_something_else").is_none());
    }
}
