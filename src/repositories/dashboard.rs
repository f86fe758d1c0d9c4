use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, OrderStatus};

/// Student dashboard counters, one aggregate query.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentCounters {
    pub(crate) purchased_exams: i64,
    pub(crate) attempts_count: i64,
    pub(crate) completed_count: i64,
    pub(crate) passed_count: i64,
    pub(crate) average_percentage: f64,
}

pub(crate) async fn student_counters(
    pool: &PgPool,
    user_id: &str,
) -> Result<StudentCounters, sqlx::Error> {
    sqlx::query_as::<_, StudentCounters>(
        "SELECT
            (SELECT COUNT(DISTINCT exam_id) FROM exam_orders
              WHERE user_id = $1 AND NOT is_deleted AND status IN ($2, $3)) AS purchased_exams,
            (SELECT COUNT(*) FROM exam_attempts WHERE user_id = $1) AS attempts_count,
            (SELECT COUNT(*) FROM exam_attempts
              WHERE user_id = $1 AND status = $4) AS completed_count,
            (SELECT COUNT(*) FROM exam_attempts
              WHERE user_id = $1 AND status = $4 AND is_passed) AS passed_count,
            COALESCE((SELECT AVG(percentage) FROM exam_attempts
              WHERE user_id = $1 AND status = $4), 0) AS average_percentage",
    )
    .bind(user_id)
    .bind(OrderStatus::Paid)
    .bind(OrderStatus::PaidUnverified)
    .bind(AttemptStatus::Completed)
    .fetch_one(pool)
    .await
}

/// Orders and attempts merged into one feed, newest first.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ActivityRow {
    pub(crate) kind: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
    pub(crate) detail: String,
    pub(crate) happened_at: PrimitiveDateTime,
}

pub(crate) async fn recent_activity(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<ActivityRow>, sqlx::Error> {
    sqlx::query_as::<_, ActivityRow>(
        "SELECT * FROM (
            SELECT 'order' AS kind, o.exam_id,
                   e.title_ar AS exam_title_ar, e.title_en AS exam_title_en,
                   o.status::text AS detail,
                   COALESCE(o.paid_at, o.created_at) AS happened_at
            FROM exam_orders o
            JOIN exams e ON e.id = o.exam_id
            WHERE o.user_id = $1 AND NOT o.is_deleted
            UNION ALL
            SELECT 'attempt' AS kind, a.exam_id,
                   e.title_ar AS exam_title_ar, e.title_en AS exam_title_en,
                   a.status::text AS detail,
                   COALESCE(a.submitted_at, a.started_at) AS happened_at
            FROM exam_attempts a
            JOIN exams e ON e.id = a.exam_id
            WHERE a.user_id = $1
         ) feed
         ORDER BY happened_at DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UpcomingExamRow {
    pub(crate) exam_id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) start_date: PrimitiveDateTime,
    pub(crate) end_date: Option<PrimitiveDateTime>,
    pub(crate) duration_minutes: i32,
    pub(crate) price: f64,
}

/// Scheduled exams the student can take (free, or already paid for) starting
/// within the window.
pub(crate) async fn upcoming_exams(
    pool: &PgPool,
    user_id: &str,
    now: PrimitiveDateTime,
    days_ahead: i64,
) -> Result<Vec<UpcomingExamRow>, sqlx::Error> {
    sqlx::query_as::<_, UpcomingExamRow>(
        "SELECT e.id AS exam_id, e.title_ar, e.title_en, e.start_date, e.end_date,
                e.duration_minutes, e.price
         FROM exams e
         WHERE NOT e.is_deleted AND e.is_active
           AND e.start_date IS NOT NULL
           AND e.start_date > $2
           AND e.start_date <= $2 + make_interval(days => $3::int)
           AND (e.price = 0 OR EXISTS (
                SELECT 1 FROM exam_orders o
                WHERE o.exam_id = e.id AND o.user_id = $1
                  AND NOT o.is_deleted AND o.status IN ($4, $5)
           ))
         ORDER BY e.start_date",
    )
    .bind(user_id)
    .bind(now)
    .bind(days_ahead.clamp(1, 365))
    .bind(OrderStatus::Paid)
    .bind(OrderStatus::PaidUnverified)
    .fetch_all(pool)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct InProgressRow {
    pub(crate) attempt_id: String,
    pub(crate) exam_id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
}

pub(crate) async fn in_progress_attempts(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<InProgressRow>, sqlx::Error> {
    sqlx::query_as::<_, InProgressRow>(
        "SELECT a.id AS attempt_id, a.exam_id, e.title_ar, e.title_en,
                a.started_at, e.duration_minutes
         FROM exam_attempts a
         JOIN exams e ON e.id = a.exam_id
         WHERE a.user_id = $1 AND a.status = $2
         ORDER BY a.started_at DESC",
    )
    .bind(user_id)
    .bind(AttemptStatus::InProgress)
    .fetch_all(pool)
    .await
}

/// Per-exam progress: attempts used against the cap, best and latest scores.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ExamProgressRow {
    pub(crate) exam_id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) attempts_used: i64,
    pub(crate) best_percentage: f64,
    pub(crate) last_percentage: f64,
    pub(crate) has_passed: bool,
}

pub(crate) async fn exam_progress(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<ExamProgressRow>, sqlx::Error> {
    sqlx::query_as::<_, ExamProgressRow>(
        "SELECT e.id AS exam_id, e.title_ar, e.title_en, e.max_attempts,
                COUNT(a.id) AS attempts_used,
                COALESCE(MAX(a.percentage) FILTER (WHERE a.status = $2), 0) AS best_percentage,
                COALESCE((
                    SELECT a2.percentage FROM exam_attempts a2
                    WHERE a2.user_id = $1 AND a2.exam_id = e.id AND a2.status = $2
                    ORDER BY a2.submitted_at DESC LIMIT 1
                ), 0) AS last_percentage,
                bool_or(a.is_passed) AS has_passed
         FROM exams e
         JOIN exam_attempts a ON a.exam_id = e.id AND a.user_id = $1
         WHERE NOT e.is_deleted
         GROUP BY e.id, e.title_ar, e.title_en, e.max_attempts
         ORDER BY MAX(COALESCE(a.submitted_at, a.started_at)) DESC",
    )
    .bind(user_id)
    .bind(AttemptStatus::Completed)
    .fetch_all(pool)
    .await
}

/// Instructor-side student directory row with activity aggregates.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentListRow {
    pub(crate) user_id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) exams_count: i64,
    pub(crate) attempts_count: i64,
    pub(crate) last_activity: Option<PrimitiveDateTime>,
    pub(crate) total_count: i64,
}

pub(crate) struct StudentFilter<'a> {
    pub search: Option<&'a str>,
    pub is_active: Option<bool>,
    pub skip: i64,
    pub limit: i64,
}

pub(crate) async fn list_students(
    pool: &PgPool,
    filter: StudentFilter<'_>,
) -> Result<Vec<StudentListRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT u.id AS user_id, u.first_name, u.last_name, u.email, u.phone, u.is_active,
                COUNT(DISTINCT o.exam_id) AS exams_count,
                COUNT(DISTINCT a.id) AS attempts_count,
                GREATEST(
                    MAX(COALESCE(a.submitted_at, a.started_at)),
                    MAX(COALESCE(o.paid_at, o.created_at)),
                    MAX(u.last_login_at)
                ) AS last_activity,
                COUNT(*) OVER() AS total_count
         FROM users u
         LEFT JOIN exam_orders o ON o.user_id = u.id AND NOT o.is_deleted
         LEFT JOIN exam_attempts a ON a.user_id = u.id
         WHERE u.role = 'student' AND NOT u.is_deleted",
    );

    if let Some(is_active) = filter.is_active {
        builder.push(" AND u.is_active = ");
        builder.push_bind(is_active);
    }

    if let Some(search) = filter.search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(" AND (concat(u.first_name, ' ', u.last_name) ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.phone ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(
        " GROUP BY u.id, u.first_name, u.last_name, u.email, u.phone, u.is_active
         ORDER BY last_activity DESC NULLS LAST, u.id DESC",
    );
    builder.push(" OFFSET ");
    builder.push_bind(filter.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(filter.limit.clamp(1, 1000));

    builder.build_query_as::<StudentListRow>().fetch_all(pool).await
}
