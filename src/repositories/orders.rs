use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::ExamOrder;
use crate::db::types::OrderStatus;

const COLUMNS: &str = "\
    id, user_id, exam_id, currency, price_at_purchase, discount_amount, paid_amount, \
    status, payment_method, receipt_file_name, receipt_url, receipt_uploaded_at, \
    bank_ref, reject_reason, verified_by, verified_at, paid_at, is_deleted, \
    created_at, updated_at";

/// Creates a PENDING bank-transfer order, copying the exam's current price.
/// Returns None when the exam does not exist or is deleted.
pub(crate) async fn create(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
    currency: &str,
    discount_amount: f64,
    now: PrimitiveDateTime,
) -> Result<Option<ExamOrder>, sqlx::Error> {
    sqlx::query_as::<_, ExamOrder>(&format!(
        "INSERT INTO exam_orders (
            id, user_id, exam_id, currency, price_at_purchase, discount_amount,
            paid_amount, status, payment_method, is_deleted, created_at, updated_at
        )
        SELECT $1, $2, e.id, $3, e.price, $4, 0, $5, 'BANK_TRANSFER', FALSE, $6, $6
        FROM exams e
        WHERE e.id = $7 AND NOT e.is_deleted
        RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(currency)
    .bind(discount_amount)
    .bind(OrderStatus::Pending)
    .bind(now)
    .bind(exam_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_for_user(
    pool: &PgPool,
    order_id: &str,
    user_id: &str,
) -> Result<Option<ExamOrder>, sqlx::Error> {
    sqlx::query_as::<_, ExamOrder>(&format!(
        "SELECT {COLUMNS} FROM exam_orders
         WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
    ))
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<ExamOrder>, sqlx::Error> {
    sqlx::query_as::<_, ExamOrder>(&format!(
        "SELECT {COLUMNS} FROM exam_orders WHERE id = $1 AND NOT is_deleted",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The latest order for the pair that never reached a paid state; reused by
/// order creation instead of stacking duplicates.
pub(crate) async fn find_reusable(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
) -> Result<Option<ExamOrder>, sqlx::Error> {
    sqlx::query_as::<_, ExamOrder>(&format!(
        "SELECT {COLUMNS} FROM exam_orders
         WHERE user_id = $1 AND exam_id = $2 AND NOT is_deleted
           AND status IN ($3, $4, $5)
         ORDER BY created_at DESC
         LIMIT 1",
    ))
    .bind(user_id)
    .bind(exam_id)
    .bind(OrderStatus::Pending)
    .bind(OrderStatus::Failed)
    .bind(OrderStatus::Cancelled)
    .fetch_optional(pool)
    .await
}

pub(crate) struct ReceiptAttachment<'a> {
    pub paid_amount: f64,
    pub receipt_file_name: &'a str,
    pub receipt_url: &'a str,
    pub bank_ref: Option<&'a str>,
}

/// Student self-reports the transfer; the order waits for instructor review.
pub(crate) async fn attach_receipt(
    pool: &PgPool,
    order_id: &str,
    params: ReceiptAttachment<'_>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_orders SET
            status = $1,
            paid_amount = $2,
            receipt_file_name = $3,
            receipt_url = $4,
            receipt_uploaded_at = $5,
            bank_ref = $6,
            paid_at = $5,
            updated_at = $5
         WHERE id = $7 AND NOT is_deleted",
    )
    .bind(OrderStatus::PaidUnverified)
    .bind(params.paid_amount)
    .bind(params.receipt_file_name)
    .bind(params.receipt_url)
    .bind(now)
    .bind(params.bank_ref)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Does the user hold an order that unlocks the exam? Unverified receipts
/// count unless the caller asks for confirmed payments only.
pub(crate) async fn has_paid(
    pool: &PgPool,
    user_id: &str,
    exam_id: &str,
    include_unverified: bool,
) -> Result<bool, sqlx::Error> {
    let verified_only = OrderStatus::Paid;
    let unverified =
        if include_unverified { OrderStatus::PaidUnverified } else { OrderStatus::Paid };

    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM exam_orders
            WHERE user_id = $1 AND exam_id = $2 AND NOT is_deleted
              AND status IN ($3, $4)
        )",
    )
    .bind(user_id)
    .bind(exam_id)
    .bind(verified_only)
    .bind(unverified)
    .fetch_one(pool)
    .await
}

pub(crate) async fn paid_exam_ids(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT exam_id FROM exam_orders
         WHERE user_id = $1 AND NOT is_deleted AND status IN ($2, $3)",
    )
    .bind(user_id)
    .bind(OrderStatus::Paid)
    .bind(OrderStatus::PaidUnverified)
    .fetch_all(pool)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderListRow {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
    pub(crate) currency: String,
    pub(crate) price_at_purchase: f64,
    pub(crate) paid_amount: f64,
    pub(crate) status: OrderStatus,
    pub(crate) receipt_url: Option<String>,
    pub(crate) bank_ref: Option<String>,
    pub(crate) reject_reason: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) paid_at: Option<PrimitiveDateTime>,
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<OrderListRow>, sqlx::Error> {
    sqlx::query_as::<_, OrderListRow>(
        "SELECT o.id, o.exam_id, e.title_ar AS exam_title_ar, e.title_en AS exam_title_en,
                o.currency, o.price_at_purchase, o.paid_amount, o.status,
                o.receipt_url, o.bank_ref, o.reject_reason, o.created_at, o.paid_at
         FROM exam_orders o
         JOIN exams e ON e.id = o.exam_id
         WHERE o.user_id = $1 AND NOT o.is_deleted
         ORDER BY COALESCE(o.paid_at, o.created_at) DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Review-queue row for the instructor, joined with student identity.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct OrderReviewRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) user_name: String,
    pub(crate) user_email: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
    pub(crate) paid_amount: f64,
    pub(crate) currency: String,
    pub(crate) status: OrderStatus,
    pub(crate) receipt_url: Option<String>,
    pub(crate) bank_ref: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) paid_at: Option<PrimitiveDateTime>,
    pub(crate) total_count: i64,
}

pub(crate) struct ReviewFilter<'a> {
    pub instructor_id: &'a str,
    pub status: Option<OrderStatus>,
    pub search: Option<&'a str>,
    pub skip: i64,
    pub limit: i64,
}

pub(crate) async fn list_for_review(
    pool: &PgPool,
    filter: ReviewFilter<'_>,
) -> Result<Vec<OrderReviewRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT o.id, o.user_id,
                trim(concat(u.first_name, ' ', u.last_name)) AS user_name,
                u.email AS user_email,
                o.exam_id, e.title_ar AS exam_title_ar, e.title_en AS exam_title_en,
                o.paid_amount, o.currency, o.status, o.receipt_url, o.bank_ref,
                o.created_at, o.paid_at,
                COUNT(*) OVER() AS total_count
         FROM exam_orders o
         JOIN exams e ON e.id = o.exam_id AND NOT e.is_deleted AND e.instructor_id = ",
    );
    builder.push_bind(filter.instructor_id);
    builder.push(
        " JOIN users u ON u.id = o.user_id
         WHERE NOT o.is_deleted",
    );

    if let Some(status) = filter.status {
        builder.push(" AND o.status = ");
        builder.push_bind(status);
    }

    if let Some(search) = filter.search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{search}%");
        builder.push(" AND (concat(u.first_name, ' ', u.last_name) ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR u.email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.title_ar ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR e.title_en ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(" ORDER BY COALESCE(o.paid_at, o.created_at) DESC");
    builder.push(" OFFSET ");
    builder.push_bind(filter.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(filter.limit.clamp(1, 1000));

    builder.build_query_as::<OrderReviewRow>().fetch_all(pool).await
}

/// Only orders still awaiting review can be confirmed.
pub(crate) async fn mark_verified(
    pool: &PgPool,
    order_id: &str,
    verified_by: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_orders SET
            status = $1,
            verified_by = $2,
            verified_at = $3,
            updated_at = $3
         WHERE id = $4 AND NOT is_deleted AND status IN ($5, $6)",
    )
    .bind(OrderStatus::Paid)
    .bind(verified_by)
    .bind(now)
    .bind(order_id)
    .bind(OrderStatus::PaidUnverified)
    .bind(OrderStatus::Pending)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn mark_rejected(
    pool: &PgPool,
    order_id: &str,
    verified_by: &str,
    reason: Option<&str>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE exam_orders SET
            status = $1,
            reject_reason = $2,
            verified_by = $3,
            verified_at = $4,
            updated_at = $4
         WHERE id = $5 AND NOT is_deleted AND status IN ($6, $7)",
    )
    .bind(OrderStatus::Failed)
    .bind(reason)
    .bind(verified_by)
    .bind(now)
    .bind(order_id)
    .bind(OrderStatus::PaidUnverified)
    .bind(OrderStatus::Pending)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
