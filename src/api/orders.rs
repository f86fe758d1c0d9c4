use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentInstructor, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamOrder;
use crate::db::types::{OrderStatus, UserRole};
use crate::repositories;
use crate::schemas::bank::BankAccountResponse;
use crate::schemas::order::{
    OrderActionResponse, OrderCreateRequest, OrderHistoryItem, OrderResponse, OrderReviewItem,
    ReceiptUploadResponse, RejectOrderRequest,
};
use crate::schemas::Bilingual;
use crate::services::receipts;

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewQuery {
    #[serde(default)]
    status: Option<OrderStatus>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order).get(list_my_orders))
        .route("/paid-exams", get(paid_exam_ids))
        .route("/review", get(review_orders))
        .route("/bank-accounts", get(list_bank_accounts))
        .route("/:order_id/receipt", post(upload_receipt))
        .route("/:order_id/receipt-url", get(receipt_download_url))
        .route("/:order_id/verify", post(verify_order))
        .route("/:order_id/reject", post(reject_order))
}

async fn create_order(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<OrderCreateRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = repositories::exams::find_by_id(state.db(), &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    if exam.is_free() {
        return Err(ApiError::Rejected(Bilingual::new(
            "هذا الاختبار مجاني ولا يحتاج إلى طلب شراء",
            "This exam is free and needs no purchase order",
        )));
    }

    let already_paid = repositories::orders::has_paid(state.db(), &user.id, &exam.id, true)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check payment"))?;
    if already_paid {
        return Err(ApiError::Rejected(Bilingual::new(
            "لقد قمت بشراء هذا الاختبار بالفعل",
            "You have already purchased this exam",
        )));
    }

    // A dangling pending/failed order for the pair is reused, not duplicated.
    let reusable = repositories::orders::find_reusable(state.db(), &user.id, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up existing order"))?;

    if let Some(order) = reusable {
        return Ok((StatusCode::OK, Json(OrderResponse::from_db(order, true))));
    }

    let order = repositories::orders::create(
        state.db(),
        &user.id,
        &exam.id,
        &state.settings().payments().currency,
        0.0,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create order"))?
    .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        exam_id = %exam.id,
        order_id = %order.id,
        action = "order_create",
        "Bank-transfer order created"
    );

    Ok((StatusCode::CREATED, Json(OrderResponse::from_db(order, false))))
}

async fn list_my_orders(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderHistoryItem>>, ApiError> {
    let rows = repositories::orders::list_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list orders"))?;

    Ok(Json(rows.into_iter().map(OrderHistoryItem::from_row).collect()))
}

async fn upload_receipt(
    Path(order_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ReceiptUploadResponse>, ApiError> {
    let order = repositories::orders::find_for_user(state.db(), &order_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch order"))?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if order.status.grants_access() {
        return Err(ApiError::Rejected(Bilingual::new(
            "تم رفع إيصال لهذا الطلب بالفعل",
            "A receipt was already uploaded for this order",
        )));
    }

    let Some(storage) = state.receipts() else {
        return Err(ApiError::ServiceUnavailable("Receipt storage is not configured".to_string()));
    };

    let mut file_name: Option<String> = None;
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut bank_ref: Option<String> = None;
    let mut paid_amount: Option<f64> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;
                file_bytes = Some(bytes.to_vec());
            }
            "bank_ref" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid bank_ref: {e}")))?;
                bank_ref = Some(value).filter(|value| !value.trim().is_empty());
            }
            "paid_amount" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid paid_amount: {e}")))?;
                paid_amount = value.trim().parse::<f64>().ok();
            }
            _ => {}
        }
    }

    let (Some(file_name), Some(file_bytes)) = (file_name, file_bytes) else {
        return Err(ApiError::BadRequest("A receipt file is required".to_string()));
    };

    let Some(extension) = receipts::allowed_extension(&file_name, state.settings()) else {
        return Err(ApiError::Rejected(Bilingual::new(
            "نوع ملف الإيصال غير مدعوم",
            "Unsupported receipt file type",
        )));
    };

    if !receipts::within_size_limit(file_bytes.len(), state.settings()) {
        return Err(ApiError::Rejected(Bilingual::new(
            "حجم ملف الإيصال أكبر من المسموح",
            "The receipt file exceeds the size limit",
        )));
    }

    let stored = storage
        .upload_receipt(
            &order.id,
            &extension,
            receipts::content_type_for(&extension),
            file_bytes,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store receipt"))?;

    let paid_amount = paid_amount.filter(|value| *value > 0.0).unwrap_or(order.price_at_purchase);

    let updated = repositories::orders::attach_receipt(
        state.db(),
        &order.id,
        repositories::orders::ReceiptAttachment {
            paid_amount,
            receipt_file_name: &file_name,
            receipt_url: &stored.key,
            bank_ref: bank_ref.as_deref(),
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to attach receipt"))?;

    if !updated {
        return Err(ApiError::NotFound("Order not found".to_string()));
    }

    tracing::info!(
        user_id = %user.id,
        order_id = %order.id,
        receipt_sha256 = %stored.sha256,
        receipt_size = stored.size,
        action = "receipt_upload",
        "Receipt uploaded; order awaiting verification"
    );

    Ok(Json(ReceiptUploadResponse {
        order_id: order.id,
        status: OrderStatus::PaidUnverified,
        receipt_url: stored.key,
        message: Bilingual::new(
            "تم رفع الإيصال وسيتم مراجعته قريباً",
            "Receipt uploaded; it will be reviewed shortly",
        ),
    }))
}

/// Exam ids the caller has unlocked (verified or self-reported payment).
async fn paid_exam_ids(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let ids = repositories::orders::paid_exam_ids(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list paid exams"))?;

    Ok(Json(ids))
}

/// Short-lived download link for the uploaded receipt, for review.
async fn receipt_download_url(
    Path(order_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let order = fetch_reviewable_order(&state, &order_id, &instructor).await?;

    let Some(receipt_key) = order.receipt_url.as_deref() else {
        return Err(ApiError::NotFound("No receipt uploaded for this order".to_string()));
    };

    let Some(storage) = state.receipts() else {
        return Err(ApiError::ServiceUnavailable("Receipt storage is not configured".to_string()));
    };

    let expires_in = std::time::Duration::from_secs(
        state.settings().uploads().presigned_url_expire_minutes * 60,
    );
    let url = storage
        .presign_get(receipt_key, expires_in)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to presign receipt URL"))?;

    Ok(Json(serde_json::json!({ "order_id": order.id, "url": url })))
}

async fn review_orders(
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Query(params): Query<ReviewQuery>,
) -> Result<Json<PaginatedResponse<OrderReviewItem>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let rows = repositories::orders::list_for_review(
        state.db(),
        repositories::orders::ReviewFilter {
            instructor_id: &instructor.id,
            status: params.status,
            search: params.search.as_deref(),
            skip,
            limit,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list orders for review"))?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows.into_iter().map(OrderReviewItem::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

async fn verify_order(
    Path(order_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<OrderActionResponse>, ApiError> {
    let order = fetch_reviewable_order(&state, &order_id, &instructor).await?;

    let updated =
        repositories::orders::mark_verified(state.db(), &order.id, &instructor.id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to verify order"))?;

    if !updated {
        return Err(ApiError::Rejected(Bilingual::new(
            "لا يمكن اعتماد هذا الطلب في حالته الحالية",
            "This order cannot be verified in its current state",
        )));
    }

    tracing::info!(
        instructor_id = %instructor.id,
        order_id = %order.id,
        action = "order_verify",
        "Payment verified"
    );

    Ok(Json(OrderActionResponse {
        order_id: order.id,
        status: OrderStatus::Paid,
        message: Bilingual::new("تم اعتماد الدفع", "Payment verified"),
    }))
}

async fn reject_order(
    Path(order_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<RejectOrderRequest>,
) -> Result<Json<OrderActionResponse>, ApiError> {
    let order = fetch_reviewable_order(&state, &order_id, &instructor).await?;

    let updated = repositories::orders::mark_rejected(
        state.db(),
        &order.id,
        &instructor.id,
        payload.reason.as_deref(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to reject order"))?;

    if !updated {
        return Err(ApiError::Rejected(Bilingual::new(
            "لا يمكن رفض هذا الطلب في حالته الحالية",
            "This order cannot be rejected in its current state",
        )));
    }

    tracing::info!(
        instructor_id = %instructor.id,
        order_id = %order.id,
        action = "order_reject",
        "Payment rejected"
    );

    Ok(Json(OrderActionResponse {
        order_id: order.id,
        status: OrderStatus::Failed,
        message: Bilingual::new("تم رفض الدفع", "Payment rejected"),
    }))
}

async fn list_bank_accounts(
    State(state): State<AppState>,
) -> Result<Json<Vec<BankAccountResponse>>, ApiError> {
    let accounts = repositories::bank_accounts::list_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list bank accounts"))?;

    Ok(Json(accounts.into_iter().map(BankAccountResponse::from_db).collect()))
}

/// The reviewing instructor must own the exam behind the order.
async fn fetch_reviewable_order(
    state: &AppState,
    order_id: &str,
    instructor: &crate::db::models::User,
) -> Result<ExamOrder, ApiError> {
    let order = repositories::orders::find_by_id(state.db(), order_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch order"))?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;

    if instructor.role == UserRole::Admin {
        return Ok(order);
    }

    let exam = repositories::exams::find_by_id(state.db(), &order.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?;

    match exam {
        Some(exam) if exam.instructor_id == instructor.id => Ok(order),
        _ => Err(ApiError::Forbidden("You can only review orders for your own exams")),
    }
}
