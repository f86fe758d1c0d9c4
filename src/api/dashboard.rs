use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentInstructor, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::attempt::AttemptHistoryItem;
use crate::schemas::dashboard::{
    ActivityItem, ExamProgressItem, InProgressItem, StudentCountersResponse,
    StudentDashboardResponse, StudentDetailsResponse, StudentListItem, UpcomingExamItem,
};
use crate::schemas::order::OrderHistoryItem;

const DEFAULT_ACTIVITY_LIMIT: i64 = 10;
const DEFAULT_UPCOMING_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub(crate) struct StudentDashboardQuery {
    #[serde(default)]
    #[serde(alias = "activityLimit")]
    activity_limit: Option<i64>,
    #[serde(default)]
    #[serde(alias = "upcomingDays")]
    upcoming_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentsQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    is_active: Option<bool>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/student", get(student_dashboard))
        .route("/students", get(list_students))
        .route("/students/:student_id", get(student_details))
}

/// Everything the student landing page shows, assembled from SQL aggregates.
async fn student_dashboard(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<StudentDashboardQuery>,
) -> Result<Json<StudentDashboardResponse>, ApiError> {
    let db = state.db();
    let now = primitive_now_utc();
    let activity_limit = params.activity_limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let upcoming_days = params.upcoming_days.unwrap_or(DEFAULT_UPCOMING_DAYS);

    let counters = repositories::dashboard::student_counters(db, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load counters"))?;
    let activity = repositories::dashboard::recent_activity(db, &user.id, activity_limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load activity"))?;
    let upcoming = repositories::dashboard::upcoming_exams(db, &user.id, now, upcoming_days)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load upcoming exams"))?;
    let in_progress = repositories::dashboard::in_progress_attempts(db, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load open attempts"))?;
    let progress = repositories::dashboard::exam_progress(db, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam progress"))?;

    Ok(Json(StudentDashboardResponse {
        counters: StudentCountersResponse::from_row(counters),
        recent_activity: activity.into_iter().map(ActivityItem::from_row).collect(),
        upcoming_exams: upcoming.into_iter().map(UpcomingExamItem::from_row).collect(),
        in_progress: in_progress.into_iter().map(InProgressItem::from_row).collect(),
        exam_progress: progress.into_iter().map(ExamProgressItem::from_row).collect(),
    }))
}

async fn list_students(
    CurrentInstructor(_instructor): CurrentInstructor,
    State(state): State<AppState>,
    Query(params): Query<StudentsQuery>,
) -> Result<Json<PaginatedResponse<StudentListItem>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let rows = repositories::dashboard::list_students(
        state.db(),
        repositories::dashboard::StudentFilter {
            search: params.search.as_deref(),
            is_active: params.is_active,
            skip,
            limit,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows.into_iter().map(StudentListItem::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

async fn student_details(
    Path(student_id): Path<String>,
    CurrentInstructor(_instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<StudentDetailsResponse>, ApiError> {
    let student = repositories::users::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let orders = repositories::orders::list_for_user(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load orders"))?;
    let attempts = repositories::attempts::list_for_user(state.db(), &student.id, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load attempts"))?;

    Ok(Json(StudentDetailsResponse {
        full_name: student.full_name(),
        user_id: student.id,
        email: student.email,
        phone: student.phone,
        orders: orders.into_iter().map(OrderHistoryItem::from_row).collect(),
        attempts: attempts.into_iter().map(AttemptHistoryItem::from_row).collect(),
    }))
}
