use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentInstructor, MaybeUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::{Exam, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::exam::{
    CategoryResponse, ExamResponse, ExamSummaryResponse, ExamWriteRequest,
};
use crate::schemas::question::{QuestionCreate, QuestionResponse};
use crate::schemas::Bilingual;
use crate::services::access::{self, AccessRequest};

#[derive(Debug, Deserialize)]
pub(crate) struct ListExamsQuery {
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    #[serde(alias = "categoryId")]
    category_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    is_active: Option<bool>,
    #[serde(default)]
    #[serde(alias = "isPublic")]
    is_public: Option<bool>,
    #[serde(default)]
    mine: bool,
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessQuery {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessResponse {
    has_access: bool,
    is_scheduled: bool,
    has_started: bool,
    has_ended: bool,
    max_attempts_reached: bool,
    requires_password: bool,
    message: Bilingual,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exam).get(list_exams))
        .route("/categories", get(list_categories))
        .route("/:exam_id", get(get_exam).put(update_exam).delete(delete_exam))
        .route("/:exam_id/access", get(check_access))
        .route("/:exam_id/questions", post(add_question).get(list_questions))
        .route("/:exam_id/questions/:question_id", get(get_question).delete(delete_question))
}

fn can_manage_exam(user: &User, exam: &Exam) -> bool {
    user.role == UserRole::Admin || exam.instructor_id == user.id
}

async fn create_exam(
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<ExamWriteRequest>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    payload.business_rules().map_err(ApiError::Rejected)?;
    let payload = payload.normalized();

    let now = primitive_now_utc();
    let exam = repositories::exams::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &instructor.id,
        exam_write_params(&payload),
        now,
    )
    .await
    .map_err(|e| match repositories::exams::constraint_message(&e) {
        Some(message) => ApiError::Rejected(message),
        None => ApiError::internal(e, "Failed to create exam"),
    })?;

    tracing::info!(
        instructor_id = %instructor.id,
        exam_id = %exam.id,
        action = "exam_create",
        "Exam created"
    );

    let response = ExamResponse::from_parts(
        exam,
        repositories::exams::ExamStats { attempts_count: 0, unique_students: 0 },
        0,
    );

    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_exams(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Query(params): Query<ListExamsQuery>,
) -> Result<Json<PaginatedResponse<ExamSummaryResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let is_staff = matches!(
        user.as_ref().map(|user| user.role),
        Some(UserRole::Instructor) | Some(UserRole::Admin)
    );

    // Students and anonymous visitors only ever see the public active catalog.
    let (is_active, is_public) = if is_staff {
        (params.is_active, params.is_public)
    } else {
        (Some(true), Some(true))
    };

    let instructor_id = if params.mine && is_staff {
        user.as_ref().map(|user| user.id.clone())
    } else {
        None
    };

    let rows = repositories::exams::list(
        state.db(),
        repositories::exams::ExamListFilter {
            search: params.search.as_deref(),
            category_id: params.category_id.as_deref(),
            instructor_id: instructor_id.as_deref(),
            is_active,
            is_public,
            skip,
            limit,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows.into_iter().map(ExamSummaryResponse::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = repositories::exams::list_categories(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list categories"))?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from_db).collect()))
}

async fn get_exam(
    Path(exam_id): Path<String>,
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    let stats = repositories::exams::stats(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam stats"))?;

    let user_attempts = match &user {
        Some(user) => repositories::attempts::count_for_user(state.db(), &user.id, &exam.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?,
        None => 0,
    };

    Ok(Json(ExamResponse::from_parts(exam, stats, user_attempts)))
}

async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<ExamWriteRequest>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if !can_manage_exam(&instructor, &exam) {
        return Err(ApiError::Forbidden("You can only update your own exams"));
    }

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    payload.business_rules().map_err(ApiError::Rejected)?;
    let payload = payload.normalized();

    let now = primitive_now_utc();
    let updated =
        repositories::exams::update(state.db(), &exam_id, exam_write_params(&payload), now)
            .await
            .map_err(|e| match repositories::exams::constraint_message(&e) {
                Some(message) => ApiError::Rejected(message),
                None => ApiError::internal(e, "Failed to update exam"),
            })?;

    let Some(updated) = updated else {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    };

    let stats = repositories::exams::stats(state.db(), &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam stats"))?;

    Ok(Json(ExamResponse::from_parts(updated, stats, 0)))
}

async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if !can_manage_exam(&instructor, &exam) {
        return Err(ApiError::Forbidden("You can only delete your own exams"));
    }

    let deleted = repositories::exams::soft_delete(state.db(), &exam_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    if !deleted {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    tracing::info!(
        instructor_id = %instructor.id,
        exam_id = %exam_id,
        action = "exam_delete",
        "Exam soft-deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn check_access(
    Path(exam_id): Path<String>,
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Query(params): Query<AccessQuery>,
) -> Result<Json<AccessResponse>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    let (authenticated, has_payment, attempts_used) = match &user {
        Some(user) => {
            let has_payment = repositories::orders::has_paid(state.db(), &user.id, &exam.id, true)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check payment"))?;
            let attempts_used =
                repositories::attempts::count_for_user(state.db(), &user.id, &exam.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;
            (true, has_payment, attempts_used)
        }
        None => (false, false, 0),
    };

    let decision = access::check_access(
        &exam,
        &AccessRequest {
            now: primitive_now_utc(),
            authenticated,
            has_payment,
            attempts_used,
            password: params.password.as_deref(),
        },
    );

    Ok(Json(AccessResponse {
        has_access: decision.has_access,
        is_scheduled: decision.is_scheduled,
        has_started: decision.has_started,
        has_ended: decision.has_ended,
        max_attempts_reached: decision.max_attempts_reached,
        requires_password: decision.requires_password,
        message: decision.message,
    }))
}

async fn add_question(
    Path(exam_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if !can_manage_exam(&instructor, &exam) {
        return Err(ApiError::Forbidden("You can only add questions to your own exams"));
    }

    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    payload.business_rules().map_err(ApiError::Rejected)?;

    let now = primitive_now_utc();
    let question = repositories::questions::create(
        state.db(),
        &exam_id,
        repositories::questions::QuestionWrite {
            kind: payload.kind,
            text_ar: &payload.text_ar,
            text_en: payload.text_en.as_deref(),
            image_url: payload.image_url.as_deref(),
            marks: payload.marks,
            negative_marks: payload.negative_marks,
            correct_answer: payload.correct_answer.as_deref(),
            explanation_ar: payload.explanation_ar.as_deref(),
            explanation_en: payload.explanation_en.as_deref(),
            display_order: payload.display_order,
            options: payload
                .options
                .iter()
                .map(|option| repositories::questions::OptionWrite {
                    text_ar: &option.text_ar,
                    text_en: option.text_en.as_deref(),
                    image_url: option.image_url.as_deref(),
                    is_correct: option.is_correct,
                    display_order: option.display_order,
                })
                .collect(),
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    let options = repositories::questions::options_for_question(state.db(), &question.id, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load options"))?;

    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question, options))))
}

async fn list_questions(
    Path(exam_id): Path<String>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if !can_manage_exam(&instructor, &exam) {
        return Err(ApiError::Forbidden("You can only view questions of your own exams"));
    }

    let loaded = repositories::questions::list_for_exam(state.db(), &exam_id, false, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;

    Ok(Json(
        loaded
            .into_iter()
            .map(|entry| QuestionResponse::from_db(entry.question, entry.options))
            .collect(),
    ))
}

async fn get_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if !can_manage_exam(&instructor, &exam) {
        return Err(ApiError::Forbidden("You can only view questions of your own exams"));
    }

    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    let Some(question) = question.filter(|question| question.exam_id == exam_id) else {
        return Err(ApiError::NotFound("Question not found".to_string()));
    };

    let options = repositories::questions::options_for_question(state.db(), &question.id, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load options"))?;

    Ok(Json(QuestionResponse::from_db(question, options)))
}

async fn delete_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;

    if !can_manage_exam(&instructor, &exam) {
        return Err(ApiError::Forbidden("You can only delete questions of your own exams"));
    }

    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    if question.filter(|question| question.exam_id == exam_id).is_none() {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    repositories::questions::soft_delete(state.db(), &question_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

fn exam_write_params(payload: &ExamWriteRequest) -> repositories::exams::ExamWrite<'_> {
    repositories::exams::ExamWrite {
        title_ar: &payload.title_ar,
        title_en: payload.title_en.as_deref(),
        description_ar: payload.description_ar.as_deref(),
        description_en: payload.description_en.as_deref(),
        category_id: payload.category_id.as_deref(),
        course_id: payload.course_id.as_deref(),
        duration_minutes: payload.duration_minutes,
        total_marks: payload.total_marks,
        passing_marks: payload.passing_marks,
        max_attempts: payload.max_attempts,
        start_date: payload.start_date.map(to_primitive_utc),
        end_date: payload.end_date.map(to_primitive_utc),
        is_public: payload.is_public,
        require_password: payload.require_password,
        exam_password: payload.exam_password.as_deref(),
        show_results_immediately: payload.show_results_immediately,
        show_correct_answers: payload.show_correct_answers,
        shuffle_questions: payload.shuffle_questions,
        shuffle_options: payload.shuffle_options,
        show_answer_during_exam: payload.show_answer_during_exam,
        show_explanation_during_exam: payload.show_explanation_during_exam,
        price: payload.price,
    }
}
