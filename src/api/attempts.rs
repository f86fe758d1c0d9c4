use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::{minutes_between, primitive_now_utc};
use crate::db::models::{Exam, ExamAttempt, User};
use crate::repositories;
use crate::schemas::attempt::{
    AnswerResponse, AttemptHistoryItem, AttemptResponse, QuestionResultResponse, ResultsResponse,
    SaveAnswerRequest, StartAttemptRequest, StartAttemptResponse,
};
use crate::schemas::question::{QuestionResponse, QuestionRevealResponse, TakerQuestionResponse};
use crate::schemas::Bilingual;
use crate::services::access::{self, AccessRequest};
use crate::services::grading::{self, round2};

#[derive(Debug, Deserialize)]
pub(crate) struct ListAttemptsQuery {
    #[serde(default)]
    #[serde(alias = "examId")]
    exam_id: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_attempt))
        .route("/", get(list_my_attempts))
        .route("/:attempt_id", get(get_attempt))
        .route("/:attempt_id/questions", get(questions_for_taking))
        .route("/:attempt_id/answers", post(save_answer))
        .route("/:attempt_id/submit", post(submit_attempt))
        .route("/:attempt_id/results", get(get_results))
        .route("/:attempt_id/questions/:question_id/reveal", get(reveal_answer))
}

async fn start_attempt(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<(StatusCode, Json<StartAttemptResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = fetch_exam(&state, &payload.exam_id).await?;

    let has_payment = repositories::orders::has_paid(state.db(), &user.id, &exam.id, true)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check payment"))?;
    let attempts_used = repositories::attempts::count_for_user(state.db(), &user.id, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    let now = primitive_now_utc();
    let decision = access::check_access(
        &exam,
        &AccessRequest {
            now,
            authenticated: true,
            has_payment,
            attempts_used,
            password: payload.exam_password.as_deref(),
        },
    );

    if !decision.has_access {
        return Err(ApiError::Rejected(decision.message));
    }

    // Idempotent resume: a second start returns the open attempt untouched.
    let existing = repositories::attempts::find_in_progress(state.db(), &user.id, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to look up open attempt"))?;

    if let Some(attempt) = existing {
        return Ok((
            StatusCode::OK,
            Json(StartAttemptResponse {
                attempt_id: attempt.id,
                attempt_number: attempt.attempt_number,
                resumed: true,
                message: Bilingual::new(
                    "لديك محاولة جارية، سيتم استكمالها",
                    "You have an attempt in progress; resuming it",
                ),
            }),
        ));
    }

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').next().unwrap_or(value).trim().to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let attempt = repositories::attempts::create(
        state.db(),
        repositories::attempts::CreateAttempt {
            exam_id: &exam.id,
            user_id: &user.id,
            attempt_number: (attempts_used + 1) as i32,
            total_marks: exam.total_marks,
            ip_address: ip_address.as_deref(),
            user_agent: user_agent.as_deref(),
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to start attempt"))?;

    tracing::info!(
        user_id = %user.id,
        exam_id = %exam.id,
        attempt_id = %attempt.id,
        action = "attempt_start",
        "Attempt started"
    );

    Ok((
        StatusCode::CREATED,
        Json(StartAttemptResponse {
            attempt_id: attempt.id,
            attempt_number: attempt.attempt_number,
            resumed: false,
            message: Bilingual::new("تم بدء الاختبار بنجاح", "The exam has started"),
        }),
    ))
}

async fn list_my_attempts(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ListAttemptsQuery>,
) -> Result<Json<Vec<AttemptHistoryItem>>, ApiError> {
    let rows =
        repositories::attempts::list_for_user(state.db(), &user.id, params.exam_id.as_deref())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    Ok(Json(rows.into_iter().map(AttemptHistoryItem::from_row).collect()))
}

async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = fetch_owned_attempt(&state, &attempt_id, &user).await?;
    Ok(Json(AttemptResponse::from_db(attempt)))
}

async fn questions_for_taking(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TakerQuestionResponse>>, ApiError> {
    let attempt = fetch_owned_attempt(&state, &attempt_id, &user).await?;

    if attempt.is_completed() {
        return Err(ApiError::Rejected(Bilingual::new(
            "تم تسليم هذا الاختبار مسبقاً",
            "This attempt was already submitted",
        )));
    }

    let exam = fetch_exam(&state, &attempt.exam_id).await?;

    let loaded = repositories::questions::list_for_exam(
        state.db(),
        &exam.id,
        exam.shuffle_questions,
        exam.shuffle_options,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    let show_explanations = exam.show_explanation_during_exam;
    Ok(Json(
        loaded
            .into_iter()
            .map(|entry| TakerQuestionResponse::from_loaded(entry, show_explanations))
            .collect(),
    ))
}

async fn save_answer(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let attempt = fetch_owned_attempt(&state, &attempt_id, &user).await?;

    if attempt.is_completed() {
        return Err(ApiError::Rejected(Bilingual::new(
            "لا يمكن تعديل إجابات اختبار تم تسليمه",
            "Answers cannot change after submission",
        )));
    }

    let question = repositories::questions::find_by_id(state.db(), &payload.question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    if question.filter(|question| question.exam_id == attempt.exam_id).is_none() {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    repositories::attempts::upsert_answer(
        state.db(),
        repositories::attempts::AnswerWrite {
            attempt_id: &attempt.id,
            question_id: &payload.question_id,
            selected_option_id: payload.selected_option_id.as_deref(),
            answer_text: payload.answer_text.as_deref(),
            time_spent_seconds: payload.time_spent_seconds.max(0),
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to save answer"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    if attempt.user_id != user.id {
        return Err(ApiError::Forbidden("You may only submit your own attempts"));
    }

    if attempt.is_completed() {
        return Err(ApiError::Rejected(Bilingual::new(
            "تم تسليم هذا الاختبار مسبقاً",
            "This attempt was already submitted",
        )));
    }

    let exam = fetch_exam(&state, &attempt.exam_id).await?;

    let questions = repositories::questions::list_for_exam(state.db(), &exam.id, false, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let answers = repositories::attempts::answers_for_attempt(state.db(), &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    let outcome = grading::grade_attempt(&questions, &answers);

    let now = primitive_now_utc();
    let obtained = outcome.auto_obtained_marks;
    let percentage = if exam.total_marks > 0.0 {
        round2(obtained / exam.total_marks * 100.0)
    } else {
        0.0
    };

    let finalized = repositories::attempts::finalize(
        state.db(),
        repositories::attempts::FinalizeAttempt {
            attempt_id: &attempt.id,
            obtained_marks: obtained,
            total_marks: exam.total_marks,
            percentage,
            is_passed: obtained >= exam.passing_marks,
            time_spent_minutes: minutes_between(attempt.started_at, now),
            graded: &outcome.graded,
        },
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to finalize attempt"))?;

    tracing::info!(
        user_id = %user.id,
        attempt_id = %finalized.id,
        obtained_marks = finalized.obtained_marks,
        pending_manual = outcome.pending_manual_count,
        action = "attempt_submit",
        "Attempt submitted"
    );

    Ok(Json(AttemptResponse::from_db(finalized)))
}

async fn get_results(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let attempt = fetch_owned_attempt(&state, &attempt_id, &user).await?;
    let exam = fetch_exam(&state, &attempt.exam_id).await?;

    let questions = repositories::questions::list_for_exam(state.db(), &exam.id, false, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let answers = repositories::attempts::answers_for_attempt(state.db(), &attempt.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    let outcome = grading::grade_attempt(&questions, &answers);

    let show_correct = exam.show_correct_answers;
    let mut question_results = Vec::with_capacity(questions.len());
    for mut entry in questions {
        // Correct answers stay hidden when the exam says so.
        if !show_correct {
            entry.question.correct_answer = None;
            for option in &mut entry.options {
                option.is_correct = false;
            }
        }

        let answer = answers
            .iter()
            .find(|answer| answer.question_id == entry.question.id)
            .cloned()
            .map(AnswerResponse::from_db);

        question_results.push(QuestionResultResponse {
            question: QuestionResponse::from_db(entry.question, entry.options),
            answer,
        });
    }

    Ok(Json(ResultsResponse {
        attempt: AttemptResponse::from_db(attempt),
        questions: question_results,
        auto_max_marks: outcome.auto_max_marks,
        auto_obtained_marks: outcome.auto_obtained_marks,
        auto_provisional_percentage: outcome.auto_provisional_percentage,
        pending_manual_count: outcome.pending_manual_count,
        pending_manual_marks: outcome.pending_manual_marks,
    }))
}

async fn reveal_answer(
    Path((attempt_id, question_id)): Path<(String, String)>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<QuestionRevealResponse>, ApiError> {
    let attempt = fetch_owned_attempt(&state, &attempt_id, &user).await?;

    if attempt.is_completed() {
        return Err(ApiError::Rejected(Bilingual::new(
            "المحاولة منتهية",
            "This attempt has ended",
        )));
    }

    let exam = fetch_exam(&state, &attempt.exam_id).await?;

    if !exam.show_answer_during_exam && !exam.show_explanation_during_exam {
        return Err(ApiError::Forbidden("This exam does not reveal answers during the attempt"));
    }

    let question = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?;

    let Some(question) = question.filter(|question| question.exam_id == exam.id) else {
        return Err(ApiError::NotFound("Question not found".to_string()));
    };

    let correct_option_ids = if exam.show_answer_during_exam {
        repositories::questions::options_for_question(state.db(), &question.id, false)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load options"))?
            .into_iter()
            .filter(|option| option.is_correct)
            .map(|option| option.id)
            .collect()
    } else {
        Vec::new()
    };

    Ok(Json(QuestionRevealResponse {
        question_id: question.id,
        explanation_ar: exam
            .show_explanation_during_exam
            .then_some(question.explanation_ar)
            .flatten(),
        explanation_en: exam
            .show_explanation_during_exam
            .then_some(question.explanation_en)
            .flatten(),
        show_answer: exam.show_answer_during_exam,
        correct_option_ids,
    }))
}

async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

async fn fetch_owned_attempt(
    state: &AppState,
    attempt_id: &str,
    user: &User,
) -> Result<ExamAttempt, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    // Absent and not-owned collapse into the same answer on purpose.
    attempt
        .filter(|attempt| attempt.user_id == user.id)
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))
}
