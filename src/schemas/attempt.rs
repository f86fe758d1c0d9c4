use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{ExamAnswer, ExamAttempt};
use crate::db::types::AttemptStatus;
use crate::repositories::attempts::AttemptListRow;
use crate::schemas::question::QuestionResponse;
use crate::schemas::Bilingual;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StartAttemptRequest {
    #[serde(alias = "examId")]
    #[validate(length(min = 1, message = "exam_id must not be empty"))]
    pub(crate) exam_id: String,
    #[serde(default)]
    #[serde(alias = "examPassword")]
    pub(crate) exam_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) resumed: bool,
    pub(crate) message: Bilingual,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveAnswerRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    #[serde(alias = "selectedOptionId")]
    pub(crate) selected_option_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "answerText")]
    pub(crate) answer_text: Option<String>,
    #[serde(default)]
    #[serde(alias = "timeSpentSeconds")]
    pub(crate) time_spent_seconds: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) time_spent_minutes: Option<i32>,
    pub(crate) total_marks: f64,
    pub(crate) obtained_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) is_passed: bool,
    pub(crate) status: AttemptStatus,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: ExamAttempt) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            attempt_number: attempt.attempt_number,
            started_at: format_primitive(attempt.started_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            time_spent_minutes: attempt.time_spent_minutes,
            total_marks: attempt.total_marks,
            obtained_marks: attempt.obtained_marks,
            percentage: attempt.percentage,
            is_passed: attempt.is_passed,
            status: attempt.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptHistoryItem {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) obtained_marks: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) is_passed: bool,
    pub(crate) status: AttemptStatus,
}

impl AttemptHistoryItem {
    pub(crate) fn from_row(row: AttemptListRow) -> Self {
        Self {
            id: row.id,
            exam_id: row.exam_id,
            exam_title_ar: row.exam_title_ar,
            exam_title_en: row.exam_title_en,
            attempt_number: row.attempt_number,
            started_at: format_primitive(row.started_at),
            submitted_at: row.submitted_at.map(format_primitive),
            obtained_marks: row.obtained_marks,
            total_marks: row.total_marks,
            percentage: row.percentage,
            is_passed: row.is_passed,
            status: row.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) answer_text: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: f64,
    pub(crate) answered_at: String,
    pub(crate) time_spent_seconds: i32,
}

impl AnswerResponse {
    pub(crate) fn from_db(answer: ExamAnswer) -> Self {
        Self {
            question_id: answer.question_id,
            selected_option_id: answer.selected_option_id,
            answer_text: answer.answer_text,
            is_correct: answer.is_correct,
            marks_obtained: answer.marks_obtained,
            answered_at: format_primitive(answer.answered_at),
            time_spent_seconds: answer.time_spent_seconds,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResultResponse {
    pub(crate) question: QuestionResponse,
    pub(crate) answer: Option<AnswerResponse>,
}

/// Attempt results with the provisional auto-graded score. Essay and short
/// questions are reported as pending and never feed the percentage.
#[derive(Debug, Serialize)]
pub(crate) struct ResultsResponse {
    pub(crate) attempt: AttemptResponse,
    pub(crate) questions: Vec<QuestionResultResponse>,
    pub(crate) auto_max_marks: f64,
    pub(crate) auto_obtained_marks: f64,
    pub(crate) auto_provisional_percentage: f64,
    pub(crate) pending_manual_count: i64,
    pub(crate) pending_manual_marks: f64,
}
