use serde::Serialize;

use crate::core::time::format_primitive;
use crate::repositories::dashboard::{
    ActivityRow, ExamProgressRow, InProgressRow, StudentCounters, StudentListRow, UpcomingExamRow,
};
use crate::schemas::attempt::AttemptHistoryItem;
use crate::schemas::order::OrderHistoryItem;
use crate::services::grading::round2;

#[derive(Debug, Serialize)]
pub(crate) struct StudentCountersResponse {
    pub(crate) purchased_exams: i64,
    pub(crate) attempts_count: i64,
    pub(crate) completed_count: i64,
    pub(crate) passed_count: i64,
    pub(crate) average_percentage: f64,
}

impl StudentCountersResponse {
    pub(crate) fn from_row(row: StudentCounters) -> Self {
        Self {
            purchased_exams: row.purchased_exams,
            attempts_count: row.attempts_count,
            completed_count: row.completed_count,
            passed_count: row.passed_count,
            average_percentage: round2(row.average_percentage),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivityItem {
    pub(crate) kind: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title_ar: String,
    pub(crate) exam_title_en: Option<String>,
    pub(crate) detail: String,
    pub(crate) happened_at: String,
}

impl ActivityItem {
    pub(crate) fn from_row(row: ActivityRow) -> Self {
        Self {
            kind: row.kind,
            exam_id: row.exam_id,
            exam_title_ar: row.exam_title_ar,
            exam_title_en: row.exam_title_en,
            detail: row.detail,
            happened_at: format_primitive(row.happened_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UpcomingExamItem {
    pub(crate) exam_id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) start_date: String,
    pub(crate) end_date: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) price: f64,
}

impl UpcomingExamItem {
    pub(crate) fn from_row(row: UpcomingExamRow) -> Self {
        Self {
            exam_id: row.exam_id,
            title_ar: row.title_ar,
            title_en: row.title_en,
            start_date: format_primitive(row.start_date),
            end_date: row.end_date.map(format_primitive),
            duration_minutes: row.duration_minutes,
            price: row.price,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct InProgressItem {
    pub(crate) attempt_id: String,
    pub(crate) exam_id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) started_at: String,
    pub(crate) duration_minutes: i32,
}

impl InProgressItem {
    pub(crate) fn from_row(row: InProgressRow) -> Self {
        Self {
            attempt_id: row.attempt_id,
            exam_id: row.exam_id,
            title_ar: row.title_ar,
            title_en: row.title_en,
            started_at: format_primitive(row.started_at),
            duration_minutes: row.duration_minutes,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamProgressItem {
    pub(crate) exam_id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) attempts_used: i64,
    pub(crate) best_percentage: f64,
    pub(crate) last_percentage: f64,
    pub(crate) has_passed: bool,
}

impl ExamProgressItem {
    pub(crate) fn from_row(row: ExamProgressRow) -> Self {
        Self {
            exam_id: row.exam_id,
            title_ar: row.title_ar,
            title_en: row.title_en,
            max_attempts: row.max_attempts,
            attempts_used: row.attempts_used,
            best_percentage: row.best_percentage,
            last_percentage: row.last_percentage,
            has_passed: row.has_passed,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentDashboardResponse {
    pub(crate) counters: StudentCountersResponse,
    pub(crate) recent_activity: Vec<ActivityItem>,
    pub(crate) upcoming_exams: Vec<UpcomingExamItem>,
    pub(crate) in_progress: Vec<InProgressItem>,
    pub(crate) exam_progress: Vec<ExamProgressItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentListItem {
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) exams_count: i64,
    pub(crate) attempts_count: i64,
    pub(crate) last_activity: Option<String>,
}

impl StudentListItem {
    pub(crate) fn from_row(row: StudentListRow) -> Self {
        Self {
            user_id: row.user_id,
            full_name: format!("{} {}", row.first_name, row.last_name).trim().to_string(),
            email: row.email,
            phone: row.phone,
            is_active: row.is_active,
            exams_count: row.exams_count,
            attempts_count: row.attempts_count,
            last_activity: row.last_activity.map(format_primitive),
        }
    }
}

/// Instructor drill-down: profile plus full order and attempt history.
#[derive(Debug, Serialize)]
pub(crate) struct StudentDetailsResponse {
    pub(crate) user_id: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) orders: Vec<OrderHistoryItem>,
    pub(crate) attempts: Vec<AttemptHistoryItem>,
}
