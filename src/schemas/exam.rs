use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Exam, ExamCategory};
use crate::repositories::exams::{ExamListRow, ExamStats};
use crate::schemas::Bilingual;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamWriteRequest {
    #[serde(alias = "titleAr")]
    #[validate(length(min = 1, message = "title_ar must not be empty"))]
    pub(crate) title_ar: String,
    #[serde(default)]
    #[serde(alias = "titleEn")]
    pub(crate) title_en: Option<String>,
    #[serde(default)]
    #[serde(alias = "descriptionAr")]
    pub(crate) description_ar: Option<String>,
    #[serde(default)]
    #[serde(alias = "descriptionEn")]
    pub(crate) description_en: Option<String>,
    #[serde(default)]
    #[serde(alias = "categoryId")]
    pub(crate) category_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default = "default_duration_minutes")]
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default = "default_total_marks")]
    #[serde(alias = "totalMarks")]
    #[validate(range(exclusive_min = 0.0, message = "total_marks must be positive"))]
    pub(crate) total_marks: f64,
    #[serde(default = "default_passing_marks")]
    #[serde(alias = "passingMarks")]
    #[validate(range(min = 0.0, message = "passing_marks must be non-negative"))]
    pub(crate) passing_marks: f64,
    #[serde(default = "default_max_attempts")]
    #[serde(alias = "maxAttempts")]
    pub(crate) max_attempts: Option<i32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[serde(alias = "startDate")]
    pub(crate) start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    #[serde(alias = "endDate")]
    pub(crate) end_date: Option<OffsetDateTime>,
    #[serde(default = "default_true")]
    #[serde(alias = "isPublic")]
    pub(crate) is_public: bool,
    #[serde(default)]
    #[serde(alias = "requirePassword")]
    pub(crate) require_password: bool,
    #[serde(default)]
    #[serde(alias = "examPassword")]
    pub(crate) exam_password: Option<String>,
    #[serde(default = "default_true")]
    #[serde(alias = "showResultsImmediately")]
    pub(crate) show_results_immediately: bool,
    #[serde(default = "default_true")]
    #[serde(alias = "showCorrectAnswers")]
    pub(crate) show_correct_answers: bool,
    #[serde(default)]
    #[serde(alias = "shuffleQuestions")]
    pub(crate) shuffle_questions: bool,
    #[serde(default)]
    #[serde(alias = "shuffleOptions")]
    pub(crate) shuffle_options: bool,
    #[serde(default)]
    #[serde(alias = "showAnswerDuringExam")]
    pub(crate) show_answer_during_exam: bool,
    #[serde(default)]
    #[serde(alias = "showExplanationDuringExam")]
    pub(crate) show_explanation_during_exam: bool,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "price must be non-negative"))]
    pub(crate) price: f64,
}

impl ExamWriteRequest {
    /// Cross-field rules the derive cannot express; messages are surfaced to
    /// the student-facing UI in both languages.
    pub(crate) fn business_rules(&self) -> Result<(), Bilingual> {
        if self.title_ar.trim().is_empty() {
            return Err(Bilingual::new("عنوان الاختبار مطلوب", "Exam title is required"));
        }
        if self.duration_minutes <= 0 {
            return Err(Bilingual::new(
                "مدة الاختبار يجب أن تكون أكبر من صفر",
                "Exam duration must be greater than zero",
            ));
        }
        if self.passing_marks > self.total_marks {
            return Err(Bilingual::new(
                "درجة النجاح يجب أن تكون أقل من أو تساوي الدرجة الكلية",
                "Passing marks must not exceed total marks",
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Bilingual::new(
                    "تاريخ الانتهاء يجب أن يكون بعد تاريخ البداية",
                    "End date must come after the start date",
                ));
            }
        }
        if self.price < 0.0 {
            return Err(Bilingual::new("السعر لا يمكن أن يكون سالباً", "Price cannot be negative"));
        }
        Ok(())
    }

    /// Free exams are forced public with no password before they reach the
    /// repository; the repository and the CHECK constraints repeat the rule.
    pub(crate) fn normalized(mut self) -> Self {
        if self.price == 0.0 {
            self.is_public = true;
            self.require_password = false;
            self.exam_password = None;
        }
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title_ar: String,
    pub(crate) title_en: Option<String>,
    pub(crate) description_ar: Option<String>,
    pub(crate) description_en: Option<String>,
    pub(crate) category_id: Option<String>,
    pub(crate) course_id: Option<String>,
    pub(crate) instructor_id: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) is_public: bool,
    pub(crate) require_password: bool,
    pub(crate) show_results_immediately: bool,
    pub(crate) show_correct_answers: bool,
    pub(crate) shuffle_questions: bool,
    pub(crate) shuffle_options: bool,
    pub(crate) show_answer_during_exam: bool,
    pub(crate) show_explanation_during_exam: bool,
    pub(crate) price: f64,
    pub(crate) is_free: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
    pub(crate) attempts_count: i64,
    pub(crate) unique_students: i64,
    pub(crate) user_attempts: i64,
}

impl ExamResponse {
    pub(crate) fn from_parts(exam: Exam, stats: ExamStats, user_attempts: i64) -> Self {
        Self {
            is_free: exam.is_free(),
            id: exam.id,
            title_ar: exam.title_ar,
            title_en: exam.title_en,
            description_ar: exam.description_ar,
            description_en: exam.description_en,
            category_id: exam.category_id,
            course_id: exam.course_id,
            instructor_id: exam.instructor_id,
            duration_minutes: exam.duration_minutes,
            total_marks: exam.total_marks,
            passing_marks: exam.passing_marks,
            max_attempts: exam.max_attempts,
            start_date: exam.start_date.map(format_primitive),
            end_date: exam.end_date.map(format_primitive),
            is_public: exam.is_public,
            require_password: exam.require_password,
            show_results_immediately: exam.show_results_immediately,
            show_correct_answers: exam.show_correct_answers,
            shuffle_questions: exam.shuffle_questions,
            shuffle_options: exam.shuffle_options,
            show_answer_during_exam: exam.show_answer_during_exam,
            show_explanation_during_exam: exam.show_explanation_during_exam,
            price: exam.price,
            is_active: exam.is_active,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
            attempts_count: stats.attempts_count,
            unique_students: stats.unique_students,
            user_attempts,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamSummaryResponse {
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
    pub(crate) start_date: Option<String>,
    pub(crate) end_date: Option<String>,
    pub(crate) is_public: bool,
    pub(crate) require_password: bool,
    pub(crate) is_active: bool,
    pub(crate) price: f64,
    pub(crate) is_free: bool,
    pub(crate) attempts_count: i64,
    pub(crate) unique_students: i64,
}

impl ExamSummaryResponse {
    pub(crate) fn from_row(row: ExamListRow) -> Self {
        Self {
            id: row.id,
            title_ar: row.title_ar,
            title_en: row.title_en,
            description_ar: row.description_ar,
            description_en: row.description_en,
            category_id: row.category_id,
            category_name_ar: row.category_name_ar,
            category_name_en: row.category_name_en,
            duration_minutes: row.duration_minutes,
            total_marks: row.total_marks,
            passing_marks: row.passing_marks,
            max_attempts: row.max_attempts,
            start_date: row.start_date.map(format_primitive),
            end_date: row.end_date.map(format_primitive),
            is_public: row.is_public,
            require_password: row.require_password,
            is_active: row.is_active,
            is_free: row.price == 0.0,
            price: row.price,
            attempts_count: row.attempts_count,
            unique_students: row.unique_students,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryResponse {
    pub(crate) id: String,
    pub(crate) name_ar: String,
    pub(crate) name_en: String,
    pub(crate) description: Option<String>,
    pub(crate) display_order: i32,
}

impl CategoryResponse {
    pub(crate) fn from_db(category: ExamCategory) -> Self {
        Self {
            id: category.id,
            name_ar: category.name_ar,
            name_en: category.name_en,
            description: category.description,
            display_order: category.display_order,
        }
    }
}

fn default_duration_minutes() -> i32 {
    60
}

fn default_total_marks() -> f64 {
    100.0
}

fn default_passing_marks() -> f64 {
    50.0
}

fn default_max_attempts() -> Option<i32> {
    Some(1)
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ExamWriteRequest {
        serde_json::from_value(serde_json::json!({
            "title_ar": "اختبار تجريبي",
            "title_en": "Sample exam",
            "price": 0.0,
            "require_password": true,
            "exam_password": "secret",
            "is_public": false
        }))
        .expect("request")
    }

    #[test]
    fn free_exam_is_normalized_public_and_passwordless() {
        let normalized = request().normalized();
        assert!(normalized.is_public);
        assert!(!normalized.require_password);
        assert!(normalized.exam_password.is_none());
    }

    #[test]
    fn paid_exam_keeps_password_settings() {
        let mut paid = request();
        paid.price = 200.0;
        let normalized = paid.normalized();
        assert!(!normalized.is_public);
        assert!(normalized.require_password);
        assert_eq!(normalized.exam_password.as_deref(), Some("secret"));
    }

    #[test]
    fn business_rules_reject_inverted_marks_and_dates() {
        let mut bad_marks = request();
        bad_marks.passing_marks = 120.0;
        let err = bad_marks.business_rules().unwrap_err();
        assert_eq!(err.en, "Passing marks must not exceed total marks");

        let mut bad_dates = request();
        bad_dates.start_date = Some(time::macros::datetime!(2026-05-02 10:00 UTC));
        bad_dates.end_date = Some(time::macros::datetime!(2026-05-01 10:00 UTC));
        assert!(bad_dates.business_rules().is_err());

        assert!(request().business_rules().is_ok());
    }

    #[test]
    fn defaults_fill_in_missing_fields() {
        let minimal: ExamWriteRequest =
            serde_json::from_value(serde_json::json!({"title_ar": "عنوان"})).expect("minimal");
        assert_eq!(minimal.duration_minutes, 60);
        assert_eq!(minimal.total_marks, 100.0);
        assert_eq!(minimal.passing_marks, 50.0);
        assert_eq!(minimal.max_attempts, Some(1));
        assert!(minimal.is_public);
    }
}
