use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{AttemptStatus, OrderStatus, QuestionKind, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) is_deleted: bool,
    pub(crate) accept_marketing: bool,
    pub(crate) bio: Option<String>,
    pub(crate) country: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) date_of_birth: Option<Date>,
    pub(crate) last_login_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamCategory {
    pub(crate) id: String,
    pub(crate) name_ar: String,
    pub(crate) name_en: String,
    pub(crate) description: Option<String>,
    pub(crate) display_order: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
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
    pub(crate) start_date: Option<PrimitiveDateTime>,
    pub(crate) end_date: Option<PrimitiveDateTime>,
    pub(crate) is_public: bool,
    pub(crate) require_password: bool,
    pub(crate) exam_password: Option<String>,
    pub(crate) show_results_immediately: bool,
    pub(crate) show_correct_answers: bool,
    pub(crate) shuffle_questions: bool,
    pub(crate) shuffle_options: bool,
    pub(crate) show_answer_during_exam: bool,
    pub(crate) show_explanation_during_exam: bool,
    pub(crate) price: f64,
    pub(crate) is_active: bool,
    pub(crate) is_deleted: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Exam {
    pub(crate) fn is_free(&self) -> bool {
        self.price == 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) text_ar: String,
    pub(crate) text_en: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) marks: f64,
    pub(crate) negative_marks: f64,
    pub(crate) correct_answer: Option<String>,
    pub(crate) explanation_ar: Option<String>,
    pub(crate) explanation_en: Option<String>,
    pub(crate) display_order: i32,
    pub(crate) is_active: bool,
    pub(crate) is_deleted: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) question_id: String,
    pub(crate) text_ar: String,
    pub(crate) text_en: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) display_order: i32,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) user_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) time_spent_minutes: Option<i32>,
    pub(crate) total_marks: f64,
    pub(crate) obtained_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) is_passed: bool,
    pub(crate) status: AttemptStatus,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl ExamAttempt {
    pub(crate) fn is_completed(&self) -> bool {
        self.status == AttemptStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamAnswer {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) answer_text: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_obtained: f64,
    pub(crate) instructor_feedback: Option<String>,
    pub(crate) graded_by: Option<String>,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
    pub(crate) answered_at: PrimitiveDateTime,
    pub(crate) time_spent_seconds: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamOrder {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) exam_id: String,
    pub(crate) currency: String,
    pub(crate) price_at_purchase: f64,
    pub(crate) discount_amount: f64,
    pub(crate) paid_amount: f64,
    pub(crate) status: OrderStatus,
    pub(crate) payment_method: String,
    pub(crate) receipt_file_name: Option<String>,
    pub(crate) receipt_url: Option<String>,
    pub(crate) receipt_uploaded_at: Option<PrimitiveDateTime>,
    pub(crate) bank_ref: Option<String>,
    pub(crate) reject_reason: Option<String>,
    pub(crate) verified_by: Option<String>,
    pub(crate) verified_at: Option<PrimitiveDateTime>,
    pub(crate) paid_at: Option<PrimitiveDateTime>,
    pub(crate) is_deleted: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct BankAccount {
    pub(crate) id: String,
    pub(crate) bank_name: String,
    pub(crate) account_name: String,
    pub(crate) account_number: String,
    pub(crate) iban: Option<String>,
    pub(crate) swift_code: Option<String>,
    pub(crate) branch: Option<String>,
    pub(crate) currency: String,
    pub(crate) is_active: bool,
    pub(crate) is_default: bool,
    pub(crate) display_order: i32,
    pub(crate) notes: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
