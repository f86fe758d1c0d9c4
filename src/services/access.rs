use time::PrimitiveDateTime;

use crate::core::time::format_primitive;
use crate::db::models::Exam;
use crate::schemas::Bilingual;

/// Everything the access decision needs besides the exam row itself. The
/// caller resolves payment state and attempt counts from storage; the decision
/// stays a pure function.
#[derive(Debug)]
pub(crate) struct AccessRequest<'a> {
    pub(crate) now: PrimitiveDateTime,
    pub(crate) authenticated: bool,
    pub(crate) has_payment: bool,
    pub(crate) attempts_used: i64,
    pub(crate) password: Option<&'a str>,
}

#[derive(Debug)]
pub(crate) struct ExamAccess {
    pub(crate) has_access: bool,
    pub(crate) is_scheduled: bool,
    pub(crate) has_started: bool,
    pub(crate) has_ended: bool,
    pub(crate) max_attempts_reached: bool,
    pub(crate) requires_password: bool,
    pub(crate) message: Bilingual,
}

impl ExamAccess {
    fn denied(message: Bilingual) -> Self {
        Self {
            has_access: false,
            is_scheduled: false,
            has_started: false,
            has_ended: false,
            max_attempts_reached: false,
            requires_password: false,
            message,
        }
    }
}

/// Decides whether a user may start or continue an attempt.
///
/// Rule order: deleted exam, payment gate (paid exams only), scheduling
/// window, attempt ceiling, password gate. Free exams skip the payment gate
/// but are still held to the window and the attempt ceiling.
pub(crate) fn check_access(exam: &Exam, request: &AccessRequest<'_>) -> ExamAccess {
    if exam.is_deleted {
        return ExamAccess::denied(Bilingual::new("الاختبار غير موجود", "Exam not found"));
    }

    if !exam.is_free() {
        if !request.authenticated {
            return ExamAccess::denied(Bilingual::new(
                "يلزم تسجيل الدخول لشراء هذا الاختبار",
                "You must log in to purchase this exam",
            ));
        }

        if !request.has_payment {
            return ExamAccess::denied(Bilingual::new(
                "يلزم شراء الاختبار أو رفع إيصال التحويل قبل البدء",
                "Purchase the exam or upload a transfer receipt before starting",
            ));
        }
    }

    let is_scheduled = exam.start_date.is_some() || exam.end_date.is_some();
    let has_started = exam.start_date.map(|start| start <= request.now).unwrap_or(true);
    let has_ended = exam.end_date.map(|end| end < request.now).unwrap_or(false);

    if is_scheduled && !has_started {
        let starts_at = exam.start_date.map(format_primitive).unwrap_or_default();
        return ExamAccess {
            has_access: false,
            is_scheduled: true,
            has_started: false,
            has_ended: false,
            max_attempts_reached: false,
            requires_password: false,
            message: Bilingual::new(
                format!("الاختبار سيبدأ في {starts_at}"),
                format!("The exam starts at {starts_at}"),
            ),
        };
    }

    if has_ended {
        return ExamAccess {
            has_access: false,
            is_scheduled: true,
            has_started: true,
            has_ended: true,
            max_attempts_reached: false,
            requires_password: false,
            message: Bilingual::new("انتهى وقت الاختبار", "The exam window has ended"),
        };
    }

    // max_attempts absent or zero means unlimited.
    let attempt_cap = exam.max_attempts.unwrap_or(0);
    if attempt_cap > 0 && request.attempts_used >= attempt_cap as i64 {
        return ExamAccess {
            has_access: false,
            is_scheduled,
            has_started,
            has_ended: false,
            max_attempts_reached: true,
            requires_password: false,
            message: Bilingual::new(
                "لقد وصلت للحد الأقصى من المحاولات",
                "You have reached the maximum number of attempts",
            ),
        };
    }

    if exam.require_password {
        let Some(supplied) = request.password.filter(|value| !value.is_empty()) else {
            return ExamAccess {
                has_access: false,
                is_scheduled,
                has_started,
                has_ended: false,
                max_attempts_reached: false,
                requires_password: true,
                message: Bilingual::new("الاختبار يتطلب كلمة مرور", "This exam requires a password"),
            };
        };

        // Exam passwords are shared gate codes, not credentials; plain
        // equality, no hashing.
        if exam.exam_password.as_deref() != Some(supplied) {
            return ExamAccess {
                has_access: false,
                is_scheduled,
                has_started,
                has_ended: false,
                max_attempts_reached: false,
                requires_password: true,
                message: Bilingual::new("كلمة المرور غير صحيحة", "Incorrect exam password"),
            };
        }
    }

    ExamAccess {
        has_access: true,
        is_scheduled,
        has_started: true,
        has_ended: false,
        max_attempts_reached: false,
        requires_password: exam.require_password,
        message: Bilingual::new("يمكنك بدء الاختبار", "You can start the exam"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Time};

    fn at(day: u8, hour: u8) -> PrimitiveDateTime {
        let date = Date::from_calendar_date(2026, time::Month::March, day).unwrap();
        PrimitiveDateTime::new(date, Time::from_hms(hour, 0, 0).unwrap())
    }

    fn exam() -> Exam {
        let now = at(10, 12);
        Exam {
            id: "exam-1".to_string(),
            title_ar: "اختبار المحاسبة".to_string(),
            title_en: Some("Accounting exam".to_string()),
            description_ar: None,
            description_en: None,
            category_id: None,
            course_id: None,
            instructor_id: "instructor-1".to_string(),
            duration_minutes: 60,
            total_marks: 100.0,
            passing_marks: 50.0,
            max_attempts: None,
            start_date: None,
            end_date: None,
            is_public: true,
            require_password: false,
            exam_password: None,
            show_results_immediately: true,
            show_correct_answers: true,
            shuffle_questions: false,
            shuffle_options: false,
            show_answer_during_exam: false,
            show_explanation_during_exam: false,
            price: 0.0,
            is_active: true,
            is_deleted: false,
            created_by: "instructor-1".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn request(now: PrimitiveDateTime) -> AccessRequest<'static> {
        AccessRequest { now, authenticated: false, has_payment: false, attempts_used: 0, password: None }
    }

    #[test]
    fn free_exam_grants_access_without_login_or_payment() {
        let access = check_access(&exam(), &request(at(10, 12)));
        assert!(access.has_access);
    }

    #[test]
    fn free_exam_still_honours_schedule_and_attempt_cap() {
        let mut scheduled = exam();
        scheduled.start_date = Some(at(11, 9));
        let access = check_access(&scheduled, &request(at(10, 12)));
        assert!(!access.has_access);
        assert!(access.is_scheduled);
        assert!(!access.has_started);

        let mut capped = exam();
        capped.max_attempts = Some(2);
        let mut req = request(at(10, 12));
        req.attempts_used = 2;
        let access = check_access(&capped, &req);
        assert!(!access.has_access);
        assert!(access.max_attempts_reached);
    }

    #[test]
    fn paid_exam_requires_login_then_payment() {
        let mut paid = exam();
        paid.price = 150.0;
        paid.is_public = false;

        let access = check_access(&paid, &request(at(10, 12)));
        assert!(!access.has_access);

        let mut req = request(at(10, 12));
        req.authenticated = true;
        let access = check_access(&paid, &req);
        assert!(!access.has_access);

        req.has_payment = true;
        let access = check_access(&paid, &req);
        assert!(access.has_access);
    }

    #[test]
    fn window_end_is_inclusive_of_the_boundary() {
        let mut windowed = exam();
        windowed.start_date = Some(at(9, 8));
        windowed.end_date = Some(at(10, 12));

        assert!(check_access(&windowed, &request(at(10, 12))).has_access);

        let access = check_access(&windowed, &request(at(10, 13)));
        assert!(!access.has_access);
        assert!(access.has_ended);
    }

    #[test]
    fn unlimited_when_max_attempts_zero_or_absent() {
        let mut zeroed = exam();
        zeroed.max_attempts = Some(0);
        let mut req = request(at(10, 12));
        req.attempts_used = 99;
        assert!(check_access(&zeroed, &req).has_access);
    }

    #[test]
    fn password_gate_uses_plain_equality() {
        let mut gated = exam();
        gated.price = 80.0;
        gated.require_password = true;
        gated.exam_password = Some("open-sesame".to_string());

        let mut req = request(at(10, 12));
        req.authenticated = true;
        req.has_payment = true;

        let access = check_access(&gated, &req);
        assert!(!access.has_access);
        assert!(access.requires_password);

        req.password = Some("OPEN-SESAME");
        assert!(!check_access(&gated, &req).has_access);

        req.password = Some("open-sesame");
        assert!(check_access(&gated, &req).has_access);
    }

    #[test]
    fn deleted_exam_reads_as_missing() {
        let mut gone = exam();
        gone.is_deleted = true;
        let access = check_access(&gone, &request(at(10, 12)));
        assert!(!access.has_access);
        assert_eq!(access.message.en, "Exam not found");
    }
}
