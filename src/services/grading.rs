use crate::db::models::{ExamAnswer, Question, QuestionOption};
use crate::db::types::QuestionKind;

/// A question joined with its option rows, as loaded for grading or taking.
#[derive(Debug, Clone)]
pub(crate) struct QuestionWithOptions {
    pub(crate) question: Question,
    pub(crate) options: Vec<QuestionOption>,
}

/// Per-answer grading verdict for an auto-gradable question the student
/// actually answered. Unanswered questions contribute to the aggregates only.
#[derive(Debug, Clone)]
pub(crate) struct GradedAnswer {
    pub(crate) answer_id: String,
    pub(crate) question_id: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_awarded: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct AutoGradeOutcome {
    pub(crate) auto_max_marks: f64,
    pub(crate) auto_obtained_marks: f64,
    pub(crate) auto_provisional_percentage: f64,
    pub(crate) pending_manual_count: i64,
    pub(crate) pending_manual_marks: f64,
    pub(crate) graded: Vec<GradedAnswer>,
}

/// Scores the auto-gradable subset of an attempt.
///
/// Short/essay questions are excluded from the provisional score entirely;
/// they are tallied so the caller can surface how much is still waiting on a
/// human grader. Negative marks apply both to wrong answers and to skipped
/// questions, matching the source system.
pub(crate) fn grade_attempt(
    questions: &[QuestionWithOptions],
    answers: &[ExamAnswer],
) -> AutoGradeOutcome {
    let mut auto_max_marks = 0.0;
    let mut auto_obtained_marks = 0.0;
    let mut pending_manual_count = 0i64;
    let mut pending_manual_marks = 0.0;
    let mut graded = Vec::new();

    for entry in questions {
        let question = &entry.question;

        if !question.kind.auto_gradable() {
            pending_manual_count += 1;
            pending_manual_marks += question.marks;
            continue;
        }

        auto_max_marks += question.marks;

        let answer = answers.iter().find(|answer| answer.question_id == question.id);

        let Some(answer) = answer else {
            if question.negative_marks > 0.0 {
                auto_obtained_marks -= question.negative_marks;
            }
            continue;
        };

        let is_correct = match question.kind {
            QuestionKind::Mcq | QuestionKind::Tf => answer
                .selected_option_id
                .as_deref()
                .map(|selected| {
                    entry.options.iter().any(|option| option.id == selected && option.is_correct)
                })
                .unwrap_or(false),
            QuestionKind::Fillblank => fillblank_matches(
                answer.answer_text.as_deref(),
                question.correct_answer.as_deref(),
            ),
            QuestionKind::Short | QuestionKind::Essay => unreachable!("filtered above"),
        };

        let marks_awarded = if is_correct {
            question.marks
        } else if question.negative_marks > 0.0 {
            -question.negative_marks
        } else {
            0.0
        };

        auto_obtained_marks += marks_awarded;
        graded.push(GradedAnswer {
            answer_id: answer.id.clone(),
            question_id: question.id.clone(),
            is_correct,
            marks_awarded,
        });
    }

    let auto_provisional_percentage = if auto_max_marks > 0.0 {
        round2(auto_obtained_marks / auto_max_marks * 100.0)
    } else {
        0.0
    };

    AutoGradeOutcome {
        auto_max_marks,
        auto_obtained_marks,
        auto_provisional_percentage,
        pending_manual_count,
        pending_manual_marks,
        graded,
    }
}

/// Trimmed, case-insensitive comparison. An empty stored answer never matches.
fn fillblank_matches(submitted: Option<&str>, expected: Option<&str>) -> bool {
    let expected = expected.unwrap_or_default().trim();
    if expected.is_empty() {
        return false;
    }
    let submitted = submitted.unwrap_or_default().trim();
    submitted.to_lowercase() == expected.to_lowercase()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn question(id: &str, kind: QuestionKind, marks: f64, negative: f64) -> Question {
        let now = primitive_now_utc();
        Question {
            id: id.to_string(),
            exam_id: "exam-1".to_string(),
            kind,
            text_ar: "سؤال".to_string(),
            text_en: None,
            image_url: None,
            marks,
            negative_marks: negative,
            correct_answer: None,
            explanation_ar: None,
            explanation_en: None,
            display_order: 0,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn option(id: &str, question_id: &str, is_correct: bool) -> QuestionOption {
        QuestionOption {
            id: id.to_string(),
            question_id: question_id.to_string(),
            text_ar: "خيار".to_string(),
            text_en: None,
            image_url: None,
            is_correct,
            display_order: 0,
            is_active: true,
            created_at: primitive_now_utc(),
        }
    }

    fn answer(question_id: &str, selected: Option<&str>, text: Option<&str>) -> ExamAnswer {
        ExamAnswer {
            id: format!("ans-{question_id}"),
            attempt_id: "attempt-1".to_string(),
            question_id: question_id.to_string(),
            selected_option_id: selected.map(str::to_string),
            answer_text: text.map(str::to_string),
            is_correct: None,
            marks_obtained: 0.0,
            instructor_feedback: None,
            graded_by: None,
            graded_at: None,
            answered_at: primitive_now_utc(),
            time_spent_seconds: 30,
        }
    }

    #[test]
    fn mcq_correct_option_earns_full_marks() {
        let q = question("q1", QuestionKind::Mcq, 5.0, 0.0);
        let entry = QuestionWithOptions {
            question: q,
            options: vec![option("o1", "q1", false), option("o2", "q1", true)],
        };

        let outcome = grade_attempt(&[entry], &[answer("q1", Some("o2"), None)]);
        assert_eq!(outcome.auto_obtained_marks, 5.0);
        assert_eq!(outcome.auto_max_marks, 5.0);
        assert_eq!(outcome.auto_provisional_percentage, 100.0);
        assert!(outcome.graded[0].is_correct);
    }

    #[test]
    fn unanswered_question_loses_negative_marks() {
        let q = question("q1", QuestionKind::Mcq, 5.0, 2.0);
        let entry = QuestionWithOptions { question: q, options: vec![option("o1", "q1", true)] };

        let outcome = grade_attempt(&[entry], &[]);
        assert_eq!(outcome.auto_obtained_marks, -2.0);
        assert!(outcome.graded.is_empty());
    }

    #[test]
    fn wrong_selection_loses_negative_marks_when_configured() {
        let q = question("q1", QuestionKind::Tf, 3.0, 1.0);
        let entry = QuestionWithOptions {
            question: q,
            options: vec![option("o1", "q1", true), option("o2", "q1", false)],
        };

        let outcome = grade_attempt(&[entry], &[answer("q1", Some("o2"), None)]);
        assert_eq!(outcome.auto_obtained_marks, -1.0);
        assert_eq!(outcome.graded[0].marks_awarded, -1.0);
        assert!(!outcome.graded[0].is_correct);
    }

    #[test]
    fn fillblank_comparison_trims_and_ignores_case() {
        let mut q = question("q1", QuestionKind::Fillblank, 2.0, 0.0);
        q.correct_answer = Some("paris".to_string());
        let entry = QuestionWithOptions { question: q, options: vec![] };

        let outcome = grade_attempt(&[entry.clone()], &[answer("q1", None, Some("Paris "))]);
        assert_eq!(outcome.auto_obtained_marks, 2.0);

        let outcome = grade_attempt(&[entry], &[answer("q1", None, Some("London"))]);
        assert_eq!(outcome.auto_obtained_marks, 0.0);
    }

    #[test]
    fn empty_stored_answer_never_matches() {
        let mut q = question("q1", QuestionKind::Fillblank, 2.0, 0.0);
        q.correct_answer = Some("  ".to_string());
        let entry = QuestionWithOptions { question: q, options: vec![] };

        let outcome = grade_attempt(&[entry], &[answer("q1", None, Some(""))]);
        assert_eq!(outcome.auto_obtained_marks, 0.0);
        assert!(!outcome.graded[0].is_correct);
    }

    #[test]
    fn all_manual_paper_yields_zero_percentage() {
        let essay = QuestionWithOptions {
            question: question("q1", QuestionKind::Essay, 10.0, 0.0),
            options: vec![],
        };
        let short = QuestionWithOptions {
            question: question("q2", QuestionKind::Short, 5.0, 0.0),
            options: vec![],
        };

        let outcome = grade_attempt(&[essay, short], &[answer("q1", None, Some("مقال"))]);
        assert_eq!(outcome.auto_max_marks, 0.0);
        assert_eq!(outcome.auto_provisional_percentage, 0.0);
        assert_eq!(outcome.pending_manual_count, 2);
        assert_eq!(outcome.pending_manual_marks, 15.0);
    }

    #[test]
    fn provisional_percentage_rounds_to_two_decimals() {
        let q1 = QuestionWithOptions {
            question: question("q1", QuestionKind::Mcq, 1.0, 0.0),
            options: vec![option("o1", "q1", true)],
        };
        let q2 = QuestionWithOptions {
            question: question("q2", QuestionKind::Mcq, 1.0, 0.0),
            options: vec![option("o2", "q2", true)],
        };
        let q3 = QuestionWithOptions {
            question: question("q3", QuestionKind::Mcq, 1.0, 0.0),
            options: vec![option("o3", "q3", true)],
        };

        let outcome = grade_attempt(
            &[q1, q2, q3],
            &[answer("q1", Some("o1"), None), answer("q2", Some("wrong"), None)],
        );
        // 1 of 3 marks: 33.333... → 33.33
        assert_eq!(outcome.auto_provisional_percentage, 33.33);
    }
}
