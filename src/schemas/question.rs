use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionKind;
use crate::schemas::Bilingual;
use crate::services::grading::QuestionWithOptions;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionOptionCreate {
    #[serde(alias = "textAr")]
    #[validate(length(min = 1, max = 1000, message = "option text_ar must be 1-1000 characters"))]
    pub(crate) text_ar: String,
    #[serde(default)]
    #[serde(alias = "textEn")]
    #[validate(length(max = 1000, message = "option text_en must be at most 1000 characters"))]
    pub(crate) text_en: Option<String>,
    #[serde(default)]
    #[serde(alias = "imageUrl")]
    pub(crate) image_url: Option<String>,
    #[serde(default)]
    #[serde(alias = "isCorrect")]
    pub(crate) is_correct: bool,
    #[serde(default)]
    #[serde(alias = "displayOrder")]
    pub(crate) display_order: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    pub(crate) kind: QuestionKind,
    #[serde(alias = "textAr")]
    #[validate(length(min = 1, message = "text_ar must not be empty"))]
    pub(crate) text_ar: String,
    #[serde(default)]
    #[serde(alias = "textEn")]
    pub(crate) text_en: Option<String>,
    #[serde(default)]
    #[serde(alias = "imageUrl")]
    pub(crate) image_url: Option<String>,
    #[serde(default = "default_marks")]
    #[validate(range(exclusive_min = 0.0, max = 100.0, message = "marks must be in (0, 100]"))]
    pub(crate) marks: f64,
    #[serde(default)]
    #[serde(alias = "negativeMarks")]
    #[validate(range(min = 0.0, max = 100.0, message = "negative_marks must be in [0, 100]"))]
    pub(crate) negative_marks: f64,
    #[serde(default)]
    #[serde(alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    #[serde(alias = "explanationAr")]
    pub(crate) explanation_ar: Option<String>,
    #[serde(default)]
    #[serde(alias = "explanationEn")]
    pub(crate) explanation_en: Option<String>,
    #[serde(default)]
    #[serde(alias = "displayOrder")]
    pub(crate) display_order: i32,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) options: Vec<QuestionOptionCreate>,
}

impl QuestionCreate {
    /// Kind-dependent rules: choice questions need options and at least one
    /// flagged correct; fill-in-the-blank needs the expected answer.
    pub(crate) fn business_rules(&self) -> Result<(), Bilingual> {
        if self.text_ar.trim().is_empty() {
            return Err(Bilingual::new("نص السؤال مطلوب", "Question text is required"));
        }
        if self.marks <= 0.0 {
            return Err(Bilingual::new(
                "درجة السؤال يجب أن تكون أكبر من صفر",
                "Question marks must be greater than zero",
            ));
        }
        if self.kind.requires_options() {
            if self.options.is_empty() {
                return Err(Bilingual::new(
                    "هذا النوع من الأسئلة يتطلب خيارات",
                    "This question kind requires options",
                ));
            }
            if !self.options.iter().any(|option| option.is_correct) {
                return Err(Bilingual::new(
                    "يجب تحديد الإجابة الصحيحة",
                    "A correct option must be selected",
                ));
            }
        }
        if self.kind == QuestionKind::Fillblank
            && self.correct_answer.as_deref().map(str::trim).unwrap_or_default().is_empty()
        {
            return Err(Bilingual::new(
                "الإجابة الصحيحة مطلوبة لسؤال أكمل الفراغ",
                "A correct answer is required for fill-in-the-blank questions",
            ));
        }
        Ok(())
    }
}

/// Full view for the authoring side; includes correctness and explanations.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
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
    pub(crate) options: Vec<AuthorOptionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthorOptionResponse {
    pub(crate) id: String,
    pub(crate) text_ar: String,
    pub(crate) text_en: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) display_order: i32,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question, options: Vec<QuestionOption>) -> Self {
        Self {
            id: question.id,
            exam_id: question.exam_id,
            kind: question.kind,
            text_ar: question.text_ar,
            text_en: question.text_en,
            image_url: question.image_url,
            marks: question.marks,
            negative_marks: question.negative_marks,
            correct_answer: question.correct_answer,
            explanation_ar: question.explanation_ar,
            explanation_en: question.explanation_en,
            display_order: question.display_order,
            options: options.into_iter().map(AuthorOptionResponse::from_db).collect(),
        }
    }
}

impl AuthorOptionResponse {
    fn from_db(option: QuestionOption) -> Self {
        Self {
            id: option.id,
            text_ar: option.text_ar,
            text_en: option.text_en,
            image_url: option.image_url,
            is_correct: option.is_correct,
            display_order: option.display_order,
        }
    }
}

/// Taker-facing view: correctness flags and stored answers are stripped;
/// explanations appear only when the exam shows them during the attempt.
#[derive(Debug, Serialize)]
pub(crate) struct TakerQuestionResponse {
    pub(crate) id: String,
    pub(crate) kind: QuestionKind,
    pub(crate) text_ar: String,
    pub(crate) text_en: Option<String>,
    pub(crate) image_url: Option<String>,
    pub(crate) marks: f64,
    pub(crate) negative_marks: f64,
    pub(crate) explanation_ar: Option<String>,
    pub(crate) explanation_en: Option<String>,
    pub(crate) options: Vec<TakerOptionResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TakerOptionResponse {
    pub(crate) id: String,
    pub(crate) text_ar: String,
    pub(crate) text_en: Option<String>,
    pub(crate) image_url: Option<String>,
}

impl TakerQuestionResponse {
    pub(crate) fn from_loaded(entry: QuestionWithOptions, show_explanations: bool) -> Self {
        let question = entry.question;
        Self {
            id: question.id,
            kind: question.kind,
            text_ar: question.text_ar,
            text_en: question.text_en,
            image_url: question.image_url,
            marks: question.marks,
            negative_marks: question.negative_marks,
            explanation_ar: show_explanations.then_some(question.explanation_ar).flatten(),
            explanation_en: show_explanations.then_some(question.explanation_en).flatten(),
            options: entry
                .options
                .into_iter()
                .map(|option| TakerOptionResponse {
                    id: option.id,
                    text_ar: option.text_ar,
                    text_en: option.text_en,
                    image_url: option.image_url,
                })
                .collect(),
        }
    }
}

/// During-exam reveal for exams that allow it.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionRevealResponse {
    pub(crate) question_id: String,
    pub(crate) explanation_ar: Option<String>,
    pub(crate) explanation_en: Option<String>,
    pub(crate) show_answer: bool,
    pub(crate) correct_option_ids: Vec<String>,
}

fn default_marks() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq() -> QuestionCreate {
        serde_json::from_value(serde_json::json!({
            "kind": "mcq",
            "text_ar": "ما عاصمة فرنسا؟",
            "marks": 2.0,
            "options": [
                {"text_ar": "باريس", "is_correct": true},
                {"text_ar": "لندن"}
            ]
        }))
        .expect("question")
    }

    #[test]
    fn choice_question_requires_a_correct_option() {
        assert!(mcq().business_rules().is_ok());

        let mut no_correct = mcq();
        for option in &mut no_correct.options {
            option.is_correct = false;
        }
        let err = no_correct.business_rules().unwrap_err();
        assert_eq!(err.en, "A correct option must be selected");

        let mut no_options = mcq();
        no_options.options.clear();
        assert!(no_options.business_rules().is_err());
    }

    #[test]
    fn fillblank_requires_stored_answer() {
        let mut blank = mcq();
        blank.kind = QuestionKind::Fillblank;
        blank.options.clear();
        blank.correct_answer = None;
        assert!(blank.business_rules().is_err());

        blank.correct_answer = Some("باريس".to_string());
        assert!(blank.business_rules().is_ok());
    }

    #[test]
    fn essay_question_needs_no_options() {
        let mut essay = mcq();
        essay.kind = QuestionKind::Essay;
        essay.options.clear();
        assert!(essay.business_rules().is_ok());
    }
}
