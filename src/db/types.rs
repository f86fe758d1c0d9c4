use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Student,
    Instructor,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "orderstatus", rename_all = "snake_case")]
pub(crate) enum OrderStatus {
    Pending,
    PaidUnverified,
    Paid,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// Statuses that unlock a paid exam (self-reported receipts count).
    pub(crate) fn grants_access(self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::PaidUnverified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "questionkind", rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    Mcq,
    Tf,
    Fillblank,
    Short,
    Essay,
}

impl QuestionKind {
    /// Whether the kind carries a fixed option list the author must supply.
    pub(crate) fn requires_options(self) -> bool {
        matches!(self, QuestionKind::Mcq | QuestionKind::Tf)
    }

    /// Short and essay answers need a human grader; everything else is scored
    /// automatically at submit time.
    pub(crate) fn auto_gradable(self) -> bool {
        !matches!(self, QuestionKind::Short | QuestionKind::Essay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_gradable_excludes_manual_kinds() {
        assert!(QuestionKind::Mcq.auto_gradable());
        assert!(QuestionKind::Tf.auto_gradable());
        assert!(QuestionKind::Fillblank.auto_gradable());
        assert!(!QuestionKind::Short.auto_gradable());
        assert!(!QuestionKind::Essay.auto_gradable());
    }

    #[test]
    fn options_required_for_choice_kinds_only() {
        assert!(QuestionKind::Mcq.requires_options());
        assert!(QuestionKind::Tf.requires_options());
        assert!(!QuestionKind::Fillblank.requires_options());
        assert!(!QuestionKind::Essay.requires_options());
    }

    #[test]
    fn order_access_includes_unverified_receipts() {
        assert!(OrderStatus::Paid.grants_access());
        assert!(OrderStatus::PaidUnverified.grants_access());
        assert!(!OrderStatus::Pending.grants_access());
        assert!(!OrderStatus::Failed.grants_access());
        assert!(!OrderStatus::Cancelled.grants_access());
    }
}
