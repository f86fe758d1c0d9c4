pub(crate) mod attempts;
pub(crate) mod bank_accounts;
pub(crate) mod dashboard;
pub(crate) mod exams;
pub(crate) mod orders;
pub(crate) mod questions;
pub(crate) mod users;
