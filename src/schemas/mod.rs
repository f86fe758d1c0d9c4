use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod attempt;
pub(crate) mod bank;
pub(crate) mod dashboard;
pub(crate) mod exam;
pub(crate) mod order;
pub(crate) mod question;
pub(crate) mod user;

/// User-facing message carried in both platform languages. Every denial or
/// validation failure surfaces one of these rather than a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Bilingual {
    pub(crate) ar: String,
    pub(crate) en: String,
}

impl Bilingual {
    pub(crate) fn new(ar: impl Into<String>, en: impl Into<String>) -> Self {
        Self { ar: ar.into(), en: en.into() }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}
