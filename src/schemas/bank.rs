use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::BankAccount;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct BankAccountWriteRequest {
    #[serde(alias = "bankName")]
    #[validate(length(min = 1, message = "bank_name must not be empty"))]
    pub(crate) bank_name: String,
    #[serde(alias = "accountName")]
    #[validate(length(min = 1, message = "account_name must not be empty"))]
    pub(crate) account_name: String,
    #[serde(alias = "accountNumber")]
    #[validate(length(min = 1, message = "account_number must not be empty"))]
    pub(crate) account_number: String,
    #[serde(default)]
    pub(crate) iban: Option<String>,
    #[serde(default)]
    #[serde(alias = "swiftCode")]
    pub(crate) swift_code: Option<String>,
    #[serde(default)]
    pub(crate) branch: Option<String>,
    #[serde(default)]
    pub(crate) currency: Option<String>,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
    #[serde(default)]
    #[serde(alias = "displayOrder")]
    pub(crate) display_order: i32,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BankAccountResponse {
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
}

impl BankAccountResponse {
    pub(crate) fn from_db(account: BankAccount) -> Self {
        Self {
            id: account.id,
            bank_name: account.bank_name,
            account_name: account.account_name,
            account_number: account.account_number,
            iban: account.iban,
            swift_code: account.swift_code,
            branch: account.branch,
            currency: account.currency,
            is_active: account.is_active,
            is_default: account.is_default,
            display_order: account.display_order,
            notes: account.notes,
        }
    }
}

fn default_true() -> bool {
    true
}
