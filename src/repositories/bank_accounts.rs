use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::BankAccount;

const COLUMNS: &str = "\
    id, bank_name, account_name, account_number, iban, swift_code, branch, \
    currency, is_active, is_default, display_order, notes, created_at, updated_at";

pub(crate) async fn list_active(pool: &PgPool) -> Result<Vec<BankAccount>, sqlx::Error> {
    sqlx::query_as::<_, BankAccount>(&format!(
        "SELECT {COLUMNS} FROM bank_accounts
         WHERE is_active
         ORDER BY is_default DESC, display_order, id",
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<BankAccount>, sqlx::Error> {
    sqlx::query_as::<_, BankAccount>(&format!(
        "SELECT {COLUMNS} FROM bank_accounts ORDER BY is_default DESC, display_order, id",
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn find_default(pool: &PgPool) -> Result<Option<BankAccount>, sqlx::Error> {
    sqlx::query_as::<_, BankAccount>(&format!(
        "SELECT {COLUMNS} FROM bank_accounts
         WHERE is_active
         ORDER BY is_default DESC, display_order, id
         LIMIT 1",
    ))
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<BankAccount>, sqlx::Error> {
    sqlx::query_as::<_, BankAccount>(&format!("SELECT {COLUMNS} FROM bank_accounts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) struct BankAccountWrite<'a> {
    pub bank_name: &'a str,
    pub account_name: &'a str,
    pub account_number: &'a str,
    pub iban: Option<&'a str>,
    pub swift_code: Option<&'a str>,
    pub branch: Option<&'a str>,
    pub currency: &'a str,
    pub is_active: bool,
    pub display_order: i32,
    pub notes: Option<&'a str>,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: BankAccountWrite<'_>,
    now: PrimitiveDateTime,
) -> Result<BankAccount, sqlx::Error> {
    sqlx::query_as::<_, BankAccount>(&format!(
        "INSERT INTO bank_accounts (
            id, bank_name, account_name, account_number, iban, swift_code, branch,
            currency, is_active, is_default, display_order, notes, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,FALSE,$10,$11,$12,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(params.bank_name)
    .bind(params.account_name)
    .bind(params.account_number)
    .bind(params.iban)
    .bind(params.swift_code)
    .bind(params.branch)
    .bind(params.currency)
    .bind(params.is_active)
    .bind(params.display_order)
    .bind(params.notes)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: BankAccountWrite<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<BankAccount>, sqlx::Error> {
    sqlx::query_as::<_, BankAccount>(&format!(
        "UPDATE bank_accounts SET
            bank_name = $1, account_name = $2, account_number = $3, iban = $4,
            swift_code = $5, branch = $6, currency = $7, is_active = $8,
            display_order = $9, notes = $10, updated_at = $11
         WHERE id = $12
         RETURNING {COLUMNS}",
    ))
    .bind(params.bank_name)
    .bind(params.account_name)
    .bind(params.account_number)
    .bind(params.iban)
    .bind(params.swift_code)
    .bind(params.branch)
    .bind(params.currency)
    .bind(params.is_active)
    .bind(params.display_order)
    .bind(params.notes)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Clearing the old default and setting the new one happen in one
/// transaction: either both writes commit or neither does.
pub(crate) async fn set_default(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE bank_accounts SET is_default = FALSE, updated_at = $1 WHERE is_default")
        .bind(now)
        .execute(&mut *tx)
        .await?;

    let result =
        sqlx::query("UPDATE bank_accounts SET is_default = TRUE, updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Ok(false);
    }

    tx.commit().await?;
    Ok(true)
}
