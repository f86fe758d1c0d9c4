use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::bank::{BankAccountResponse, BankAccountWriteRequest};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_account).get(list_accounts))
        .route("/:account_id", put(update_account).get(get_account))
        .route("/:account_id/default", post(set_default))
}

async fn create_account(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<BankAccountWriteRequest>,
) -> Result<(StatusCode, Json<BankAccountResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let currency =
        payload.currency.clone().unwrap_or_else(|| state.settings().payments().currency.clone());

    let account = repositories::bank_accounts::create(
        state.db(),
        repositories::bank_accounts::BankAccountWrite {
            bank_name: &payload.bank_name,
            account_name: &payload.account_name,
            account_number: &payload.account_number,
            iban: payload.iban.as_deref(),
            swift_code: payload.swift_code.as_deref(),
            branch: payload.branch.as_deref(),
            currency: &currency,
            is_active: payload.is_active,
            display_order: payload.display_order,
            notes: payload.notes.as_deref(),
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create bank account"))?;

    tracing::info!(
        admin_id = %admin.id,
        account_id = %account.id,
        action = "bank_account_create",
        "Bank account created"
    );

    Ok((StatusCode::CREATED, Json(BankAccountResponse::from_db(account))))
}

async fn list_accounts(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<BankAccountResponse>>, ApiError> {
    let accounts = repositories::bank_accounts::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list bank accounts"))?;

    Ok(Json(accounts.into_iter().map(BankAccountResponse::from_db).collect()))
}

async fn get_account(
    Path(account_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<BankAccountResponse>, ApiError> {
    let account = repositories::bank_accounts::find_by_id(state.db(), &account_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch bank account"))?
        .ok_or_else(|| ApiError::NotFound("Bank account not found".to_string()))?;

    Ok(Json(BankAccountResponse::from_db(account)))
}

async fn update_account(
    Path(account_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<BankAccountWriteRequest>,
) -> Result<Json<BankAccountResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let currency =
        payload.currency.clone().unwrap_or_else(|| state.settings().payments().currency.clone());

    let updated = repositories::bank_accounts::update(
        state.db(),
        &account_id,
        repositories::bank_accounts::BankAccountWrite {
            bank_name: &payload.bank_name,
            account_name: &payload.account_name,
            account_number: &payload.account_number,
            iban: payload.iban.as_deref(),
            swift_code: payload.swift_code.as_deref(),
            branch: payload.branch.as_deref(),
            currency: &currency,
            is_active: payload.is_active,
            display_order: payload.display_order,
            notes: payload.notes.as_deref(),
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update bank account"))?
    .ok_or_else(|| ApiError::NotFound("Bank account not found".to_string()))?;

    Ok(Json(BankAccountResponse::from_db(updated)))
}

/// Atomic default switch: every other default is cleared in the same
/// transaction that sets the new one.
async fn set_default(
    Path(account_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<BankAccountResponse>, ApiError> {
    let switched =
        repositories::bank_accounts::set_default(state.db(), &account_id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to set default bank account"))?;

    if !switched {
        return Err(ApiError::NotFound("Bank account not found".to_string()));
    }

    tracing::info!(
        admin_id = %admin.id,
        account_id = %account_id,
        action = "bank_account_set_default",
        "Default bank account changed"
    );

    let account = repositories::bank_accounts::find_by_id(state.db(), &account_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch bank account"))?
        .ok_or_else(|| ApiError::NotFound("Bank account not found".to_string()))?;

    Ok(Json(BankAccountResponse::from_db(account)))
}
