use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::{ProfileUpdateRequest, UserResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).patch(update_profile))
}

async fn get_profile(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn update_profile(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let now = primitive_now_utc();

    repositories::users::update_profile(
        state.db(),
        &user.id,
        repositories::users::ProfileUpdate {
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            bio: payload.bio,
            country: payload.country,
            city: payload.city,
            date_of_birth: payload.date_of_birth,
            accept_marketing: payload.accept_marketing,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update profile"))?;

    let updated = repositories::users::fetch_one_by_id(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated profile"))?;

    Ok(Json(UserResponse::from_db(updated)))
}
