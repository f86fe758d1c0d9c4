use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    id, first_name, last_name, email, phone, hashed_password, role, \
    is_active, is_deleted, accept_marketing, bio, country, city, \
    date_of_birth, last_login_at, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE id = $1 AND NOT is_deleted"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1) AND NOT is_deleted"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn exists_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM users WHERE lower(email) = lower($1) AND NOT is_deleted",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub hashed_password: String,
    pub role: UserRole,
    pub accept_marketing: bool,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, first_name, last_name, email, phone, hashed_password, role,
            is_active, is_deleted, accept_marketing, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,TRUE,FALSE,$8,$9,$10)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.accept_marketing)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub date_of_birth: Option<time::Date>,
    pub accept_marketing: Option<bool>,
    pub updated_at: PrimitiveDateTime,
}

/// Partial update; absent fields keep their stored values.
pub(crate) async fn update_profile(
    pool: &PgPool,
    id: &str,
    params: ProfileUpdate,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            phone = COALESCE($3, phone),
            bio = COALESCE($4, bio),
            country = COALESCE($5, country),
            city = COALESCE($6, city),
            date_of_birth = COALESCE($7, date_of_birth),
            accept_marketing = COALESCE($8, accept_marketing),
            updated_at = $9
         WHERE id = $10 AND NOT is_deleted",
    )
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(params.phone)
    .bind(params.bio)
    .bind(params.country)
    .bind(params.city)
    .bind(params.date_of_birth)
    .bind(params.accept_marketing)
    .bind(params.updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn mark_login(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = $1, updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn promote_admin(
    pool: &PgPool,
    id: &str,
    hashed_password: String,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            hashed_password = $1,
            role = $2,
            is_active = TRUE,
            updated_at = $3
         WHERE id = $4",
    )
    .bind(hashed_password)
    .bind(UserRole::Admin)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}
