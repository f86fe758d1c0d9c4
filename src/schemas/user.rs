use serde::{Deserialize, Serialize};
use time::Date;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[serde(alias = "firstName")]
    #[validate(length(min = 1, max = 50, message = "first_name must be 1-50 characters"))]
    pub(crate) first_name: String,
    #[serde(alias = "lastName")]
    #[validate(length(min = 1, max = 50, message = "last_name must be 1-50 characters"))]
    pub(crate) last_name: String,
    #[validate(
        email(message = "email must be a valid address"),
        length(max = 100, message = "email must be at most 100 characters")
    )]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub(crate) password: String,
    #[serde(default)]
    #[serde(alias = "acceptTerms")]
    pub(crate) accept_terms: bool,
    #[serde(default)]
    #[serde(alias = "acceptMarketing")]
    pub(crate) accept_marketing: bool,
}

impl RegisterRequest {
    /// Upper, lower, digit and a symbol, matching the signup form policy.
    pub(crate) fn password_strong_enough(&self) -> bool {
        let has_upper = self.password.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = self.password.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = self.password.chars().any(|c| c.is_ascii_digit());
        let has_symbol = self.password.chars().any(|c| !c.is_ascii_alphanumeric());
        has_upper && has_lower && has_digit && has_symbol
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileUpdateRequest {
    #[serde(default)]
    #[serde(alias = "firstName")]
    pub(crate) first_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "lastName")]
    pub(crate) last_name: Option<String>,
    #[serde(default)]
    pub(crate) phone: Option<String>,
    #[serde(default)]
    pub(crate) bio: Option<String>,
    #[serde(default)]
    pub(crate) country: Option<String>,
    #[serde(default)]
    pub(crate) city: Option<String>,
    #[serde(default)]
    #[serde(alias = "dateOfBirth")]
    pub(crate) date_of_birth: Option<Date>,
    #[serde(default)]
    #[serde(alias = "acceptMarketing")]
    pub(crate) accept_marketing: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) full_name: String,
    pub(crate) email: String,
    pub(crate) phone: Option<String>,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) bio: Option<String>,
    pub(crate) country: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) accept_marketing: bool,
    pub(crate) last_login_at: Option<String>,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        let full_name = user.full_name();
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            full_name,
            email: user.email,
            phone: user.phone,
            role: user.role,
            is_active: user.is_active,
            bio: user.bio,
            country: user.country,
            city: user.city,
            accept_marketing: user.accept_marketing,
            last_login_at: user.last_login_at.map(format_primitive),
            created_at: format_primitive(user.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) token_type: String,
    pub(crate) user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn request(password: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Salma".to_string(),
            last_name: "Hassan".to_string(),
            email: "salma@example.com".to_string(),
            phone: None,
            password: password.to_string(),
            accept_terms: true,
            accept_marketing: false,
        }
    }

    #[test]
    fn password_policy_requires_all_classes() {
        assert!(request("Str0ng!pass").password_strong_enough());
        assert!(!request("weakpassword").password_strong_enough());
        assert!(!request("NoDigits!!").password_strong_enough());
        assert!(!request("nodigit5!").password_strong_enough());
        assert!(!request("NOLOWER5!").password_strong_enough());
    }

    #[test]
    fn full_name_trims_for_single_name_users() {
        let now = primitive_now_utc();
        let user = User {
            id: "u1".to_string(),
            first_name: "Mona".to_string(),
            last_name: "".to_string(),
            email: "mona@example.com".to_string(),
            phone: None,
            hashed_password: "x".to_string(),
            role: UserRole::Student,
            is_active: true,
            is_deleted: false,
            accept_marketing: false,
            bio: None,
            country: None,
            city: None,
            date_of_birth: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(UserResponse::from_db(user).full_name, "Mona");
    }
}
