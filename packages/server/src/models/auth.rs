use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::validate_length;
use crate::entity::user;
use crate::error::AppError;

/// Request body for account signup.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    #[schema(example = "julia@example.com")]
    pub email: String,
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "julia_c")]
    pub username: String,
    /// Defaults to the username when omitted.
    #[schema(example = "Julia Child")]
    pub display_name: Option<String>,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = email.chars().count() <= 254
        && !email.contains(char::is_whitespace)
        && matches!(email.split_once('@'), Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@'));
    if !valid {
        return Err(AppError::Validation("Email address is invalid".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_signup_request(payload: &SignupRequest) -> Result<(), AppError> {
    validate_email(&payload.email)?;
    validate_username(&payload.username)?;
    if let Some(ref display_name) = payload.display_name {
        validate_length("Display name", display_name, 1, 64)?;
    }
    validate_password(&payload.password)
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username or email of the account.
    #[schema(example = "julia_c")]
    pub username: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::Validation("Username must not be empty".into()));
    }
    if payload.password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".into()));
    }
    Ok(())
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub fn validate_change_password_request(payload: &ChangePasswordRequest) -> Result<(), AppError> {
    if payload.current_password.is_empty() {
        return Err(AppError::Validation(
            "Current password must not be empty".into(),
        ));
    }
    validate_password(&payload.new_password)
}

/// Public view of an account. Never carries the password hash.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserResponse {
    #[schema(example = 42)]
    pub id: i32,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            display_name: user.display_name,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Successful login response.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

/// Row counts removed by an account deletion.
#[derive(Serialize, Deserialize, Default, utoipa::ToSchema)]
pub struct AccountDeletionSummary {
    pub user_id: i32,
    pub profiles: u64,
    pub saved_recipes: u64,
    pub recipes: u64,
    pub ratings: u64,
}
