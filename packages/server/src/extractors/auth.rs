use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication.
/// Role checks happen via `require_admin()` / `require_self_or_admin()` in the handler body.
///
/// The admin flag is read from the user row, not the token, so demoted or
/// deleted accounts lose their rights before the token expires.
#[derive(Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    /// Passes for the owner of `user_id` and for admins.
    pub fn require_self_or_admin(&self, user_id: i32) -> Result<(), AppError> {
        if self.user_id == user_id || self.is_admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims =
            jwt::verify(token, &state.config.auth.jwt_secret).map_err(|_| AppError::TokenInvalid)?;

        let user = user::Entity::find_by_id(claims.uid)
            .one(&state.db)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        Ok(AuthUser {
            user_id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        })
    }
}
