use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{profile, rating, recipe, recipe_ingredient, saved_recipe, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::auth::*;
use crate::state::AppState;
use crate::utils::recipe::{find_recipe_for_update, recompute_average_rating};
use crate::utils::user::find_user;
use crate::utils::{jwt, password};

#[utoipa::path(
    post,
    path = "/signup",
    tag = "Auth",
    operation_id = "signup",
    summary = "Create an account",
    description = "Registers a new user. The password is stored as an Argon2 hash.",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username or email in use (USERNAME_TAKEN, EMAIL_TAKEN)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_signup_request(&payload)?;

    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let display_name = payload
        .display_name
        .map(|d| d.trim().to_string())
        .unwrap_or_else(|| username.clone());

    if let Some(err) = taken_account_field(&state.db, &username, &email).await? {
        return Err(err);
    }

    let hash = password::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let new_user = user::ActiveModel {
        email: Set(email.clone()),
        username: Set(username.clone()),
        display_name: Set(display_name),
        password: Set(hash),
        is_admin: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let user = match new_user.insert(&state.db).await {
        Ok(user) => user,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            tracing::debug!("Signup race condition: unique constraint caught on insert");
            // The winning row is committed by now, so the lookup names the field.
            return Err(taken_account_field(&state.db, &username, &email)
                .await?
                .unwrap_or(AppError::UsernameTaken));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, "Account created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    description = "Exchanges a username (or email) and password for a bearer token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Bad credentials (INVALID_CREDENTIALS)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&payload)?;

    let login = payload.username.trim();

    let user = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(login))
                .add(user::Column::Email.eq(login.to_lowercase())),
        )
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = password::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let signed = jwt::sign(
        user.id,
        &user.username,
        user.is_admin,
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token: signed.token,
        expires_at: signed.expires_at,
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current account",
    responses(
        (status = 200, description = "The authenticated account", body = UserResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Account no longer exists (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state.db, auth_user.user_id).await?;
    Ok(Json(user.into()))
}

#[utoipa::path(
    put,
    path = "/user/{user_id}/password",
    tag = "Auth",
    operation_id = "changePassword",
    summary = "Change password",
    description = "Only the account owner may change the password, and must supply the current one.",
    params(("user_id" = i32, Path, description = "User ID")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong current password (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Not the account owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id))]
pub async fn change_password(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if auth_user.user_id != user_id {
        return Err(AppError::PermissionDenied);
    }
    validate_change_password_request(&payload)?;

    let user = find_user(&state.db, user_id).await?;
    let is_valid = password::verify_password(&payload.current_password, &user.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }

    let hash = password::hash_password(&payload.new_password)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let mut active: user::ActiveModel = user.into();
    active.password = Set(hash);
    active.update(&state.db).await?;

    tracing::info!(user_id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/user/{user_id}",
    tag = "Auth",
    operation_id = "deleteAccount",
    summary = "Delete an account",
    description = "Deletes the account with its profile, saved recipes, recipes and ratings in one transaction. Allowed for the owner and for admins.",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deleted", body = AccountDeletionSummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id))]
pub async fn delete_account(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<AccountDeletionSummary>, AppError> {
    auth_user.require_self_or_admin(user_id)?;

    let txn = state.db.begin().await?;
    find_user(&txn, user_id).await?;

    let summary = delete_account_rows(&txn, user_id).await?;

    txn.commit().await?;
    tracing::info!(
        user_id,
        deleted_by = auth_user.user_id,
        recipes = summary.recipes,
        ratings = summary.ratings,
        "Account deleted"
    );
    Ok(Json(summary))
}

/// Remove a user and every row that depends on it. Runs inside the caller's
/// transaction; nothing is visible to other connections until it commits.
async fn delete_account_rows(
    txn: &DatabaseTransaction,
    user_id: i32,
) -> Result<AccountDeletionSummary, AppError> {
    let mut summary = AccountDeletionSummary {
        user_id,
        ..Default::default()
    };

    summary.profiles = profile::Entity::delete_many()
        .filter(profile::Column::UserId.eq(user_id))
        .exec(txn)
        .await?
        .rows_affected;
    tracing::debug!(user_id, rows = summary.profiles, "Deleted profile");

    summary.saved_recipes = saved_recipe::Entity::delete_many()
        .filter(saved_recipe::Column::UserId.eq(user_id))
        .exec(txn)
        .await?
        .rows_affected;
    tracing::debug!(user_id, rows = summary.saved_recipes, "Deleted saved recipes");

    let owned: Vec<i32> = recipe::Entity::find()
        .filter(recipe::Column::UserId.eq(user_id))
        .select_only()
        .column(recipe::Column::Id)
        .into_tuple::<i32>()
        .all(txn)
        .await?;

    if !owned.is_empty() {
        let saves = saved_recipe::Entity::delete_many()
            .filter(saved_recipe::Column::RecipeId.is_in(owned.clone()))
            .exec(txn)
            .await?
            .rows_affected;
        let ratings = rating::Entity::delete_many()
            .filter(rating::Column::RecipeId.is_in(owned.clone()))
            .exec(txn)
            .await?
            .rows_affected;
        let lines = recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.is_in(owned.clone()))
            .exec(txn)
            .await?
            .rows_affected;
        tracing::debug!(user_id, saves, ratings, lines, "Deleted rows of owned recipes");
    }

    summary.recipes = recipe::Entity::delete_many()
        .filter(recipe::Column::UserId.eq(user_id))
        .exec(txn)
        .await?
        .rows_affected;
    tracing::debug!(user_id, rows = summary.recipes, "Deleted recipes");

    // Ratings left on other people's recipes: their averages must be recomputed.
    let mut rated: Vec<i32> = rating::Entity::find()
        .filter(rating::Column::UserId.eq(user_id))
        .select_only()
        .column(rating::Column::RecipeId)
        .into_tuple::<i32>()
        .all(txn)
        .await?;
    rated.sort_unstable();

    for &recipe_id in &rated {
        find_recipe_for_update(txn, recipe_id).await?;
    }
    summary.ratings = rating::Entity::delete_many()
        .filter(rating::Column::UserId.eq(user_id))
        .exec(txn)
        .await?
        .rows_affected;
    for &recipe_id in &rated {
        recompute_average_rating(txn, recipe_id).await?;
    }
    tracing::debug!(user_id, rows = summary.ratings, "Deleted ratings");

    user::Entity::delete_by_id(user_id).exec(txn).await?;

    Ok(summary)
}

/// The error for whichever unique account field is already in use, if any.
async fn taken_account_field<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
) -> Result<Option<AppError>, AppError> {
    let taken = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(username))
                .add(user::Column::Email.eq(email)),
        )
        .one(db)
        .await?;
    Ok(taken.map(|existing| {
        if existing.username == username {
            AppError::UsernameTaken
        } else {
            AppError::EmailTaken
        }
    }))
}
