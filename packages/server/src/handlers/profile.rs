use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{profile, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::profile::*;
use crate::models::shared::normalize_optional;
use crate::state::AppState;
use crate::utils::user::find_user;

#[utoipa::path(
    get,
    path = "/",
    tag = "Profiles",
    operation_id = "getOwnProfile",
    summary = "Get the caller's profile",
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No profile yet (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_own_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    load_profile(&state.db, auth_user.user_id).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/{user_id}",
    tag = "Profiles",
    operation_id = "getProfile",
    summary = "Get a user's profile",
    params(("user_id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "User or profile not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(user_id))]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<ProfileResponse>, AppError> {
    load_profile(&state.db, user_id).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Profiles",
    operation_id = "createProfile",
    summary = "Create the caller's profile",
    request_body = ProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 409, description = "Profile already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_profile_request(&payload)?;

    let txn = state.db.begin().await?;
    let user = find_user(&txn, auth_user.user_id).await?;

    if profile::Entity::find_by_id(user.id).one(&txn).await?.is_some() {
        return Err(AppError::Conflict("Profile already exists".into()));
    }

    // A concurrent create can still win the insert; the primary key decides.
    let blank = blank_profile(user.id)
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Profile already exists".into())
            }
            _ => AppError::from(e),
        })?;

    let (profile, user) = write_profile(&txn, user, blank, true, payload).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(ProfileResponse::new(profile, user))))
}

#[utoipa::path(
    put,
    path = "/",
    tag = "Profiles",
    operation_id = "upsertProfile",
    summary = "Create or update the caller's profile",
    description = "Creates the profile on first use. Absent fields are unchanged; `null` clears a field.",
    request_body = ProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = ProfileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn upsert_profile(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate_profile_request(&payload)?;

    let txn = state.db.begin().await?;
    let user = find_user(&txn, auth_user.user_id).await?;

    // Make sure the row exists so the lock below serializes concurrent first writes.
    let inserted = profile::Entity::insert(blank_profile(user.id))
        .on_conflict(
            OnConflict::column(profile::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    let existing = profile::Entity::find_by_id(user.id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

    let (profile, user) = write_profile(&txn, user, existing, inserted > 0, payload).await?;
    txn.commit().await?;

    Ok(Json(ProfileResponse::new(profile, user)))
}

async fn load_profile<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<ProfileResponse, AppError> {
    let (profile, user) = profile::Entity::find_by_id(user_id)
        .find_also_related(user::Entity)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;
    let user = user.ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(ProfileResponse::new(profile, user))
}

fn blank_profile(user_id: i32) -> profile::ActiveModel {
    profile::ActiveModel {
        user_id: Set(user_id),
        bio: Set(None),
        pronouns: Set(None),
        image_url: Set(None),
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
}

/// Apply the request to an existing profile row, and the display name to the user row.
async fn write_profile(
    txn: &DatabaseTransaction,
    user: user::Model,
    existing: profile::Model,
    created: bool,
    payload: ProfileRequest,
) -> Result<(profile::Model, user::Model), AppError> {
    let mut active: profile::ActiveModel = existing.into();

    if let Some(bio) = payload.bio {
        active.bio = Set(normalize_optional(bio));
    }
    if let Some(pronouns) = payload.pronouns {
        active.pronouns = Set(normalize_optional(pronouns));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(normalize_optional(image_url));
    }
    active.updated_at = Set(chrono::Utc::now());

    let profile = active.update(txn).await?;

    let user = match payload.display_name {
        Some(display_name) => {
            let mut active_user: user::ActiveModel = user.into();
            active_user.display_name = Set(display_name.trim().to_string());
            active_user.update(txn).await?
        }
        None => user,
    };

    tracing::debug!(user_id = user.id, created, "Profile written");
    Ok((profile, user))
}
