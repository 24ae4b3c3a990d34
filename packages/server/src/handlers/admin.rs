use axum::{Json, extract::State};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{rating, recipe, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::admin::{StatsResponse, TotalResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/total-users",
    tag = "Admin",
    operation_id = "totalUsers",
    summary = "Count all accounts",
    responses(
        (status = 200, description = "Number of accounts", body = TotalResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn total_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TotalResponse>, AppError> {
    auth_user.require_admin()?;
    let total = user::Entity::find().count(&state.db).await?;
    Ok(Json(TotalResponse { total }))
}

#[utoipa::path(
    get,
    path = "/total-admins",
    tag = "Admin",
    operation_id = "totalAdmins",
    summary = "Count admin accounts",
    responses(
        (status = 200, description = "Number of admins", body = TotalResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn total_admins(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TotalResponse>, AppError> {
    auth_user.require_admin()?;
    let total = count_admins(&state.db).await?;
    Ok(Json(TotalResponse { total }))
}

#[utoipa::path(
    get,
    path = "/total-recipes",
    tag = "Admin",
    operation_id = "totalRecipes",
    summary = "Count all recipes",
    responses(
        (status = 200, description = "Number of recipes", body = TotalResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn total_recipes(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TotalResponse>, AppError> {
    auth_user.require_admin()?;
    let total = recipe::Entity::find().count(&state.db).await?;
    Ok(Json(TotalResponse { total }))
}

#[utoipa::path(
    get,
    path = "/stats",
    tag = "Admin",
    operation_id = "stats",
    summary = "All aggregate counts",
    responses(
        (status = 200, description = "Aggregate counts", body = StatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    auth_user.require_admin()?;

    Ok(Json(StatsResponse {
        users: user::Entity::find().count(&state.db).await?,
        admins: count_admins(&state.db).await?,
        recipes: recipe::Entity::find().count(&state.db).await?,
        ratings: rating::Entity::find().count(&state.db).await?,
    }))
}

async fn count_admins<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
    user::Entity::find()
        .filter(user::Column::IsAdmin.eq(true))
        .count(db)
        .await
}
