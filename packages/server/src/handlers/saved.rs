use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{recipe, saved_recipe};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::saved::*;
use crate::state::AppState;
use crate::utils::recipe::{find_recipe, recipe_detail};
use crate::utils::user::find_user;

#[utoipa::path(
    post,
    path = "/{recipe_id}/save",
    tag = "Saved Recipes",
    operation_id = "saveRecipe",
    summary = "Save a recipe",
    description = "Bookmarks the recipe for the caller. A recipe can be saved once per user.",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 201, description = "Recipe saved", body = SaveResponse),
        (status = 400, description = "Already saved (DUPLICATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(recipe_id, user_id = auth_user.user_id))]
pub async fn save_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    find_recipe(&txn, recipe_id).await?;
    find_user(&txn, auth_user.user_id).await?;

    if saved_recipe::Entity::find_by_id((auth_user.user_id, recipe_id))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate("Recipe is already saved".into()));
    }

    let new_save = saved_recipe::ActiveModel {
        user_id: Set(auth_user.user_id),
        recipe_id: Set(recipe_id),
        saved_at: Set(chrono::Utc::now()),
    };

    match new_save.insert(&txn).await {
        Ok(model) => {
            txn.commit().await?;
            Ok((StatusCode::CREATED, Json(SaveResponse::from(model))))
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Err(AppError::Duplicate("Recipe is already saved".into()))
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    delete,
    path = "/{recipe_id}/save",
    tag = "Saved Recipes",
    operation_id = "unsaveRecipe",
    summary = "Remove a saved recipe",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Save removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not saved (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(recipe_id, user_id = auth_user.user_id))]
pub async fn unsave_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let result = saved_recipe::Entity::delete_by_id((auth_user.user_id, recipe_id))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Recipe is not saved".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Saved Recipes",
    operation_id = "listSavedRecipes",
    summary = "List the caller's saved recipes",
    description = "Most recently saved first, each with full recipe detail.",
    responses(
        (status = 200, description = "Saved recipes", body = Vec<SavedRecipeResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_saved_recipes(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<SavedRecipeResponse>>, AppError> {
    let rows = saved_recipe::Entity::find()
        .filter(saved_recipe::Column::UserId.eq(auth_user.user_id))
        .find_also_related(recipe::Entity)
        .order_by_desc(saved_recipe::Column::SavedAt)
        .all(&state.db)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for (save, recipe) in rows {
        let Some(recipe) = recipe else { continue };
        items.push(SavedRecipeResponse {
            saved_at: save.saved_at,
            recipe: recipe_detail(&state.db, recipe).await?,
        });
    }

    Ok(Json(items))
}
