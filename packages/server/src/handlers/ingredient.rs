use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::Func;
use sea_orm::*;
use tracing::instrument;

use crate::entity::ingredient;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::ingredient::*;
use crate::state::AppState;
use crate::utils::recipe::{find_recipe, recipe_ingredients};

#[utoipa::path(
    get,
    path = "/",
    tag = "Ingredients",
    operation_id = "listIngredients",
    summary = "List ingredients",
    description = "Returns every ingredient ordered by name, optionally restricted to one category.",
    params(IngredientListQuery),
    responses(
        (status = 200, description = "Ingredients", body = Vec<IngredientResponse>),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientListQuery>,
) -> Result<Json<Vec<IngredientResponse>>, AppError> {
    let mut select = ingredient::Entity::find();

    if let Some(category) = query.category.as_deref().map(str::trim)
        && !category.is_empty()
    {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(ingredient::Column::Category)))
                .eq(category.to_lowercase()),
        );
    }

    let data = select
        .order_by_asc(ingredient::Column::Name)
        .all(&state.db)
        .await?
        .into_iter()
        .map(IngredientResponse::from)
        .collect();

    Ok(Json(data))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Ingredients",
    operation_id = "createIngredient",
    summary = "Add an ingredient",
    description = "Adds reference data. Admin only.",
    request_body = CreateIngredientRequest,
    responses(
        (status = 201, description = "Ingredient created", body = IngredientResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 409, description = "Name already exists (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_ingredient(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateIngredientRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_admin()?;
    validate_create_ingredient(&payload)?;

    let new_ingredient = ingredient::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        category: Set(payload.category.trim().to_string()),
        is_allergen: Set(payload.is_allergen),
        nutrition_info: Set(payload.nutrition_info.map(|n| n.trim().to_string())),
        ..Default::default()
    };

    let model = new_ingredient
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("An ingredient with this name already exists".into())
            }
            _ => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(IngredientResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{recipe_id}/ingredients",
    tag = "Ingredients",
    operation_id = "listRecipeIngredients",
    summary = "Ingredient lines of a recipe",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Ingredient lines", body = Vec<RecipeIngredientResponse>),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(recipe_id))]
pub async fn list_recipe_ingredients(
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<Vec<RecipeIngredientResponse>>, AppError> {
    find_recipe(&state.db, recipe_id).await?;
    recipe_ingredients(&state.db, recipe_id).await.map(Json)
}
