use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use common::{RecipeSortField, SortOrder};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, NullOrdering};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{ingredient, rating, recipe, recipe_ingredient, saved_recipe};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::recipe::*;
use crate::state::AppState;
use crate::utils::recipe::{find_recipe, find_recipe_for_update, recipe_detail};
use crate::utils::user::find_user;

#[utoipa::path(
    post,
    path = "/",
    tag = "Recipes",
    operation_id = "createRecipe",
    summary = "Create a recipe",
    description = "Creates a recipe and its ingredient lines atomically. If any line cannot be stored the recipe is not created either.",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeDetailResponse),
        (status = 400, description = "Validation error or unknown ingredient (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRecipeRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_recipe(&payload)?;

    let txn = state.db.begin().await?;
    find_user(&txn, auth_user.user_id).await?;

    let now = chrono::Utc::now();
    let new_recipe = recipe::ActiveModel {
        user_id: Set(auth_user.user_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description.trim().to_string()),
        instructions: Set(payload.instructions),
        time_to_make: Set(payload.time_to_make),
        is_approved: Set(false),
        average_rating: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let model = new_recipe.insert(&txn).await?;

    if let Err(e) = insert_ingredient_lines(&txn, model.id, &payload.ingredients).await {
        tracing::warn!(recipe_id = model.id, "Ingredient lines failed, rolling back recipe");
        txn.rollback().await?;
        return Err(e);
    }

    let detail = recipe_detail(&txn, model).await?;
    txn.commit().await?;

    tracing::info!(recipe_id = detail.id, lines = detail.ingredients.len(), "Recipe created");
    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Recipes",
    operation_id = "listRecipes",
    summary = "List recipes with pagination and search",
    description = "Supports case-insensitive name search, approval and author filters, and sorting by `created_at` (default, desc), `name`, `average_rating` or `time_to_make`. Unrated recipes sort last.",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "List of recipes", body = RecipeListResponse),
        (status = 400, description = "Invalid sort option or page (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<RecipeListResponse>, AppError> {
    let (sort_by, sort_order) = query.sort()?;
    let PageWindow {
        page,
        per_page,
        offset,
    } = query.window()?;

    let mut select = recipe::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(recipe::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }
    if let Some(approved) = query.approved {
        select = select.filter(recipe::Column::IsApproved.eq(approved));
    }
    if let Some(user_id) = query.user_id {
        select = select.filter(recipe::Column::UserId.eq(user_id));
    }

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let total_pages = total.div_ceil(per_page);

    let sort_column = match sort_by {
        RecipeSortField::CreatedAt => recipe::Column::CreatedAt,
        RecipeSortField::Name => recipe::Column::Name,
        RecipeSortField::AverageRating => recipe::Column::AverageRating,
        RecipeSortField::TimeToMake => recipe::Column::TimeToMake,
    };
    let order = match sort_order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    };

    let data = select
        .order_by_with_nulls(sort_column, order.clone(), NullOrdering::Last)
        .order_by(recipe::Column::Id, order)
        .select_only()
        .column(recipe::Column::Id)
        .column(recipe::Column::UserId)
        .column(recipe::Column::Name)
        .column(recipe::Column::Description)
        .column(recipe::Column::TimeToMake)
        .column(recipe::Column::IsApproved)
        .column(recipe::Column::AverageRating)
        .column(recipe::Column::CreatedAt)
        .offset(Some(offset))
        .limit(Some(per_page))
        .into_model::<RecipeListItem>()
        .all(&state.db)
        .await?;

    Ok(Json(RecipeListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{recipe_id}",
    tag = "Recipes",
    operation_id = "getRecipe",
    summary = "Get a recipe by ID",
    description = "Returns the recipe with its author and ingredient lines.",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Recipe details", body = RecipeDetailResponse),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(recipe_id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let model = find_recipe(&state.db, recipe_id).await?;
    recipe_detail(&state.db, model).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{recipe_id}",
    tag = "Recipes",
    operation_id = "deleteRecipe",
    summary = "Delete a recipe",
    description = "Deletes the recipe with its ingredient lines, ratings and saves. Allowed for the author and for admins.",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(recipe_id))]
pub async fn delete_recipe(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let model = find_recipe_for_update(&txn, recipe_id).await?;
    auth_user.require_self_or_admin(model.user_id)?;

    saved_recipe::Entity::delete_many()
        .filter(saved_recipe::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    rating::Entity::delete_many()
        .filter(rating::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    recipe::Entity::delete_by_id(recipe_id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/{recipe_id}/approval",
    tag = "Recipes",
    operation_id = "setRecipeApproval",
    summary = "Approve or unapprove a recipe",
    description = "Admin only.",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Approval updated", body = RecipeDetailResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(recipe_id))]
pub async fn set_approval(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
    AppJson(payload): AppJson<ApprovalRequest>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    auth_user.require_admin()?;

    let existing = find_recipe(&state.db, recipe_id).await?;
    let mut active: recipe::ActiveModel = existing.into();
    active.is_approved = Set(payload.approved);
    active.updated_at = Set(chrono::Utc::now());
    let model = active.update(&state.db).await?;

    tracing::info!(recipe_id, approved = payload.approved, "Recipe approval changed");
    recipe_detail(&state.db, model).await.map(Json)
}

/// Store the ingredient lines of a freshly inserted recipe.
///
/// Fails with a validation error when a line points at an unknown ingredient.
async fn insert_ingredient_lines(
    txn: &DatabaseTransaction,
    recipe_id: i32,
    lines: &[IngredientLine],
) -> Result<(), AppError> {
    if lines.is_empty() {
        return Ok(());
    }

    let ids: Vec<i32> = lines.iter().map(|l| l.ingredient_id).collect();
    let known: HashSet<i32> = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ids.clone()))
        .select_only()
        .column(ingredient::Column::Id)
        .into_tuple::<i32>()
        .all(txn)
        .await?
        .into_iter()
        .collect();

    let unknown: Vec<i32> = ids.into_iter().filter(|id| !known.contains(id)).collect();
    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "Unknown ingredient IDs: {unknown:?}"
        )));
    }

    let models = lines.iter().map(|line| recipe_ingredient::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(line.ingredient_id),
        quantity: Set(line.quantity.trim().to_string()),
    });

    recipe_ingredient::Entity::insert_many(models)
        .exec_without_returning(txn)
        .await?;

    Ok(())
}
