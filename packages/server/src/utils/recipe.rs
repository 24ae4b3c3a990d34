use sea_orm::prelude::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::*;

use common::average_score;

use crate::entity::{ingredient, rating, recipe, recipe_ingredient, user};
use crate::error::AppError;
use crate::models::recipe::{RecipeDetailResponse, RecipeIngredientResponse};

/// Look up a recipe by ID, returning 404 if not found.
pub async fn find_recipe<C: ConnectionTrait>(db: &C, id: i32) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

/// Look up a recipe and lock its row until the transaction ends.
pub async fn find_recipe_for_update(
    txn: &DatabaseTransaction,
    id: i32,
) -> Result<recipe::Model, AppError> {
    recipe::Entity::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe not found".into()))
}

/// Ingredient lines of a recipe, ordered by ingredient name.
pub async fn recipe_ingredients<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
) -> Result<Vec<RecipeIngredientResponse>, AppError> {
    let rows = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .find_also_related(ingredient::Entity)
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(line, ing)| ing.map(|ing| RecipeIngredientResponse::new(line, ing)))
        .collect())
}

/// Full recipe view: the row, its author and its ingredient lines.
pub async fn recipe_detail<C: ConnectionTrait>(
    db: &C,
    recipe: recipe::Model,
) -> Result<RecipeDetailResponse, AppError> {
    let author = user::Entity::find_by_id(recipe.user_id).one(db).await?;
    let ingredients = recipe_ingredients(db, recipe.id).await?;
    Ok(RecipeDetailResponse::new(recipe, author, ingredients))
}

/// Recompute the cached average rating of a recipe from every stored score.
///
/// Returns the new average (`None` when the recipe has no ratings left) and
/// the number of ratings it was computed from.
pub async fn recompute_average_rating<C: ConnectionTrait>(
    db: &C,
    recipe_id: i32,
) -> Result<(Option<f64>, u64), AppError> {
    let scores: Vec<i32> = rating::Entity::find()
        .filter(rating::Column::RecipeId.eq(recipe_id))
        .select_only()
        .column(rating::Column::Score)
        .into_tuple::<i32>()
        .all(db)
        .await?;

    let average = average_score(&scores);

    recipe::Entity::update_many()
        .col_expr(recipe::Column::AverageRating, Expr::value(average))
        .filter(recipe::Column::Id.eq(recipe_id))
        .exec(db)
        .await?;

    tracing::debug!(recipe_id, count = scores.len(), ?average, "Recomputed average rating");
    Ok((average, scores.len() as u64))
}
