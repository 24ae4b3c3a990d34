use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{RecipeSortField, SortOrder};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

pub use super::ingredient::RecipeIngredientResponse;
pub use super::shared::{Pagination, escape_like};
use super::shared::validate_length;
use crate::entity::{recipe, user};
use crate::error::AppError;

/// Maximum ingredient lines accepted on a single recipe.
pub const MAX_INGREDIENT_LINES: usize = 100;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct IngredientLine {
    pub ingredient_id: i32,
    #[schema(example = "200 g")]
    pub quantity: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    #[schema(example = "Boeuf Bourguignon")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub instructions: String,
    /// Minutes from start to table.
    #[schema(example = 180)]
    pub time_to_make: i32,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
}

pub fn validate_create_recipe(payload: &CreateRecipeRequest) -> Result<(), AppError> {
    validate_length("Name", &payload.name, 1, 200)?;
    validate_length("Description", &payload.description, 0, 2000)?;
    validate_length("Instructions", &payload.instructions, 1, 20_000)?;
    if payload.time_to_make < 0 {
        return Err(AppError::Validation("Time to make must be >= 0".into()));
    }
    if payload.ingredients.len() > MAX_INGREDIENT_LINES {
        return Err(AppError::Validation(format!(
            "Too many ingredients: max {MAX_INGREDIENT_LINES}"
        )));
    }
    let mut seen = HashSet::new();
    for line in &payload.ingredients {
        validate_length("Quantity", &line.quantity, 1, 100)?;
        if !seen.insert(line.ingredient_id) {
            return Err(AppError::Validation(format!(
                "Duplicate ingredient {} in recipe",
                line.ingredient_id
            )));
        }
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct RecipeListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive substring match on the recipe name.
    pub search: Option<String>,
    pub approved: Option<bool>,
    /// Only recipes authored by this user.
    pub user_id: Option<i32>,
    /// One of `created_at`, `name`, `average_rating`, `time_to_make`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

/// Page window of a recipe listing.
#[derive(Debug, PartialEq)]
pub struct PageWindow {
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl RecipeListQuery {
    /// Page defaults to 1, `per_page` to 20 (clamped to 1..=100). Rejects pages
    /// whose row offset does not fit a database integer.
    pub fn window(&self) -> Result<PageWindow, AppError> {
        let page = Ord::max(self.page.unwrap_or(1), 1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1)
            .checked_mul(per_page)
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| AppError::Validation(format!("Page {page} is out of range")))?;
        Ok(PageWindow {
            page,
            per_page,
            offset,
        })
    }

    pub fn sort(&self) -> Result<(RecipeSortField, SortOrder), AppError> {
        let field = match self.sort_by.as_deref() {
            Some(s) => s
                .parse()
                .map_err(|e| AppError::Validation(format!("sort_by: {e}")))?,
            None => RecipeSortField::default(),
        };
        let order = match self.sort_order.as_deref() {
            Some(s) => s
                .parse()
                .map_err(|e| AppError::Validation(format!("sort_order: {e}")))?,
            None => SortOrder::default(),
        };
        Ok((field, order))
    }
}

#[derive(Serialize, Deserialize, FromQueryResult, utoipa::ToSchema)]
pub struct RecipeListItem {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: String,
    pub time_to_make: i32,
    pub is_approved: bool,
    pub average_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecipeListResponse {
    pub data: Vec<RecipeListItem>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecipeDetailResponse {
    pub id: i32,
    pub user_id: i32,
    /// `None` only if the author row vanished mid-request.
    pub author_username: Option<String>,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub time_to_make: i32,
    pub is_approved: bool,
    pub average_rating: Option<f64>,
    pub ingredients: Vec<RecipeIngredientResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecipeDetailResponse {
    pub fn new(
        recipe: recipe::Model,
        author: Option<user::Model>,
        ingredients: Vec<RecipeIngredientResponse>,
    ) -> Self {
        Self {
            id: recipe.id,
            user_id: recipe.user_id,
            author_username: author.map(|u| u.username),
            name: recipe.name,
            description: recipe.description,
            instructions: recipe.instructions,
            time_to_make: recipe.time_to_make,
            is_approved: recipe.is_approved,
            average_rating: recipe.average_rating,
            ingredients,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ApprovalRequest {
    pub approved: bool,
}
