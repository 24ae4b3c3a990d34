use serde::{Deserialize, Serialize};

use super::shared::validate_length;
use crate::entity::{ingredient, recipe_ingredient};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateIngredientRequest {
    #[schema(example = "Butter")]
    pub name: String,
    #[schema(example = "Dairy")]
    pub category: String,
    #[serde(default)]
    pub is_allergen: bool,
    #[schema(example = "717 kcal per 100 g")]
    pub nutrition_info: Option<String>,
}

pub fn validate_create_ingredient(payload: &CreateIngredientRequest) -> Result<(), AppError> {
    validate_length("Name", &payload.name, 1, 100)?;
    validate_length("Category", &payload.category, 1, 50)?;
    if let Some(ref info) = payload.nutrition_info {
        validate_length("Nutrition info", info, 0, 2000)?;
    }
    Ok(())
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct IngredientListQuery {
    /// Only return ingredients in this category (case-insensitive).
    pub category: Option<String>,
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub is_allergen: bool,
    pub nutrition_info: Option<String>,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(m: ingredient::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            category: m.category,
            is_allergen: m.is_allergen,
            nutrition_info: m.nutrition_info,
        }
    }
}

/// One ingredient line of a recipe.
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecipeIngredientResponse {
    pub ingredient_id: i32,
    pub name: String,
    pub category: String,
    pub is_allergen: bool,
    #[schema(example = "2 cups")]
    pub quantity: String,
}

impl RecipeIngredientResponse {
    pub fn new(line: recipe_ingredient::Model, ingredient: ingredient::Model) -> Self {
        Self {
            ingredient_id: line.ingredient_id,
            name: ingredient.name,
            category: ingredient.category,
            is_allergen: ingredient.is_allergen,
            quantity: line.quantity,
        }
    }
}
