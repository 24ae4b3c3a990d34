use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::recipe::RecipeDetailResponse;
use crate::entity::saved_recipe;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct SaveResponse {
    pub user_id: i32,
    pub recipe_id: i32,
    pub saved_at: DateTime<Utc>,
}

impl From<saved_recipe::Model> for SaveResponse {
    fn from(m: saved_recipe::Model) -> Self {
        Self {
            user_id: m.user_id,
            recipe_id: m.recipe_id,
            saved_at: m.saved_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct SavedRecipeResponse {
    pub saved_at: DateTime<Utc>,
    pub recipe: RecipeDetailResponse,
}
