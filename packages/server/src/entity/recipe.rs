use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub author: HasOne<super::user::Entity>,

    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub instructions: String,
    pub time_to_make: i32, // in minutes
    #[sea_orm(default_value = false)]
    pub is_approved: bool,
    /// Mean of all rating scores, one decimal. Rewritten on every new rating.
    pub average_rating: Option<f64>,

    #[sea_orm(has_many)]
    pub ingredient_lines: HasMany<super::recipe_ingredient::Entity>,

    #[sea_orm(has_many)]
    pub ratings: HasMany<super::rating::Entity>,

    #[sea_orm(has_many)]
    pub saves: HasMany<super::saved_recipe::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
