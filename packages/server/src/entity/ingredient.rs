use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredient")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(indexed)]
    pub category: String,
    #[sea_orm(default_value = false)]
    pub is_allergen: bool,
    #[sea_orm(column_type = "Text", nullable)]
    pub nutrition_info: Option<String>,

    #[sea_orm(has_many)]
    pub recipe_lines: HasMany<super::recipe_ingredient::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
