use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rating")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique_key = "recipe_user")]
    pub recipe_id: i32,
    #[sea_orm(unique_key = "recipe_user")]
    pub user_id: i32,

    #[sea_orm(belongs_to, from = "recipe_id", to = "id")]
    pub recipe: HasOne<super::recipe::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub score: i32, // 1..=5
    #[sea_orm(column_type = "Text", nullable)]
    pub review: Option<String>,

    pub posted_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
