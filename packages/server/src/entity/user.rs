use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique)]
    pub username: String,
    pub display_name: String,
    /// Argon2 PHC string.
    pub password: String,
    #[sea_orm(default_value = false)]
    pub is_admin: bool,

    #[sea_orm(has_one)]
    pub profile: HasOne<super::profile::Entity>,

    #[sea_orm(has_many)]
    pub recipes: HasMany<super::recipe::Entity>,

    #[sea_orm(has_many)]
    pub ratings: HasMany<super::rating::Entity>,

    #[sea_orm(has_many)]
    pub saved_recipes: HasMany<super::saved_recipe::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
