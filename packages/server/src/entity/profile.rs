use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub pronouns: Option<String>,
    pub image_url: Option<String>,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
