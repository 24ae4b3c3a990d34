use sea_orm::{ConnectionTrait, EntityTrait};

use crate::entity::user;
use crate::error::AppError;

/// Look up a user by ID, returning 404 if not found.
///
/// Inside a transaction this also catches an account deleted after the
/// request was authenticated.
pub async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
