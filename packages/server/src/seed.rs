use chrono::Utc;
use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::AdminSeedConfig;
use crate::entity::{rating, recipe_ingredient, saved_recipe, user};
use crate::utils::password::hash_password;

/// Ensure required database indexes exist.
///
/// Schema sync only creates the indexes declared on the entities, so the
/// lookup indexes used by the cascade deletes are created here.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // One rating per (recipe, user); handlers map violations to DUPLICATE.
    create_index(
        db,
        "idx_rating_recipe_user",
        Index::create()
            .unique()
            .table(rating::Entity)
            .col(rating::Column::RecipeId)
            .col(rating::Column::UserId)
            .to_owned(),
    )
    .await;

    // DELETE FROM saved_recipe WHERE recipe_id IN (...)
    create_index(
        db,
        "idx_saved_recipe_recipe",
        Index::create()
            .table(saved_recipe::Entity)
            .col(saved_recipe::Column::RecipeId)
            .to_owned(),
    )
    .await;

    // Ingredient lookups from the ingredient side.
    create_index(
        db,
        "idx_recipe_ingredient_ingredient",
        Index::create()
            .table(recipe_ingredient::Entity)
            .col(recipe_ingredient::Column::IngredientId)
            .to_owned(),
    )
    .await;

    Ok(())
}

async fn create_index(db: &DatabaseConnection, name: &str, mut stmt: IndexCreateStatement) {
    let sql = stmt
        .if_not_exists()
        .name(name)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&sql).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}

/// Create the configured admin account if no user with that username exists.
pub async fn seed_admin(
    db: &DatabaseConnection,
    admin: Option<&AdminSeedConfig>,
) -> anyhow::Result<()> {
    let Some(admin) = admin else {
        return Ok(());
    };

    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(&admin.username))
        .one(db)
        .await?;

    if let Some(existing) = existing {
        if !existing.is_admin {
            let mut active: user::ActiveModel = existing.into();
            active.is_admin = Set(true);
            active.update(db).await?;
            info!("Promoted existing user {} to admin", admin.username);
        }
        return Ok(());
    }

    let password = hash_password(&admin.password)?;
    user::ActiveModel {
        email: Set(admin.email.trim().to_lowercase()),
        username: Set(admin.username.clone()),
        display_name: Set(admin.username.clone()),
        password: Set(password),
        is_admin: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Seeded admin account {}", admin.username);
    Ok(())
}
