use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{rating, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::rating::*;
use crate::state::AppState;
use crate::utils::recipe::{find_recipe, find_recipe_for_update, recompute_average_rating};
use crate::utils::user::find_user;

#[utoipa::path(
    get,
    path = "/{recipe_id}/ratings",
    tag = "Ratings",
    operation_id = "listRatings",
    summary = "List ratings of a recipe",
    description = "Returns every rating of the recipe, newest first.",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    responses(
        (status = 200, description = "Ratings", body = Vec<RatingResponse>),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(recipe_id))]
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<Vec<RatingResponse>>, AppError> {
    find_recipe(&state.db, recipe_id).await?;

    let rows = rating::Entity::find()
        .filter(rating::Column::RecipeId.eq(recipe_id))
        .find_also_related(user::Entity)
        .order_by_desc(rating::Column::PostedAt)
        .order_by_desc(rating::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(|(r, u)| RatingResponse::new(r, u))
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/{recipe_id}/ratings",
    tag = "Ratings",
    operation_id = "createRating",
    summary = "Rate a recipe",
    description = "Adds the caller's rating (score 1-5, optional review) and recomputes the recipe's average from all its ratings. A user can rate a recipe once.",
    params(("recipe_id" = i32, Path, description = "Recipe ID")),
    request_body = CreateRatingRequest,
    responses(
        (status = 201, description = "Rating stored", body = RatingCreatedResponse),
        (status = 400, description = "Invalid score (VALIDATION_ERROR) or already rated (DUPLICATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Recipe not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(recipe_id, user_id = auth_user.user_id))]
pub async fn create_rating(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(recipe_id): Path<i32>,
    AppJson(payload): AppJson<CreateRatingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let score = validate_create_rating(&payload)?;

    let txn = state.db.begin().await?;
    // Serializes concurrent ratings of the same recipe until commit.
    find_recipe_for_update(&txn, recipe_id).await?;
    let user = find_user(&txn, auth_user.user_id).await?;

    let already_rated = rating::Entity::find()
        .filter(rating::Column::RecipeId.eq(recipe_id))
        .filter(rating::Column::UserId.eq(user.id))
        .count(&txn)
        .await?
        > 0;
    if already_rated {
        return Err(AppError::Duplicate(
            "You have already rated this recipe".into(),
        ));
    }

    let new_rating = rating::ActiveModel {
        recipe_id: Set(recipe_id),
        user_id: Set(user.id),
        score: Set(score.into()),
        review: Set(payload
            .review
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())),
        posted_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let model = match new_rating.insert(&txn).await {
        Ok(model) => model,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Duplicate(
                "You have already rated this recipe".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let (average, rating_count) = recompute_average_rating(&txn, recipe_id).await?;
    txn.commit().await?;

    let average_rating = average.ok_or_else(|| {
        AppError::Internal(format!("recipe {recipe_id} has no ratings after insert"))
    })?;
    tracing::info!(rating_id = model.id, score = %score, average_rating, "Recipe rated");

    Ok((
        StatusCode::CREATED,
        Json(RatingCreatedResponse {
            rating: RatingResponse::new(model, Some(user)),
            average_rating,
            rating_count,
        }),
    ))
}
