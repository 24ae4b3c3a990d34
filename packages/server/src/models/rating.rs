use chrono::{DateTime, Utc};
use common::Score;
use serde::{Deserialize, Serialize};

use super::shared::validate_length;
use crate::entity::{rating, user};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRatingRequest {
    /// Whole number from 1 to 5.
    #[schema(example = 4)]
    pub score: Option<i64>,
    #[schema(example = "Rich and worth the wait.")]
    pub review: Option<String>,
}

/// Validate the body and return the checked score.
pub fn validate_create_rating(payload: &CreateRatingRequest) -> Result<Score, AppError> {
    let score = Score::from_request(payload.score)?;
    if let Some(ref review) = payload.review {
        validate_length("Review", review, 0, 5000)?;
    }
    Ok(score)
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RatingResponse {
    pub id: i32,
    pub recipe_id: i32,
    pub user_id: i32,
    pub username: Option<String>,
    pub score: i32,
    pub review: Option<String>,
    pub posted_at: DateTime<Utc>,
}

impl RatingResponse {
    pub fn new(rating: rating::Model, user: Option<user::Model>) -> Self {
        Self {
            id: rating.id,
            recipe_id: rating.recipe_id,
            user_id: rating.user_id,
            username: user.map(|u| u.username),
            score: rating.score,
            review: rating.review,
            posted_at: rating.posted_at,
        }
    }
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct RatingCreatedResponse {
    pub rating: RatingResponse,
    /// The recipe's average after this rating.
    #[schema(example = 4.5)]
    pub average_rating: f64,
    pub rating_count: u64,
}
