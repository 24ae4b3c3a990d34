use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_length};
use crate::entity::{profile, user};
use crate::error::AppError;

/// Body for `POST /profile` and `PUT /profile`.
///
/// Absent fields are left unchanged; `null` clears a field.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct ProfileRequest {
    /// Updates the account's display name.
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "they/them")]
    pub pronouns: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, example = "https://images.example.com/julia.png")]
    pub image_url: Option<Option<String>>,
}

pub fn validate_profile_request(payload: &ProfileRequest) -> Result<(), AppError> {
    if let Some(ref display_name) = payload.display_name {
        validate_length("Display name", display_name, 1, 64)?;
    }
    if let Some(Some(ref bio)) = payload.bio {
        validate_length("Bio", bio, 0, 1000)?;
    }
    if let Some(Some(ref pronouns)) = payload.pronouns {
        validate_length("Pronouns", pronouns, 0, 32)?;
    }
    if let Some(Some(ref url)) = payload.image_url {
        validate_length("Image URL", url, 0, 2048)?;
        let url = url.trim();
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(AppError::Validation(
                "Image URL must start with http:// or https://".into(),
            ));
        }
    }
    Ok(())
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProfileResponse {
    pub user_id: i32,
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub pronouns: Option<String>,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn new(profile: profile::Model, user: user::Model) -> Self {
        Self {
            user_id: profile.user_id,
            username: user.username,
            display_name: user.display_name,
            bio: profile.bio,
            pronouns: profile.pronouns,
            image_url: profile.image_url,
            updated_at: profile.updated_at,
        }
    }
}
