use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    pub admin: bool,
    pub exp: usize, // Expiration timestamp
}

/// A freshly signed session token.
pub struct SignedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign a new JWT token for a user, valid for `ttl_hours`.
pub fn sign(
    user_id: i32,
    username: &str,
    is_admin: bool,
    secret: &str,
    ttl_hours: i64,
) -> Result<SignedToken> {
    let ttl = Duration::try_hours(ttl_hours).context("token TTL out of range")?;
    let expires_at = Utc::now()
        .checked_add_signed(ttl)
        .context("token expiry out of range")?;

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        admin: is_admin,
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(SignedToken { token, expires_at })
}

/// Verify and decode a JWT token.
pub fn verify(token: &str, secret: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
