// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::AppState;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::User;
use crate::schema::users;

/// JWT claims: `sub` carries the user id, `exp` the expiry as a unix
/// timestamp (validated on decode).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let config = Config::get();
    bcrypt::hash(password, config.auth.bcrypt_cost)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hashed: &str) -> bool {
    bcrypt::verify(password, hashed).unwrap_or(false)
}

/// Issue a signed bearer token for the given user.
pub fn create_access_token(user_id: i32) -> Result<String, ApiError> {
    let config = Config::get();
    let expire = Utc::now() + Duration::minutes(config.auth.token_expire_minutes);
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expire.timestamp(),
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}

/// Decode a bearer token to a user id. Any invalid, expired or malformed
/// token resolves to `None` rather than an error.
pub fn decode_user_id(token: &str) -> Option<i32> {
    let config = Config::get();
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    data.claims.sub.parse().ok()
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Optional identity: absence or invalidity of the credential yields an
/// unauthenticated identity rather than a hard failure. Read-mostly
/// endpoints use this directly.
pub struct MaybeAuthUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeAuthUser(None));
        };
        let Some(user_id) = decode_user_id(token) else {
            debug!("Rejected invalid or expired bearer token");
            return Ok(MaybeAuthUser(None));
        };

        let mut conn = state.db.get_connection().await?;
        let user = users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .await
            .optional()?;

        Ok(MaybeAuthUser(user.filter(|u| u.is_active)))
    }
}

/// Required identity: write endpoints reject unauthenticated callers.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(parts, state).await?;
        user.map(AuthUser).ok_or(ApiError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_to_the_same_user() {
        let token = create_access_token(42).unwrap();
        assert_eq!(decode_user_id(&token), Some(42));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = Config::get();
        let claims = Claims {
            sub: "42".to_string(),
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.auth.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(decode_user_id(&token), None);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert_eq!(decode_user_id("not-a-token"), None);
        assert_eq!(decode_user_id(""), None);
    }

    #[test]
    fn password_verification_round_trips() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-bcrypt-hash"));
    }
}
