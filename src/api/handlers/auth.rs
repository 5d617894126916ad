// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::AppState;
use crate::auth;
use crate::error::ApiError;
use crate::models::{NewUser, User, UserResponse};
use crate::schema::users;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub profile_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Register a new user. Username and email collisions surface as
/// Conflict through the unique constraints.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Username and password must not be empty".to_string(),
        ));
    }

    let hashed_password = auth::hash_password(&req.password)?;
    let mut conn = state.db.get_connection().await?;

    let user: User = diesel::insert_into(users::table)
        .values(&NewUser {
            username: req.username,
            email: req.email,
            hashed_password,
            is_active: true,
            profile_image: req.profile_image,
        })
        .get_result(&mut conn)
        .await?;

    info!("Registered user {} ({})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Verify credentials and issue a bearer token.
pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut conn = state.db.get_connection().await?;

    let user: Option<User> = users::table
        .filter(users::username.eq(&req.username))
        .first(&mut conn)
        .await
        .optional()?;

    let Some(user) =
        user.filter(|u| u.is_active && auth::verify_password(&req.password, &u.hashed_password))
    else {
        debug!("Rejected credentials for username {:?}", req.username);
        return Err(ApiError::Unauthenticated);
    };

    let access_token = auth::create_access_token(user.id)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
