// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::api::AppState;
use crate::auth::{AuthUser, MaybeAuthUser};
use crate::engagement;
use crate::error::ApiError;
use crate::models::{
    FollowRelation, UpdateUserProfile, User, UserProfileResponse, UserResponse,
};
use crate::schema::{follows, users};

/// Get the authenticated caller's own profile.
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from_user(&user))
}

/// Update the authenticated caller's profile fields.
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(changes): Json<UpdateUserProfile>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut conn = state.db.get_connection().await?;

    let updated: User = diesel::update(users::table.find(user.id))
        .set(&changes)
        .get_result(&mut conn)
        .await?;

    debug!("User {} updated their profile", updated.id);

    Ok(Json(UserResponse::from_user(&updated)))
}

/// Public profile with follower/following counts. The email is only
/// included for authenticated callers.
pub async fn get_user_profile(
    State(state): State<AppState>,
    MaybeAuthUser(caller): MaybeAuthUser,
    Path(user_id): Path<i32>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let mut conn = state.db.get_connection().await?;

    let user: User = users::table
        .find(user_id)
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let followers_count: i64 = follows::table
        .filter(follows::followed_id.eq(user_id))
        .count()
        .get_result(&mut conn)
        .await?;

    let following_count: i64 = follows::table
        .filter(follows::follower_id.eq(user_id))
        .count()
        .get_result(&mut conn)
        .await?;

    Ok(Json(UserProfileResponse {
        id: user.id,
        username: user.username,
        email: caller.map(|_| user.email),
        profile_image: user.profile_image,
        followers_count,
        following_count,
    }))
}

/// Follow a user. Emits the "new follower" notification and a live
/// broadcast.
pub async fn follow_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(target_id): Path<i32>,
) -> Result<Json<FollowRelation>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let relation = engagement::follow_user(&mut conn, &user, target_id).await?;

    state.broadcaster.broadcast().await;
    crate::metrics::LIVE_BROADCASTS.inc();

    Ok(Json(relation))
}

/// Unfollow a user. No notification, no broadcast.
pub async fn unfollow_user(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(target_id): Path<i32>,
) -> Result<Json<FollowRelation>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let relation = engagement::unfollow_user(&mut conn, &user, target_id).await?;

    Ok(Json(relation))
}

/// Whether the caller follows the given user.
pub async fn is_following(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(target_id): Path<i32>,
) -> Result<Json<bool>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let following = engagement::is_following(&mut conn, user.id, target_id).await?;

    Ok(Json(following))
}
