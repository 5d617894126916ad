// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::json;
use tracing::debug;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::metrics;
use crate::models::notification::CreateNotification;
use crate::models::{NewNotification, Notification, NotificationResponse};
use crate::schema::notifications;

/// Most recent notifications land first; the limit bounds an otherwise
/// unbounded result set.
const NOTIFICATION_LIST_LIMIT: i64 = 100;

/// The caller's notifications, newest first.
pub async fn get_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let mut conn = state.db.get_connection().await?;

    let rows: Vec<Notification> = notifications::table
        .filter(notifications::user_id.eq(user.id))
        .order_by(notifications::created_at.desc())
        .limit(NOTIFICATION_LIST_LIMIT)
        .load(&mut conn)
        .await?;

    Ok(Json(
        rows.into_iter()
            .map(NotificationResponse::from_notification)
            .collect(),
    ))
}

/// Delete all of the caller's notifications. Deleting zero rows is not
/// an error.
pub async fn clear_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.db.get_connection().await?;

    let cleared = diesel::delete(notifications::table.filter(notifications::user_id.eq(user.id)))
        .execute(&mut conn)
        .await?;

    debug!("Cleared {} notifications for user {}", cleared, user.id);

    Ok(Json(json!({ "cleared": cleared })))
}

/// Create a notification addressed to the caller, then signal live
/// subscribers.
pub async fn create_notification(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateNotification>,
) -> Result<(StatusCode, Json<NotificationResponse>), ApiError> {
    let mut conn = state.db.get_connection().await?;

    let notification: Notification = diesel::insert_into(notifications::table)
        .values(&NewNotification {
            user_id: user.id,
            title: req.title,
            description: req.description,
            link: req.link,
        })
        .get_result(&mut conn)
        .await?;

    state.broadcaster.broadcast().await;
    metrics::LIVE_BROADCASTS.inc();

    Ok((
        StatusCode::CREATED,
        Json(NotificationResponse::from_notification(notification)),
    ))
}
