// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::notifications;

/// System-created record addressed to a single recipient. Never edited;
/// deleted only in bulk by its owner.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub link: String,
}

/// Request body for the manual notification endpoint.
#[derive(Debug, Deserialize)]
pub struct CreateNotification {
    pub title: String,
    pub description: String,
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub link: String,
    pub date: DateTime<Utc>,
}

impl NotificationResponse {
    pub fn from_notification(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            description: n.description,
            link: n.link,
            date: n.created_at,
        }
    }
}
