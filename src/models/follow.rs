// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::models::user::UserResponse;
use crate::schema::follows;

/// Directional follow edge: `follower_id` follows `followed_id`.
/// Unique per ordered pair; never self-referential.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = follows)]
pub struct Follow {
    pub id: i32,
    pub follower_id: i32,
    pub followed_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = follows)]
pub struct NewFollow {
    pub follower_id: i32,
    pub followed_id: i32,
}

/// Follow/unfollow response with both endpoints resolved.
#[derive(Debug, Serialize)]
pub struct FollowRelation {
    pub id: i32,
    pub follower: UserResponse,
    pub followed: UserResponse,
    pub date: DateTime<Utc>,
}
