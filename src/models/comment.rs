// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::user::UserResponse;
use crate::schema::post_comments;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = post_comments)]
pub struct PostComment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = post_comments)]
pub struct NewPostComment {
    pub post_id: i32,
    pub author_id: i32,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateComment {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub body: String,
    pub author: UserResponse,
    pub date: DateTime<Utc>,
}

impl CommentResponse {
    pub fn from_comment(comment: &PostComment, author: UserResponse) -> Self {
        Self {
            body: comment.body.clone(),
            author,
            date: comment.created_at,
        }
    }
}
