// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use diesel::prelude::*;

use crate::schema::post_likes;

/// One row per (post, user) pair; the row's existence is the source of
/// truth for "liked", `posts.likes` is the denormalized count.
#[derive(Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = post_likes)]
pub struct PostLike {
    pub id: i32,
    pub post_id: i32,
    pub user_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = post_likes)]
pub struct NewPostLike {
    pub post_id: i32,
    pub user_id: i32,
}
