// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::comment::CommentResponse;
use crate::models::user::UserResponse;
use crate::schema::{post_views, posts};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = posts)]
pub struct Post {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
    pub body: String,
    pub category: String,
    pub tags: Vec<String>,
    pub slug: String,
    pub main_image: Option<String>,
    pub likes: i32,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = posts)]
pub struct NewPost {
    pub author_id: i32,
    pub title: String,
    pub body: String,
    pub category: String,
    pub tags: Vec<String>,
    pub slug: String,
    pub main_image: Option<String>,
}

/// One counted view. Uniqueness per (post, address, hour window) is
/// enforced logically at write time, not by a database constraint.
#[derive(Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = post_views)]
pub struct PostView {
    pub id: i32,
    pub post_id: i32,
    pub ip_address: String,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = post_views)]
pub struct NewPostView {
    pub post_id: i32,
    pub ip_address: String,
    pub viewed_at: DateTime<Utc>,
}

/// Generate a globally unique, URL-safe slug: the publication date
/// followed by 32 hex characters of a v4 uuid. Immutable once assigned.
pub fn generate_slug(now: DateTime<Utc>) -> String {
    format!("{}-{}", now.format("%d-%m-%y"), Uuid::new_v4().simple())
}

/// Request body for post creation.
#[derive(Debug, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub body: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub main_image: Option<String>,
}

/// Full post representation returned by the read and write surfaces.
#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: i32,
    pub title: String,
    pub body: String,
    pub author: UserResponse,
    pub date: DateTime<Utc>,
    pub slug: String,
    pub main_image: Option<String>,
    pub likes: i32,
    pub views_count: i64,
    pub comments: Vec<CommentResponse>,
    pub tags: Vec<String>,
    pub category: String,
}

impl PostResponse {
    pub fn assemble(
        post: Post,
        author: UserResponse,
        comments: Vec<CommentResponse>,
        views_count: i64,
    ) -> Self {
        Self {
            id: post.id,
            title: post.title,
            body: post.body,
            author,
            date: post.published_at,
            slug: post.slug,
            main_image: post.main_image,
            likes: post.likes,
            views_count,
            comments,
            tags: post.tags,
            category: post.category,
        }
    }
}

/// Compact post card used in the related-posts listing.
#[derive(Debug, Serialize)]
pub struct RelatedPostCard {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RelatedPostsResponse {
    pub current_post: CurrentPostCard,
    pub related_posts: Vec<RelatedPostCard>,
}

#[derive(Debug, Serialize)]
pub struct CurrentPostCard {
    pub title: String,
    pub slug: String,
    pub category: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slug_carries_date_prefix_and_uuid_entropy() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let slug = generate_slug(now);

        assert!(slug.starts_with("07-08-26-"));
        assert_eq!(slug.len(), "07-08-26-".len() + 32);
        assert!(!slug.contains('/'));
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn slugs_are_unique_across_generations() {
        let now = Utc::now();
        let a = generate_slug(now);
        let b = generate_slug(now);
        assert_ne!(a, b);
    }
}
