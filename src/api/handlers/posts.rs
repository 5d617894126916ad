// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::engagement;
use crate::error::ApiError;
use crate::fanout;
use crate::metrics;
use crate::models::post::{generate_slug, CreatePost, CurrentPostCard, RelatedPostCard};
use crate::models::comment::CreateComment;
use crate::models::{
    CommentResponse, NewPost, NewPostComment, Post, PostComment, PostResponse,
    RelatedPostsResponse, User, UserResponse,
};
use crate::schema::{post_comments, post_views, posts, users};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub count: Option<i64>,
}

/// Translate page/count query parameters into an (offset, limit) window.
/// `count` is clamped to 1..=100; pages start at 1.
fn page_window(page: Option<i64>, count: Option<i64>) -> (i64, i64) {
    let count = count.unwrap_or(3).clamp(1, 100);
    let page = page.unwrap_or(1).max(1);
    ((page - 1) * count, count)
}

/// Resolve the viewer's network address: first hop of X-Forwarded-For
/// when present, the socket peer otherwise.
fn client_address(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Assemble full post representations with batched lookups: authors by
/// id set, comments grouped by post, view counts grouped by post.
async fn load_post_responses(
    conn: &mut AsyncPgConnection,
    posts: Vec<Post>,
) -> Result<Vec<PostResponse>, ApiError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<i32> = posts.iter().map(|p| p.id).collect();

    let comments: Vec<PostComment> = post_comments::table
        .filter(post_comments::post_id.eq_any(&post_ids))
        .order_by(post_comments::created_at.asc())
        .load(conn)
        .await?;

    let mut author_ids: Vec<i32> = posts.iter().map(|p| p.author_id).collect();
    author_ids.extend(comments.iter().map(|c| c.author_id));
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: Vec<User> = users::table
        .filter(users::id.eq_any(&author_ids))
        .load(conn)
        .await?;
    let authors_by_id: HashMap<i32, UserResponse> = authors
        .iter()
        .map(|u| (u.id, UserResponse::from_user(u)))
        .collect();

    let view_counts: Vec<(i32, i64)> = post_views::table
        .filter(post_views::post_id.eq_any(&post_ids))
        .group_by(post_views::post_id)
        .select((post_views::post_id, count_star()))
        .load(conn)
        .await?;
    let views_by_post: HashMap<i32, i64> = view_counts.into_iter().collect();

    let mut comments_by_post: HashMap<i32, Vec<CommentResponse>> = HashMap::new();
    for comment in &comments {
        if let Some(author) = authors_by_id.get(&comment.author_id) {
            comments_by_post
                .entry(comment.post_id)
                .or_default()
                .push(CommentResponse::from_comment(comment, author.clone()));
        }
    }

    posts
        .into_iter()
        .map(|post| {
            let author = authors_by_id
                .get(&post.author_id)
                .cloned()
                .ok_or_else(|| {
                    ApiError::Internal(format!("author {} missing for post {}", post.author_id, post.id))
                })?;
            let comments = comments_by_post.remove(&post.id).unwrap_or_default();
            let views = views_by_post.get(&post.id).copied().unwrap_or(0);
            Ok(PostResponse::assemble(post, author, comments, views))
        })
        .collect()
}

async fn get_user_or_404(conn: &mut AsyncPgConnection, user_id: i32) -> Result<User, ApiError> {
    users::table
        .find(user_id)
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn get_post_by_slug_or_404(
    conn: &mut AsyncPgConnection,
    slug: &str,
) -> Result<Post, ApiError> {
    posts::table
        .filter(posts::slug.eq(slug))
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// Create a post. After the post is durably inserted, every follower of
/// the author gets a notification (one batch) and connected live
/// subscribers get an update signal.
pub async fn create_post_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    AuthUser(current_user): AuthUser,
    Json(req): Json<CreatePost>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let mut conn = state.db.get_connection().await?;
    get_user_or_404(&mut conn, user_id).await?;

    let slug = generate_slug(Utc::now());

    let post: Post = diesel::insert_into(posts::table)
        .values(&NewPost {
            author_id: current_user.id,
            title: req.title,
            body: req.body,
            category: req.category,
            tags: req.tags,
            slug,
            main_image: req.main_image,
        })
        .get_result(&mut conn)
        .await?;

    info!("User {} published post {} ({})", current_user.id, post.id, post.slug);
    metrics::POSTS_CREATED.inc();

    let report = fanout::notify_followers(&mut conn, &current_user, &post).await?;
    metrics::NOTIFICATIONS_FANNED_OUT.inc_by(report.notified as u64);

    state.broadcaster.broadcast().await;
    metrics::LIVE_BROADCASTS.inc();

    let author = UserResponse::from_user(&current_user);
    let response = PostResponse::assemble(post, author, Vec::new(), 0);

    Ok((StatusCode::CREATED, Json(response)))
}

/// All posts by one user, newest first.
pub async fn get_posts_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    get_user_or_404(&mut conn, user_id).await?;

    let user_posts: Vec<Post> = posts::table
        .filter(posts::author_id.eq(user_id))
        .order_by(posts::published_at.desc())
        .load(&mut conn)
        .await?;

    let responses = load_post_responses(&mut conn, user_posts).await?;
    Ok(Json(responses))
}

/// All posts, paginated, newest first.
pub async fn get_all_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let (offset, limit) = page_window(query.page, query.count);
    debug!("Listing posts, offset {}, limit {}", offset, limit);

    let mut conn = state.db.get_connection().await?;
    let page: Vec<Post> = posts::table
        .order_by(posts::published_at.desc())
        .offset(offset)
        .limit(limit)
        .load(&mut conn)
        .await?;

    let responses = load_post_responses(&mut conn, page).await?;
    Ok(Json(responses))
}

/// Single post lookup by slug.
pub async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostResponse>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let post = get_post_by_slug_or_404(&mut conn, &slug).await?;

    let mut responses = load_post_responses(&mut conn, vec![post]).await?;
    responses
        .pop()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

/// Most-viewed posts. Posts with zero views fill the tail when fewer
/// than `count` posts have been viewed at all.
pub async fn get_top_posts(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let limit = query.count.unwrap_or(6).clamp(1, 100);
    let mut conn = state.db.get_connection().await?;

    let view_counts: Vec<(i32, i64)> = post_views::table
        .group_by(post_views::post_id)
        .select((post_views::post_id, count_star()))
        .order_by(count_star().desc())
        .limit(limit)
        .load(&mut conn)
        .await?;
    let viewed_ids: Vec<i32> = view_counts.iter().map(|(id, _)| *id).collect();

    let mut top: Vec<Post> = posts::table
        .filter(posts::id.eq_any(&viewed_ids))
        .load(&mut conn)
        .await?;
    top.sort_by_key(|p| {
        viewed_ids
            .iter()
            .position(|&id| id == p.id)
            .unwrap_or(usize::MAX)
    });

    if (top.len() as i64) < limit {
        let fill: Vec<Post> = posts::table
            .filter(posts::id.ne_all(&viewed_ids))
            .order_by(posts::published_at.desc())
            .limit(limit - top.len() as i64)
            .load(&mut conn)
            .await?;
        top.extend(fill);
    }

    let responses = load_post_responses(&mut conn, top).await?;
    Ok(Json(responses))
}

/// Posts sharing the base post's category, excluding the base itself.
pub async fn get_related_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<RelatedPostsResponse>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let current = get_post_by_slug_or_404(&mut conn, &slug).await?;

    let related: Vec<Post> = posts::table
        .filter(posts::category.eq(&current.category))
        .filter(posts::slug.ne(&current.slug))
        .limit(5)
        .load(&mut conn)
        .await?;

    Ok(Json(RelatedPostsResponse {
        current_post: CurrentPostCard {
            title: current.title,
            slug: current.slug,
            category: current.category,
            content: current.body,
        },
        related_posts: related
            .into_iter()
            .map(|p| RelatedPostCard {
                title: p.title,
                slug: p.slug,
                category: p.category,
                image: p.main_image,
            })
            .collect(),
    }))
}

/// Comment on a post; connected live subscribers get an update signal.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    AuthUser(current_user): AuthUser,
    Json(req): Json<CreateComment>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let mut conn = state.db.get_connection().await?;

    let post_exists: i64 = posts::table
        .filter(posts::id.eq(post_id))
        .count()
        .get_result(&mut conn)
        .await?;
    if post_exists == 0 {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let comment: PostComment = diesel::insert_into(post_comments::table)
        .values(&NewPostComment {
            post_id,
            author_id: current_user.id,
            body: req.body,
        })
        .get_result(&mut conn)
        .await?;

    metrics::COMMENTS_CREATED.inc();
    state.broadcaster.broadcast().await;
    metrics::LIVE_BROADCASTS.inc();

    let author = UserResponse::from_user(&current_user);
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::from_comment(&comment, author)),
    ))
}

/// Like a post; responds with the new counter value.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    AuthUser(current_user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let likes = engagement::like_post(&mut conn, post_id, current_user.id).await?;
    Ok(Json(json!({ "likes": likes })))
}

/// Remove a like; responds with the new counter value.
pub async fn unlike_post(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    AuthUser(current_user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let likes = engagement::unlike_post(&mut conn, post_id, current_user.id).await?;
    Ok(Json(json!({ "likes": likes })))
}

/// Whether the caller has liked the post.
pub async fn is_post_liked(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    AuthUser(current_user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut conn = state.db.get_connection().await?;
    let liked = engagement::is_liked(&mut conn, post_id, current_user.id).await?;
    Ok(Json(json!({ "isLiked": liked })))
}

/// Count a view, deduplicated per address within the sliding window.
pub async fn increment_views(
    State(state): State<AppState>,
    Path(post_id): Path<i32>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let address = client_address(&headers, peer);
    let mut conn = state.db.get_connection().await?;
    let views = engagement::record_view(&mut conn, post_id, &address).await?;
    Ok(Json(json!({ "views": views })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_window_applies_defaults_and_clamps() {
        assert_eq!(page_window(None, None), (0, 3));
        assert_eq!(page_window(Some(1), Some(10)), (0, 10));
        assert_eq!(page_window(Some(3), Some(10)), (20, 10));
        // Out-of-range values are pulled back into bounds.
        assert_eq!(page_window(Some(0), Some(0)), (0, 1));
        assert_eq!(page_window(Some(-5), Some(1000)), (0, 100));
    }

    #[test]
    fn client_address_prefers_the_first_forwarded_hop() {
        let peer: SocketAddr = "10.0.0.1:9999".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.2".parse().unwrap());
        assert_eq!(client_address(&headers, peer), "203.0.113.7");

        let empty = HeaderMap::new();
        assert_eq!(client_address(&empty, peer), "10.0.0.1");

        let mut blank = HeaderMap::new();
        blank.insert("x-forwarded-for", "".parse().unwrap());
        assert_eq!(client_address(&blank, peer), "10.0.0.1");
    }
}
