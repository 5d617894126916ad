// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

//! Notification fan-out.
//!
//! A triggering write (new post, new follower) is materialized into one
//! notification record per interested recipient. Post fan-out is
//! unbounded in the follower count: K followers means K rows, written
//! as a single batch insert so the fan-out commits or fails as a whole.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::info;

use crate::error::ApiError;
use crate::models::{NewNotification, Post, User};
use crate::schema::{follows, notifications};

/// Outcome of a fan-out pass, rather than a silently swallowed loop.
#[derive(Debug, PartialEq, Eq)]
pub struct FanoutReport {
    pub notified: usize,
}

/// Build the per-follower notification batch for a freshly published post.
pub fn follower_notifications(
    author: &User,
    post: &Post,
    follower_ids: &[i32],
) -> Vec<NewNotification> {
    follower_ids
        .iter()
        .map(|&user_id| NewNotification {
            user_id,
            title: format!("{} published a new post", author.username),
            description: post.title.clone(),
            link: format!("/posts/{}", post.slug),
        })
        .collect()
}

/// Build the single notification emitted when `follower` starts
/// following the user identified by `target_id`.
pub fn follow_notification(follower: &User, target_id: i32) -> NewNotification {
    NewNotification {
        user_id: target_id,
        title: "New follower".to_string(),
        description: format!("{} started following you.", follower.username),
        link: format!("/profile/{}", follower.id),
    }
}

/// Notify every follower of `author` that `post` was published.
///
/// The batch goes in as one insert statement, so either every follower
/// gets a row or none does.
pub async fn notify_followers(
    conn: &mut AsyncPgConnection,
    author: &User,
    post: &Post,
) -> Result<FanoutReport, ApiError> {
    let follower_ids: Vec<i32> = follows::table
        .filter(follows::followed_id.eq(author.id))
        .select(follows::follower_id)
        .load(conn)
        .await?;

    if follower_ids.is_empty() {
        return Ok(FanoutReport { notified: 0 });
    }

    let batch = follower_notifications(author, post, &follower_ids);
    let notified = diesel::insert_into(notifications::table)
        .values(&batch)
        .execute(conn)
        .await?;

    info!(
        "Fanned out post {} to {} followers of user {}",
        post.id, notified, author.id
    );

    Ok(FanoutReport { notified })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn author() -> User {
        User {
            id: 1,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            hashed_password: String::new(),
            is_active: true,
            profile_image: None,
        }
    }

    fn post() -> Post {
        Post {
            id: 10,
            author_id: 1,
            title: "Hello".to_string(),
            body: "First post".to_string(),
            category: "general".to_string(),
            tags: vec![],
            slug: "07-08-26-deadbeefdeadbeefdeadbeefdeadbeef".to_string(),
            main_image: None,
            likes: 0,
            published_at: Utc::now(),
        }
    }

    #[test]
    fn one_notification_per_follower_each_linking_the_slug() {
        let followers = [2, 3, 5];
        let batch = follower_notifications(&author(), &post(), &followers);

        assert_eq!(batch.len(), followers.len());
        for (notification, follower_id) in batch.iter().zip(followers) {
            assert_eq!(notification.user_id, follower_id);
            assert_eq!(notification.title, "ada published a new post");
            assert_eq!(notification.description, "Hello");
            assert_eq!(
                notification.link,
                "/posts/07-08-26-deadbeefdeadbeefdeadbeefdeadbeef"
            );
        }
    }

    #[test]
    fn zero_followers_builds_an_empty_batch() {
        let batch = follower_notifications(&author(), &post(), &[]);
        assert!(batch.is_empty());
    }

    #[test]
    fn follow_notification_addresses_the_target() {
        let n = follow_notification(&author(), 9);
        assert_eq!(n.user_id, 9);
        assert_eq!(n.title, "New follower");
        assert_eq!(n.description, "ada started following you.");
        assert_eq!(n.link, "/profile/1");
    }
}
