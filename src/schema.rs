// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use diesel::allow_tables_to_appear_in_same_query;
use diesel::joinable;
use diesel::table;

table! {
    users (id) {
        id -> Integer,
        username -> Varchar,
        email -> Varchar,
        hashed_password -> Varchar,
        is_active -> Bool,
        profile_image -> Nullable<Varchar>,
    }
}

table! {
    posts (id) {
        id -> Integer,
        author_id -> Integer,
        title -> Varchar,
        body -> Text,
        category -> Varchar,
        tags -> Array<Text>,
        slug -> Varchar,
        main_image -> Nullable<Varchar>,
        likes -> Integer,
        published_at -> Timestamptz,
    }
}

table! {
    post_views (id) {
        id -> Integer,
        post_id -> Integer,
        ip_address -> Varchar,
        viewed_at -> Timestamptz,
    }
}

table! {
    post_comments (id) {
        id -> Integer,
        post_id -> Integer,
        author_id -> Integer,
        body -> Text,
        created_at -> Timestamptz,
    }
}

table! {
    post_likes (id) {
        id -> Integer,
        post_id -> Integer,
        user_id -> Integer,
    }
}

table! {
    follows (id) {
        id -> Integer,
        follower_id -> Integer,
        followed_id -> Integer,
        created_at -> Timestamptz,
    }
}

table! {
    notifications (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Varchar,
        description -> Text,
        link -> Varchar,
        created_at -> Timestamptz,
    }
}

joinable!(posts -> users (author_id));
joinable!(post_views -> posts (post_id));
joinable!(post_comments -> posts (post_id));
joinable!(post_comments -> users (author_id));
joinable!(post_likes -> posts (post_id));
joinable!(post_likes -> users (user_id));
joinable!(notifications -> users (user_id));

allow_tables_to_appear_in_same_query!(
    users,
    posts,
    post_views,
    post_comments,
    post_likes,
    follows,
    notifications,
);
