// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::users;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub profile_image: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub profile_image: Option<String>,
}

/// Changeset for `PUT /api/users/me`. The whole profile is overwritten
/// with what the caller sends; an absent image clears the stored one.
#[derive(Debug, Deserialize, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateUserProfile {
    pub username: String,
    pub email: String,
    pub profile_image: Option<String>,
}

/// Public user representation. The password hash never leaves the model
/// layer; email is stripped for unauthenticated viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: Some(user.email.clone()),
            profile_image: user.profile_image.clone(),
        }
    }

    pub fn without_email(mut self) -> Self {
        self.email = None;
        self
    }
}

/// Profile view with social graph counts, for `GET /api/users/:id`.
#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub profile_image: Option<String>,
    pub followers_count: i64,
    pub following_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            hashed_password: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
            is_active: true,
            profile_image: None,
        }
    }

    #[test]
    fn response_hides_email_for_anonymous_viewers() {
        let full = UserResponse::from_user(&sample_user());
        assert_eq!(full.email.as_deref(), Some("ada@example.com"));

        let stripped = full.without_email();
        assert_eq!(stripped.email, None);
        assert_eq!(stripped.username, "ada");
    }
}
