// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

pub mod auth;
pub mod health;
pub mod live;
pub mod metrics;
pub mod notifications;
pub mod posts;
pub mod users;
