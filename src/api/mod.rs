mod handlers;

use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::db::Database;
use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state carried by every handler: the database pool and the
/// live-update broadcaster.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub broadcaster: Broadcaster,
}

/// Start the API server
pub async fn start_api_server(db: Arc<Database>, broadcaster: Broadcaster) -> Result<()> {
    let config = Config::get();

    // Set up CORS
    let cors = if config.api.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    let state = AppState { db, broadcaster };

    // Create router with all routes
    let app = Router::new()
        // General routes
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::get_metrics))
        // Live-update channel
        .route("/ws", get(handlers::live::live_updates))
        // Identity routes
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/token", post(handlers::auth::issue_token))
        // User routes
        .route(
            "/api/users/me",
            get(handlers::users::get_me).put(handlers::users::update_me),
        )
        .route("/api/users/:id", get(handlers::users::get_user_profile))
        .route(
            "/api/users/:id/posts",
            get(handlers::posts::get_posts_for_user).post(handlers::posts::create_post_for_user),
        )
        .route("/api/users/:id/follow", post(handlers::users::follow_user))
        .route(
            "/api/users/:id/unfollow",
            post(handlers::users::unfollow_user),
        )
        .route(
            "/api/users/:id/is-following",
            get(handlers::users::is_following),
        )
        // Post routes
        .route("/api/posts", get(handlers::posts::get_all_posts))
        .route("/api/posts/top", get(handlers::posts::get_top_posts))
        .route(
            "/api/posts/by-slug/:slug",
            get(handlers::posts::get_post_by_slug),
        )
        .route(
            "/api/posts/by-slug/:slug/related",
            get(handlers::posts::get_related_posts),
        )
        .route(
            "/api/posts/:id/comments",
            post(handlers::posts::create_comment),
        )
        .route("/api/posts/:id/like", post(handlers::posts::like_post))
        .route("/api/posts/:id/unlike", post(handlers::posts::unlike_post))
        .route(
            "/api/posts/:id/is-liked",
            get(handlers::posts::is_post_liked),
        )
        .route(
            "/api/posts/:id/views",
            post(handlers::posts::increment_views),
        )
        // Notification routes
        .route(
            "/api/notifications",
            get(handlers::notifications::get_notifications)
                .post(handlers::notifications::create_notification)
                .delete(handlers::notifications::clear_notifications),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Get bind address
    let addr = format!("{}:{}", config.api.host, config.api.port).parse::<SocketAddr>()?;

    // Start server
    info!("Starting API server on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, stopping API server");
}
