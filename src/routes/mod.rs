use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use crate::middleware::auth::session_middleware;
use axum::{middleware, routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::services::ServeDir;

/// Full application router minus the `Extension` layers, which the caller
/// supplies (database, email service, feed config).
pub fn create_app(static_dir: &str) -> Router {
    Router::new()
        .merge(create_routes())
        .route("/health", routing::get(handlers::health_check))
        .nest_service("/static", ServeDir::new(static_dir))
}

/// Every HTML page, behind the session middleware.
pub fn create_routes() -> Router {
    let rate_limit_config = RateLimitConfig::from_env();

    auth_routes(&rate_limit_config)
        .merge(page_routes(&rate_limit_config))
        .layer(middleware::from_fn(session_middleware))
}

/// Credential forms: login, register, password reset.
fn auth_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/login",
            routing::get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route(
            "/register",
            routing::get(handlers::auth::register_page).post(handlers::auth::register),
        )
        .route(
            "/reset_password_request",
            routing::get(handlers::auth::reset_password_request_page)
                .post(handlers::auth::reset_password_request),
        )
        .route(
            "/reset_password/{token}",
            routing::get(handlers::auth::reset_password_page)
                .post(handlers::auth::reset_password),
        );

    with_optional_rate_limit(router, config.enabled, config.auth)
}

/// Everything else a browser navigates to.
fn page_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/",
            routing::get(handlers::post::index).post(handlers::post::create_post),
        )
        .route(
            "/index",
            routing::get(handlers::post::index).post(handlers::post::create_post),
        )
        .route("/explore", routing::get(handlers::post::explore))
        .route("/logout", routing::get(handlers::auth::logout))
        .route("/user/{username}", routing::get(handlers::user::profile))
        .route(
            "/edit_profile",
            routing::get(handlers::user::edit_profile_page).post(handlers::user::edit_profile),
        )
        .route("/follow/{username}", routing::post(handlers::follow::follow))
        .route(
            "/unfollow/{username}",
            routing::post(handlers::follow::unfollow),
        );

    with_optional_rate_limit(router, config.enabled, config.pages)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!("Invalid rate limit rule {:?}, serving without a limit", rule);
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
