use axum::{extract::Extension, middleware, Router};
use microblog::config::{self, feed::FeedConfig, jwt::JwtConfig};
use microblog::{migration, routes, services, templates, utils};
use sea_orm_migration::MigratorTrait;
use std::env;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "microblog=debug,tower_http=debug,axum=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    // Validate configuration before doing anything else
    let (jwt_config, database_url) = validate_config()?;
    utils::jwt::init_jwt_config(jwt_config)?;
    templates::init()?;

    tracing::info!("Starting Microblog v{}...", env!("CARGO_PKG_VERSION"));

    let db = config::database::get_database(&database_url).await?;
    tracing::info!("Database connected successfully");

    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let email_service = services::email::EmailService::from_env();
    if email_service.is_configured() {
        tracing::info!("SMTP email service configured");
    } else {
        tracing::warn!("SMTP not configured, password reset emails will be skipped");
    }

    let static_dir = env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string());
    let app = create_app(&static_dir)
        .layer(Extension(db))
        .layer(Extension(email_service))
        .layer(Extension(FeedConfig::from_env()));

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Validate all required configuration at startup (fail-fast).
fn validate_config() -> anyhow::Result<(JwtConfig, String)> {
    let jwt_config = JwtConfig::from_env()?;

    // DATABASE_URL is checked here for an early error; the connection happens later
    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable must be set"))?;

    Ok((jwt_config, database_url))
}

fn create_app(static_dir: &str) -> Router {
    routes::create_app(static_dir)
        .layer(middleware::from_fn(
            microblog::middleware::security::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, gracefully shutting down...");
}
