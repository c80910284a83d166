#![allow(dead_code)]

use microblog::models::UserModel;
use reqwest::{redirect::Policy, Client, Response};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Once,
};

static INIT: Once = Once::new();
static USER_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const PASSWORD: &str = "test_password_123";

fn init_env() {
    INIT.call_once(|| {
        std::env::set_var(
            "SECRET_KEY",
            "integration_test_secret_that_is_at_least_32_characters_long",
        );
        std::env::set_var("RATE_LIMIT_ENABLED", "false");
        std::env::set_var("BCRYPT_COST", "4");
        let config = microblog::config::jwt::JwtConfig::from_env().unwrap();
        let _ = microblog::utils::jwt::init_jwt_config(config);
    });
}

pub struct TestApp {
    pub addr: String,
    pub db: DatabaseConnection,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// A second browser against the same server, with its own cookie jar.
    pub fn new_client(&self) -> Client {
        browser()
    }
}

/// Cookie-keeping client that reports redirects instead of following them.
fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// Database with the schema applied, private to the calling test.
pub async fn setup_db() -> DatabaseConnection {
    init_env();
    let db = microblog::config::database::get_database("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database");
    microblog::migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_page_size(25).await
}

pub async fn spawn_app_with_page_size(posts_per_page: u64) -> TestApp {
    let db = setup_db().await;
    let email_service = microblog::services::email::EmailService::disabled(
        "http://localhost:5000".to_string(),
    );

    let app = microblog::routes::create_app("./static")
        .layer(axum::middleware::from_fn(
            microblog::middleware::security::security_headers_middleware,
        ))
        .layer(axum::extract::Extension(db.clone()))
        .layer(axum::extract::Extension(email_service))
        .layer(axum::extract::Extension(
            microblog::config::feed::FeedConfig { posts_per_page },
        ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        addr: format!("http://{}", addr),
        db,
        client: browser(),
    }
}

pub fn unique_username(prefix: &str) -> String {
    let counter = USER_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}{}", prefix, counter)
}

/// Register straight through the service layer.
pub async fn create_user(db: &DatabaseConnection, prefix: &str) -> UserModel {
    let username = unique_username(prefix);
    microblog::services::auth::AuthService::new(db.clone())
        .register(&username, &format!("{}@example.com", username), PASSWORD)
        .await
        .expect("Failed to create user")
}

pub async fn register(client: &Client, app: &TestApp, username: &str, email: &str) -> Response {
    client
        .post(app.url("/register"))
        .form(&[
            ("username", username),
            ("email", email),
            ("password", PASSWORD),
            ("password2", PASSWORD),
        ])
        .send()
        .await
        .expect("Failed to post register form")
}

pub async fn login(client: &Client, app: &TestApp, username: &str, password: &str) -> Response {
    client
        .post(app.url("/login"))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .expect("Failed to post login form")
}

/// Create a user and log the default client in as them.
pub async fn logged_in_user(app: &TestApp, prefix: &str) -> UserModel {
    let user = create_user(&app.db, prefix).await;
    let resp = login(&app.client, app, &user.username, PASSWORD).await;
    assert_eq!(resp.status(), 302, "login failed for {}", user.username);
    user
}

pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
