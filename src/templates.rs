//! HTML rendering with Tera.
//!
//! Templates are compiled into the binary with `include_str!` and parsed once
//! on first use. Autoescaping is on for every `.html` template.

use crate::error::AppResult;
use crate::models::{PostModel, UserModel};
use crate::utils::flash::Flash;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tera::{Context, Tera};
use validator::ValidationErrors;

static TEMPLATES: OnceLock<Tera> = OnceLock::new();

const SOURCES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("_post.html", include_str!("../templates/_post.html")),
    ("macros.html", include_str!("../templates/macros.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("user.html", include_str!("../templates/user.html")),
    ("edit_profile.html", include_str!("../templates/edit_profile.html")),
    (
        "reset_password_request.html",
        include_str!("../templates/reset_password_request.html"),
    ),
    ("reset_password.html", include_str!("../templates/reset_password.html")),
    ("error.html", include_str!("../templates/error.html")),
    (
        "email/reset_password.txt",
        include_str!("../templates/email/reset_password.txt"),
    ),
];

fn build() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(SOURCES.iter().copied())?;
    Ok(tera)
}

fn engine() -> tera::Result<&'static Tera> {
    if let Some(tera) = TEMPLATES.get() {
        return Ok(tera);
    }
    let tera = build()?;
    Ok(TEMPLATES.get_or_init(|| tera))
}

/// Parse every template up front so a broken template fails startup.
pub fn init() -> tera::Result<()> {
    engine().map(|_| ())
}

pub fn render(name: &str, context: &Context) -> AppResult<Html<String>> {
    Ok(Html(engine()?.render(name, context)?))
}

pub fn render_text(name: &str, context: &Context) -> AppResult<String> {
    Ok(engine()?.render(name, context)?)
}

/// Error pages must render even when the template engine itself is broken.
pub fn render_error(status: StatusCode, message: &str) -> Response {
    let mut context = Context::new();
    context.insert("title", status.canonical_reason().unwrap_or("Error"));
    context.insert("status", &status.as_u16());
    context.insert("message", message);
    context.insert("current_user", &None::<()>);
    context.insert("flash", &None::<String>);

    match engine().and_then(|tera| tera.render("error.html", &context)) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {:?}", e);
            (status, message.to_string()).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct CurrentUserView<'a> {
    id: i32,
    username: &'a str,
}

/// Context shared by every page: title, logged-in user and flash message.
pub fn page_context(title: &str, current_user: Option<&UserModel>, flash: &Flash) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert(
        "current_user",
        &current_user.map(|u| CurrentUserView {
            id: u.id,
            username: &u.username,
        }),
    );
    context.insert("flash", &flash.0);
    context
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i32,
    pub body: String,
    pub timestamp: String,
    pub author: String,
    pub avatar: String,
}

impl PostView {
    pub fn new(post: PostModel, author: &UserModel) -> Self {
        Self {
            id: post.id,
            body: post.body,
            timestamp: format_timestamp(&post.timestamp),
            author: author.username.clone(),
            avatar: author.avatar(36),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub username: String,
    pub about_me: Option<String>,
    pub last_seen: String,
    pub avatar: String,
    pub followers_count: u64,
    pub following_count: u64,
}

impl ProfileView {
    pub fn new(user: &UserModel, followers_count: u64, following_count: u64) -> Self {
        Self {
            username: user.username.clone(),
            about_me: user.about_me.clone(),
            last_seen: format_timestamp(&user.last_seen),
            avatar: user.avatar(128),
            followers_count,
            following_count,
        }
    }
}

pub fn format_timestamp(ts: &chrono::NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Field name to messages, in the shape templates iterate over.
pub type FieldErrors = HashMap<String, Vec<String>>;

pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

pub fn add_field_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}
