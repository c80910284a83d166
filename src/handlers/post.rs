use crate::config::feed::FeedConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{flash_redirect, page_links};
use crate::middleware::AuthUser;
use crate::models::UserModel;
use crate::pagination::{Page, PageQuery};
use crate::services::post::PostService;
use crate::templates::{self, add_field_error, field_errors, page_context, FieldErrors, PostView};
use crate::utils::flash::Flash;
use axum::{
    extract::Query,
    response::{IntoResponse, Response},
    Extension, Form,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct PostForm {
    #[validate(length(min = 1, max = 280, message = "Post must be 1 to 280 characters."))]
    pub post: String,
}

async fn render_feed(
    service: &PostService,
    feed: FeedConfig,
    user: &UserModel,
    flash: &Flash,
    page: u64,
    form: &PostForm,
    errors: &FieldErrors,
) -> AppResult<Response> {
    let per_page = feed.posts_per_page;
    let (posts, total) = service.following_posts(user.id, page, per_page).await?;
    let page = Page::new(posts, total, page, per_page)
        .map(|(post, author)| PostView::new(post, &author));
    let (prev_url, next_url) = page_links("/index", &page);

    let mut context = page_context("Home", Some(user), flash);
    context.insert("show_form", &true);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("posts", &page.items);
    context.insert("prev_url", &prev_url);
    context.insert("next_url", &next_url);
    Ok(templates::render("index.html", &context)?.into_response())
}

/// The home feed: own posts plus followed users' posts.
pub async fn index(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<FeedConfig>,
    auth: AuthUser,
    flash: Flash,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let service = PostService::new(db);
    render_feed(
        &service,
        feed,
        &auth.user,
        &flash,
        query.page(),
        &PostForm::default(),
        &FieldErrors::new(),
    )
    .await
}

pub async fn create_post(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<FeedConfig>,
    auth: AuthUser,
    flash: Flash,
    Query(query): Query<PageQuery>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let service = PostService::new(db);

    let mut errors = form.validate().err().map(|e| field_errors(&e)).unwrap_or_default();
    if errors.is_empty() {
        match service.create(auth.user.id, &form.post).await {
            Ok(_) => return flash_redirect("/index", "Your post is now live!"),
            Err(AppError::Validation(message)) => add_field_error(&mut errors, "post", message),
            Err(e) => return Err(e),
        }
    }

    render_feed(&service, feed, &auth.user, &flash, query.page(), &form, &errors).await
}

/// Every post on the site.
pub async fn explore(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<FeedConfig>,
    auth: AuthUser,
    flash: Flash,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let per_page = feed.posts_per_page;
    let page = query.page();
    let (posts, total) = PostService::new(db).explore(page, per_page).await?;
    let page = Page::new(posts, total, page, per_page)
        .map(|(post, author)| PostView::new(post, &author));
    let (prev_url, next_url) = page_links("/explore", &page);

    let mut context = page_context("Explore", Some(&auth.user), &flash);
    context.insert("show_form", &false);
    context.insert("posts", &page.items);
    context.insert("prev_url", &prev_url);
    context.insert("next_url", &next_url);
    Ok(templates::render("index.html", &context)?.into_response())
}
