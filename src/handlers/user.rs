use crate::config::feed::FeedConfig;
use crate::error::{AppError, AppResult};
use crate::handlers::{flash_redirect, page_links};
use crate::middleware::AuthUser;
use crate::pagination::{Page, PageQuery};
use crate::services::auth::USERNAME_TAKEN;
use crate::services::follow::FollowService;
use crate::services::post::PostService;
use crate::services::user::UserService;
use crate::templates::{
    self, add_field_error, field_errors, page_context, FieldErrors, PostView, ProfileView,
};
use crate::utils::flash::Flash;
use axum::{
    extract::{Path, Query},
    response::{IntoResponse, Response},
    Extension, Form,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct EditProfileForm {
    #[validate(length(min = 1, max = 64, message = "Username must be 1 to 64 characters."))]
    pub username: String,
    #[validate(length(max = 280, message = "About me must be at most 280 characters."))]
    pub about_me: String,
}

/// Profile page with the user's own posts.
pub async fn profile(
    Extension(db): Extension<DatabaseConnection>,
    Extension(feed): Extension<FeedConfig>,
    auth: AuthUser,
    flash: Flash,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let user = UserService::new(db.clone()).get_by_username(&username).await?;

    let follows = FollowService::new(db.clone());
    let followers = follows.followers_count(user.id).await?;
    let following = follows.following_count(user.id).await?;
    let is_following = follows.is_following(auth.user.id, user.id).await?;

    let per_page = feed.posts_per_page;
    let page = query.page();
    let (posts, total) = PostService::new(db)
        .user_posts(user.id, page, per_page)
        .await?;
    let page = Page::new(posts, total, page, per_page)
        .map(|(post, author)| PostView::new(post, &author));
    let base = format!("/user/{}", urlencoding::encode(&user.username));
    let (prev_url, next_url) = page_links(&base, &page);

    let mut context = page_context(&user.username, Some(&auth.user), &flash);
    context.insert("user", &ProfileView::new(&user, followers, following));
    context.insert("is_following", &is_following);
    context.insert("posts", &page.items);
    context.insert("prev_url", &prev_url);
    context.insert("next_url", &next_url);
    Ok(templates::render("user.html", &context)?.into_response())
}

fn render_edit_profile(
    auth: &AuthUser,
    flash: &Flash,
    form: &EditProfileForm,
    errors: &FieldErrors,
) -> AppResult<Response> {
    let mut context = page_context("Edit Profile", Some(&auth.user), flash);
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(templates::render("edit_profile.html", &context)?.into_response())
}

pub async fn edit_profile_page(auth: AuthUser, flash: Flash) -> AppResult<Response> {
    let form = EditProfileForm {
        username: auth.user.username.clone(),
        about_me: auth.user.about_me.clone().unwrap_or_default(),
    };
    render_edit_profile(&auth, &flash, &form, &FieldErrors::new())
}

pub async fn edit_profile(
    Extension(db): Extension<DatabaseConnection>,
    auth: AuthUser,
    flash: Flash,
    Form(form): Form<EditProfileForm>,
) -> AppResult<Response> {
    let service = UserService::new(db);

    let mut errors = form.validate().err().map(|e| field_errors(&e)).unwrap_or_default();
    if errors.is_empty()
        && service
            .username_taken_by_other(auth.user.id, &form.username)
            .await?
    {
        add_field_error(&mut errors, "username", USERNAME_TAKEN);
    }
    if !errors.is_empty() {
        return render_edit_profile(&auth, &flash, &form, &errors);
    }

    match service
        .update_profile(auth.user.id, &form.username, Some(form.about_me.clone()))
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = user.id, "profile updated");
            flash_redirect("/edit_profile", "Your changes have been saved.")
        }
        Err(AppError::Conflict(_)) => {
            add_field_error(&mut errors, "username", USERNAME_TAKEN);
            render_edit_profile(&auth, &flash, &form, &errors)
        }
        Err(e) => Err(e),
    }
}
