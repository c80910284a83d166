use crate::error::{redirect_found, AppError, AppResult};
use crate::handlers::flash_redirect;
use crate::middleware::auth::safe_next;
use crate::middleware::AuthUser;
use crate::models::UserModel;
use crate::services::auth::{AuthService, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::services::email::EmailService;
use crate::templates::{self, add_field_error, field_errors, page_context, FieldErrors};
use crate::utils::cookie::{append_set_cookie, build_clear_cookie, build_cookie, SESSION_COOKIE};
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
pub struct LoginForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    pub remember_me: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct RegisterForm {
    #[validate(length(min = 1, max = 64, message = "Username must be 1 to 64 characters."))]
    pub username: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Field must be equal to password."))]
    pub password2: String,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ResetPasswordRequestForm {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
}

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct ResetPasswordForm {
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Field must be equal to password."))]
    pub password2: String,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

fn already_logged_in(auth: &Option<AuthUser>) -> Option<Response> {
    auth.as_ref().map(|_| redirect_found("/index"))
}

fn render_login(
    flash: &Flash,
    form: &LoginForm,
    errors: &FieldErrors,
    login_error: Option<&str>,
) -> AppResult<Response> {
    let mut context = page_context("Sign In", None, flash);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("login_error", &login_error);
    Ok(templates::render("login.html", &context)?.into_response())
}

pub async fn login_page(auth: Option<AuthUser>, flash: Flash) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }
    render_login(&flash, &LoginForm::default(), &FieldErrors::new(), None)
}

pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    auth: Option<AuthUser>,
    flash: Flash,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }
    if let Err(e) = form.validate() {
        return render_login(&flash, &form, &field_errors(&e), None);
    }

    let service = AuthService::new(db);
    let user = match service.login(&form.username, &form.password).await {
        Ok(user) => user,
        Err(AppError::Unauthorized) => {
            tracing::debug!(username = %form.username, "failed login");
            return render_login(
                &flash,
                &form,
                &FieldErrors::new(),
                Some("Invalid username or password"),
            );
        }
        Err(e) => return Err(e),
    };

    let session = service.issue_session(&user, form.remember_me.is_some())?;
    let mut response = redirect_found(safe_next(query.next.as_deref()));
    append_set_cookie(
        &mut response,
        &build_cookie(SESSION_COOKIE, &session.token, session.max_age),
    )?;

    tracing::info!(user_id = user.id, "user logged in");
    Ok(response)
}

pub async fn logout() -> AppResult<Response> {
    let mut response = redirect_found("/index");
    append_set_cookie(&mut response, &build_clear_cookie(SESSION_COOKIE))?;
    Ok(response)
}

fn render_register(flash: &Flash, form: &RegisterForm, errors: &FieldErrors) -> AppResult<Response> {
    let mut context = page_context("Register", None, flash);
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(templates::render("register.html", &context)?.into_response())
}

pub async fn register_page(auth: Option<AuthUser>, flash: Flash) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }
    render_register(&flash, &RegisterForm::default(), &FieldErrors::new())
}

pub async fn register(
    Extension(db): Extension<DatabaseConnection>,
    auth: Option<AuthUser>,
    flash: Flash,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }

    let mut errors = form.validate().err().map(|e| field_errors(&e)).unwrap_or_default();
    let service = AuthService::new(db);
    if !form.username.is_empty() && service.username_taken(&form.username).await? {
        add_field_error(&mut errors, "username", USERNAME_TAKEN);
    }
    if !form.email.is_empty() && service.email_taken(&form.email).await? {
        add_field_error(&mut errors, "email", EMAIL_TAKEN);
    }
    if !errors.is_empty() {
        return render_register(&flash, &form, &errors);
    }

    match service.register(&form.username, &form.email, &form.password).await {
        Ok(_) => flash_redirect("/login", "Congratulations, you are now a registered user!"),
        Err(AppError::Conflict(message)) => {
            let field = if message == EMAIL_TAKEN { "email" } else { "username" };
            add_field_error(&mut errors, field, message);
            render_register(&flash, &form, &errors)
        }
        Err(e) => Err(e),
    }
}

fn render_reset_request(
    flash: &Flash,
    form: &ResetPasswordRequestForm,
    errors: &FieldErrors,
) -> AppResult<Response> {
    let mut context = page_context("Reset Password", None, flash);
    context.insert("form", form);
    context.insert("errors", errors);
    Ok(templates::render("reset_password_request.html", &context)?.into_response())
}

pub async fn reset_password_request_page(
    auth: Option<AuthUser>,
    flash: Flash,
) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }
    render_reset_request(&flash, &ResetPasswordRequestForm::default(), &FieldErrors::new())
}

pub async fn reset_password_request(
    Extension(db): Extension<DatabaseConnection>,
    Extension(email_service): Extension<EmailService>,
    auth: Option<AuthUser>,
    flash: Flash,
    Form(form): Form<ResetPasswordRequestForm>,
) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }
    if let Err(e) = form.validate() {
        return render_reset_request(&flash, &form, &field_errors(&e));
    }

    AuthService::new(db)
        .request_password_reset(&form.email, &email_service)
        .await?;

    flash_redirect(
        "/login",
        "Check your email for the instructions to reset your password",
    )
}

fn render_reset(flash: &Flash, errors: &FieldErrors) -> AppResult<Response> {
    let mut context = page_context("Reset Your Password", None, flash);
    context.insert("errors", errors);
    Ok(templates::render("reset_password.html", &context)?.into_response())
}

/// Resolve the token in the link, or send the visitor away with a message.
async fn reset_target(
    service: &AuthService,
    token: &str,
) -> AppResult<Result<UserModel, Response>> {
    match service.verify_reset_password_token(token).await {
        Ok(user) => Ok(Ok(user)),
        Err(AppError::InvalidResetToken) => Ok(Err(flash_redirect(
            "/index",
            "The password reset link is invalid or has expired.",
        )?)),
        Err(e) => Err(e),
    }
}

pub async fn reset_password_page(
    Extension(db): Extension<DatabaseConnection>,
    auth: Option<AuthUser>,
    flash: Flash,
    Path(token): Path<String>,
) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }
    let service = AuthService::new(db);
    if let Err(redirect) = reset_target(&service, &token).await? {
        return Ok(redirect);
    }
    render_reset(&flash, &FieldErrors::new())
}

pub async fn reset_password(
    Extension(db): Extension<DatabaseConnection>,
    auth: Option<AuthUser>,
    flash: Flash,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> AppResult<Response> {
    if let Some(redirect) = already_logged_in(&auth) {
        return Ok(redirect);
    }
    let service = AuthService::new(db);
    let user = match reset_target(&service, &token).await? {
        Ok(user) => user,
        Err(redirect) => return Ok(redirect),
    };

    if let Err(e) = form.validate() {
        return render_reset(&flash, &field_errors(&e));
    }

    service.reset_password(user, &form.password).await?;
    flash_redirect("/login", "Your password has been reset.")
}
