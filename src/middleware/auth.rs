use crate::{
    error::{AppError, AppResult},
    models::UserModel,
    services::user::UserService,
    utils::{
        cookie::{
            append_set_cookie, build_clear_cookie, extract_cookie, sets_cookie, FLASH_COOKIE,
            SESSION_COOKIE,
        },
        flash::Flash,
        jwt::{decode_session_token, TokenError},
    },
};
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use sea_orm::DatabaseConnection;
use std::convert::Infallible;

/// The logged-in user, resolved from the session cookie.
///
/// Extracting `AuthUser` makes a handler login-only: anonymous requests are
/// bounced to the login page with a `next` parameter. Extract
/// `Option<AuthUser>` on pages that work either way.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserModel,
}

/// Session middleware, run in front of every page.
///
/// Resolves the session cookie into an [`AuthUser`] request extension and
/// bumps the user's last-seen time. A cookie that no longer verifies is
/// treated as logged out and cleared. Also moves the flash cookie into a
/// [`Flash`] extension and clears it once a non-redirect response is served.
pub async fn session_middleware(
    Extension(db): Extension<DatabaseConnection>,
    mut request: Request,
    next: Next,
) -> Response {
    let flash = Flash::from_headers(request.headers());
    let had_flash = flash.0.is_some();
    request.extensions_mut().insert(flash);

    let mut stale_session = false;
    if let Some(token) = extract_cookie(request.headers(), SESSION_COOKIE) {
        match load_session_user(&db, &token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthUser { user });
            }
            Ok(None) => stale_session = true,
            Err(e) => return e.into_response(),
        }
    }

    let mut response = next.run(request).await;

    let mut expired = Vec::new();
    // A flash survives redirects and is consumed by the first page rendered.
    if had_flash && !response.status().is_redirection() && !sets_cookie(&response, FLASH_COOKIE)
    {
        expired.push(FLASH_COOKIE);
    }
    if stale_session && !sets_cookie(&response, SESSION_COOKIE) {
        expired.push(SESSION_COOKIE);
    }
    for name in expired {
        if let Err(e) = append_set_cookie(&mut response, &build_clear_cookie(name)) {
            tracing::warn!("Failed to clear {name} cookie: {e}");
        }
    }

    response
}

async fn load_session_user(
    db: &DatabaseConnection,
    token: &str,
) -> AppResult<Option<UserModel>> {
    let user_id = match decode_session_token(token) {
        Ok(id) => id,
        Err(TokenError::Config(e)) => return Err(AppError::Internal(e)),
        Err(e) => {
            tracing::debug!("ignoring session cookie: {e}");
            return Ok(None);
        }
    };

    let service = UserService::new(db.clone());
    let user = match service.get_by_id(user_id).await {
        Ok(user) => user,
        Err(AppError::NotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    service.touch_last_seen(user.id).await?;
    Ok(Some(user))
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            let next = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| parts.uri.path().to_string());
            AppError::LoginRequired(next)
        })
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

/// Accept a post-login redirect target only if it stays on this site.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/index",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_local() {
        assert_eq!(safe_next(Some("/user/susan")), "/user/susan");
        assert_eq!(safe_next(Some("/explore?page=2")), "/explore?page=2");
        assert_eq!(safe_next(Some("https://evil.example")), "/index");
        assert_eq!(safe_next(Some("//evil.example")), "/index");
        assert_eq!(safe_next(Some("/\\evil.example")), "/index");
        assert_eq!(safe_next(None), "/index");
    }
}
