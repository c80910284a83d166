use crate::error::{AppError, AppResult};
use crate::handlers::flash_redirect;
use crate::middleware::AuthUser;
use crate::services::follow::FollowService;
use crate::services::user::UserService;
use axum::{extract::Path, response::Response, Extension};
use sea_orm::DatabaseConnection;

fn profile_url(username: &str) -> String {
    format!("/user/{}", urlencoding::encode(username))
}

pub async fn follow(
    Extension(db): Extension<DatabaseConnection>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let target = match UserService::new(db.clone()).get_by_username(&username).await {
        Ok(user) => user,
        Err(AppError::NotFound) => {
            return flash_redirect("/index", &format!("User {username} not found."));
        }
        Err(e) => return Err(e),
    };
    if target.id == auth.user.id {
        return flash_redirect(&profile_url(&username), "You cannot follow yourself!");
    }

    FollowService::new(db).follow(auth.user.id, target.id).await?;
    tracing::debug!(follower = auth.user.id, followed = target.id, "follow");
    flash_redirect(
        &profile_url(&username),
        &format!("You are following {username}!"),
    )
}

pub async fn unfollow(
    Extension(db): Extension<DatabaseConnection>,
    auth: AuthUser,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let target = match UserService::new(db.clone()).get_by_username(&username).await {
        Ok(user) => user,
        Err(AppError::NotFound) => {
            return flash_redirect("/index", &format!("User {username} not found."));
        }
        Err(e) => return Err(e),
    };
    if target.id == auth.user.id {
        return flash_redirect(&profile_url(&username), "You cannot unfollow yourself!");
    }

    FollowService::new(db)
        .unfollow(auth.user.id, target.id)
        .await?;
    tracing::debug!(follower = auth.user.id, followed = target.id, "unfollow");
    flash_redirect(
        &profile_url(&username),
        &format!("You are not following {username}."),
    )
}
