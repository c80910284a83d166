use crate::{
    error::{AppError, AppResult},
    models::{user, User, UserModel},
    services::email::EmailService,
    utils::jwt::{self, TokenError},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, SqlErr, TransactionTrait,
};

pub const USERNAME_TAKEN: &str = "Please use a different username.";
pub const EMAIL_TAKEN: &str = "Please use a different email address.";

/// A signed session token and the cookie lifetime to go with it. `None`
/// means a browser-session cookie.
pub struct Session {
    pub token: String,
    pub max_age: Option<u64>,
}

pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn username_taken(&self, username: &str) -> AppResult<bool> {
        username_exists(&self.db, username).await
    }

    pub async fn email_taken(&self, email: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Email.eq(email))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Create an account. The uniqueness checks and the insert share one
    /// transaction; the unique indexes catch anything that races past them.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> AppResult<UserModel> {
        let txn = self.db.begin().await?;

        if username_exists(&txn, username).await? {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }
        let email_count = User::find()
            .filter(user::Column::Email.eq(email))
            .count(&txn)
            .await?;
        if email_count > 0 {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let mut new_user = user::ActiveModel {
            username: sea_orm::ActiveValue::Set(username.to_string()),
            email: sea_orm::ActiveValue::Set(email.to_string()),
            about_me: sea_orm::ActiveValue::Set(None),
            last_seen: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            ..Default::default()
        };
        new_user.set_password(password)?;

        let user = new_user.insert(&txn).await.map_err(conflict_on_unique)?;
        txn.commit().await?;

        tracing::info!(user_id = user.id, username = %user.username, "registered new user");
        Ok(user)
    }

    /// Verify credentials. Unknown users and wrong passwords produce the
    /// same error.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<UserModel> {
        let user = User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !user.check_password(password)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    pub fn issue_session(&self, user: &UserModel, remember_me: bool) -> AppResult<Session> {
        let config = jwt::config()?;
        let (ttl, max_age) = if remember_me {
            (config.remember_me_expiry, Some(config.remember_me_expiry))
        } else {
            (config.session_expiry, None)
        };
        let token = jwt::encode_session_token(user.id, ttl as i64)?;
        Ok(Session { token, max_age })
    }

    pub fn reset_password_token(&self, user: &UserModel) -> AppResult<String> {
        let ttl = jwt::config()?.reset_token_expiry;
        Ok(jwt::encode_reset_password_token(&user.username, ttl as i64)?)
    }

    /// Resolve a reset token to its user. Every failure, from a bad
    /// signature to an expired token to a since-renamed user, collapses to
    /// `InvalidResetToken`; the precise cause is only logged.
    pub async fn verify_reset_password_token(&self, token: &str) -> AppResult<UserModel> {
        let username = match jwt::decode_reset_password_token(token) {
            Ok(username) => username,
            Err(TokenError::Config(e)) => return Err(AppError::Internal(e)),
            Err(e) => {
                tracing::debug!("rejected reset token: {e}");
                return Err(AppError::InvalidResetToken);
            }
        };

        User::find()
            .filter(user::Column::Username.eq(username.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                tracing::debug!("reset token names unknown user {username}");
                AppError::InvalidResetToken
            })
    }

    /// Mail a reset link if the address belongs to an account. Succeeds
    /// either way so the form does not reveal which emails are registered.
    pub async fn request_password_reset(
        &self,
        email: &str,
        email_service: &EmailService,
    ) -> AppResult<()> {
        let Some(user) = User::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
        else {
            return Ok(());
        };

        let token = self.reset_password_token(&user)?;
        if let Err(e) = email_service
            .send_password_reset_email(&user.email, &user.username, &token)
            .await
        {
            tracing::warn!("Failed to send password reset email: {e}");
        }
        Ok(())
    }

    pub async fn reset_password(&self, user: UserModel, new_password: &str) -> AppResult<()> {
        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.set_password(new_password)?;
        active.update(&self.db).await?;
        tracing::info!(user_id, "password reset");
        Ok(())
    }
}

async fn username_exists<C: ConnectionTrait>(conn: &C, username: &str) -> AppResult<bool> {
    let count = User::find()
        .filter(user::Column::Username.eq(username))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Map a unique-index violation to a user-facing conflict.
pub(crate) fn conflict_on_unique(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            tracing::debug!("unique constraint violated: {detail}");
            AppError::Conflict("Username or email already exists".to_string())
        }
        _ => AppError::Database(err),
    }
}
