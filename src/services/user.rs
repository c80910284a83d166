use crate::{
    error::{AppError, AppResult},
    models::{user, User, UserModel},
    services::auth::{conflict_on_unique, USERNAME_TAKEN},
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter,
};

pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<UserModel> {
        User::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<UserModel> {
        User::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// True if some user other than `user_id` already has `username`.
    pub async fn username_taken_by_other(&self, user_id: i32, username: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Username.eq(username))
            .filter(user::Column::Id.ne(user_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Change username and about-me text. A blank about-me clears it.
    pub async fn update_profile(
        &self,
        user_id: i32,
        username: &str,
        about_me: Option<String>,
    ) -> AppResult<UserModel> {
        if self.username_taken_by_other(user_id, username).await? {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let existing = self.get_by_id(user_id).await?;
        let about_me = about_me
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        let mut active: user::ActiveModel = existing.into();
        active.username = sea_orm::ActiveValue::Set(username.to_string());
        active.about_me = sea_orm::ActiveValue::Set(about_me);

        let updated = active.update(&self.db).await.map_err(conflict_on_unique)?;
        Ok(updated)
    }

    pub async fn touch_last_seen(&self, user_id: i32) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::LastSeen,
                Expr::value(chrono::Utc::now().naive_utc()),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
