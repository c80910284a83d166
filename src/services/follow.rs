use crate::{
    error::{AppError, AppResult},
    models::{follow, Follow},
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, SqlErr,
};

pub struct FollowService {
    db: DatabaseConnection,
}

impl FollowService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Add the edge `follower_id -> followed_id`.
    /// Returns false if it already existed.
    pub async fn follow(&self, follower_id: i32, followed_id: i32) -> AppResult<bool> {
        if follower_id == followed_id {
            return Err(AppError::Validation("You cannot follow yourself!".to_string()));
        }
        if self.is_following(follower_id, followed_id).await? {
            return Ok(false);
        }

        let edge = follow::ActiveModel {
            follower_id: sea_orm::ActiveValue::Set(follower_id),
            followed_id: sea_orm::ActiveValue::Set(followed_id),
        };

        match Follow::insert(edge).exec_without_returning(&self.db).await {
            Ok(_) => Ok(true),
            // Lost a race with an identical request; the edge exists either way.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the edge if present. Returns false if there was none.
    pub async fn unfollow(&self, follower_id: i32, followed_id: i32) -> AppResult<bool> {
        let result = Follow::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FollowedId.eq(followed_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn is_following(&self, follower_id: i32, followed_id: i32) -> AppResult<bool> {
        let count = Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FollowedId.eq(followed_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Number of users following `user_id`.
    pub async fn followers_count(&self, user_id: i32) -> AppResult<u64> {
        Ok(Follow::find()
            .filter(follow::Column::FollowedId.eq(user_id))
            .count(&self.db)
            .await?)
    }

    /// Number of users `user_id` follows.
    pub async fn following_count(&self, user_id: i32) -> AppResult<u64> {
        Ok(Follow::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .count(&self.db)
            .await?)
    }
}
