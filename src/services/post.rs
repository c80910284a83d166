use crate::{
    error::{AppError, AppResult},
    models::{follow, post, user, Follow, Post, PostModel, User, UserModel},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationDef, Select,
};
use std::collections::HashMap;

pub struct PostService {
    db: DatabaseConnection,
}

impl PostService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, user_id: i32, body: &str) -> AppResult<PostModel> {
        let body = body.trim();
        if body.is_empty() || body.chars().count() as u64 > post::MAX_BODY_LEN {
            return Err(AppError::Validation(format!(
                "Post body must be between 1 and {} characters",
                post::MAX_BODY_LEN
            )));
        }

        let new_post = post::ActiveModel {
            body: sea_orm::ActiveValue::Set(body.to_string()),
            timestamp: sea_orm::ActiveValue::Set(chrono::Utc::now().naive_utc()),
            user_id: sea_orm::ActiveValue::Set(user_id),
            ..Default::default()
        };

        let post = new_post.insert(&self.db).await?;
        tracing::debug!(post_id = post.id, user_id, "created post");
        Ok(post)
    }

    /// The feed: `user_id`'s own posts plus posts by everyone they follow,
    /// newest first. One page plus the total count.
    pub async fn following_posts(
        &self,
        user_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<(PostModel, UserModel)>, u64)> {
        self.paginate_with_authors(following_posts_query(user_id), page, per_page)
            .await
    }

    /// Every post from every user, newest first.
    pub async fn explore(
        &self,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<(PostModel, UserModel)>, u64)> {
        let query = Post::find()
            .order_by_desc(post::Column::Timestamp)
            .order_by_desc(post::Column::Id);
        self.paginate_with_authors(query, page, per_page).await
    }

    pub async fn user_posts(
        &self,
        user_id: i32,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<(PostModel, UserModel)>, u64)> {
        let query = Post::find()
            .filter(post::Column::UserId.eq(user_id))
            .order_by_desc(post::Column::Timestamp)
            .order_by_desc(post::Column::Id);
        self.paginate_with_authors(query, page, per_page).await
    }

    async fn paginate_with_authors(
        &self,
        query: Select<Post>,
        page: u64,
        per_page: u64,
    ) -> AppResult<(Vec<(PostModel, UserModel)>, u64)> {
        let paginator = query.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;

        // Past the last page is empty; never hand an unbounded page to the offset math.
        let page_index = page.saturating_sub(1);
        if page_index >= total.div_ceil(per_page.max(1)) {
            return Ok((vec![], total));
        }
        let posts = paginator.fetch_page(page_index).await?;

        let mut author_ids: Vec<i32> = posts.iter().map(|p| p.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        if author_ids.is_empty() {
            return Ok((vec![], total));
        }

        let authors: HashMap<i32, UserModel> = User::find()
            .filter(user::Column::Id.is_in(author_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        // Posts cascade with their author, so every author is present.
        let with_authors = posts
            .into_iter()
            .filter_map(|p| authors.get(&p.user_id).cloned().map(|a| (p, a)))
            .collect();

        Ok((with_authors, total))
    }
}

/// Edges whose followed side is a post's author.
fn author_followers() -> RelationDef {
    Post::belongs_to(Follow)
        .from(post::Column::UserId)
        .to(follow::Column::FollowedId)
        .into()
}

/// Posts visible in `user_id`'s feed.
///
/// Each post is left-joined to the edges pointing at its author, and kept if
/// one of those edges starts at `user_id` or the author is `user_id`. The
/// outer join keeps the user's own posts even when nobody follows them;
/// `DISTINCT` collapses the repeats produced when an author has several
/// followers.
pub fn following_posts_query(user_id: i32) -> Select<Post> {
    Post::find()
        .join(JoinType::LeftJoin, author_followers())
        .filter(
            Condition::any()
                .add(follow::Column::FollowerId.eq(user_id))
                .add(post::Column::UserId.eq(user_id)),
        )
        .distinct()
        .order_by_desc(post::Column::Timestamp)
        .order_by_desc(post::Column::Id)
}
