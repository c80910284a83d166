pub mod auth;
pub mod follow;
pub mod post;
pub mod user;

use crate::error::{redirect_found, AppResult};
use crate::pagination::Page;
use crate::utils::flash::set_flash;
use axum::{
    response::{IntoResponse, Response},
    Extension, Json,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde::Serialize;
use serde_json::json;

/// Redirect with a message for the next page.
pub(crate) fn flash_redirect(location: &str, message: &str) -> AppResult<Response> {
    let mut response = redirect_found(location);
    set_flash(&mut response, message)?;
    Ok(response)
}

/// Newer/older links for a paged listing at `base`.
pub(crate) fn page_links<T: Serialize>(
    base: &str,
    page: &Page<T>,
) -> (Option<String>, Option<String>) {
    let link = |n: u64| format!("{base}?page={n}");
    (page.prev_num.map(link), page.next_num.map(link))
}

pub async fn health_check(Extension(db): Extension<DatabaseConnection>) -> impl IntoResponse {
    let backend = db.get_database_backend();
    let db_ok = db
        .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };

    Json(json!({
        "status": status,
        "database": db_ok,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_follow_page_position() {
        let page = Page::<String>::new(vec![], 60, 2, 25);
        let (prev, next) = page_links("/explore", &page);
        assert_eq!(prev.as_deref(), Some("/explore?page=1"));
        assert_eq!(next.as_deref(), Some("/explore?page=3"));

        let last = Page::<String>::new(vec![], 60, 3, 25);
        assert_eq!(page_links("/explore", &last).1, None);
    }
}
