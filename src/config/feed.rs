use std::env;

pub const DEFAULT_POSTS_PER_PAGE: u64 = 25;
const MAX_POSTS_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    pub posts_per_page: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let posts_per_page = env::var("POSTS_PER_PAGE")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|n| *n > 0)
            .map(|n| n.min(MAX_POSTS_PER_PAGE))
            .unwrap_or(DEFAULT_POSTS_PER_PAGE);

        Self { posts_per_page }
    }
}
