use serde::{Deserialize, Serialize};

/// `?page=N` query parameter, 1-based.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// One page of results plus what a template needs to draw newer/older links.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
    pub prev_num: Option<u64>,
    pub next_num: Option<u64>,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        let prev_num = (page > 1).then(|| page - 1);
        let next_num = (page < total_pages).then(|| page + 1);

        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
            prev_num,
            next_num,
        }
    }

    pub fn map<U: Serialize>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
            prev_num: self.prev_num,
            next_num: self.next_num,
        }
    }
}
