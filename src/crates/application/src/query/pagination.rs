use domain::user::UserListQuery;
use log::warn;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;
pub const DEFAULT_SORT_BY: &str = "id";
pub const DEFAULT_ORDER_BY: &str = "desc";

/// Raw list parameters as they arrive from a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub page: i64,
    pub per_page: i64,
    pub sort_by: String,
    pub order_by: String,
    pub name: String,
}

impl ListParams {
    /// Clamps every field to a usable value. Out-of-range values are replaced
    /// by the defaults, never rejected. Applying it twice changes nothing.
    pub fn normalized(mut self) -> Self {
        if self.page < 1 {
            self.page = DEFAULT_PAGE;
        }
        if self.per_page > MAX_PER_PAGE {
            warn!(
                "requested per_page={} exceeds max={}, using default={}",
                self.per_page, MAX_PER_PAGE, DEFAULT_PER_PAGE
            );
            self.per_page = DEFAULT_PER_PAGE;
        } else if self.per_page < 1 {
            self.per_page = DEFAULT_PER_PAGE;
        }
        let last_page = i64::MAX / self.per_page;
        if self.page > last_page {
            warn!("requested page={} is out of range, using page={}", self.page, last_page);
            self.page = last_page;
        }
        if self.sort_by.trim().is_empty() {
            self.sort_by = DEFAULT_SORT_BY.to_string();
        }
        if self.order_by.trim().is_empty() {
            self.order_by = DEFAULT_ORDER_BY.to_string();
        }
        self.name = self.name.trim().to_string();
        self
    }

    pub fn to_query(&self) -> UserListQuery {
        UserListQuery {
            name: self.name.clone(),
            sort_by: self.sort_by.clone(),
            order_by: self.order_by.clone(),
            page: self.page.max(1) as u64,
            per_page: self.per_page.max(1) as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationMeta {
    pub current_page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(current_page: u64, per_page: u64, total_items: u64) -> Self {
        Self {
            current_page,
            per_page,
            total_items,
            total_pages: total_pages(total_items, per_page),
        }
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// Paginated result envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> PaginatedResult<T> {
    pub fn empty(current_page: u64, per_page: u64) -> Self {
        Self {
            data: Vec::new(),
            meta: PaginationMeta::new(current_page, per_page, 0),
        }
    }
}

pub fn total_pages(total_items: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total_items.div_ceil(per_page)
}
