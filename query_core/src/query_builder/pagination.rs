use serde::Serialize;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: u64 = 100;

/// A clamped page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Clamp to `page ≥ 1` and `1 ≤ page_size ≤ 100`
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = page.max(1) as u64;
        let page_size = (page_size.max(1) as u64).min(MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of rows plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size.max(1))
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Window arithmetic for fixed-size batch iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    pub batch_size: u64,
    pub index: u64,
}

impl BatchWindow {
    pub fn new(batch_size: u64) -> Self {
        Self {
            batch_size: batch_size.max(1),
            index: 0,
        }
    }

    pub fn offset(&self) -> u64 {
        self.index.saturating_mul(self.batch_size)
    }

    /// A short batch means the source is exhausted
    pub fn is_last(&self, fetched: usize) -> bool {
        (fetched as u64) < self.batch_size
    }

    pub fn advance(&mut self) {
        self.index += 1;
    }
}
