//! Pagination parameters for queries

use serde::{Deserialize, Serialize};

/// Default number of rows per page
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Limit/offset window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// 1-indexed page; page 0 is treated as page 1. The offset saturates.
    pub fn page(page: u64, per_page: u64) -> Self {
        Self {
            limit: per_page,
            offset: page.saturating_sub(1).saturating_mul(per_page),
        }
    }

    /// Whether both bounds fit a signed 64-bit SQL integer
    pub fn fits_sql(&self) -> bool {
        i64::try_from(self.limit).is_ok() && i64::try_from(self.offset).is_ok()
    }

    /// 1-indexed page number of this window
    pub fn page_number(&self) -> u64 {
        if self.limit == 0 {
            1
        } else {
            (self.offset / self.limit) + 1
        }
    }
}
