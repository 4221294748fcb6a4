//! Page window arithmetic for list endpoints.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

/// Page size used when the request does not give a valid `limit`.
pub const DEFAULT_LIMIT: u64 = 25;

/// Upper bound on `limit`.
pub const MAX_LIMIT: u64 = 100;

/// The slice of a filtered result set that one request returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
    pub skip: u64,
    /// Filtered document count
    pub total: u64,
}

impl PaginationWindow {
    /// Resolve raw `page`/`limit` values into a window over `total` documents.
    ///
    /// Missing, non-numeric, zero or negative values fall back to page 1 and
    /// `default_limit`; `limit` is clamped to `max_limit`.
    #[must_use]
    pub fn compute(
        page: Option<&str>,
        limit: Option<&str>,
        total: u64,
        default_limit: u64,
        max_limit: u64,
    ) -> Self {
        let page = positive(page).unwrap_or(1);
        let limit = positive(limit)
            .unwrap_or(default_limit)
            .min(max_limit)
            .max(1);
        Self {
            page,
            limit,
            skip: (page - 1).saturating_mul(limit),
            total,
        }
    }

    #[must_use]
    pub fn next(&self) -> Option<PageRef> {
        (self.skip.saturating_add(self.limit) < self.total).then(|| PageRef {
            page: self.page + 1,
            limit: self.limit,
        })
    }

    #[must_use]
    pub fn prev(&self) -> Option<PageRef> {
        (self.page > 1).then(|| PageRef {
            page: self.page - 1,
            limit: self.limit,
        })
    }

    #[must_use]
    pub fn links(&self) -> PageLinks {
        PageLinks {
            next: self.next(),
            prev: self.prev(),
        }
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
}

/// Target of a `next` or `prev` link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageLinks {
    pub next: Option<PageRef>,
    pub prev: Option<PageRef>,
}
