use serde::Serialize;

use crate::config::QueryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

/// Neighbouring pages; a side is omitted when it would be out of range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

/// Offset pagination state. `page` and `limit` are always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u64,
    limit: u64,
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Read `page`/`limit` query text. Unparseable or non-positive input
    /// falls back to page 1 and the configured default limit; a limit above
    /// the configured maximum is capped.
    pub fn from_params(page: Option<&str>, limit: Option<&str>, config: &QueryConfig) -> Self {
        let page = page
            .and_then(parse_int_prefix)
            .filter(|p| *p >= 1)
            .map(|p| p as u64)
            .unwrap_or(1);

        let mut limit = limit
            .and_then(parse_int_prefix)
            .filter(|l| *l >= 1)
            .map(|l| l as u64)
            .unwrap_or_else(|| config.default_limit.max(1));

        if let Some(max_limit) = config.max_limit.filter(|m| *m >= 1) {
            if limit > max_limit {
                if config.debug_logging {
                    tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
                }
                limit = max_limit;
            }
        }

        Self { page, limit }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn take(&self) -> u64 {
        self.limit
    }

    /// `total` must count the records matching the same filter as the page.
    pub fn metadata(&self, total: u64) -> PaginationMeta {
        let limit = self.limit;
        PaginationMeta {
            next: (self.page.saturating_mul(limit) < total).then(|| PageRef {
                page: self.page + 1,
                limit,
            }),
            prev: (self.page > 1).then(|| PageRef {
                page: self.page - 1,
                limit,
            }),
        }
    }
}

/// Leading integer of `text`: `"12abc"` is 12, `"-3"` is -3, `"abc"` is None.
fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let n = digits[..end].parse::<i64>().ok()?;
    Some(if negative { -n } else { n })
}
