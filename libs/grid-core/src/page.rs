use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Pagination strategy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMethod {
    /// Fixed page size equal to the throttle.
    #[default]
    Single,
    /// Everything below the threshold on one page, otherwise a fixed number of pages.
    Group,
    /// Same arithmetic as `Single`; the client decides how pages are consumed.
    Infinite,
}

impl PaginationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaginationMethod::Single => "single",
            PaginationMethod::Group => "group",
            PaginationMethod::Infinite => "infinite",
        }
    }
}

impl fmt::Display for PaginationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaginationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(PaginationMethod::Single),
            "group" => Ok(PaginationMethod::Group),
            "infinite" => Ok(PaginationMethod::Infinite),
            other => Err(Error::UnknownPaginationMethod(other.to_string())),
        }
    }
}

/// Result of [`calculate_pagination`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLayout {
    pub pages: u64,
    pub per_page: u64,
}

/// Result of [`calculate_pages`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
}

/// Computes page count and page size for `filtered` rows.
///
/// Fails when `throttle` is below 1. For `group`, a result set smaller than
/// `threshold` fits on one page; otherwise it is spread evenly over
/// `ceil(threshold / throttle)` pages. The reported page count only covers
/// pages that hold rows, so it can come out below that target (101 rows over
/// 100 pages of 2 fill 51).
pub fn calculate_pagination(
    filtered: u64,
    method: PaginationMethod,
    threshold: i64,
    throttle: i64,
) -> Result<PageLayout, Error> {
    if throttle < 1 {
        return Err(Error::InvalidThrottle(throttle));
    }
    let throttle = throttle as u64;

    let layout = match method {
        PaginationMethod::Group => {
            let threshold = threshold.max(0) as u64;
            if filtered < threshold {
                PageLayout {
                    pages: 1,
                    per_page: filtered,
                }
            } else {
                let target = threshold.div_ceil(throttle).max(1);
                let per_page = filtered.div_ceil(target);
                PageLayout {
                    pages: filtered.div_ceil(per_page.max(1)).max(1),
                    per_page,
                }
            }
        }
        PaginationMethod::Single | PaginationMethod::Infinite => PageLayout {
            pages: filtered.div_ceil(throttle),
            per_page: throttle,
        },
    };

    Ok(layout)
}

/// Clamps `requested_page` into the available range and derives neighbours.
pub fn calculate_pages(filtered: u64, requested_page: u64, per_page: u64) -> PageWindow {
    let pages = if per_page == 0 {
        0
    } else {
        filtered.div_ceil(per_page)
    };

    let page = requested_page.min(pages).max(1);

    PageWindow {
        page,
        previous_page: (page > 1).then(|| page - 1),
        next_page: (page < pages).then(|| page + 1),
    }
}
