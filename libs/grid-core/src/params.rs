use serde::{Deserialize, Serialize};

use crate::{ColumnFilter, GlobalFilter, Operator, PageLayout, PageWindow, PaginationMethod, SortSpec};

/// Filter as it was applied, echoed back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AppliedFilter {
    Column {
        column: String,
        operator: Operator,
        value: String,
    },
    Global {
        operator: Operator,
        value: String,
    },
}

impl From<&ColumnFilter> for AppliedFilter {
    fn from(f: &ColumnFilter) -> Self {
        AppliedFilter::Column {
            column: f.column.clone(),
            operator: f.operator,
            value: f.value.clone(),
        }
    }
}

impl From<&GlobalFilter> for AppliedFilter {
    fn from(f: &GlobalFilter) -> Self {
        AppliedFilter::Global {
            operator: f.operator,
            value: f.value.clone(),
        }
    }
}

/// Everything the pipeline derived, built up stage by stage.
///
/// Page fields stay `None` until pagination runs; it does not run for an
/// empty result set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub total: u64,
    pub filtered: u64,
    pub page: Option<u64>,
    pub pages: Option<u64>,
    pub per_page: Option<u64>,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<PaginationMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throttle: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i64>,
    pub filters: Vec<AppliedFilter>,
    pub sort: Vec<SortSpec>,
}

impl Parameters {
    pub fn set_pagination(&mut self, layout: PageLayout, window: PageWindow) {
        self.pages = Some(layout.pages);
        self.per_page = Some(layout.per_page);
        self.page = Some(window.page);
        self.previous_page = window.previous_page;
        self.next_page = window.next_page;
    }

    pub fn is_paginated(&self) -> bool {
        self.page.is_some()
    }
}
