use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use grid_core::{Columns, Operator, PaginationMethod, SortDefault, SortSpec};
use sea_orm::sea_query::SelectStatement;

use crate::source::Row;

/// Custom column or global filter: `(statement, operator, value)`.
pub type FilterFn = Arc<dyn Fn(&mut SelectStatement, Operator, &str) + Send + Sync>;
/// Custom sort: `(statement, direction)`.
pub type SortFn = Arc<dyn Fn(&mut SelectStatement, Option<&str>) + Send + Sync>;
/// Replaces default row shaping.
pub type TransformFn = Arc<dyn Fn(Row) -> Row + Send + Sync>;

#[derive(Clone)]
pub enum FilterStrategy {
    Builtin,
    Custom(FilterFn),
}

#[derive(Clone)]
pub enum SortStrategy {
    Builtin,
    Custom(SortFn),
}

/// Per-grid configuration.
///
/// Custom filters and sorts are keyed by real column name.
#[derive(Clone, Default)]
pub struct Settings {
    pub columns: Columns,
    pub filters: HashMap<String, FilterStrategy>,
    pub sorts: HashMap<String, SortStrategy>,
    /// Used when the request asks for no sort.
    pub sort: Vec<SortSpec>,
    /// Replaces the built-in global filter entirely.
    pub global: Option<FilterFn>,
    pub transformer: Option<TransformFn>,
    pub method: Option<PaginationMethod>,
    pub threshold: Option<i64>,
    pub throttle: Option<i64>,
}

impl Settings {
    pub fn new(columns: Columns) -> Self {
        Self {
            columns,
            ..Default::default()
        }
    }

    pub fn filter<F>(mut self, column: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut SelectStatement, Operator, &str) + Send + Sync + 'static,
    {
        self.filters
            .insert(column.into(), FilterStrategy::Custom(Arc::new(f)));
        self
    }

    pub fn sort_with<F>(mut self, column: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut SelectStatement, Option<&str>) + Send + Sync + 'static,
    {
        self.sorts
            .insert(column.into(), SortStrategy::Custom(Arc::new(f)));
        self
    }

    pub fn default_sort(mut self, sort: impl Into<SortDefault>) -> Self {
        self.sort = sort.into().into_vec();
        self
    }

    pub fn global<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut SelectStatement, Operator, &str) + Send + Sync + 'static,
    {
        self.global = Some(Arc::new(f));
        self
    }

    pub fn transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(Row) -> Row + Send + Sync + 'static,
    {
        self.transformer = Some(Arc::new(f));
        self
    }

    pub fn method(mut self, method: PaginationMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn threshold(mut self, threshold: i64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn throttle(mut self, throttle: i64) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn custom_filter(&self, column: &str) -> Option<&FilterFn> {
        match self.filters.get(column) {
            Some(FilterStrategy::Custom(f)) => Some(f),
            _ => None,
        }
    }

    pub fn custom_sort(&self, column: &str) -> Option<&SortFn> {
        match self.sorts.get(column) {
            Some(SortStrategy::Custom(f)) => Some(f),
            _ => None,
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<_> = self.filters.keys().collect();
        filters.sort();
        let mut sorts: Vec<_> = self.sorts.keys().collect();
        sorts.sort();
        f.debug_struct("Settings")
            .field("columns", &self.columns)
            .field("filters", &filters)
            .field("sorts", &sorts)
            .field("sort", &self.sort)
            .field("global", &self.global.is_some())
            .field("transformer", &self.transformer.is_some())
            .field("method", &self.method)
            .field("threshold", &self.threshold)
            .field("throttle", &self.throttle)
            .finish()
    }
}
