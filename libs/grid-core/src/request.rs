//! Request provider contract.
//!
//! Parsing an HTTP request into these values is the web layer's job; the grid
//! only consumes the typed getters. [`GridRequest`] is a ready-made provider
//! that deserializes straight from query/body parameters.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PaginationMethod, RawFilter, SortSpec};

/// Normalized view of one grid request plus configured fallbacks.
pub trait RequestProvider {
    fn page(&self) -> Option<u64>;
    fn method(&self) -> Option<String>;
    fn threshold(&self) -> Option<i64>;
    fn throttle(&self) -> Option<i64>;
    fn sort(&self) -> Vec<SortSpec>;
    fn filters(&self) -> Vec<RawFilter>;

    fn default_method(&self) -> PaginationMethod;
    fn default_threshold(&self) -> i64;
    fn default_throttle(&self) -> i64;
}

/// Configured pagination fallbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    pub method: PaginationMethod,
    pub threshold: i64,
    pub throttle: i64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            method: PaginationMethod::Single,
            threshold: 100,
            throttle: 100,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GridRequest {
    pub page: Option<u64>,
    pub method: Option<String>,
    pub threshold: Option<i64>,
    pub throttle: Option<i64>,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub filters: Value,
    #[serde(skip)]
    pub defaults: Defaults,
}

impl GridRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_threshold(mut self, threshold: i64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_throttle(mut self, throttle: i64) -> Self {
        self.throttle = Some(throttle);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_filters(mut self, filters: Value) -> Self {
        self.filters = filters;
        self
    }
}

impl RequestProvider for GridRequest {
    fn page(&self) -> Option<u64> {
        self.page
    }

    fn method(&self) -> Option<String> {
        self.method.clone()
    }

    fn threshold(&self) -> Option<i64> {
        self.threshold
    }

    fn throttle(&self) -> Option<i64> {
        self.throttle
    }

    fn sort(&self) -> Vec<SortSpec> {
        self.sort.clone()
    }

    fn filters(&self) -> Vec<RawFilter> {
        RawFilter::from_json(&self.filters)
    }

    fn default_method(&self) -> PaginationMethod {
        self.defaults.method
    }

    fn default_threshold(&self) -> i64 {
        self.defaults.threshold
    }

    fn default_throttle(&self) -> i64 {
        self.defaults.throttle
    }
}
