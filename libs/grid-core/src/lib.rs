//! Transport-agnostic data grid model.
//!
//! This crate knows nothing about SQL. It turns loosely typed request input
//! (filter tokens, sort specs, paging knobs) into normalized values and owns the
//! page arithmetic. Compilation into a query belongs to `grid-db`.

pub mod columns;
pub mod filter;
pub mod page;
pub mod params;
pub mod request;
pub mod sort;

pub use columns::{ColumnEntry, Columns};
pub use filter::{
    ColumnFilter, FilterKey, FilterParser, GlobalFilter, Junction, Operator, ParsedFilters,
    RawFilter,
};
pub use page::{calculate_pages, calculate_pagination, PageLayout, PageWindow, PaginationMethod};
pub use params::{AppliedFilter, Parameters};
pub use request::{Defaults, GridRequest, RequestProvider};
pub use sort::{SortDefault, SortSpec};

use thiserror::Error;

/// Errors raised by the transport-agnostic layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid throttle of [{0}], must be [1] or more")]
    InvalidThrottle(i64),

    #[error("unknown pagination method: {0}")]
    UnknownPaginationMethod(String),

    #[error("invalid column entry: {0}")]
    InvalidColumnEntry(String),
}
