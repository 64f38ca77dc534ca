//! Data grid execution over SQL.
//!
//! Takes the normalized model from `grid-core` and runs it against a
//! sea-query [`SelectStatement`](sea_orm::sea_query::SelectStatement):
//! filters compile into `Condition`s, sort specs into `ORDER BY`, the page
//! layout into `LIMIT`/`OFFSET`, and rows come back as JSON objects.
//!
//! # Features
//! - `pg`, `mysql`, `sqlite`: enable the matching sea-orm drivers. SQL for all
//!   three backends can be rendered regardless of which drivers are compiled in.
//!
//! # Example
//! ```rust,no_run
//! # async fn demo(conn: sea_orm::DatabaseConnection) -> grid_db::Result<()> {
//! use grid_core::{Columns, GridRequest, SortSpec};
//! use grid_db::{DataGrid, DataSource, ModelDef, Settings};
//! use serde_json::json;
//!
//! let users = ModelDef::new("user", "users").hidden("password");
//! let settings = Settings::new(Columns::new().column("id").alias("users.name", "name"))
//!     .default_sort(SortSpec::asc("id"));
//! let request = GridRequest::new()
//!     .with_filters(json!([{"name": "ada"}]))
//!     .with_page(2);
//!
//! let result = DataGrid::new(DataSource::Model { conn, model: users }, settings, request)?
//!     .run()
//!     .await?;
//! println!("{}", serde_json::to_string(&result).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod config;
pub mod grid;
pub mod hydrate;
pub mod model;
pub mod predicate;
pub mod settings;
pub mod sort;
pub mod source;

pub use attributes::{AttributeStore, SqlAttributeStore};
pub use config::{AttributeTables, GridConfig};
pub use grid::{DataGrid, GridResult, RunOptions, Stage};
pub use model::{column_ref, ModelDef, PivotDef, RelationDef, RelationKind};
pub use predicate::PredicateCompiler;
pub use settings::{FilterFn, FilterStrategy, Settings, SortFn, SortStrategy, TransformFn};
pub use sort::SortCompiler;
pub use source::{DataSource, GridQuery, Row, SelectItem, SourceKind, SqlQuery};

use thiserror::Error;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, GridError>;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid data source: {0}; expected a model, a model query, a has-many or belongs-to-many relationship, or a query")]
    InvalidSource(String),

    #[error("invalid throttle of [{0}], must be [1] or more")]
    InvalidThrottle(i64),

    #[error("sort column [{0}] does not exist in data")]
    SortColumnNotFound(String),

    #[error("unknown relation: {0}")]
    UnknownRelation(String),

    #[error("invalid sort direction: {0}")]
    InvalidSortDirection(String),

    #[error("stage {stage:?} cannot run once the grid reached {current:?}")]
    StageOrder { stage: Stage, current: Stage },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

impl From<grid_core::Error> for GridError {
    fn from(e: grid_core::Error) -> Self {
        match e {
            grid_core::Error::InvalidThrottle(v) => GridError::InvalidThrottle(v),
            other => GridError::Config(other.to_string()),
        }
    }
}

impl From<figment::Error> for GridError {
    fn from(e: figment::Error) -> Self {
        GridError::Config(e.to_string())
    }
}
