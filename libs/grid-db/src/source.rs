//! Query capabilities the pipeline relies on, and the sea-orm adapter.
//!
//! [`DataSource`] is everything a grid may be built from. Validation turns it
//! into one [`SqlQuery`]; the pipeline only ever talks to [`GridQuery`].

use std::fmt;

use async_trait::async_trait;
use sea_orm::sea_query::{
    Alias, Asterisk, ColumnRef, Condition, ConditionalStatement, Expr, Func, IntoIden,
    Order, OrderedStatement, Query, SelectStatement, SimpleExpr,
};
use sea_orm::{ConnectionTrait, DbBackend, FromQueryResult, JsonValue, Value};
use tracing::debug;

use crate::model::{column_ref, qualified, ModelDef, RelationKind};
use crate::{GridError, Result};

/// One hydrated record, keyed by exposed column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A column to add to the select list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectItem {
    pub column: String,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: None,
        }
    }

    pub fn aliased(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: Some(alias.into()),
        }
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} as {}", self.column, alias),
            None => f.write_str(&self.column),
        }
    }
}

/// Minimal query surface the grid pipeline needs.
///
/// For relationship sources the statement is the related-table query the
/// relation wraps.
#[async_trait]
pub trait GridQuery: Send + Sync {
    fn backend(&self) -> DbBackend;

    fn statement(&self) -> &SelectStatement;

    fn statement_mut(&mut self) -> &mut SelectStatement;

    /// Present for model and model-query sources only.
    fn model(&self) -> Option<&ModelDef>;

    fn model_mut(&mut self) -> Option<&mut ModelDef>;

    /// Textual select expressions, e.g. `"bar.baz as qux"`.
    fn selected(&self) -> &[String];

    fn add_select(&mut self, items: &[SelectItem]);

    async fn count(&self) -> Result<u64>;

    async fn fetch(&self) -> Result<Vec<Row>>;

    fn supports_regex(&self) -> bool {
        self.backend() == DbBackend::MySql
    }

    fn filter(&mut self, condition: Condition) {
        self.statement_mut().cond_where(condition);
    }

    /// `direction` is matched case-insensitively; `None` means ascending.
    fn order_by(&mut self, column: &str, direction: Option<&str>) -> Result<()> {
        let order = match direction.map(|d| d.trim().to_ascii_lowercase()) {
            None => Order::Asc,
            Some(d) if d == "asc" => Order::Asc,
            Some(d) if d == "desc" => Order::Desc,
            Some(d) => return Err(GridError::InvalidSortDirection(d)),
        };
        self.statement_mut().order_by(column_ref(column), order);
        Ok(())
    }

    fn for_page(&mut self, page: u64, per_page: u64) {
        let offset = page.saturating_sub(1) * per_page;
        self.statement_mut().limit(per_page).offset(offset);
    }

    fn limit(&mut self, n: u64) {
        self.statement_mut().limit(n);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Query,
    ModelQuery,
    HasMany,
    BelongsToMany,
}

/// sea-query statement bound to a connection.
#[derive(Clone, Debug)]
pub struct SqlQuery<C> {
    conn: C,
    kind: SourceKind,
    table: String,
    stmt: SelectStatement,
    model: Option<ModelDef>,
    selected: Vec<String>,
}

impl<C: ConnectionTrait> SqlQuery<C> {
    /// Bare query over `table`.
    pub fn table(conn: C, table: impl Into<String>) -> Self {
        let table = table.into();
        let mut stmt = SelectStatement::new();
        stmt.from(Alias::new(&table));
        Self {
            conn,
            kind: SourceKind::Query,
            table,
            stmt,
            model: None,
            selected: Vec::new(),
        }
    }

    /// Query built from a model; keeps the model metadata for EAV and relation filters.
    pub fn for_model(conn: C, model: ModelDef) -> Self {
        Self {
            conn,
            kind: SourceKind::ModelQuery,
            table: model.table.clone(),
            stmt: model.new_query(),
            model: Some(model),
            selected: Vec::new(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Adds `GROUP BY column`.
    pub fn group_by(&mut self, column: &str) -> &mut Self {
        self.stmt.group_by_col(column_ref(column));
        self
    }

    /// Raw select expression; its alias is recorded so sorting can find it.
    pub fn select_expr(&mut self, expr: impl Into<SimpleExpr>, alias: &str) -> &mut Self {
        self.stmt.expr_as(expr, Alias::new(alias));
        self.selected.push(alias.to_string());
        self
    }

    fn select_statement(&self) -> SelectStatement {
        let mut stmt = self.stmt.clone();
        if self.selected.is_empty() {
            stmt.column(ColumnRef::TableAsterisk(Alias::new(&self.table).into_iden()));
        }
        stmt
    }
}

#[async_trait]
impl<C> GridQuery for SqlQuery<C>
where
    C: ConnectionTrait + Send + Sync,
{
    fn backend(&self) -> DbBackend {
        self.conn.get_database_backend()
    }

    fn statement(&self) -> &SelectStatement {
        &self.stmt
    }

    fn statement_mut(&mut self) -> &mut SelectStatement {
        &mut self.stmt
    }

    fn model(&self) -> Option<&ModelDef> {
        self.model.as_ref()
    }

    fn model_mut(&mut self) -> Option<&mut ModelDef> {
        self.model.as_mut()
    }

    fn selected(&self) -> &[String] {
        &self.selected
    }

    fn add_select(&mut self, items: &[SelectItem]) {
        for item in items {
            match &item.alias {
                Some(alias) => {
                    self.stmt
                        .expr_as(Expr::col(column_ref(&item.column)), Alias::new(alias));
                }
                None => {
                    self.stmt.column(column_ref(&item.column));
                }
            }
            self.selected.push(item.to_string());
        }
    }

    /// Counts the rows the statement yields, wrapped as
    /// `SELECT COUNT(*) FROM (<stmt>) AS aggregate_table`.
    ///
    /// Wrapping keeps the count right for grouped statements however the
    /// grouping was added.
    async fn count(&self) -> Result<u64> {
        let mut inner = self.select_statement();
        inner.clear_order_by();

        let stmt = Query::select()
            .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("aggregate"))
            .from_subquery(inner, Alias::new("aggregate_table"))
            .to_owned();

        let backend = self.backend();
        let row = self.conn.query_one(backend.build(&stmt)).await?;
        let count = match row {
            Some(row) => row.try_get::<i64>("", "aggregate")?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    async fn fetch(&self) -> Result<Vec<Row>> {
        let backend = self.backend();
        let stmt = backend.build(&self.select_statement());
        debug!(sql = %stmt, "fetching grid rows");

        let values = JsonValue::find_by_statement(stmt).all(&self.conn).await?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .collect())
    }
}

/// Everything a grid can be built from.
pub enum DataSource<C> {
    /// Bare query, used as is.
    Query(SqlQuery<C>),
    /// Model; a fresh query over its table is created.
    Model { conn: C, model: ModelDef },
    /// Query already built from a model.
    ModelQuery(SqlQuery<C>),
    /// Related rows of one parent through a has-many relation.
    HasMany {
        conn: C,
        parent: ModelDef,
        parent_key: Value,
        relation: String,
    },
    /// Related rows of one parent through a many-to-many relation.
    BelongsToMany {
        conn: C,
        parent: ModelDef,
        parent_key: Value,
        relation: String,
    },
}

impl<C: ConnectionTrait> DataSource<C> {
    /// Normalizes the source into a query or fails with [`GridError::InvalidSource`].
    pub fn validate(self) -> Result<SqlQuery<C>> {
        match self {
            DataSource::Query(query) => {
                ensure_table(&query.table)?;
                Ok(query)
            }
            DataSource::ModelQuery(query) => {
                ensure_table(&query.table)?;
                if query.model.is_none() {
                    return Err(GridError::InvalidSource(
                        "model query without model metadata".to_string(),
                    ));
                }
                Ok(query)
            }
            DataSource::Model { conn, model } => {
                ensure_table(&model.table)?;
                Ok(SqlQuery::for_model(conn, model))
            }
            DataSource::HasMany {
                conn,
                parent,
                parent_key,
                relation,
            } => relation_query(conn, &parent, parent_key, &relation, SourceKind::HasMany),
            DataSource::BelongsToMany {
                conn,
                parent,
                parent_key,
                relation,
            } => relation_query(conn, &parent, parent_key, &relation, SourceKind::BelongsToMany),
        }
    }
}

fn ensure_table(table: &str) -> Result<()> {
    if table.trim().is_empty() {
        return Err(GridError::InvalidSource("no table".to_string()));
    }
    Ok(())
}

fn relation_query<C: ConnectionTrait>(
    conn: C,
    parent: &ModelDef,
    parent_key: Value,
    name: &str,
    kind: SourceKind,
) -> Result<SqlQuery<C>> {
    let relation = parent.relations.get(name).ok_or_else(|| {
        GridError::InvalidSource(format!("relation `{name}` is not defined on `{}`", parent.table))
    })?;
    ensure_table(&relation.table)?;
    if is_null(&parent_key) {
        return Err(GridError::InvalidSource(format!(
            "relation `{name}` has no parent key"
        )));
    }

    let mut query = SqlQuery::table(conn, relation.table.clone());
    query.kind = kind;

    match (&relation.kind, kind) {
        (
            RelationKind::HasMany { foreign_key, .. },
            SourceKind::HasMany,
        ) => {
            query
                .stmt
                .and_where(Expr::col(qualified(&relation.table, foreign_key)).eq(parent_key));
        }
        (RelationKind::BelongsToMany(pivot), SourceKind::BelongsToMany) => {
            query
                .stmt
                .inner_join(
                    Alias::new(&pivot.table),
                    Expr::col(qualified(&pivot.table, &pivot.related_pivot_key))
                        .equals(qualified(&relation.table, &pivot.related_key)),
                )
                .and_where(
                    Expr::col(qualified(&pivot.table, &pivot.foreign_pivot_key)).eq(parent_key),
                );
        }
        (other, _) => {
            return Err(GridError::InvalidSource(format!(
                "relation `{name}` is {}, not {kind:?}",
                relation_kind_name(other)
            )))
        }
    }

    Ok(query)
}

fn relation_kind_name(kind: &RelationKind) -> &'static str {
    match kind {
        RelationKind::HasMany { .. } => "has-many",
        RelationKind::BelongsTo { .. } => "belongs-to",
        RelationKind::BelongsToMany(_) => "belongs-to-many",
    }
}

fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::String(None)
    )
}
