//! Filter → sea_query::Condition compiler.
//!
//! Parsing happens in `grid-core`; this module only turns normalized
//! [`ColumnFilter`]s and [`GlobalFilter`]s into conditions for one backend.
//! Every column filter is a group: its values are AND-ed, or OR-ed when the
//! value was a `", "`-separated list. A global filter is an OR group over all
//! configured columns.

use std::sync::Arc;

use grid_core::{ColumnFilter, Columns, GlobalFilter, Junction, Operator};
use sea_orm::sea_query::{Alias, BinOper, Condition, Expr, Func, SimpleExpr};
use sea_orm::DbBackend;
use tracing::{debug, warn};

use crate::attributes::AttributeStore;
use crate::model::{column_ref, ModelDef};
use crate::source::GridQuery;
use crate::{GridError, Result};

const RELATION_SEPARATOR: &str = "..";
const NULL_SENTINEL: &str = "%null%";
const NOT_NULL_SENTINEL: &str = "%not_null%";

pub struct PredicateCompiler {
    backend: DbBackend,
    columns: Columns,
    model: Option<ModelDef>,
    attributes: Option<Arc<dyn AttributeStore>>,
}

impl PredicateCompiler {
    pub fn new(backend: DbBackend, columns: &Columns, model: Option<&ModelDef>) -> Self {
        Self {
            backend,
            columns: columns.clone(),
            model: model.cloned(),
            attributes: None,
        }
    }

    pub fn with_attributes(mut self, store: Option<Arc<dyn AttributeStore>>) -> Self {
        self.attributes = store;
        self
    }

    /// Compiles `filter` and adds it to the query's `WHERE`.
    pub async fn apply<Q: GridQuery + ?Sized>(&self, query: &mut Q, filter: &ColumnFilter) -> Result<()> {
        if let Some(group) = self.column_group(filter).await? {
            query.filter(group);
        }
        Ok(())
    }

    pub async fn apply_global<Q: GridQuery + ?Sized>(
        &self,
        query: &mut Q,
        filter: &GlobalFilter,
    ) -> Result<()> {
        if let Some(group) = self.global_group(filter).await? {
            query.filter(group);
        }
        Ok(())
    }

    pub async fn column_group(&self, filter: &ColumnFilter) -> Result<Option<Condition>> {
        let (junction, values) = filter.values();
        let mut group = match junction {
            Junction::And => Condition::all(),
            Junction::Or => Condition::any(),
        };
        for value in values {
            if let Some(cond) = self.compile(&filter.column, filter.operator, value).await? {
                group = group.add(cond);
            }
        }
        Ok((!group.is_empty()).then_some(group))
    }

    /// OR over every configured column except appended attributes.
    pub async fn global_group(&self, filter: &GlobalFilter) -> Result<Option<Condition>> {
        let mut group = Condition::any();
        for entry in self.columns.iter() {
            if self.is_append(entry.exposed()) {
                continue;
            }
            if let Some(cond) = self.compile(&entry.column, filter.operator, &filter.value).await? {
                group = group.add(cond);
            }
        }
        Ok((!group.is_empty()).then_some(group))
    }

    /// One `column operator value` predicate.
    ///
    /// Returns `None` when the backend cannot evaluate it (regex outside MySQL).
    pub async fn compile(
        &self,
        column: &str,
        operator: Operator,
        value: &str,
    ) -> Result<Option<Condition>> {
        let value = match operator {
            Operator::Regex => return Ok(self.regex(column, value)),
            Operator::Like if !value.contains('%') => format!("%{value}%"),
            _ => value.to_string(),
        };

        if let Some((relation, rest)) = column.split_once(RELATION_SEPARATOR) {
            let nested = rest.rsplit(RELATION_SEPARATOR).next().unwrap_or(rest);
            return self.relation(relation, nested, operator, &value).map(Some);
        }

        if self.is_attribute(column) {
            return self.attribute(column, operator, &value).await.map(Some);
        }

        let col = Expr::col(column_ref(column));
        let cond = if value == NULL_SENTINEL {
            Condition::all().add(col.is_null())
        } else if value == NOT_NULL_SENTINEL {
            Condition::all().add(col.is_not_null())
        } else if self.backend == DbBackend::Postgres {
            self.text_cast(column, operator, &value)
        } else {
            Condition::all().add(compare(col.into(), operator, &value))
        };
        Ok(Some(cond))
    }

    fn regex(&self, column: &str, pattern: &str) -> Option<Condition> {
        if self.backend != DbBackend::MySql {
            warn!(column, backend = ?self.backend, "regex filter is not supported on this backend, skipping");
            return None;
        }
        Some(Condition::all().add(regexp(Expr::col(column_ref(column)).into(), pattern)))
    }

    /// Postgres compares the text rendering of the column, so `like` works on
    /// any type. Booleans render as `t`/`f`; `%1%` and `%0%` match them too.
    fn text_cast(&self, column: &str, operator: Operator, value: &str) -> Condition {
        let cast = |v: &str| {
            compare(
                Func::cast_as(Expr::col(column_ref(column)), Alias::new("text")).into(),
                operator,
                v,
            )
        };

        let mut group = Condition::any().add(cast(value));
        match value {
            "%0%" => group = group.add(cast("%f%")),
            "%1%" => group = group.add(cast("%t%")),
            _ => {}
        }
        group
    }

    fn relation(
        &self,
        relation: &str,
        nested: &str,
        operator: Operator,
        value: &str,
    ) -> Result<Condition> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| GridError::UnknownRelation(relation.to_string()))?;
        let def = model
            .relations
            .get(relation)
            .ok_or_else(|| GridError::UnknownRelation(relation.to_string()))?;

        let inner = compare(Expr::col(def.column(nested)).into(), operator, value);
        Ok(Condition::all().add(def.exists(&model.table, inner)))
    }

    async fn attribute(&self, column: &str, operator: Operator, value: &str) -> Result<Condition> {
        let Some(model) = self.model.as_ref() else {
            return Err(GridError::Config(format!(
                "attribute filter on `{column}` needs model metadata"
            )));
        };
        let Some(store) = self.attributes.as_ref() else {
            return Err(GridError::Config(format!(
                "attribute filter on `{column}` needs an attribute store"
            )));
        };

        let ids = store
            .matching_entity_ids(&model.entity_type, column, operator, value)
            .await?;
        debug!(column, matched = ids.len(), "attribute filter resolved");

        let key = Expr::col(model.key_column());
        // No match must still filter everything out.
        Ok(if ids.is_empty() {
            Condition::all().add(key.is_null())
        } else {
            Condition::all().add(key.is_in(ids))
        })
    }

    fn is_attribute(&self, column: &str) -> bool {
        self.model.as_ref().is_some_and(|m| m.is_attribute(column))
    }

    fn is_append(&self, exposed: &str) -> bool {
        self.model.as_ref().is_some_and(|m| m.is_append(exposed))
    }
}

/// `lhs <operator> value`.
pub(crate) fn compare(lhs: SimpleExpr, operator: Operator, value: &str) -> SimpleExpr {
    let value = value.to_string();
    let lhs = Expr::expr(lhs);
    match operator {
        Operator::Like => lhs.like(value),
        Operator::Regex => regexp(lhs.into(), &value),
        Operator::Eq => lhs.eq(value),
        Operator::Ne | Operator::NotEq => lhs.ne(value),
        Operator::Gt => lhs.gt(value),
        Operator::Ge => lhs.gte(value),
        Operator::Lt => lhs.lt(value),
        Operator::Le => lhs.lte(value),
    }
}

fn regexp(lhs: SimpleExpr, pattern: &str) -> SimpleExpr {
    lhs.binary(BinOper::Custom("REGEXP"), Expr::val(pattern.to_string()))
}

#[cfg(test)]
#[path = "predicate_tests.rs"]
mod predicate_tests;
