//! EAV attribute lookups.
//!
//! Attribute filters cannot be expressed against the entity table. The
//! compiler asks an [`AttributeStore`] for the entity ids whose attribute value
//! matches and folds them into `key IN (…)`. The grid also asks the store which
//! attribute keys an entity type has, so keys defined only in storage are
//! never selected or filtered as real columns.

use async_trait::async_trait;
use grid_core::Operator;
use sea_orm::sea_query::{Alias, ConditionalStatement, Expr, Order, OrderedStatement, Query};
use sea_orm::{ConnectionTrait, FromQueryResult, JsonValue, Value};
use tracing::debug;

use crate::config::AttributeTables;
use crate::model::qualified;
use crate::predicate::compare;
use crate::Result;

#[async_trait]
pub trait AttributeStore: Send + Sync {
    /// Attribute keys defined for `entity_type`.
    async fn available_attributes(&self, entity_type: &str) -> Result<Vec<String>>;

    /// Ids of `entity_type` entities whose `attribute` value satisfies `operator value`.
    async fn matching_entity_ids(
        &self,
        entity_type: &str,
        attribute: &str,
        operator: Operator,
        value: &str,
    ) -> Result<Vec<Value>>;
}

/// [`AttributeStore`] over the attribute tables of the same database.
pub struct SqlAttributeStore<C> {
    conn: C,
    tables: AttributeTables,
}

impl<C: ConnectionTrait> SqlAttributeStore<C> {
    pub fn new(conn: C, tables: AttributeTables) -> Self {
        Self { conn, tables }
    }
}

#[async_trait]
impl<C> AttributeStore for SqlAttributeStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn available_attributes(&self, entity_type: &str) -> Result<Vec<String>> {
        let t = &self.tables;
        let mut stmt = Query::select();
        stmt.column(Alias::new(&t.key_column))
            .from(Alias::new(&t.attributes_table))
            .and_where(Expr::col(Alias::new(&t.namespace_column)).eq(entity_type))
            .order_by(Alias::new(&t.key_column), Order::Asc);

        let backend = self.conn.get_database_backend();
        let rows = JsonValue::find_by_statement(backend.build(&stmt))
            .all(&self.conn)
            .await?;

        let keys: Vec<String> = rows
            .into_iter()
            .filter_map(|row| match row {
                JsonValue::Object(mut map) => match map.remove(&t.key_column) {
                    Some(JsonValue::String(key)) => Some(key),
                    _ => None,
                },
                _ => None,
            })
            .collect();

        debug!(entity_type, found = keys.len(), "available attributes");
        Ok(keys)
    }

    async fn matching_entity_ids(
        &self,
        entity_type: &str,
        attribute: &str,
        operator: Operator,
        value: &str,
    ) -> Result<Vec<Value>> {
        let t = &self.tables;
        let mut stmt = Query::select();
        stmt.column(qualified(&t.values_table, &t.entity_id_column))
            .from(Alias::new(&t.values_table))
            .inner_join(
                Alias::new(&t.attributes_table),
                Expr::col(qualified(&t.attributes_table, &t.attribute_pk))
                    .equals(qualified(&t.values_table, &t.attribute_id_column)),
            )
            .and_where(Expr::col(qualified(&t.values_table, &t.entity_type_column)).eq(entity_type))
            .and_where(Expr::col(qualified(&t.attributes_table, &t.key_column)).eq(attribute))
            .and_where(compare(
                Expr::col(qualified(&t.values_table, &t.value_column)).into(),
                operator,
                value,
            ));

        let backend = self.conn.get_database_backend();
        let rows = JsonValue::find_by_statement(backend.build(&stmt))
            .all(&self.conn)
            .await?;

        let ids: Vec<Value> = rows
            .into_iter()
            .filter_map(|row| match row {
                JsonValue::Object(mut map) => map.remove(&t.entity_id_column),
                _ => None,
            })
            .filter_map(json_to_value)
            .collect();

        debug!(entity_type, attribute, matched = ids.len(), "attribute filter lookup");
        Ok(ids)
    }
}

fn json_to_value(v: JsonValue) -> Option<Value> {
    match v {
        JsonValue::Number(n) => n.as_i64().map(Value::from),
        JsonValue::String(s) => Some(Value::from(s)),
        _ => None,
    }
}
