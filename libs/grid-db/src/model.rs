//! Model metadata the grid needs from an ORM entity.
//!
//! The grid never loads entities; it only needs the table, the key, which
//! exposed names are virtual (appended or EAV attributes), which fields are
//! hidden from output, and how relations join back to the parent table.

use std::collections::BTreeMap;

use sea_orm::sea_query::{
    Alias, ColumnRef, ConditionalStatement, Expr, IntoColumnRef, Query, SelectStatement, SimpleExpr,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelDef {
    /// Entity type tag used to scope EAV attribute values.
    pub entity_type: String,
    pub table: String,
    pub primary_key: String,
    /// Computed attributes; exposed names listed here are never selected or filtered in SQL.
    pub appends: Vec<String>,
    /// EAV attribute keys, filtered through the attribute store.
    pub attributes: Vec<String>,
    /// Fields removed from hydrated rows.
    pub hidden: Vec<String>,
    pub relations: BTreeMap<String, RelationDef>,
}

impl ModelDef {
    pub fn new(entity_type: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            ..Default::default()
        }
    }

    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    pub fn append(mut self, name: impl Into<String>) -> Self {
        self.appends.push(name.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>) -> Self {
        self.attributes.push(key.into());
        self
    }

    /// Adds attribute keys discovered in storage, skipping known ones.
    pub fn merge_attributes(&mut self, keys: impl IntoIterator<Item = String>) {
        for key in keys {
            if !self.attributes.contains(&key) {
                self.attributes.push(key);
            }
        }
    }

    pub fn hidden(mut self, field: impl Into<String>) -> Self {
        self.hidden.push(field.into());
        self
    }

    pub fn relation(mut self, name: impl Into<String>, relation: RelationDef) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }

    /// `child.foreign_key = parent.local_key`
    pub fn has_many(
        self,
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        local_key: impl Into<String>,
    ) -> Self {
        self.relation(
            name,
            RelationDef::new(
                table,
                RelationKind::HasMany {
                    foreign_key: foreign_key.into(),
                    local_key: local_key.into(),
                },
            ),
        )
    }

    /// `parent.foreign_key = owner.owner_key`
    pub fn belongs_to(
        self,
        name: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        owner_key: impl Into<String>,
    ) -> Self {
        self.relation(
            name,
            RelationDef::new(
                table,
                RelationKind::BelongsTo {
                    foreign_key: foreign_key.into(),
                    owner_key: owner_key.into(),
                },
            ),
        )
    }

    pub fn belongs_to_many(
        self,
        name: impl Into<String>,
        table: impl Into<String>,
        pivot: PivotDef,
    ) -> Self {
        self.relation(
            name,
            RelationDef::new(table, RelationKind::BelongsToMany(pivot)),
        )
    }

    pub fn is_append(&self, name: &str) -> bool {
        self.appends.iter().any(|a| a == name)
    }

    pub fn is_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }

    /// `SELECT … FROM <table>` with nothing selected yet.
    pub fn new_query(&self) -> SelectStatement {
        let mut stmt = Query::select();
        stmt.from(Alias::new(&self.table));
        stmt
    }

    pub fn key_column(&self) -> ColumnRef {
        qualified(&self.table, &self.primary_key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationDef {
    /// Table of the related model.
    pub table: String,
    pub kind: RelationKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelationKind {
    HasMany {
        foreign_key: String,
        local_key: String,
    },
    BelongsTo {
        foreign_key: String,
        owner_key: String,
    },
    BelongsToMany(PivotDef),
}

/// Join table of a many-to-many relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PivotDef {
    pub table: String,
    /// Pivot column pointing at the parent.
    pub foreign_pivot_key: String,
    /// Pivot column pointing at the related row.
    pub related_pivot_key: String,
    /// Parent column the pivot refers to.
    pub parent_key: String,
    /// Related column the pivot refers to.
    pub related_key: String,
}

impl PivotDef {
    pub fn new(
        table: impl Into<String>,
        foreign_pivot_key: impl Into<String>,
        related_pivot_key: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            foreign_pivot_key: foreign_pivot_key.into(),
            related_pivot_key: related_pivot_key.into(),
            parent_key: "id".to_string(),
            related_key: "id".to_string(),
        }
    }

    pub fn keys(mut self, parent_key: impl Into<String>, related_key: impl Into<String>) -> Self {
        self.parent_key = parent_key.into();
        self.related_key = related_key.into();
        self
    }
}

impl RelationDef {
    pub fn new(table: impl Into<String>, kind: RelationKind) -> Self {
        Self {
            table: table.into(),
            kind,
        }
    }

    /// Column of the related table; already qualified names pass through.
    pub fn column(&self, name: &str) -> ColumnRef {
        if name.contains('.') {
            column_ref(name)
        } else {
            qualified(&self.table, name)
        }
    }

    /// `EXISTS (SELECT 1 FROM related … WHERE <join to parent> AND <inner>)`
    pub fn exists(&self, parent_table: &str, inner: SimpleExpr) -> SimpleExpr {
        let mut sub = Query::select();
        sub.expr(Expr::val(1)).from(Alias::new(&self.table));

        match &self.kind {
            RelationKind::HasMany {
                foreign_key,
                local_key,
            } => {
                sub.and_where(
                    Expr::col(qualified(&self.table, foreign_key))
                        .equals(qualified(parent_table, local_key)),
                );
            }
            RelationKind::BelongsTo {
                foreign_key,
                owner_key,
            } => {
                sub.and_where(
                    Expr::col(qualified(&self.table, owner_key))
                        .equals(qualified(parent_table, foreign_key)),
                );
            }
            RelationKind::BelongsToMany(pivot) => {
                sub.inner_join(
                    Alias::new(&pivot.table),
                    Expr::col(qualified(&pivot.table, &pivot.related_pivot_key))
                        .equals(qualified(&self.table, &pivot.related_key)),
                )
                .and_where(
                    Expr::col(qualified(&pivot.table, &pivot.foreign_pivot_key))
                        .equals(qualified(parent_table, &pivot.parent_key)),
                );
            }
        }

        sub.and_where(inner);
        Expr::exists(sub)
    }
}

/// `"table.column"` or `"column"` as a column reference.
pub fn column_ref(name: &str) -> ColumnRef {
    match name.split_once('.') {
        Some((table, column)) => qualified(table, column),
        None => Alias::new(name).into_column_ref(),
    }
}

pub(crate) fn qualified(table: &str, column: &str) -> ColumnRef {
    (Alias::new(table), Alias::new(column)).into_column_ref()
}
