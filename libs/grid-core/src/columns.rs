//! Column / alias map exposed by a grid.
//!
//! Entries are either a bare column (`"foo"`) or a real column exposed under an
//! alias (`{"bar.baz": "qux"}`). Order is significant: it drives the select list
//! and the global filter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawColumnEntry", into = "RawColumnEntry")]
pub struct ColumnEntry {
    /// Real column or relationship path.
    pub column: String,
    /// Name the column is exposed under, if different.
    pub alias: Option<String>,
}

impl ColumnEntry {
    pub fn plain(column: impl Into<String>) -> Self {
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

    /// Name the client sees for this column.
    pub fn exposed(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum RawColumnEntry {
    Plain(String),
    Aliased(BTreeMap<String, String>),
}

impl TryFrom<RawColumnEntry> for ColumnEntry {
    type Error = Error;

    fn try_from(raw: RawColumnEntry) -> Result<Self, Self::Error> {
        match raw {
            RawColumnEntry::Plain(column) => Ok(ColumnEntry::plain(column)),
            RawColumnEntry::Aliased(map) => {
                let mut it = map.into_iter();
                match (it.next(), it.next()) {
                    (Some((column, alias)), None) => Ok(ColumnEntry::aliased(column, alias)),
                    _ => Err(Error::InvalidColumnEntry(
                        "aliased entry must hold exactly one `column: alias` pair".into(),
                    )),
                }
            }
        }
    }
}

impl From<ColumnEntry> for RawColumnEntry {
    fn from(entry: ColumnEntry) -> Self {
        match entry.alias {
            None => RawColumnEntry::Plain(entry.column),
            Some(alias) => RawColumnEntry::Aliased(BTreeMap::from([(entry.column, alias)])),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Columns(Vec<ColumnEntry>);

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.0.push(ColumnEntry::plain(column));
        self
    }

    pub fn alias(mut self, column: impl Into<String>, alias: impl Into<String>) -> Self {
        self.0.push(ColumnEntry::aliased(column, alias));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnEntry> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entry whose exposed name (alias or bare column) equals `name`.
    pub fn find_exposed(&self, name: &str) -> Option<&ColumnEntry> {
        self.0.iter().find(|e| e.exposed() == name)
    }

    /// Maps an alias back to its real column; anything else is returned as-is.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.0
            .iter()
            .find(|e| e.alias.as_deref() == Some(name))
            .map(|e| e.column.as_str())
            .unwrap_or(name)
    }

    /// Real column names in declaration order.
    pub fn real_columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.column.as_str())
    }
}

impl FromIterator<ColumnEntry> for Columns {
    fn from_iter<I: IntoIterator<Item = ColumnEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a ColumnEntry;
    type IntoIter = std::slice::Iter<'a, ColumnEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
