//! Default row shaping.

use crate::source::Row;

/// Drops `hidden` fields, keeping the select-list order of the rest.
///
/// Rows come back from the driver as JSON, so nested values are already plain
/// mappings and lists.
pub fn shape_row(row: Row, hidden: &[String]) -> Row {
    if hidden.is_empty() {
        return row;
    }
    row.into_iter()
        .filter(|(key, _)| !hidden.iter().any(|h| h == key))
        .collect()
}
