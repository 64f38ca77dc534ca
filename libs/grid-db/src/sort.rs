//! Sort spec → `ORDER BY`.

use grid_core::SortSpec;
use tracing::debug;

use crate::settings::Settings;
use crate::source::GridQuery;
use crate::{GridError, Result};

pub struct SortCompiler<'a> {
    settings: &'a Settings,
}

impl<'a> SortCompiler<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Requested sorts, or the configured default when none were requested.
    pub fn effective(&self, requested: Vec<SortSpec>) -> Vec<SortSpec> {
        if requested.is_empty() {
            self.settings.sort.clone()
        } else {
            requested
        }
    }

    /// Maps an exposed name to a real column.
    ///
    /// A name that is not configured is still accepted when it is exactly one
    /// of the selected expressions or the alias one of them is exposed under
    /// (e.g. a raw `COUNT(*) as total`).
    pub fn resolve_column(&self, requested: &str, selected: &[String]) -> Result<String> {
        if let Some(entry) = self.settings.columns.find_exposed(requested) {
            return Ok(entry.column.clone());
        }
        if selected.iter().any(|s| selected_name(s) == requested) {
            return Ok(requested.to_string());
        }
        Err(GridError::SortColumnNotFound(requested.to_string()))
    }

    /// Applies `sorts` in order and returns the specs that were applied.
    pub fn apply<Q: GridQuery + ?Sized>(
        &self,
        query: &mut Q,
        sorts: &[SortSpec],
    ) -> Result<Vec<SortSpec>> {
        let mut applied = Vec::with_capacity(sorts.len());

        for spec in sorts {
            if spec.column.is_empty() {
                continue;
            }
            let column = self.resolve_column(&spec.column, query.selected())?;
            let direction = spec.direction.as_deref();

            match self.settings.custom_sort(&column) {
                Some(sort) => sort(query.statement_mut(), direction),
                None => query.order_by(&column, direction)?,
            }
            debug!(column = %column, direction = ?direction, "sort applied");
            applied.push(spec.clone());
        }

        Ok(applied)
    }
}

/// Name a selected expression is exposed under: the alias after ` as `, else
/// the expression itself.
fn selected_name(expr: &str) -> &str {
    let lower = expr.to_ascii_lowercase();
    match lower.rfind(" as ") {
        Some(i) => expr[i + 4..].trim(),
        None => expr.trim(),
    }
}
