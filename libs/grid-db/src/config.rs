//! Grid configuration.
//!
//! Deserialized from Figment. Values here are the last fallback: a request
//! value wins, then a per-grid [`Settings`](crate::Settings) override, then
//! the request provider's defaults (normally built from this config).
//!
//! ```yaml
//! datagrid:
//!   method: group
//!   threshold: 200
//!   throttle: 50
//!   attributes:
//!     values_table: attribute_values
//! ```
//!
//! Environment overrides use the `DATAGRID__` prefix with `__` as the nesting
//! separator, e.g. `DATAGRID__THROTTLE=25` or `DATAGRID__ATTRIBUTES__KEY_COLUMN=code`.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use grid_core::{Defaults, PaginationMethod};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Section name inside a larger configuration document.
pub const CONFIG_KEY: &str = "datagrid";

const ENV_PREFIX: &str = "DATAGRID__";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    #[serde(default)]
    pub method: PaginationMethod,
    #[serde(default = "default_threshold")]
    pub threshold: i64,
    #[serde(default = "default_throttle")]
    pub throttle: i64,
    #[serde(default)]
    pub attributes: AttributeTables,
}

fn default_threshold() -> i64 {
    100
}

fn default_throttle() -> i64 {
    100
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            method: PaginationMethod::Single,
            threshold: default_threshold(),
            throttle: default_throttle(),
            attributes: AttributeTables::default(),
        }
    }
}

impl GridConfig {
    /// Reads the `datagrid` section; a missing section yields the defaults.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        if figment.find_value(CONFIG_KEY).is_err() {
            return Ok(Self::default());
        }
        Ok(figment.extract_inner::<GridConfig>(CONFIG_KEY)?)
    }

    /// Defaults, then the YAML file (if any), then `DATAGRID__*` env vars.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment =
            Figment::new().merge(Serialized::default(CONFIG_KEY, GridConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .map(|key| format!("{CONFIG_KEY}.{key}").into()),
        );
        Self::from_figment(&figment)
    }

    /// Pagination fallbacks handed to a request provider.
    pub fn defaults(&self) -> Defaults {
        Defaults {
            method: self.method,
            threshold: self.threshold,
            throttle: self.throttle,
        }
    }
}

/// Table and column names of the EAV attribute storage.
///
/// Values live in `values_table`, one row per entity and attribute, pointing
/// at the attribute definition in `attributes_table` whose `key_column` holds
/// the attribute key used as a grid column. `namespace_column` scopes an
/// attribute definition to one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct AttributeTables {
    pub values_table: String,
    pub attributes_table: String,
    pub entity_type_column: String,
    pub entity_id_column: String,
    pub attribute_id_column: String,
    pub value_column: String,
    pub attribute_pk: String,
    pub key_column: String,
    pub namespace_column: String,
}

impl Default for AttributeTables {
    fn default() -> Self {
        Self {
            values_table: "attribute_values".into(),
            attributes_table: "attributes".into(),
            entity_type_column: "entity_type".into(),
            entity_id_column: "entity_id".into(),
            attribute_id_column: "attribute_id".into(),
            value_column: "value".into(),
            attribute_pk: "id".into(),
            key_column: "slug".into(),
            namespace_column: "namespace".into(),
        }
    }
}
