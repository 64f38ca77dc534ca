use serde::{Deserialize, Serialize};

/// Requested ordering on one exposed column.
///
/// `direction` is passed through untouched; the query layer decides what it
/// accepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub direction: Option<String>,
}

impl SortSpec {
    pub fn new(column: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Some(direction.into()),
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, "asc")
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, "desc")
    }
}

/// Default sort configured on a grid: a single spec or a list of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortDefault {
    One(SortSpec),
    Many(Vec<SortSpec>),
}

impl SortDefault {
    pub fn into_vec(self) -> Vec<SortSpec> {
        match self {
            SortDefault::One(spec) => vec![spec],
            SortDefault::Many(specs) => specs,
        }
    }
}

impl From<SortSpec> for SortDefault {
    fn from(spec: SortSpec) -> Self {
        SortDefault::One(spec)
    }
}

impl From<Vec<SortSpec>> for SortDefault {
    fn from(specs: Vec<SortSpec>) -> Self {
        SortDefault::Many(specs)
    }
}
