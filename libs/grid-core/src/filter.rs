//! Filter tokens → normalized filters.
//!
//! Input is the loosely typed list a client sends: `{"column": "value"}`
//! entries for column filters and bare strings for global filters. Values may
//! carry an operator (`|>=5|`) or a regex (`/^a.*$/`). Anything that does not
//! fit the grammar degrades to a `like` match instead of failing.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::Columns;

static REGEX_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/(.+)/$").expect("static regex"));

static OPERATOR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|\s*(>=|<=|<>|!=|>|<|=)\s*(.*?)\s*\|$").expect("static regex")
});

/// Separator that turns one filter value into an OR group.
pub const MULTI_VALUE_SEPARATOR: &str = ", ";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "regex")]
    Regex,
    #[serde(rename = "=")]
    Eq,
    /// `<>`
    #[serde(rename = "<>")]
    Ne,
    /// `!=`
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Like => "like",
            Operator::Regex => "regex",
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "like" => Operator::Like,
            "regex" => Operator::Regex,
            "=" => Operator::Eq,
            "<>" => Operator::Ne,
            "!=" => Operator::NotEq,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            other => return Err(format!("unknown operator: {other}")),
        })
    }
}

/// How sibling predicates inside one group are joined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Junction {
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterKey {
    /// Positional entry (sequential index in the request list).
    Index(usize),
    Column(String),
}

/// One raw key/value pair as received from the request.
#[derive(Clone, Debug, PartialEq)]
pub struct RawFilter {
    pub key: FilterKey,
    pub value: Value,
}

impl RawFilter {
    pub fn column(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: FilterKey::Column(column.into()),
            value: value.into(),
        }
    }

    pub fn global(index: usize, value: impl Into<Value>) -> Self {
        Self {
            key: FilterKey::Index(index),
            value: value.into(),
        }
    }

    /// Flattens a request payload into raw filters.
    ///
    /// Accepts either a list (`[{"foo": "a"}, "global"]`) or a mapping whose
    /// numeric keys are positional. Unknown shapes yield nothing.
    pub fn from_json(value: &Value) -> Vec<RawFilter> {
        let mut out = Vec::new();
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(map) => {
                            for (k, v) in map {
                                out.push(RawFilter::column(k.clone(), v.clone()));
                            }
                        }
                        other => out.push(RawFilter::global(index, other.clone())),
                    }
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    let key = match k.parse::<usize>() {
                        Ok(i) => FilterKey::Index(i),
                        Err(_) => FilterKey::Column(k.clone()),
                    };
                    out.push(RawFilter {
                        key,
                        value: v.clone(),
                    });
                }
            }
            _ => debug!("ignoring filter payload that is neither a list nor a mapping"),
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: String,
    pub operator: Operator,
    pub value: String,
}

impl ColumnFilter {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Values to compile and how they are joined. `"a, b"` is an OR group.
    pub fn values(&self) -> (Junction, Vec<&str>) {
        if self.value.contains(MULTI_VALUE_SEPARATOR) {
            (
                Junction::Or,
                self.value.split(MULTI_VALUE_SEPARATOR).collect(),
            )
        } else {
            (Junction::And, vec![self.value.as_str()])
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalFilter {
    pub operator: Operator,
    pub value: String,
}

impl GlobalFilter {
    pub fn new(operator: Operator, value: impl Into<String>) -> Self {
        Self {
            operator,
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFilters {
    pub columns: Vec<ColumnFilter>,
    pub globals: Vec<GlobalFilter>,
}

impl ParsedFilters {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.globals.is_empty()
    }
}

/// Splits raw filter tokens into column and global filters.
pub struct FilterParser<'a> {
    columns: &'a Columns,
    supports_regex: bool,
}

impl<'a> FilterParser<'a> {
    /// `supports_regex` comes from the connection the filters will run on;
    /// without it `/…/` tokens are plain `like` values.
    pub fn new(columns: &'a Columns, supports_regex: bool) -> Self {
        Self {
            columns,
            supports_regex,
        }
    }

    pub fn parse(&self, raw: &[RawFilter]) -> ParsedFilters {
        let mut parsed = ParsedFilters::default();

        for filter in raw {
            match &filter.key {
                FilterKey::Column(key) => {
                    let Some(value) = scalar_to_string(&filter.value) else {
                        debug!(column = %key, "skipping non-scalar filter value");
                        continue;
                    };
                    let (operator, value) = self.decode_value(&value);
                    let column = self.columns.resolve_alias(key).to_string();
                    parsed.columns.push(ColumnFilter {
                        column,
                        operator,
                        value,
                    });
                }
                FilterKey::Index(index) => match &filter.value {
                    Value::String(value) => {
                        let (operator, value) = self.decode_value(value);
                        parsed.globals.push(GlobalFilter { operator, value });
                    }
                    _ => debug!(index, "skipping positional filter that is not a string"),
                },
            }
        }

        parsed
    }

    /// Extracts the operator embedded in a filter value.
    pub fn decode_value(&self, value: &str) -> (Operator, String) {
        if self.supports_regex {
            if let Some(caps) = REGEX_TOKEN.captures(value) {
                return (Operator::Regex, caps[1].to_string());
            }
        }

        if let Some(caps) = OPERATOR_TOKEN.captures(value) {
            if let Ok(op) = caps[1].parse::<Operator>() {
                return (op, caps[2].to_string());
            }
        }

        (Operator::Like, value.to_string())
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
