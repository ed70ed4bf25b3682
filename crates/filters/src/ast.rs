use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Predicate tree evaluated against the JSON view of a version row.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// Matches every row.
    Everything,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    /// A condition on the value(s) found at an attribute path.
    Field { path: Vec<String>, op: Operator },
}

/// Field-level comparison operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    Eq(Value),
    Eqi(String),
    Ne(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Null(bool),
    NotNull(bool),
    Contains(String),
    ContainsI(String),
    NotContains(String),
    NotContainsI(String),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One key of an ordering clause, e.g. `title:desc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub path: Vec<String>,
    pub direction: SortDirection,
}

impl Filter {
    /// Condition on a single (possibly dotted) attribute path.
    pub fn field(path: &str, op: Operator) -> Self {
        Filter::Field {
            path: path.split('.').map(str::to_string).collect(),
            op,
        }
    }

    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Self::field(path, Operator::Eq(value.into()))
    }

    pub fn is_null(path: &str) -> Self {
        Self::field(path, Operator::Null(true))
    }

    pub fn not_null(path: &str) -> Self {
        Self::field(path, Operator::NotNull(true))
    }

    /// Conjunction that drops `Everything` operands and unwraps single children.
    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut parts: Vec<Filter> = Vec::new();
        for filter in filters {
            match filter {
                Filter::Everything => {}
                Filter::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Filter::Everything,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    /// Narrow this filter with one more condition.
    pub fn and(self, other: Filter) -> Self {
        Filter::all([self, other])
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, Filter::Everything)
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Everything
    }
}
