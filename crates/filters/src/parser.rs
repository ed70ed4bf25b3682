use serde_json::{Map, Value};

use crate::ast::{Filter, Operator, SortDirection, SortField};

/// Filter parser error types.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("operator {operator} expects {expected}")]
    InvalidOperand {
        operator: String,
        expected: &'static str,
    },
    #[error("operator {0} must be applied to an attribute")]
    MissingAttribute(String),
    #[error("invalid sort clause: {0}")]
    InvalidSort(String),
}

/// Parse a JSON predicate tree (`{ title: { $eq: "A" }, $or: [...] }`) into a [`Filter`].
///
/// Arrays are implicit disjunctions: a top-level array ORs its members and an
/// attribute mapped to an array of scalars matches any of them.
pub fn parse(input: &Value) -> Result<Filter, FilterError> {
    parse_node(input, &[])
}

fn parse_node(value: &Value, path: &[String]) -> Result<Filter, FilterError> {
    match value {
        Value::Object(map) => parse_object(map, path),
        Value::Array(items) => {
            if !path.is_empty() && items.iter().all(is_scalar) {
                return Ok(field(path, Operator::In(items.clone())));
            }
            let branches = items
                .iter()
                .map(|item| parse_node(item, path))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(match branches.len() {
                0 => Filter::Everything,
                1 => branches.into_iter().next().unwrap_or_default(),
                _ => Filter::Or(branches),
            })
        }
        scalar if !path.is_empty() => Ok(field(path, Operator::Eq(scalar.clone()))),
        _ => Err(FilterError::InvalidOperand {
            operator: "filters".to_string(),
            expected: "an object or an array",
        }),
    }
}

fn parse_object(map: &Map<String, Value>, path: &[String]) -> Result<Filter, FilterError> {
    let mut parts = Vec::with_capacity(map.len());
    for (key, value) in map {
        let part = match key.as_str() {
            "$and" => Filter::all(parse_each(key, value, path)?),
            "$or" => Filter::Or(parse_each(key, value, path)?),
            "$not" => Filter::Not(Box::new(parse_node(value, path)?)),
            op if op.starts_with('$') => {
                if path.is_empty() {
                    return Err(FilterError::MissingAttribute(op.to_string()));
                }
                field(path, parse_operator(op, value)?)
            }
            attribute => {
                let mut nested = path.to_vec();
                nested.push(attribute.to_string());
                parse_node(value, &nested)?
            }
        };
        parts.push(part);
    }
    Ok(Filter::all(parts))
}

fn parse_each(op: &str, value: &Value, path: &[String]) -> Result<Vec<Filter>, FilterError> {
    list(op, value)?
        .iter()
        .map(|item| parse_node(item, path))
        .collect()
}

fn parse_operator(op: &str, value: &Value) -> Result<Operator, FilterError> {
    Ok(match op {
        "$eq" => match value {
            Value::Array(items) => Operator::In(items.clone()),
            other => Operator::Eq(other.clone()),
        },
        "$eqi" => Operator::Eqi(text(op, value)?),
        "$ne" => Operator::Ne(value.clone()),
        "$in" => Operator::In(values(value)),
        "$notIn" => Operator::NotIn(values(value)),
        "$null" => Operator::Null(flag(op, value)?),
        "$notNull" => Operator::NotNull(flag(op, value)?),
        "$contains" => Operator::Contains(text(op, value)?),
        "$containsi" => Operator::ContainsI(text(op, value)?),
        "$notContains" => Operator::NotContains(text(op, value)?),
        "$notContainsi" => Operator::NotContainsI(text(op, value)?),
        "$gt" => Operator::Gt(value.clone()),
        "$gte" => Operator::Gte(value.clone()),
        "$lt" => Operator::Lt(value.clone()),
        "$lte" => Operator::Lte(value.clone()),
        other => return Err(FilterError::UnknownOperator(other.to_string())),
    })
}

/// Parse a sort clause such as `"title"`, `"title:desc"` or `"author.name:asc"`.
pub fn parse_sort(clause: &str) -> Result<SortField, FilterError> {
    let (attribute, direction) = match clause.split_once(':') {
        Some((attribute, dir)) => {
            let direction = match dir.trim().to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                _ => return Err(FilterError::InvalidSort(clause.to_string())),
            };
            (attribute.trim(), direction)
        }
        None => (clause.trim(), SortDirection::Asc),
    };
    if attribute.is_empty() {
        return Err(FilterError::InvalidSort(clause.to_string()));
    }
    Ok(SortField {
        path: attribute.split('.').map(str::to_string).collect(),
        direction,
    })
}

fn field(path: &[String], op: Operator) -> Filter {
    Filter::Field {
        path: path.to_vec(),
        op,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn list<'a>(op: &str, value: &'a Value) -> Result<&'a Vec<Value>, FilterError> {
    value.as_array().ok_or_else(|| FilterError::InvalidOperand {
        operator: op.to_string(),
        expected: "an array",
    })
}

fn values(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn text(op: &str, value: &Value) -> Result<String, FilterError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(FilterError::InvalidOperand {
            operator: op.to_string(),
            expected: "a string",
        }),
    }
}

fn flag(op: &str, value: &Value) -> Result<bool, FilterError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(FilterError::InvalidOperand {
            operator: op.to_string(),
            expected: "a boolean",
        }),
    }
}
