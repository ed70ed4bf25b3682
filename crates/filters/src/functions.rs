// Operator semantics shared by the evaluator and sorting.

use std::cmp::Ordering;

use serde_json::Value;

use crate::ast::Operator;

/// Apply one operator to every value found at an attribute path.
///
/// Positive operators match when any candidate satisfies them; their negated
/// forms are the complement. No candidates at all behaves like `null`.
pub fn apply(op: &Operator, candidates: &[&Value]) -> bool {
    let null = Value::Null;
    let candidates: Vec<&Value> = if candidates.is_empty() {
        vec![&null]
    } else {
        candidates.to_vec()
    };
    let any = |pred: &dyn Fn(&Value) -> bool| candidates.iter().any(|c| pred(*c));

    match op {
        Operator::Eq(expected) => any(&|c| loose_eq(c, expected)),
        Operator::Ne(expected) => !any(&|c| loose_eq(c, expected)),
        Operator::Eqi(expected) => any(&|c| text_of(c).is_some_and(|t| t.to_lowercase() == expected.to_lowercase())),
        Operator::In(options) => any(&|c| options.iter().any(|o| loose_eq(c, o))),
        Operator::NotIn(options) => !any(&|c| options.iter().any(|o| loose_eq(c, o))),
        Operator::Null(want) => is_null(&candidates) == *want,
        Operator::NotNull(want) => is_null(&candidates) != *want,
        Operator::Contains(needle) => any(&|c| text_of(c).is_some_and(|t| t.contains(needle.as_str()))),
        Operator::ContainsI(needle) => any(&|c| contains_ignore_case(c, needle)),
        Operator::NotContains(needle) => !any(&|c| text_of(c).is_some_and(|t| t.contains(needle.as_str()))),
        Operator::NotContainsI(needle) => !any(&|c| contains_ignore_case(c, needle)),
        Operator::Gt(bound) => any(&|c| compare(c, bound) == Some(Ordering::Greater)),
        Operator::Gte(bound) => any(&|c| matches!(compare(c, bound), Some(Ordering::Greater | Ordering::Equal))),
        Operator::Lt(bound) => any(&|c| compare(c, bound) == Some(Ordering::Less)),
        Operator::Lte(bound) => any(&|c| matches!(compare(c, bound), Some(Ordering::Less | Ordering::Equal))),
    }
}

/// Equality that treats `1` and `1.0` as the same number.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => l == r,
        },
        _ => left == right,
    }
}

/// Ordering between two scalars of the same kind; `None` when incomparable.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

fn is_null(candidates: &[&Value]) -> bool {
    candidates.iter().all(|c| c.is_null())
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn contains_ignore_case(value: &Value, needle: &str) -> bool {
    text_of(value).is_some_and(|t| t.to_lowercase().contains(&needle.to_lowercase()))
}
