// In-memory evaluator for predicate trees and ordering clauses.

use std::cmp::Ordering;

use serde_json::Value;

use crate::ast::{Filter, SortDirection, SortField};
use crate::functions::{apply, compare};

/// Whether `row` satisfies `filter`.
pub fn matches(filter: &Filter, row: &Value) -> bool {
    match filter {
        Filter::Everything => true,
        Filter::And(parts) => parts.iter().all(|f| matches(f, row)),
        Filter::Or(parts) => parts.iter().any(|f| matches(f, row)),
        Filter::Not(inner) => !matches(inner, row),
        Filter::Field { path, op } => {
            let mut candidates = Vec::new();
            collect(row, path, &mut candidates);
            apply(op, &candidates)
        }
    }
}

/// Total order over rows for a list of sort keys. Missing values sort first
/// in ascending order.
pub fn compare_rows(left: &Value, right: &Value, sort: &[SortField]) -> Ordering {
    for key in sort {
        let l = lookup(left, &key.path);
        let r = lookup(right, &key.path);
        let ordering = match (l, r) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => compare(l, r).unwrap_or(Ordering::Equal),
        };
        let ordering = match key.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Gather every value reachable at `path`, fanning out across arrays.
fn collect<'a>(value: &'a Value, path: &[String], out: &mut Vec<&'a Value>) {
    if let Value::Array(items) = value {
        for item in items {
            collect(item, path, out);
        }
        return;
    }
    match path.split_first() {
        None => out.push(value),
        Some((head, rest)) => {
            if let Some(next) = value.get(head.as_str()) {
                collect(next, rest, out);
            }
        }
    }
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let found = path
        .iter()
        .try_fold(value, |current, key| current.get(key.as_str()))?;
    (!found.is_null()).then_some(found)
}
