//! Predicate trees over JSON documents.
//!
//! Filters arrive as JSON objects using `$`-prefixed operators
//! (`$and`, `$or`, `$not`, `$eq`, `$in`, `$containsi`, ...), are parsed once into a
//! [`Filter`] and can then be evaluated against any number of rows.

pub mod ast;
pub mod eval;
pub mod functions;
pub mod parser;

pub use ast::{Filter, Operator, SortDirection, SortField};
pub use eval::{compare_rows, matches};
pub use parser::{parse, parse_sort, FilterError};
