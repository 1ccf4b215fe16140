//! Column name resolution
//!
//! Turns a logical field path into a quoted, dot-separated SQL identifier.

use crate::config::FieldMapping;

/// Resolve a field path into a quoted column name
///
/// - A path wrapped in parentheses is a computed expression and is returned
///   unchanged, e.g. `(first_name || ' ' || last_name)`.
/// - Otherwise the path is looked up in `mapping` (exact match), split on `.`
///   and every segment is double-quoted. Segments that are already quoted are
///   not quoted twice.
///
/// # Example
/// ```
/// use filter_converter::sql::to_column_name;
///
/// assert_eq!(to_column_name("employee.firstName", None), "\"employee\".\"firstName\"");
/// ```
pub fn to_column_name(column: &str, mapping: Option<&FieldMapping>) -> String {
    if column.starts_with('(') && column.ends_with(')') {
        return column.to_string();
    }

    let column = mapping
        .and_then(|m| m.get(column))
        .map(String::as_str)
        .filter(|mapped| !mapped.is_empty())
        .unwrap_or(column);

    column
        .split('.')
        .map(quote_segment)
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_segment(name: &str) -> String {
    if name.is_empty() {
        return "\"\"".to_string();
    }
    format!("\"{}\"", name).replace("\"\"", "\"")
}
