//! Predicate building for query-builder WHERE clauses
//!
//! Converts operator objects to textual SQL predicates. Values are inlined as
//! single-quoted literals without escaping, so the output is only suitable for
//! trusted input or display. Use [`crate::sql::bind`] for bound parameters.

use std::fmt;

use sqlx::{Postgres, QueryBuilder};

use crate::config::FieldMapping;
use crate::error::{FilterError, Result};
use crate::filter::{Criterion, Operator, OperatorObject};
use crate::sql::column::to_column_name;
use crate::types::FilterValue;

/// Build a SQL predicate for one field
///
/// The first criterion of `object` decides the output:
/// - a vocabulary operator renders a comparison on the resolved column
/// - a relation recurses into every entry with the path extended by
///   `.<key>`, AND-joining the fragments; a nested key set to `null` is an
///   `IS NULL` check on that path
/// - an unknown scalar key fails with [`FilterError::UnknownOperator`]
pub fn operator_to_predicate(
    column: &str,
    object: &OperatorObject,
    mapping: Option<&FieldMapping>,
) -> Result<String> {
    let column_name = to_column_name(column, mapping);

    let Some(first) = object.first() else {
        return Err(FilterError::unknown_operator("", column_name));
    };

    match first {
        Criterion::Operator(op) => {
            if object.has_other_values(op.key()) {
                tracing::warn!(
                    column = %column_name,
                    operator = op.key(),
                    "Operator object has several keys, only the first is used"
                );
            }
            Ok(comparison_to_predicate(&column_name, op))
        }
        Criterion::Relation(..) => {
            let mut fragments = Vec::with_capacity(object.criteria().len());
            for criterion in object.criteria() {
                match criterion {
                    Criterion::Relation(key, nested) => {
                        let path = format!("{}.{}", column, key);
                        fragments.push(operator_to_predicate(&path, nested, mapping)?);
                    }
                    Criterion::Unknown(key, FilterValue::Null) => {
                        let path = format!("{}.{}", column, key);
                        fragments.push(format!("{} IS NULL", to_column_name(&path, mapping)));
                    }
                    other => {
                        return Err(FilterError::unknown_operator(other.key(), column_name));
                    }
                }
            }
            Ok(fragments.join(" AND "))
        }
        Criterion::Unknown(key, _) => Err(FilterError::unknown_operator(key.as_str(), column_name)),
    }
}

fn comparison_to_predicate(column: &str, op: &Operator) -> String {
    match op {
        Operator::Eq(FilterValue::Null) => format!("{} IS NULL", column),
        Operator::NotEq(FilterValue::Null) => format!("{} IS NOT NULL", column),
        Operator::Eq(v) => format!("{} = '{}'", column, v),
        Operator::NotEq(v) => format!("{} != '{}'", column, v),
        Operator::Lt(v) => format!("{} < '{}'", column, v),
        Operator::Lte(v) => format!("{} <= '{}'", column, v),
        Operator::Gt(v) => format!("{} > '{}'", column, v),
        Operator::Gte(v) => format!("{} >= '{}'", column, v),
        Operator::Between(Some(range)) => {
            format!("{} BETWEEN '{}' AND '{}'", column, range.start, range.end)
        }
        Operator::In(Some(values)) => list_to_predicate(column, values, ListOperator::In),
        Operator::NotIn(Some(values)) => list_to_predicate(column, values, ListOperator::NotIn),
        Operator::Between(None) | Operator::In(None) => format!("{} IS NULL", column),
        Operator::NotIn(None) => format!("{} IS NOT NULL", column),
        Operator::Contains(v) => format!("{} ILIKE '%{}%'", column, v),
        Operator::NotContains(v) => format!("{} NOT ILIKE '%{}%'", column, v),
        Operator::StartsWith(v) => format!("{} ILIKE '{}%'", column, v),
        Operator::NotStartsWith(v) => format!("{} NOT ILIKE '{}%'", column, v),
        Operator::EndsWith(v) => format!("{} ILIKE '%{}'", column, v),
        Operator::NotEndsWith(v) => format!("{} NOT ILIKE '%{}'", column, v),
        Operator::IsNull(_) => format!("{} IS NULL", column),
        Operator::IsNotNull(_) => format!("{} IS NOT NULL", column),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ListOperator {
    In,
    NotIn,
}

/// `IN`/`NOT IN` over the non-null values
///
/// A null in an `IN` list adds `OR col IS NULL`. A list holding only nulls
/// renders `col IS NULL` and an empty list is never satisfied.
fn list_to_predicate(column: &str, values: &[FilterValue], operator: ListOperator) -> String {
    let non_null: Vec<String> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(ToString::to_string)
        .collect();
    let has_null = values.iter().any(FilterValue::is_null);

    if !non_null.is_empty() {
        let keyword = match operator {
            ListOperator::In => "IN",
            ListOperator::NotIn => "NOT IN",
        };
        let clause = format!("{} {} ('{}')", column, keyword, non_null.join("','"));
        return if has_null && operator == ListOperator::In {
            format!("{} OR {} IS NULL", clause, column)
        } else {
            clause
        };
    }

    if has_null {
        return format!("{} IS NULL", column);
    }

    "1!=1".to_string()
}

// ============================================================================
// Predicate tree
// ============================================================================

/// OR-of-ANDs predicate handed to a query builder
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Raw(String),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// A group without children, which always holds
    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::Raw(_) => false,
            Predicate::And(children) | Predicate::Or(children) => children.is_empty(),
        }
    }

    /// Render as SQL text. Grouped children are parenthesized so fragments
    /// that contain `OR` keep their meaning; an empty group renders `1=1`.
    pub fn to_sql(&self) -> String {
        match self {
            Predicate::Raw(sql) => sql.clone(),
            Predicate::And(children) => render_group(children, " AND "),
            Predicate::Or(children) => render_group(children, " OR "),
        }
    }

    /// Append the predicate, parenthesized, to a query builder
    pub fn push_to(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push("(").push(self.to_sql()).push(")");
    }
}

fn render_group(children: &[Predicate], separator: &str) -> String {
    match children {
        [] => "1=1".to_string(),
        [only] => only.to_sql(),
        _ => children
            .iter()
            .map(|child| format!("({})", child.to_sql()))
            .collect::<Vec<_>>()
            .join(separator),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
