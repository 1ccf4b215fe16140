//! Parameterized SQL for find conditions
//!
//! Renders structured find conditions into a `sqlx` query builder. Every value
//! goes through `push_bind`; only column names are written into the SQL text.

use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};

use crate::config::FieldMapping;
use crate::find::{ConditionMap, FindCondition, FindOperand, FindOperator};
use crate::sql::column::to_column_name;
use crate::types::FilterValue;

/// Append `((a AND b) OR (c))` for a list of alternatives
///
/// An empty list, or an alternative without conditions, renders `1=1`.
/// Relation conditions address their columns with the dotted path
/// (`"employee"."firstName"`), resolved through `mapping`.
///
/// # Example
/// ```
/// use filter_converter::{Filter, Operator};
/// use filter_converter::find::to_find_conditions;
/// use filter_converter::sql::push_find_conditions;
/// use sqlx::{Postgres, QueryBuilder};
///
/// let filter = Filter::new().field("name", Operator::Eq("Sam".into()));
/// let conditions = vec![to_find_conditions(&filter).unwrap()];
///
/// let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE ");
/// push_find_conditions(&mut builder, &conditions, None);
/// assert_eq!(builder.sql(), "SELECT * FROM users WHERE ((\"name\" = $1))");
/// ```
pub fn push_find_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    alternatives: &[ConditionMap],
    mapping: Option<&FieldMapping>,
) {
    if alternatives.is_empty() {
        builder.push("1=1");
        return;
    }

    builder.push("(");
    for (i, conditions) in alternatives.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }

        let mut leaves = Vec::new();
        collect_leaves(conditions, None, &mut leaves);

        builder.push("(");
        if leaves.is_empty() {
            builder.push("1=1");
        }
        for (j, (path, operator)) in leaves.iter().enumerate() {
            if j > 0 {
                builder.push(" AND ");
            }
            push_operator(builder, &to_column_name(path, mapping), operator);
        }
        builder.push(")");
    }
    builder.push(")");
}

/// Flatten relation maps into `(dotted path, operator)` pairs
fn collect_leaves<'a>(
    conditions: &'a ConditionMap,
    prefix: Option<&str>,
    leaves: &mut Vec<(String, &'a FindOperator)>,
) {
    for (field, condition) in conditions.iter() {
        let path = match prefix {
            Some(prefix) => format!("{}.{}", prefix, field),
            None => field.to_string(),
        };
        match condition {
            Some(FindCondition::Operator(operator)) => leaves.push((path, operator)),
            Some(FindCondition::Relation(nested)) => collect_leaves(nested, Some(&path), leaves),
            None => {}
        }
    }
}

fn push_operator(builder: &mut QueryBuilder<'_, Postgres>, column: &str, operator: &FindOperator) {
    match operator {
        FindOperator::Equal(value) => push_comparison(builder, column, "=", value),
        FindOperator::LessThan(value) => push_comparison(builder, column, "<", value),
        FindOperator::LessThanOrEqual(value) => push_comparison(builder, column, "<=", value),
        FindOperator::MoreThan(value) => push_comparison(builder, column, ">", value),
        FindOperator::MoreThanOrEqual(value) => push_comparison(builder, column, ">=", value),
        FindOperator::Between(start, end) => {
            builder.push(format!("{} BETWEEN ", column));
            push_value(builder, start);
            builder.push(" AND ");
            push_value(builder, end);
        }
        FindOperator::ILike(pattern) => {
            builder
                .push(format!("{} ILIKE ", column))
                .push_bind(pattern.clone());
        }
        FindOperator::In(values) => push_list(builder, column, values),
        FindOperator::IsNull => {
            builder.push(format!("{} IS NULL", column));
        }
        FindOperator::Not(operand) => match operand.as_ref() {
            // Not produced by `to_find_conditions`, which turns null operands
            // into `IsNull`, but reachable with hand-built conditions
            FindOperand::Value(FilterValue::Null) => {
                builder.push(format!("{} IS NOT NULL", column));
            }
            FindOperand::Value(value) => push_comparison(builder, column, "!=", value),
            FindOperand::Operator(inner) => {
                builder.push("NOT (");
                push_operator(builder, column, inner);
                builder.push(")");
            }
        },
    }
}

/// Element type shared by the non-null values of an `In` list
#[derive(Debug, Clone, Copy, PartialEq)]
enum ListKind {
    Bool,
    Int,
    Float,
    Decimal,
    String,
    Date,
}

/// `None` for empty, all-null, or mixed lists. Integers mixed with floats
/// widen to `Float`.
fn list_kind(values: &[FilterValue]) -> Option<ListKind> {
    let mut kind = None;
    for value in values {
        let next = match value {
            FilterValue::Null => continue,
            FilterValue::Bool(_) => ListKind::Bool,
            FilterValue::Int(_) => ListKind::Int,
            FilterValue::Float(_) => ListKind::Float,
            FilterValue::Decimal(_) => ListKind::Decimal,
            FilterValue::String(_) => ListKind::String,
            FilterValue::Date(_) => ListKind::Date,
        };
        kind = match (kind, next) {
            (None, next) => Some(next),
            (Some(current), next) if current == next => Some(current),
            (Some(ListKind::Int), ListKind::Float) | (Some(ListKind::Float), ListKind::Int) => {
                Some(ListKind::Float)
            }
            _ => return None,
        };
    }
    kind
}

fn typed<T>(values: &[FilterValue], convert: impl Fn(&FilterValue) -> Option<T>) -> Vec<Option<T>> {
    values.iter().map(convert).collect()
}

/// `col = ANY($n)` with a typed array, nulls kept as array elements
///
/// Lists without a single element type fall back to comparing the column as
/// text against a jsonb array.
fn push_list(builder: &mut QueryBuilder<'_, Postgres>, column: &str, values: &[FilterValue]) {
    let Some(kind) = list_kind(values) else {
        let array = serde_json::Value::Array(values.iter().map(FilterValue::to_json).collect());
        builder
            .push(format!(
                "{}::text = ANY(SELECT jsonb_array_elements_text(",
                column
            ))
            .push_bind(Json(array))
            .push("::jsonb))");
        return;
    };

    builder.push(format!("{} = ANY(", column));
    match kind {
        ListKind::Bool => builder.push_bind(typed(values, |v| match v {
            FilterValue::Bool(b) => Some(*b),
            _ => None,
        })),
        ListKind::Int => builder.push_bind(typed(values, |v| match v {
            FilterValue::Int(i) => Some(*i),
            _ => None,
        })),
        ListKind::Float => builder.push_bind(typed(values, |v| match v {
            FilterValue::Float(f) => Some(*f),
            FilterValue::Int(i) => Some(*i as f64),
            _ => None,
        })),
        ListKind::Decimal => builder.push_bind(typed(values, |v| match v {
            FilterValue::Decimal(d) => Some(*d),
            _ => None,
        })),
        ListKind::String => builder.push_bind(typed(values, |v| match v {
            FilterValue::String(s) => Some(s.clone()),
            _ => None,
        })),
        ListKind::Date => builder.push_bind(typed(values, |v| match v {
            FilterValue::Date(d) => Some(*d),
            _ => None,
        })),
    };
    builder.push(")");
}

fn push_comparison(
    builder: &mut QueryBuilder<'_, Postgres>,
    column: &str,
    sql_operator: &str,
    value: &FilterValue,
) {
    builder.push(format!("{} {} ", column, sql_operator));
    push_value(builder, value);
}

/// Bind a value with its native Postgres type
fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::Null => builder.push("NULL"),
        FilterValue::Bool(b) => builder.push_bind(*b),
        FilterValue::Int(i) => builder.push_bind(*i),
        FilterValue::Float(f) => builder.push_bind(*f),
        FilterValue::Decimal(d) => builder.push_bind(*d),
        FilterValue::String(s) => builder.push_bind(s.clone()),
        FilterValue::Date(d) => builder.push_bind(*d),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::find::to_find_conditions;
    use serde_json::json;

    fn render(filters: &[serde_json::Value], mapping: Option<&FieldMapping>) -> String {
        let alternatives: Vec<ConditionMap> = filters
            .iter()
            .map(|f| to_find_conditions(&Filter::from_json(f).unwrap()).unwrap())
            .collect();
        let mut builder = QueryBuilder::<Postgres>::new("");
        push_find_conditions(&mut builder, &alternatives, mapping);
        builder.sql().to_string()
    }

    // ==================== Comparison Operations ====================

    #[test]
    fn test_comparisons_are_bound() {
        assert_eq!(render(&[json!({"name": {"eq": "test"}})], None), "((\"name\" = $1))");
        assert_eq!(render(&[json!({"age": {"gt": 3}})], None), "((\"age\" > $1))");
        assert_eq!(render(&[json!({"age": {"lte": 3}})], None), "((\"age\" <= $1))");
        assert_eq!(
            render(&[json!({"age": {"between": {"start": 18, "end": 30}}})], None),
            "((\"age\" BETWEEN $1 AND $2))"
        );
    }

    #[test]
    fn test_negations() {
        assert_eq!(
            render(&[json!({"name": {"notEq": "x"}})], None),
            "((\"name\" != $1))"
        );
        assert_eq!(
            render(&[json!({"name": {"notContains": "x"}})], None),
            "((NOT (\"name\" ILIKE $1)))"
        );
        assert_eq!(
            render(&[json!({"name": {"isNotNull": true}})], None),
            "((NOT (\"name\" IS NULL)))"
        );
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        assert_eq!(render(&[json!({"name": {"eq": null}})], None), "((\"name\" IS NULL))");
    }

    #[test]
    fn test_in_binds_typed_array() {
        assert_eq!(
            render(&[json!({"id": {"in": [1, 2, null]}})], None),
            "((\"id\" = ANY($1)))"
        );
        assert_eq!(
            render(&[json!({"created": {"notIn": ["2023-01-31T12:00:00Z"]}})], None),
            "((NOT (\"created\" = ANY($1))))"
        );
    }

    #[test]
    fn test_in_mixed_list_uses_jsonb_array() {
        assert_eq!(
            render(&[json!({"id": {"in": ["a", 1]}})], None),
            "((\"id\"::text = ANY(SELECT jsonb_array_elements_text($1::jsonb))))"
        );
        assert_eq!(
            render(&[json!({"id": {"in": []}})], None),
            "((\"id\"::text = ANY(SELECT jsonb_array_elements_text($1::jsonb))))"
        );
    }

    #[test]
    fn test_list_kind() {
        assert_eq!(list_kind(&[1.into(), FilterValue::Null]), Some(ListKind::Int));
        assert_eq!(list_kind(&[1.into(), 2.5.into()]), Some(ListKind::Float));
        assert_eq!(list_kind(&["a".into(), true.into()]), None);
        assert_eq!(list_kind(&[FilterValue::Null]), None);
        assert_eq!(list_kind(&[]), None);
    }

    #[test]
    fn test_nested_null_key_is_null_check() {
        assert_eq!(
            render(
                &[json!({"employee": {"firstName": {"eq": "John"}, "lastName": null}})],
                None
            ),
            "((\"employee\".\"firstName\" = $1 AND \"employee\".\"lastName\" IS NULL))"
        );
    }

    // ==================== Logical Structure ====================

    #[test]
    fn test_alternatives_are_or_joined() {
        assert_eq!(
            render(
                &[
                    json!({"name": {"eq": "test"}, "priority": {"eq": 12}}),
                    json!({"name": {"eq": "alternate"}, "priority": {"eq": 12}}),
                ],
                None
            ),
            "((\"name\" = $1 AND \"priority\" = $2) OR (\"name\" = $3 AND \"priority\" = $4))"
        );
    }

    #[test]
    fn test_empty_alternatives() {
        assert_eq!(render(&[], None), "1=1");
        assert_eq!(render(&[json!({})], None), "((1=1))");
        assert_eq!(render(&[json!({"name": null})], None), "((1=1))");
    }

    #[test]
    fn test_relations_use_dotted_columns() {
        assert_eq!(
            render(
                &[json!({"employee": {"firstName": {"contains": "John"}}})],
                None
            ),
            "((\"employee\".\"firstName\" ILIKE $1))"
        );
    }

    #[test]
    fn test_mapping_applies_to_full_path() {
        let mapping: FieldMapping = [
            ("name".to_string(), "full_name".to_string()),
            ("employee.firstName".to_string(), "e.first_name".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            render(
                &[json!({
                    "name": {"startsWith": "a"},
                    "employee": {"firstName": {"eq": "John"}}
                })],
                Some(&mapping)
            ),
            "((\"full_name\" ILIKE $1 AND \"e\".\"first_name\" = $2))"
        );
    }

    #[test]
    fn test_param_offset_continues_existing_binds() {
        let conditions = vec![to_find_conditions(
            &Filter::from_json(&json!({"name": {"eq": "a"}})).unwrap(),
        )
        .unwrap()];

        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM t WHERE tenant = ");
        builder.push_bind("acme").push(" AND ");
        push_find_conditions(&mut builder, &conditions, None);

        assert_eq!(
            builder.sql(),
            "SELECT * FROM t WHERE tenant = $1 AND ((\"name\" = $2))"
        );
    }
}
