//! Find conditions for repository-style queries
//!
//! Converts filters into abstract comparison tags (`Equal`, `Between`,
//! `In`, ...) keyed by field name. Unlike the textual predicate, `in` and
//! `notIn` lists are passed through untouched: nulls inside a list are not
//! split into a separate `IS NULL` check.

use serde::Serialize;

use crate::error::{FilterError, Result};
use crate::filter::{Criterion, Filter, Operator, OperatorObject};
use crate::types::{FieldMap, FilterValue};

/// Abstract comparison applied to one column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum FindOperator {
    Equal(FilterValue),
    /// Negation of a raw value (`notEq`) or of another operator
    Not(Box<FindOperand>),
    LessThan(FilterValue),
    LessThanOrEqual(FilterValue),
    MoreThan(FilterValue),
    MoreThanOrEqual(FilterValue),
    Between(FilterValue, FilterValue),
    /// Case-insensitive pattern with `%` wildcards already placed
    ILike(String),
    In(Vec<FilterValue>),
    IsNull,
}

/// Operand of [`FindOperator::Not`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FindOperand {
    Value(FilterValue),
    Operator(FindOperator),
}

impl FindOperator {
    fn negate(operator: FindOperator) -> Self {
        FindOperator::Not(Box::new(FindOperand::Operator(operator)))
    }
}

/// Condition on one field: a comparison, or conditions on a related entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FindCondition {
    Operator(FindOperator),
    Relation(ConditionMap),
}

/// Field name -> condition. `None` marks a field whose filter was undefined.
pub type ConditionMap = FieldMap<Option<FindCondition>>;

/// Convert a whole filter, field by field
pub fn to_find_conditions(filter: &Filter) -> Result<ConditionMap> {
    let mut conditions = ConditionMap::new();
    for (field, object) in filter.fields().iter() {
        let condition = object.as_ref().map(to_find_condition).transpose()?;
        conditions.insert(field, condition);
    }
    Ok(conditions)
}

/// Convert one operator object
///
/// A null operand short-circuits to `IsNull` before the key is looked at.
/// Relation objects fold every nested entry into one map, where a nested key
/// set to `null` becomes an `IsNull` check on that key. A scalar under a key
/// outside the vocabulary fails with [`FilterError::BadRequest`].
///
/// Only the first criterion decides the result. Later operator keys are
/// logged and ignored; they never override the first one, so
/// `{"gt": 1, "lt": 5}` converts to `MoreThan(1)`.
pub fn to_find_condition(object: &OperatorObject) -> Result<FindCondition> {
    let Some(first) = object.first() else {
        return Ok(FindCondition::Relation(ConditionMap::new()));
    };

    match first {
        Criterion::Operator(op) => {
            if object.has_other_values(op.key()) {
                tracing::warn!(
                    operator = op.key(),
                    "Operator object has several keys, only the first is used"
                );
            }
            Ok(FindCondition::Operator(operator_to_find(op)))
        }
        Criterion::Unknown(_, FilterValue::Null) => Ok(FindCondition::Operator(FindOperator::IsNull)),
        Criterion::Unknown(key, _) => Err(FilterError::bad_request(key.as_str())),
        Criterion::Relation(..) => {
            let mut nested = ConditionMap::new();
            for criterion in object.criteria() {
                match criterion {
                    Criterion::Relation(key, related) => {
                        nested.insert(key.as_str(), Some(to_find_condition(related)?));
                    }
                    Criterion::Unknown(key, FilterValue::Null) => {
                        nested.insert(key.as_str(), Some(FindCondition::Operator(FindOperator::IsNull)));
                    }
                    other => return Err(FilterError::bad_request(other.key())),
                }
            }
            Ok(FindCondition::Relation(nested))
        }
    }
}

fn operator_to_find(op: &Operator) -> FindOperator {
    match op {
        Operator::Between(None) | Operator::In(None) | Operator::NotIn(None) => FindOperator::IsNull,
        _ if op.has_null_operand() => FindOperator::IsNull,
        Operator::Eq(v) => FindOperator::Equal(v.clone()),
        Operator::NotEq(v) => FindOperator::Not(Box::new(FindOperand::Value(v.clone()))),
        Operator::Lt(v) => FindOperator::LessThan(v.clone()),
        Operator::Lte(v) => FindOperator::LessThanOrEqual(v.clone()),
        Operator::Gt(v) => FindOperator::MoreThan(v.clone()),
        Operator::Gte(v) => FindOperator::MoreThanOrEqual(v.clone()),
        Operator::Between(Some(range)) => {
            FindOperator::Between(range.start.clone(), range.end.clone())
        }
        Operator::In(Some(values)) => FindOperator::In(values.clone()),
        Operator::NotIn(Some(values)) => FindOperator::negate(FindOperator::In(values.clone())),
        Operator::Contains(v) => FindOperator::ILike(format!("%{}%", v)),
        Operator::NotContains(v) => FindOperator::negate(FindOperator::ILike(format!("%{}%", v))),
        Operator::StartsWith(v) => FindOperator::ILike(format!("{}%", v)),
        Operator::NotStartsWith(v) => FindOperator::negate(FindOperator::ILike(format!("{}%", v))),
        Operator::EndsWith(v) => FindOperator::ILike(format!("%{}", v)),
        Operator::NotEndsWith(v) => FindOperator::negate(FindOperator::ILike(format!("%{}", v))),
        Operator::IsNull(_) => FindOperator::IsNull,
        Operator::IsNotNull(_) => FindOperator::negate(FindOperator::IsNull),
    }
}
