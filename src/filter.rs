//! Filter data model
//!
//! A [`Filter`] maps field names to operator objects. An operator object is
//! an ordered list of criteria: vocabulary operators (`eq`, `between`, ...),
//! nested relation filters, or keys outside the vocabulary that are kept so
//! the converters can reject them with the proper error.

use serde::{Deserialize, Deserializer};

use crate::error::{FilterError, Result};
use crate::types::{FieldMap, FilterValue, Range};

// ============================================================================
// Operators
// ============================================================================

/// One comparison from the operator vocabulary
///
/// Aliases are folded when parsing: `before` is `Lt`, `beforeOrEq` is `Lte`,
/// `after` is `Gt`, `afterOrEq` is `Gte`, `null` is `IsNull` and `notNull` is
/// `IsNotNull`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(FilterValue),
    NotEq(FilterValue),
    Lt(FilterValue),
    Lte(FilterValue),
    Gt(FilterValue),
    Gte(FilterValue),
    /// `None` when the operand is JSON `null`
    Between(Option<Range>),
    In(Option<Vec<FilterValue>>),
    NotIn(Option<Vec<FilterValue>>),
    Contains(FilterValue),
    NotContains(FilterValue),
    StartsWith(FilterValue),
    NotStartsWith(FilterValue),
    EndsWith(FilterValue),
    NotEndsWith(FilterValue),
    /// The flag value is ignored except for `null`
    IsNull(FilterValue),
    IsNotNull(FilterValue),
}

impl Operator {
    /// Canonical vocabulary key
    pub fn key(&self) -> &'static str {
        match self {
            Operator::Eq(_) => "eq",
            Operator::NotEq(_) => "notEq",
            Operator::Lt(_) => "lt",
            Operator::Lte(_) => "lte",
            Operator::Gt(_) => "gt",
            Operator::Gte(_) => "gte",
            Operator::Between(_) => "between",
            Operator::In(_) => "in",
            Operator::NotIn(_) => "notIn",
            Operator::Contains(_) => "contains",
            Operator::NotContains(_) => "notContains",
            Operator::StartsWith(_) => "startsWith",
            Operator::NotStartsWith(_) => "notStartsWith",
            Operator::EndsWith(_) => "endsWith",
            Operator::NotEndsWith(_) => "notEndsWith",
            Operator::IsNull(_) => "isNull",
            Operator::IsNotNull(_) => "isNotNull",
        }
    }

    /// Whether the operand is `null`
    pub fn has_null_operand(&self) -> bool {
        match self {
            Operator::Between(range) => range.is_none(),
            Operator::In(values) | Operator::NotIn(values) => values.is_none(),
            Operator::Eq(v)
            | Operator::NotEq(v)
            | Operator::Lt(v)
            | Operator::Lte(v)
            | Operator::Gt(v)
            | Operator::Gte(v)
            | Operator::Contains(v)
            | Operator::NotContains(v)
            | Operator::StartsWith(v)
            | Operator::NotStartsWith(v)
            | Operator::EndsWith(v)
            | Operator::NotEndsWith(v)
            | Operator::IsNull(v)
            | Operator::IsNotNull(v) => v.is_null(),
        }
    }

    /// Parse a vocabulary key and its JSON operand
    ///
    /// Returns `Ok(None)` when `key` is not part of the vocabulary.
    pub fn from_json(key: &str, value: &serde_json::Value) -> Result<Option<Self>> {
        let operator = match key {
            "eq" => Operator::Eq(scalar(key, value)?),
            "notEq" => Operator::NotEq(scalar(key, value)?),
            "lt" | "before" => Operator::Lt(scalar(key, value)?),
            "lte" | "beforeOrEq" => Operator::Lte(scalar(key, value)?),
            "gt" | "after" => Operator::Gt(scalar(key, value)?),
            "gte" | "afterOrEq" => Operator::Gte(scalar(key, value)?),
            "between" => Operator::Between(range(key, value)?),
            "in" => Operator::In(list(key, value)?),
            "notIn" => Operator::NotIn(list(key, value)?),
            "contains" => Operator::Contains(scalar(key, value)?),
            "notContains" => Operator::NotContains(scalar(key, value)?),
            "startsWith" => Operator::StartsWith(scalar(key, value)?),
            "notStartsWith" => Operator::NotStartsWith(scalar(key, value)?),
            "endsWith" => Operator::EndsWith(scalar(key, value)?),
            "notEndsWith" => Operator::NotEndsWith(scalar(key, value)?),
            "isNull" | "null" => Operator::IsNull(scalar(key, value)?),
            "isNotNull" | "notNull" => Operator::IsNotNull(scalar(key, value)?),
            _ => return Ok(None),
        };
        Ok(Some(operator))
    }
}

fn scalar(key: &str, value: &serde_json::Value) -> Result<FilterValue> {
    FilterValue::from_json(value).ok_or_else(|| {
        FilterError::invalid_filter(format!("operator '{}' expects a scalar value", key))
    })
}

fn range(key: &str, value: &serde_json::Value) -> Result<Option<Range>> {
    if value.is_null() {
        return Ok(None);
    }
    let bound = |name: &str| {
        value
            .get(name)
            .and_then(FilterValue::from_json)
            .ok_or_else(|| {
                FilterError::invalid_filter(format!(
                    "operator '{}' expects an object with scalar '{}'",
                    key, name
                ))
            })
    };
    Ok(Some(Range {
        start: bound("start")?,
        end: bound("end")?,
    }))
}

fn list(key: &str, value: &serde_json::Value) -> Result<Option<Vec<FilterValue>>> {
    if value.is_null() {
        return Ok(None);
    }
    let items = value.as_array().ok_or_else(|| {
        FilterError::invalid_filter(format!("operator '{}' expects an array", key))
    })?;
    items
        .iter()
        .map(|item| scalar(key, item))
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

// ============================================================================
// Operator objects
// ============================================================================

/// One key/value pair of an operator object
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Operator(Operator),
    /// Key outside the vocabulary whose value is an object: a related entity
    Relation(String, OperatorObject),
    /// Key outside the vocabulary whose value is a scalar
    Unknown(String, FilterValue),
}

impl Criterion {
    pub fn key(&self) -> &str {
        match self {
            Criterion::Operator(op) => op.key(),
            Criterion::Relation(key, _) | Criterion::Unknown(key, _) => key,
        }
    }

    fn is_meaningful(&self) -> bool {
        match self {
            Criterion::Operator(op) => !op.has_null_operand(),
            Criterion::Relation(..) => true,
            Criterion::Unknown(_, value) => !value.is_null(),
        }
    }
}

/// The value of one filter field: an operator like `{gt: 5}`, or a nested
/// filter such as `{firstName: {contains: "John"}}`
///
/// Exactly one criterion is expected. When several are present the
/// converters use the first one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorObject {
    criteria: Vec<Criterion>,
}

impl OperatorObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn first(&self) -> Option<&Criterion> {
        self.criteria.first()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Whether any criterion other than `key` carries a non-null value
    pub fn has_other_values(&self, key: &str) -> bool {
        self.criteria
            .iter()
            .any(|criterion| criterion.key() != key && criterion.is_meaningful())
    }

    /// Parse a JSON object such as `{"contains": "dev"}`
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            FilterError::invalid_filter(format!("expected an operator object, got {}", value))
        })?;

        let mut criteria = Vec::with_capacity(map.len());
        for (key, operand) in map {
            let criterion = match Operator::from_json(key, operand)? {
                Some(op) => Criterion::Operator(op),
                None if operand.is_object() => {
                    Criterion::Relation(key.clone(), OperatorObject::from_json(operand)?)
                }
                None => match FilterValue::from_json(operand) {
                    Some(value) => Criterion::Unknown(key.clone(), value),
                    None => {
                        return Err(FilterError::invalid_filter(format!(
                            "unexpected array under '{}'",
                            key
                        )));
                    }
                },
            };
            criteria.push(criterion);
        }
        Ok(Self { criteria })
    }
}

impl From<Operator> for OperatorObject {
    fn from(op: Operator) -> Self {
        OperatorObject::new().with(Criterion::Operator(op))
    }
}

impl From<Filter> for OperatorObject {
    fn from(filter: Filter) -> Self {
        let criteria = filter
            .fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|object| Criterion::Relation(key, object)))
            .collect();
        Self { criteria }
    }
}

impl<'de> Deserialize<'de> for OperatorObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        OperatorObject::from_json(&value).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Filters
// ============================================================================

/// A set of AND-combined field conditions
///
/// A field mapped to `None` is present but undefined; it converts to an
/// undefined find condition and is skipped by the predicate form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: FieldMap<Option<OperatorObject>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field condition
    pub fn field(mut self, name: impl Into<String>, condition: impl Into<OperatorObject>) -> Self {
        self.fields.insert(name, Some(condition.into()));
        self
    }

    /// Add a nested filter for a related entity
    pub fn relation(mut self, name: impl Into<String>, filter: Filter) -> Self {
        self.fields.insert(name, Some(filter.into()));
        self
    }

    /// Add a field whose condition is left undefined
    pub fn undefined(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name, None);
        self
    }

    pub fn fields(&self) -> &FieldMap<Option<OperatorObject>> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&OperatorObject> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow merge: fields of `other` overwrite fields of `self`
    pub fn merge(&mut self, other: &Filter) {
        self.fields.merge(&other.fields);
    }

    /// Parse a JSON filter such as `{"name": {"contains": "dev"}}`
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| {
            FilterError::invalid_filter(format!("expected a filter object, got {}", value))
        })?;

        let mut fields = FieldMap::new();
        for (name, condition) in map {
            let condition = if condition.is_null() {
                None
            } else {
                Some(OperatorObject::from_json(condition)?)
            };
            fields.insert(name.clone(), condition);
        }
        Ok(Self { fields })
    }
}

impl TryFrom<serde_json::Value> for Filter {
    type Error = FilterError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Filter::from_json(&value)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Filter::from_json(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> OperatorObject {
        OperatorObject::from_json(&value).unwrap()
    }

    // =========================================================================
    // Operator Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(
            parse(json!({"eq": 23})),
            Operator::Eq(FilterValue::Int(23)).into()
        );
        assert_eq!(
            parse(json!({"between": {"start": 25, "end": 33}})),
            Operator::Between(Some(Range::new(25, 33))).into()
        );
        assert_eq!(
            parse(json!({"in": [1, 3, null]})),
            Operator::In(Some(vec![
                FilterValue::Int(1),
                FilterValue::Int(3),
                FilterValue::Null
            ]))
            .into()
        );
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(parse(json!({"before": 1})), Operator::Lt(1.into()).into());
        assert_eq!(parse(json!({"beforeOrEq": 1})), Operator::Lte(1.into()).into());
        assert_eq!(parse(json!({"after": 1})), Operator::Gt(1.into()).into());
        assert_eq!(parse(json!({"afterOrEq": 1})), Operator::Gte(1.into()).into());
        assert_eq!(parse(json!({"null": true})), Operator::IsNull(true.into()).into());
        assert_eq!(
            parse(json!({"notNull": true})),
            Operator::IsNotNull(true.into()).into()
        );
    }

    #[test]
    fn test_parse_null_operands() {
        assert_eq!(parse(json!({"eq": null})), Operator::Eq(FilterValue::Null).into());
        assert_eq!(parse(json!({"between": null})), Operator::Between(None).into());
        assert_eq!(parse(json!({"in": null})), Operator::In(None).into());
    }

    #[test]
    fn test_parse_relation_and_unknown() {
        let object = parse(json!({"firstName": {"contains": "John"}}));
        assert_eq!(
            object.first(),
            Some(&Criterion::Relation(
                "firstName".to_string(),
                Operator::Contains("John".into()).into()
            ))
        );

        let object = parse(json!({"unexistOperator": "test"}));
        assert_eq!(
            object.first(),
            Some(&Criterion::Unknown(
                "unexistOperator".to_string(),
                "test".into()
            ))
        );
    }

    #[test]
    fn test_parse_preserves_key_order() {
        let object = parse(json!({"gt": 5, "eq": 1, "contains": "x"}));
        let keys: Vec<_> = object.criteria().iter().map(Criterion::key).collect();
        assert_eq!(keys, vec!["gt", "eq", "contains"]);
    }

    #[test]
    fn test_parse_shape_errors() {
        assert!(matches!(
            OperatorObject::from_json(&json!({"between": 5})),
            Err(FilterError::InvalidFilter(_))
        ));
        assert!(matches!(
            OperatorObject::from_json(&json!({"between": {"start": 1}})),
            Err(FilterError::InvalidFilter(_))
        ));
        assert!(matches!(
            OperatorObject::from_json(&json!({"in": "a"})),
            Err(FilterError::InvalidFilter(_))
        ));
        assert!(matches!(
            OperatorObject::from_json(&json!({"eq": [1]})),
            Err(FilterError::InvalidFilter(_))
        ));
        assert!(matches!(
            OperatorObject::from_json(&json!({"tags": [1]})),
            Err(FilterError::InvalidFilter(_))
        ));
        assert!(matches!(
            OperatorObject::from_json(&json!(5)),
            Err(FilterError::InvalidFilter(_))
        ));
    }

    // =========================================================================
    // has_other_values Tests
    // =========================================================================

    #[test]
    fn test_has_other_values_empty() {
        assert!(!OperatorObject::new().has_other_values("contains"));
    }

    #[test]
    fn test_has_other_values_ignores_null() {
        let object = parse(json!({"contains": "something", "eq": null}));
        assert!(!object.has_other_values("contains"));
    }

    #[test]
    fn test_has_other_values_detects_others() {
        let object = parse(json!({"contains": "something", "eq": "test"}));
        assert!(object.has_other_values("contains"));
    }

    // =========================================================================
    // Filter Tests
    // =========================================================================

    #[test]
    fn test_filter_from_json() {
        let filter = Filter::from_json(&json!({
            "name": {"contains": "dev"},
            "employee": {"firstName": {"contains": "John"}},
            "age": null
        }))
        .unwrap();

        assert_eq!(
            filter.fields().keys().collect::<Vec<_>>(),
            vec!["name", "employee", "age"]
        );
        assert_eq!(
            filter.get("name"),
            Some(&Operator::Contains("dev".into()).into())
        );
        assert_eq!(filter.get("age"), None);
        assert!(filter.fields().contains_key("age"));
    }

    #[test]
    fn test_filter_rejects_scalar_field() {
        assert!(matches!(
            Filter::from_json(&json!({"name": "dev"})),
            Err(FilterError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_filter_builder_matches_json() {
        let built = Filter::new()
            .field("name", Operator::Contains("dev".into()))
            .relation(
                "employee",
                Filter::new().field("firstName", Operator::Contains("John".into())),
            );
        let parsed: Filter = serde_json::from_value(json!({
            "name": {"contains": "dev"},
            "employee": {"firstName": {"contains": "John"}}
        }))
        .unwrap();

        assert_eq!(built, parsed);
    }

    #[test]
    fn test_filter_merge_overwrites() {
        let mut filter = Filter::new()
            .field("name", Operator::Eq("test".into()))
            .field("priority", Operator::Eq(1.into()));
        filter.merge(&Filter::new().field("priority", Operator::Eq(12.into())));

        assert_eq!(filter.get("priority"), Some(&Operator::Eq(12.into()).into()));
        assert_eq!(
            filter.fields().keys().collect::<Vec<_>>(),
            vec!["name", "priority"]
        );
    }
}
