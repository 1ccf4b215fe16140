//! # filter-converter
//!
//! Converts declarative filter objects into database query conditions.
//!
//! A caller supplies one or more alternative filters (OR-combined) and an
//! optional global filter (AND-merged into every alternative). The converter
//! turns them into either structured find conditions or a textual
//! OR-of-ANDs predicate, and can append both to a `sqlx` query builder.
//!
//! ## Features
//!
//! - **Operator Vocabulary**: `eq`, `notEq`, `lt`/`before`, `lte`/`beforeOrEq`, `gt`/`after`,
//!   `gte`/`afterOrEq`, `between`, `in`, `notIn`, pattern matches and null checks
//! - **Relations**: Nested filters address columns of related entities (`"employee"."firstName"`)
//! - **Global Filter**: Conditions that must hold regardless of which alternative matches
//! - **Field Mapping**: Logical field names resolved to physical columns at render time
//! - **Bound Parameters**: Structured conditions render with `push_bind`, never inlined
//!
//! ## Quick Start
//!
//! ```rust
//! use filter_converter::{ConverterConfig, Filter, FiltersConverter};
//! use serde_json::json;
//!
//! let mut converter = FiltersConverter::with_config(
//!     ConverterConfig::builder().map_field("name", "full_name").build(),
//! );
//! converter
//!     .set_filters(vec![
//!         Filter::from_json(&json!({"name": {"eq": "test"}})).unwrap(),
//!         Filter::from_json(&json!({"name": {"eq": "alternate"}})).unwrap(),
//!     ])
//!     .set_global_filter(Filter::from_json(&json!({"priority": {"gte": 12}})).unwrap());
//!
//! let predicate = converter.to_predicate().unwrap();
//! assert_eq!(
//!     predicate.to_sql(),
//!     "((\"full_name\" = 'test') AND (\"priority\" >= '12')) OR \
//!      ((\"full_name\" = 'alternate') AND (\"priority\" >= '12'))"
//! );
//!
//! assert_eq!(converter.to_find_conditions().unwrap().len(), 2);
//! assert_eq!(converter.affected_fields(), vec!["name", "priority"]);
//! ```
//!
//! ## Query Builder
//!
//! ```rust
//! use filter_converter::{ConverterConfig, Filter, FiltersConverter};
//! use serde_json::json;
//! use sqlx::{Postgres, QueryBuilder};
//!
//! let converter = FiltersConverter::from_filters(
//!     Filter::from_json(&json!({"age": {"between": {"start": 18, "end": 30}}})).unwrap(),
//!     ConverterConfig::default(),
//! );
//!
//! let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE ");
//! converter.push_find_conditions(&mut builder).unwrap();
//! assert_eq!(builder.sql(), "SELECT * FROM users WHERE ((\"age\" BETWEEN $1 AND $2))");
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod filter;
pub mod filter_set;
pub mod find;
pub mod sql;
pub mod types;

// Re-export main types for convenience
pub use config::{ConverterConfig, ConverterConfigBuilder, FieldMapping};
pub use converter::FiltersConverter;
pub use error::{FilterError, Result};
pub use filter::{Criterion, Filter, Operator, OperatorObject};
pub use filter_set::{FilterId, FilterSet, IntoFilters};
pub use find::{ConditionMap, FindCondition, FindOperand, FindOperator, to_find_conditions};
pub use sql::{Predicate, push_find_conditions, to_column_name};
pub use types::{FieldMap, FilterValue, Range};
