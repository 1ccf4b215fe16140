//! SQL utilities for the filters converter
//!
//! Column naming, textual predicates, and bound-parameter rendering.

pub mod bind;
pub mod column;
pub mod predicate;

pub use bind::push_find_conditions;
pub use column::to_column_name;
pub use predicate::{Predicate, operator_to_predicate};
