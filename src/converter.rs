//! FiltersConverter - main entry point
//!
//! Holds the filter set and the rename table, and turns the effective
//! alternatives into structured find conditions or an OR-of-ANDs predicate.

use std::collections::HashSet;

use sqlx::{Postgres, QueryBuilder};

use crate::config::ConverterConfig;
use crate::error::Result;
use crate::filter::Filter;
use crate::filter_set::{FilterSet, IntoFilters};
use crate::find::{ConditionMap, to_find_conditions};
use crate::sql::bind;
use crate::sql::predicate::{Predicate, operator_to_predicate};

/// Converts caller filters into query conditions
///
/// Conversions are pure reads over the current filter set; the set only
/// changes through [`set_filters`](Self::set_filters),
/// [`add_filters`](Self::add_filters) and
/// [`set_global_filter`](Self::set_global_filter).
#[derive(Debug, Clone, Default)]
pub struct FiltersConverter {
    filters: FilterSet,
    config: ConverterConfig,
}

impl FiltersConverter {
    /// Converter without filters or field mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Converter with the given configuration
    pub fn with_config(config: ConverterConfig) -> Self {
        Self {
            filters: FilterSet::new(),
            config,
        }
    }

    /// Converter starting from the given alternatives
    pub fn from_filters(filters: impl IntoFilters, config: ConverterConfig) -> Self {
        let mut converter = Self::with_config(config);
        converter.set_filters(filters);
        converter
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn filter_set(&self) -> &FilterSet {
        &self.filters
    }

    /// Replace every alternative filter. The global filter is kept.
    pub fn set_filters(&mut self, filters: impl IntoFilters) -> &mut Self {
        self.filters.replace(filters);
        self
    }

    /// Append alternative filters
    pub fn add_filters(&mut self, filters: impl IntoFilters) -> &mut Self {
        self.filters.add(filters);
        self
    }

    /// Merge into the global filter that every alternative must also satisfy
    pub fn set_global_filter(&mut self, filter: impl Into<Option<Filter>>) -> &mut Self {
        self.filters.merge_global(filter);
        self
    }

    /// Effective alternatives with the global filter merged in
    pub fn filters(&self) -> Vec<Filter> {
        self.filters
            .materialize()
            .into_iter()
            .map(|filter| filter.into_owned())
            .collect()
    }

    /// Structured find conditions, one map per alternative
    pub fn to_find_conditions(&self) -> Result<Vec<ConditionMap>> {
        let alternatives = self.filters.materialize();
        tracing::debug!(alternatives = alternatives.len(), "Converting filters to find conditions");

        alternatives
            .iter()
            .map(|filter| to_find_conditions(filter))
            .collect()
    }

    /// Textual predicate: alternatives OR-joined, fields AND-joined
    ///
    /// Undefined fields are skipped. No alternatives at all gives an empty
    /// group, which renders as `1=1`.
    pub fn to_predicate(&self) -> Result<Predicate> {
        let alternatives = self.filters.materialize();
        tracing::debug!(alternatives = alternatives.len(), "Converting filters to predicate");

        let mut groups = Vec::with_capacity(alternatives.len());
        for filter in &alternatives {
            let mut fragments = Vec::with_capacity(filter.fields().len());
            for (field, object) in filter.fields().iter() {
                let Some(object) = object else {
                    continue;
                };
                tracing::trace!(field = %field, "Converting field");
                let sql = operator_to_predicate(field, object, Some(&self.config.field_mapping))?;
                fragments.push(Predicate::Raw(sql));
            }
            groups.push(Predicate::And(fragments));
        }
        Ok(Predicate::Or(groups))
    }

    /// Top-level field names of every alternative, in order of first appearance
    pub fn affected_fields(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for filter in self.filters.materialize() {
            for field in filter.fields().keys() {
                if seen.insert(field.to_string()) {
                    fields.push(field.to_string());
                }
            }
        }
        fields
    }

    /// The affected fields that are also known relation names
    pub fn affected_relations<S: AsRef<str>>(&self, relations: &[S]) -> Vec<String> {
        self.affected_fields()
            .into_iter()
            .filter(|field| relations.iter().any(|r| r.as_ref() == field))
            .collect()
    }

    /// Append the conditions as a WHERE fragment with bound parameters
    pub fn push_find_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) -> Result<()> {
        let conditions = self.to_find_conditions()?;
        bind::push_find_conditions(builder, &conditions, Some(&self.config.field_mapping));
        Ok(())
    }

    /// Append the textual predicate, parenthesized
    pub fn push_predicate(&self, builder: &mut QueryBuilder<'_, Postgres>) -> Result<()> {
        self.to_predicate()?.push_to(builder);
        Ok(())
    }
}
