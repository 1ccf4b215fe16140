//! Filter set management
//!
//! Holds the OR-combined alternative filters and the global filter that is
//! AND-merged into each of them.

use std::borrow::Cow;
use std::sync::Arc;

use crate::filter::Filter;

/// Handle of a filter stored in a [`FilterSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(usize);

impl FilterId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Anything that can be added to a filter set: one filter, several, or none
pub trait IntoFilters {
    fn into_filters(self) -> Vec<Arc<Filter>>;
}

impl IntoFilters for Filter {
    fn into_filters(self) -> Vec<Arc<Filter>> {
        vec![Arc::new(self)]
    }
}

impl IntoFilters for Arc<Filter> {
    fn into_filters(self) -> Vec<Arc<Filter>> {
        vec![self]
    }
}

impl IntoFilters for Vec<Filter> {
    fn into_filters(self) -> Vec<Arc<Filter>> {
        self.into_iter().map(Arc::new).collect()
    }
}

impl IntoFilters for Vec<Arc<Filter>> {
    fn into_filters(self) -> Vec<Arc<Filter>> {
        self
    }
}

impl<T: IntoFilters> IntoFilters for Option<T> {
    fn into_filters(self) -> Vec<Arc<Filter>> {
        self.map(IntoFilters::into_filters).unwrap_or_default()
    }
}

/// Alternative filters plus an optional global filter
///
/// Filters are shared, never mutated. Uniqueness is by identity: adding an
/// `Arc` that is already stored is a no-op, while two equal but separately
/// allocated filters are both kept.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    filters: Vec<Arc<Filter>>,
    global: Option<Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every alternative. The global filter is kept.
    pub fn replace(&mut self, filters: impl IntoFilters) -> &mut Self {
        self.filters.clear();
        self.add(filters)
    }

    /// Append alternatives
    pub fn add(&mut self, filters: impl IntoFilters) -> &mut Self {
        for filter in filters.into_filters() {
            self.insert(filter);
        }
        self
    }

    /// Store one filter and return its handle
    pub fn insert(&mut self, filter: Arc<Filter>) -> FilterId {
        if let Some(index) = self.filters.iter().position(|f| Arc::ptr_eq(f, &filter)) {
            tracing::debug!(index, "Filter already present, skipping");
            return FilterId(index);
        }
        self.filters.push(filter);
        FilterId(self.filters.len() - 1)
    }

    pub fn get(&self, id: FilterId) -> Option<&Arc<Filter>> {
        self.filters.get(id.0)
    }

    pub fn contains(&self, filter: &Arc<Filter>) -> bool {
        self.filters.iter().any(|f| Arc::ptr_eq(f, filter))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Filter>> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Merge fields into the global filter; later fields win on collision
    pub fn merge_global(&mut self, filter: impl Into<Option<Filter>>) -> &mut Self {
        if let Some(filter) = filter.into() {
            match &mut self.global {
                Some(global) => global.merge(&filter),
                None => self.global = Some(filter),
            }
        }
        self
    }

    pub fn global(&self) -> Option<&Filter> {
        self.global.as_ref()
    }

    /// Effective alternatives
    ///
    /// With a global filter, each alternative is merged with it (global
    /// fields win), or the global filter alone is returned when there are no
    /// alternatives. Without one, the alternatives are returned as stored.
    pub fn materialize(&self) -> Vec<Cow<'_, Filter>> {
        match &self.global {
            Some(global) if self.filters.is_empty() => vec![Cow::Borrowed(global)],
            Some(global) => self
                .filters
                .iter()
                .map(|filter| {
                    let mut merged = Filter::clone(filter);
                    merged.merge(global);
                    Cow::Owned(merged)
                })
                .collect(),
            None => self
                .filters
                .iter()
                .map(|filter| Cow::Borrowed(filter.as_ref()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Operator;

    fn eq(field: &str, value: impl Into<crate::FilterValue>) -> Filter {
        Filter::new().field(field, Operator::Eq(value.into()))
    }

    fn materialized(set: &FilterSet) -> Vec<Filter> {
        set.materialize().into_iter().map(Cow::into_owned).collect()
    }

    // =========================================================================
    // add / replace Tests
    // =========================================================================

    #[test]
    fn test_add_single_filter() {
        let mut set = FilterSet::new();
        let filter = Arc::new(eq("name", "test"));

        set.add(filter.clone());

        assert_eq!(set.len(), 1);
        assert!(set.contains(&filter));
    }

    #[test]
    fn test_add_multiple_filters() {
        let mut set = FilterSet::new();
        let filters = vec![
            Arc::new(eq("name", "test")),
            Arc::new(Filter::new().field("priority", Operator::Gt(5.into()))),
            Arc::new(eq("enabled", true)),
        ];

        set.add(filters.clone());

        assert_eq!(set.len(), 3);
        for filter in &filters {
            assert!(set.contains(filter));
        }
    }

    #[test]
    fn test_add_nothing() {
        let mut set = FilterSet::new();
        set.add(None::<Filter>);
        assert!(set.is_empty());
    }

    #[test]
    fn test_identity_not_value_uniqueness() {
        let mut set = FilterSet::new();
        let shared = Arc::new(eq("name", "test"));

        let first = set.insert(shared.clone());
        let again = set.insert(shared.clone());
        set.add(eq("name", "test"));

        assert_eq!(first, again);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(first), Some(&shared));
    }

    #[test]
    fn test_replace_clears_alternatives_only() {
        let mut set = FilterSet::new();
        set.add(vec![eq("a", 1), eq("b", 2)]);
        set.merge_global(eq("g", 3));

        set.replace(eq("c", 4));
        assert_eq!(set.len(), 1);
        assert!(set.global().is_some());

        set.replace(None::<Filter>);
        assert!(set.is_empty());
        assert!(set.global().is_some());
    }

    // =========================================================================
    // Global Filter Tests
    // =========================================================================

    #[test]
    fn test_merge_global_can_be_chained() {
        let mut set = FilterSet::new();
        set.merge_global(Filter::new())
            .merge_global(Filter::new())
            .merge_global(None::<Filter>);
        assert_eq!(set.global(), Some(&Filter::new()));
    }

    #[test]
    fn test_merge_global_later_fields_win() {
        let mut set = FilterSet::new();
        set.merge_global(eq("age", 19).field("sex", Operator::Eq("male".into())));
        set.merge_global(eq("age", 21));

        let global = set.global().unwrap();
        assert_eq!(global.get("age"), Some(&Operator::Eq(21.into()).into()));
        assert_eq!(global.fields().keys().collect::<Vec<_>>(), vec!["age", "sex"]);
    }

    // =========================================================================
    // materialize Tests
    // =========================================================================

    #[test]
    fn test_materialize_empty() {
        assert!(FilterSet::new().materialize().is_empty());
    }

    #[test]
    fn test_materialize_without_global_keeps_order() {
        let mut set = FilterSet::new();
        set.add(vec![eq("b", 1), eq("a", 2), eq("c", 3)]);

        assert_eq!(
            materialized(&set),
            vec![eq("b", 1), eq("a", 2), eq("c", 3)]
        );
    }

    #[test]
    fn test_materialize_global_only() {
        let mut set = FilterSet::new();
        set.merge_global(eq("name", "test"));

        assert_eq!(materialized(&set), vec![eq("name", "test")]);
    }

    #[test]
    fn test_materialize_merges_global_into_each() {
        let mut set = FilterSet::new();
        set.add(vec![
            eq("name", "test").field("priority", Operator::Eq(1.into())),
            eq("name", "alternate"),
        ]);
        set.merge_global(eq("priority", 12));

        assert_eq!(
            materialized(&set),
            vec![
                eq("name", "test").field("priority", Operator::Eq(12.into())),
                eq("name", "alternate").field("priority", Operator::Eq(12.into())),
            ]
        );
    }

    #[test]
    fn test_materialize_does_not_mutate_stored_filters() {
        let mut set = FilterSet::new();
        let filter = Arc::new(eq("name", "test"));
        set.add(filter.clone());
        set.merge_global(eq("priority", 12));

        let _ = set.materialize();
        assert_eq!(*filter, eq("name", "test"));
        assert_eq!(set.iter().next().map(|f| f.fields().len()), Some(1));
    }
}
