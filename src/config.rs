//! Configuration for FiltersConverter
//!
//! Provides a builder pattern for configuring the converter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rename table from logical field path to physical column name
pub type FieldMapping = HashMap<String, String>;

/// Configuration for the filters converter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterConfig {
    /// Logical field path -> physical column name. Only consulted when a
    /// column name is rendered, never when fields are matched.
    #[serde(default)]
    pub field_mapping: FieldMapping,
}

impl ConverterConfig {
    /// Create a new configuration builder
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::new()
    }

    /// Configuration with the given rename table
    pub fn with_field_mapping(field_mapping: FieldMapping) -> Self {
        Self { field_mapping }
    }

    /// Load a configuration from a JSON document such as
    /// `{"fieldMapping": {"name": "full_name"}}`
    pub fn from_json(value: serde_json::Value) -> crate::Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Builder for ConverterConfig
#[derive(Debug, Default)]
pub struct ConverterConfigBuilder {
    field_mapping: FieldMapping,
}

impl ConverterConfigBuilder {
    /// Create a new builder with an empty rename table
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a logical field path to a physical column
    pub fn map_field(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.field_mapping.insert(field.into(), column.into());
        self
    }

    /// Add several mappings at once
    pub fn field_mappings<I, K, V>(mut self, mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.field_mapping
            .extend(mappings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build the configuration
    pub fn build(self) -> ConverterConfig {
        ConverterConfig {
            field_mapping: self.field_mapping,
        }
    }
}
