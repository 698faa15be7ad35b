//! Translation options.
//!
//! An [`AvroDataConfig`] is read once and owned by one
//! [`AvroData`](crate::AvroData) instance; the caches of that instance are
//! scoped to it.

use crate::error::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Property key bounding each schema cache.
pub const SCHEMAS_CACHE_CONFIG: &str = "schemas.cache.config";
/// Property key for provenance metadata (`connect.*` properties, docs).
pub const CONNECT_META_DATA_CONFIG: &str = "connect.meta.data";
/// Property key for exact round-tripping of unions, docs and custom properties.
pub const ENHANCED_AVRO_SCHEMA_SUPPORT_CONFIG: &str = "enhanced.avro.schema.support";

fn default_cache_capacity() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Options controlling fidelity and caching of translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvroDataConfig {
    /// Entries kept per translation direction; 0 disables caching
    #[serde(default = "default_cache_capacity", alias = "schemas.cache.config")]
    pub cache_capacity: usize,

    /// Write and read `connect.*` properties and keep documentation
    #[serde(default = "default_true", alias = "connect.meta.data")]
    pub attach_provenance_metadata: bool,

    /// Keep union member order, null placement, docs and custom properties
    #[serde(default, alias = "enhanced.avro.schema.support")]
    pub enhanced_fidelity: bool,
}

impl Default for AvroDataConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            attach_provenance_metadata: true,
            enhanced_fidelity: false,
        }
    }
}

/// The options that change what a translation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FidelityFlags {
    pub metadata: bool,
    pub enhanced: bool,
}

impl AvroDataConfig {
    pub fn builder() -> AvroDataConfigBuilder {
        AvroDataConfigBuilder::default()
    }

    /// Documentation is carried when either fidelity option is on.
    pub fn keeps_docs(&self) -> bool {
        self.enhanced_fidelity || self.attach_provenance_metadata
    }

    pub fn fidelity_flags(&self) -> FidelityFlags {
        FidelityFlags {
            metadata: self.attach_provenance_metadata,
            enhanced: self.enhanced_fidelity,
        }
    }

    /// Build from Connect-style string properties. Unrecognised keys are ignored.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        for (key, value) in props {
            match key.as_str() {
                SCHEMAS_CACHE_CONFIG => {
                    config.cache_capacity = value.trim().parse().map_err(|_| {
                        ConversionError::InvalidConfig(format!(
                            "{SCHEMAS_CACHE_CONFIG} must be a non-negative integer, got '{value}'"
                        ))
                    })?;
                }
                CONNECT_META_DATA_CONFIG => {
                    config.attach_provenance_metadata = parse_bool(key, value)?;
                }
                ENHANCED_AVRO_SCHEMA_SUPPORT_CONFIG => {
                    config.enhanced_fidelity = parse_bool(key, value)?;
                }
                other => debug!("Ignoring unrecognised property '{}'", other),
            }
        }
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConversionError::InvalidConfig(format!(
            "{key} must be true or false, got '{value}'"
        ))),
    }
}

/// Builder for [`AvroDataConfig`].
#[derive(Debug, Clone, Default)]
pub struct AvroDataConfigBuilder {
    config: AvroDataConfig,
}

impl AvroDataConfigBuilder {
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn attach_provenance_metadata(mut self, enabled: bool) -> Self {
        self.config.attach_provenance_metadata = enabled;
        self
    }

    pub fn enhanced_fidelity(mut self, enabled: bool) -> Self {
        self.config.enhanced_fidelity = enabled;
        self
    }

    pub fn build(self) -> AvroDataConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AvroDataConfig::default();
        assert_eq!(config.cache_capacity, 1);
        assert!(config.attach_provenance_metadata);
        assert!(!config.enhanced_fidelity);
        assert!(config.keeps_docs());
    }

    #[test]
    fn test_keeps_docs_with_either_option() {
        let none = AvroDataConfig::builder()
            .attach_provenance_metadata(false)
            .build();
        assert!(!none.keeps_docs());
        let enhanced = AvroDataConfig::builder()
            .attach_provenance_metadata(false)
            .enhanced_fidelity(true)
            .build();
        assert!(enhanced.keeps_docs());
    }

    #[test]
    fn test_from_properties() {
        let props: HashMap<String, String> = [
            (SCHEMAS_CACHE_CONFIG, "50"),
            (CONNECT_META_DATA_CONFIG, "false"),
            (ENHANCED_AVRO_SCHEMA_SUPPORT_CONFIG, "TRUE"),
            ("schema.registry.url", "http://localhost:8081"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = AvroDataConfig::from_properties(&props).unwrap();
        assert_eq!(config.cache_capacity, 50);
        assert!(!config.attach_provenance_metadata);
        assert!(config.enhanced_fidelity);
    }

    #[test]
    fn test_invalid_property_values() {
        let props: HashMap<String, String> =
            [(SCHEMAS_CACHE_CONFIG.to_string(), "-1".to_string())].into();
        assert!(matches!(
            AvroDataConfig::from_properties(&props),
            Err(ConversionError::InvalidConfig(_))
        ));
        let props: HashMap<String, String> =
            [(CONNECT_META_DATA_CONFIG.to_string(), "yes".to_string())].into();
        assert!(AvroDataConfig::from_properties(&props).is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "cache_capacity: 8\nenhanced_fidelity: true").unwrap();
        let config = AvroDataConfig::from_file(file.path()).unwrap();
        assert_eq!(config.cache_capacity, 8);
        assert!(config.attach_provenance_metadata);
        assert!(config.enhanced_fidelity);

        let dotted = AvroDataConfig::from_yaml("connect.meta.data: false\n").unwrap();
        assert!(!dotted.attach_provenance_metadata);
    }
}
