//! Converter configuration.

use crate::error::{RegistryError, Result};
use crate::framing::Compression;
use avro_connect_types::AvroDataConfig;
use avro_schema::Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Property key selecting the subject name strategy.
pub const SUBJECT_NAME_STRATEGY_CONFIG: &str = "subject.name.strategy";
/// Property key naming the subject for the `fixed` strategy.
pub const SUBJECT_NAME_CONFIG: &str = "subject.name";
/// Property key selecting the payload compression.
pub const COMPRESSION_CONFIG: &str = "compression";

/// How the registry subject of a record is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubjectStrategy {
    /// `<topic>-value`
    #[default]
    TopicValue,
    /// `<topic>-key`
    TopicKey,
    /// Full name of the record schema
    RecordName,
    /// The configured `fixed_subject`
    Fixed,
}

impl SubjectStrategy {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "topic-value" => Ok(Self::TopicValue),
            "topic-key" => Ok(Self::TopicKey),
            "record-name" => Ok(Self::RecordName),
            "fixed" => Ok(Self::Fixed),
            _ => Err(RegistryError::InvalidConfig(format!(
                "{SUBJECT_NAME_STRATEGY_CONFIG} must be one of topic-value, topic-key, record-name, fixed, got '{value}'"
            ))),
        }
    }
}

/// Options of [`AvroConverter`](crate::AvroConverter).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default)]
    pub subject_strategy: SubjectStrategy,

    /// Subject used by [`SubjectStrategy::Fixed`]
    #[serde(default)]
    pub fixed_subject: Option<String>,

    #[serde(default)]
    pub compression: Compression,

    /// Translation options
    #[serde(default)]
    pub avro: AvroDataConfig,
}

impl ConverterConfig {
    /// Build from Connect-style string properties.
    ///
    /// Translation options are read from the same map.
    pub fn from_properties(props: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self {
            avro: AvroDataConfig::from_properties(props)?,
            ..Self::default()
        };
        if let Some(value) = props.get(SUBJECT_NAME_STRATEGY_CONFIG) {
            config.subject_strategy = SubjectStrategy::parse(value)?;
        }
        config.fixed_subject = props.get(SUBJECT_NAME_CONFIG).cloned();
        if let Some(value) = props.get(COMPRESSION_CONFIG) {
            config.compression = match value.trim().to_ascii_lowercase().as_str() {
                "none" => Compression::None,
                "zlib" => Compression::Zlib,
                _ => {
                    return Err(RegistryError::InvalidConfig(format!(
                        "{COMPRESSION_CONFIG} must be none or zlib, got '{value}'"
                    )))
                }
            };
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subject_strategy == SubjectStrategy::Fixed
            && self.fixed_subject.as_deref().map_or(true, str::is_empty)
        {
            return Err(RegistryError::InvalidConfig(
                "the fixed subject strategy needs a subject name".to_string(),
            ));
        }
        if self.compression == Compression::Zlib {
            return Err(RegistryError::UnsupportedCompression("zlib".to_string()));
        }
        Ok(())
    }

    /// Registry subject for a record of `schema` on `topic`.
    pub fn subject(&self, topic: &str, schema: &Schema) -> Result<String> {
        match self.subject_strategy {
            SubjectStrategy::TopicValue => Ok(format!("{topic}-value")),
            SubjectStrategy::TopicKey => Ok(format!("{topic}-key")),
            SubjectStrategy::RecordName => schema
                .name()
                .map(|name| name.fullname())
                .ok_or_else(|| {
                    RegistryError::Subject(format!(
                        "record-name strategy needs a named schema, got {}",
                        schema.type_name()
                    ))
                }),
            SubjectStrategy::Fixed => self
                .fixed_subject
                .clone()
                .ok_or_else(|| RegistryError::Subject("no fixed subject configured".to_string())),
        }
    }
}
