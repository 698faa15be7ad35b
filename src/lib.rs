//! Schema Bridge Library
//!
//! Translates schemas and data between Avro and Kafka Connect.
//!
//! # Crates
//!
//! - `avro_schema` - Avro schema text, values and the binary datum codec
//! - `connect_core` - Connect schemas, values and their JSON envelope
//! - `avro_connect_types` - the translation engine (`AvroData`)
//! - `schema_registry` - registry interface, wire framing and converters
//!
//! # CLI Usage
//!
//! ```bash
//! # Avro schema file to a Connect schema
//! schema-bridge to-connect user.avsc
//!
//! # Connect schema back to Avro, keeping union order and custom properties
//! schema-bridge from-connect user.connect.json --enhanced
//!
//! # Check that a schema survives Avro -> Connect -> Avro
//! schema-bridge round-trip user.avsc --enhanced
//!
//! # Convert an Avro JSON datum and frame it for a topic
//! schema-bridge convert-data --schema user.avsc --data user.json --topic users
//! ```

use anyhow::Context;
use avro_connect_types::AvroDataConfig;
use clap::Parser;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Clone, Debug, Default)]
pub struct ConversionOpts {
    /// YAML file with translation options
    #[arg(long, env = "SCHEMA_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Entries kept per translation cache (0 disables caching)
    #[arg(long, env = "SCHEMA_BRIDGE_CACHE_CAPACITY")]
    pub cache_capacity: Option<usize>,

    /// Keep union member order, null placement, docs and custom properties
    #[arg(long, env = "SCHEMA_BRIDGE_ENHANCED")]
    pub enhanced: bool,

    /// Neither write nor read connect.* provenance properties
    #[arg(long)]
    pub no_metadata: bool,
}

impl ConversionOpts {
    /// Options from the config file (if any), overridden by flags.
    pub fn to_config(&self) -> anyhow::Result<AvroDataConfig> {
        let mut config = match &self.config {
            Some(path) => AvroDataConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => AvroDataConfig::default(),
        };
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity;
        }
        if self.enhanced {
            config.enhanced_fidelity = true;
        }
        if self.no_metadata {
            config.attach_provenance_metadata = false;
        }
        Ok(config)
    }
}
