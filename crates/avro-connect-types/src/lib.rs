//! Bidirectional translation between Avro and Connect schemas and values.
//!
//! [`AvroData`] is the entry point. It translates schemas in both directions,
//! memoizing each direction in a bounded LRU cache, and converts values in
//! lock-step with their schemas.
//!
//! # Modules
//!
//! - [`config`] - fidelity and cache options
//! - [`forward`] - Avro → Connect
//! - [`reverse`] - Connect → Avro
//! - [`params`] - parameter and property keys carrying the other model's details
//! - [`naming`] - names of synthesized union and map-entry types
//! - [`cache`] - LRU schema caches
//!
//! # Example
//!
//! ```ignore
//! use avro_connect_types::{AvroData, AvroDataConfig};
//!
//! let data = AvroData::new(AvroDataConfig::default());
//! let avro = avro_schema::parse_str(text)?;
//! let connect = data.to_connect_schema(&avro)?;
//! let back = data.from_connect_schema(&connect)?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod forward;
pub mod naming;
pub mod params;
pub mod reverse;

pub use cache::{AvroSchemaKey, ConnectSchemaKey, SchemaCache};
pub use config::{
    AvroDataConfig, AvroDataConfigBuilder, FidelityFlags, CONNECT_META_DATA_CONFIG,
    ENHANCED_AVRO_SCHEMA_SUPPORT_CONFIG, SCHEMAS_CACHE_CONFIG,
};
pub use error::{ConversionError, Result};

use avro_schema::{Names, Schema, Value};
use connect_core::{ConnectValue, SchemaAndValue, SchemaRef, StructIndex};
use tracing::debug;

/// Named types of both graphs, for walking values through references.
pub(crate) struct DataContext<'a> {
    pub names: &'a Names,
    pub structs: &'a StructIndex,
}

pub(crate) fn child_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Translator between Avro and Connect, owning one cache per direction.
///
/// Safe to share between threads; translations run outside the cache locks.
pub struct AvroData {
    config: AvroDataConfig,
    to_connect_cache: SchemaCache<AvroSchemaKey, SchemaRef>,
    from_connect_cache: SchemaCache<ConnectSchemaKey, Schema>,
}

impl AvroData {
    pub fn new(config: AvroDataConfig) -> Self {
        debug!(
            "Creating AvroData: cache_capacity={}, metadata={}, enhanced={}",
            config.cache_capacity, config.attach_provenance_metadata, config.enhanced_fidelity
        );
        Self {
            to_connect_cache: SchemaCache::new(config.cache_capacity),
            from_connect_cache: SchemaCache::new(config.cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &AvroDataConfig {
        &self.config
    }

    /// Translate an Avro schema to Connect.
    ///
    /// Repeated calls with the same schema node return the same `Arc` while
    /// it stays cached.
    pub fn to_connect_schema(&self, schema: &Schema) -> Result<SchemaRef> {
        let key = AvroSchemaKey::new(schema, self.config.fidelity_flags());
        self.to_connect_cache
            .get_or_try_insert_with(key, || forward::to_connect_schema(schema, &self.config))
    }

    /// Translate a Connect schema to Avro.
    pub fn from_connect_schema(&self, schema: &SchemaRef) -> Result<Schema> {
        let key = ConnectSchemaKey::new(schema, self.config.fidelity_flags());
        self.from_connect_cache
            .get_or_try_insert_with(key, || reverse::from_connect_schema(schema, &self.config))
    }

    /// Convert an Avro value to Connect, together with its translated schema.
    pub fn to_connect_data(&self, schema: &Schema, value: &Value) -> Result<SchemaAndValue> {
        let connect = self.to_connect_schema(schema)?;
        let value = forward::to_connect_value(schema, &connect, value)?;
        Ok(SchemaAndValue::new(connect, value))
    }

    /// Convert a Connect value to Avro against the translation of its schema.
    pub fn from_connect_data(&self, schema: &SchemaRef, value: &ConnectValue) -> Result<Value> {
        let avro = self.from_connect_schema(schema)?;
        reverse::from_connect_value(schema, &avro, value)
    }

    /// Number of cached translations per direction: (to Connect, from Connect).
    pub fn cached_schemas(&self) -> (usize, usize) {
        (self.to_connect_cache.len(), self.from_connect_cache.len())
    }
}

impl Default for AvroData {
    fn default() -> Self {
        Self::new(AvroDataConfig::default())
    }
}
