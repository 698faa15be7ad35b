//! Registry interface, wire framing and adapters around the Avro ⇄ Connect core.
//!
//! Nothing in `avro-connect-types` performs I/O. This crate is where schema
//! texts are registered and resolved, and where records meet the wire.
//!
//! # Modules
//!
//! - [`registry`] - `SchemaRegistry` trait and the in-memory registry
//! - [`framing`] - header, compression marker and schema id of a frame
//! - [`serializer`] - Avro value level serializer and deserializer
//! - [`converter`] - Connect level converter
//! - [`config`] - subject naming, compression and translation options

pub mod config;
pub mod converter;
pub mod error;
pub mod framing;
pub mod registry;
pub mod serializer;

pub use config::{ConverterConfig, SubjectStrategy};
pub use converter::AvroConverter;
pub use error::{RegistryError, Result};
pub use framing::{decode_frame, encode_frame, Compression, Frame, HEADER_VERSION_BYTE};
pub use registry::{InMemorySchemaRegistry, RegisteredSchema, SchemaRegistry};
pub use serializer::{AvroDeserializer, AvroSerializer, DecodedRecord};
