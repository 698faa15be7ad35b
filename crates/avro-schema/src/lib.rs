//! Avro schema and value model for schema-bridge.
//!
//! Schema text is parsed into a graph of [`Schema`] nodes in which every named
//! type is a single shared object, and written back in the attribute order the
//! rest of the Avro ecosystem uses.
//!
//! # Modules
//!
//! - [`parser`] - schema JSON text → [`Schema`]
//! - [`writer`] - [`Schema`] → schema JSON text
//! - [`value`] - generic datum values
//! - [`default`] - JSON default literals ↔ [`Value`]
//! - [`codec`] - binary datum encoding
//!
//! # Example
//!
//! ```ignore
//! use avro_schema::{parse_str, to_json_string};
//!
//! let schema = parse_str(r#"{"type":"record","name":"P","fields":[{"name":"a","type":"int"}]}"#)?;
//! assert_eq!(to_json_string(&schema), r#"{"type":"record","name":"P","fields":[{"name":"a","type":"int"}]}"#);
//! ```

pub mod codec;
pub mod default;
pub mod error;
pub mod name;
pub mod parser;
pub mod schema;
pub mod value;
pub mod writer;

pub use codec::DatumCodec;
pub use default::{decode_default, decode_json_datum, encode_default};
pub use error::{AvroSchemaError, Result};
pub use name::{is_valid_identifier, Name};
pub use parser::{parse_json, parse_str};
pub use schema::{
    ArraySchema, EnumSchema, FixedSchema, LogicalType, MapSchema, Names, PrimitiveSchema,
    PrimitiveType, Props, RecordField, RecordSchema, Schema, UnionSchema,
};
pub use value::{Record, Value};
pub use writer::{to_json, to_json_string, to_json_with, WriteOptions};
