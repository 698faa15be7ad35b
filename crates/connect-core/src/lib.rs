//! Connect-style schema and value model.
//!
//! - [`ConnectSchema`] - flat logical schema (primitive, array, map, struct)
//!   carrying name, doc, default, version and string parameters
//! - [`ConnectValue`] / [`Struct`] - values interpreted against a schema
//! - [`json`] - JSON envelope format for schemas and values

pub mod error;
pub mod json;
pub mod schema;
pub mod value;

pub use error::{ConnectError, Result};
pub use schema::{ConnectSchema, Field, SchemaBuilder, SchemaKind, SchemaRef, StructIndex};
pub use value::{validate_value, ConnectValue, SchemaAndValue, Struct};
