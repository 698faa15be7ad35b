//! Avro → Connect translation.

mod data;
mod schema;

pub use data::to_connect_value;
pub use schema::to_connect_schema;
