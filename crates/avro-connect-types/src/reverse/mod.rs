//! Connect → Avro translation.

mod data;
mod schema;

pub use data::from_connect_value;
pub use schema::from_connect_schema;
