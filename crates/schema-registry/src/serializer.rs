//! Avro value level serializer and deserializer.
//!
//! Both sides keep the schemas they have seen by id, so a given id always
//! decodes to the same [`Schema`] node and identity-keyed translation caches
//! downstream keep hitting.

use crate::error::Result;
use crate::framing::{decode_frame, encode_frame, Compression};
use crate::registry::SchemaRegistry;
use avro_schema::{parse_str, to_json_string, DatumCodec, Schema, Value};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// A decoded record with the schema it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub schema_id: Uuid,
    pub schema: Schema,
    pub value: Value,
}

/// Registers writer schemas and frames encoded values.
pub struct AvroSerializer {
    registry: Arc<dyn SchemaRegistry>,
    compression: Compression,
    /// (subject, schema text) → id
    ids: Mutex<HashMap<(String, String), Uuid>>,
    codecs: Mutex<HashMap<Uuid, Arc<DatumCodec>>>,
}

impl AvroSerializer {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self::with_compression(registry, Compression::None)
    }

    pub fn with_compression(registry: Arc<dyn SchemaRegistry>, compression: Compression) -> Self {
        Self {
            registry,
            compression,
            ids: Mutex::new(HashMap::new()),
            codecs: Mutex::new(HashMap::new()),
        }
    }

    /// Encode `value` of `schema`, registering the schema under `subject` first.
    pub async fn serialize(&self, subject: &str, schema: &Schema, value: &Value) -> Result<Bytes> {
        let text = to_json_string(schema);
        let key = (subject.to_string(), text);
        let cached = self.ids.lock().get(&key).copied();
        let id = match cached {
            Some(id) => id,
            None => {
                let id = self.registry.register_schema(subject, &key.1).await?;
                debug!("Schema for subject '{}' registered as {}", subject, id);
                self.ids.lock().insert(key, id);
                id
            }
        };

        let codec = self.codec(id, schema)?;
        let payload = codec.encode(value)?;
        encode_frame(id, self.compression, &payload)
    }

    fn codec(&self, id: Uuid, schema: &Schema) -> Result<Arc<DatumCodec>> {
        if let Some(codec) = self.codecs.lock().get(&id) {
            return Ok(codec.clone());
        }
        let codec = Arc::new(DatumCodec::new(schema)?);
        Ok(self.codecs.lock().entry(id).or_insert(codec).clone())
    }
}

/// Reads frames and decodes them with the registered writer schema.
pub struct AvroDeserializer {
    registry: Arc<dyn SchemaRegistry>,
    codecs: Mutex<HashMap<Uuid, Arc<DatumCodec>>>,
}

impl AvroDeserializer {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            registry,
            codecs: Mutex::new(HashMap::new()),
        }
    }

    pub async fn deserialize(&self, bytes: &[u8]) -> Result<DecodedRecord> {
        let frame = decode_frame(bytes)?;
        let codec = self.codec(frame.schema_id).await?;
        let value = codec.decode(frame.payload)?;
        Ok(DecodedRecord {
            schema_id: frame.schema_id,
            schema: codec.schema().clone(),
            value,
        })
    }

    async fn codec(&self, id: Uuid) -> Result<Arc<DatumCodec>> {
        let cached = self.codecs.lock().get(&id).cloned();
        if let Some(codec) = cached {
            return Ok(codec);
        }
        let text = self.registry.resolve_schema(id).await?;
        debug!("Resolved writer schema {}", id);
        let codec = Arc::new(DatumCodec::new(&parse_str(&text)?)?);
        // First resolution wins so every caller shares one schema node.
        Ok(self.codecs.lock().entry(id).or_insert(codec).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::registry::InMemorySchemaRegistry;
    use avro_schema::Record;

    const USER: &str = r#"{"type":"record","name":"User","namespace":"example.avro","fields":[
        {"name":"name","type":"string"},
        {"name":"favorite_number","type":["int","null"]},
        {"name":"favorite_color","type":["string","null"]}]}"#;

    fn user(name: &str, number: Option<i32>) -> Value {
        Record::new()
            .with("name", Value::String(name.into()))
            .with("favorite_number", number.map_or(Value::Null, Value::Int))
            .with("favorite_color", Value::Null)
            .into()
    }

    #[tokio::test]
    async fn test_serialize_then_deserialize() {
        let registry: Arc<dyn SchemaRegistry> = Arc::new(InMemorySchemaRegistry::new());
        let serializer = AvroSerializer::new(registry.clone());
        let deserializer = AvroDeserializer::new(registry);
        let schema = parse_str(USER).unwrap();

        let bytes = serializer
            .serialize("users-value", &schema, &user("Ada", Some(7)))
            .await
            .unwrap();
        assert_eq!(bytes[0], 3);

        let decoded = deserializer.deserialize(&bytes).await.unwrap();
        assert_eq!(decoded.value, user("Ada", Some(7)));
        assert_eq!(decoded.schema, schema);
    }

    #[tokio::test]
    async fn test_one_registration_per_schema() {
        let registry = Arc::new(InMemorySchemaRegistry::new());
        let serializer = AvroSerializer::new(registry.clone());
        let schema = parse_str(USER).unwrap();
        let a = serializer.serialize("u", &schema, &user("a", None)).await.unwrap();
        let b = serializer.serialize("u", &schema, &user("b", None)).await.unwrap();
        assert_eq!(a[2..18], b[2..18]);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_same_id_decodes_to_same_schema_node() {
        let registry: Arc<dyn SchemaRegistry> = Arc::new(InMemorySchemaRegistry::new());
        let serializer = AvroSerializer::new(registry.clone());
        let deserializer = AvroDeserializer::new(registry);
        let schema = parse_str(USER).unwrap();
        let bytes = serializer.serialize("u", &schema, &user("a", None)).await.unwrap();

        let first = deserializer.deserialize(&bytes).await.unwrap();
        let second = deserializer.deserialize(&bytes).await.unwrap();
        assert!(first.schema.same_node(&second.schema));
    }

    #[tokio::test]
    async fn test_unknown_schema_id() {
        let registry: Arc<dyn SchemaRegistry> = Arc::new(InMemorySchemaRegistry::new());
        let deserializer = AvroDeserializer::new(registry);
        let bytes = encode_frame(Uuid::new_v4(), Compression::None, &[0]).unwrap();
        assert!(matches!(
            deserializer.deserialize(&bytes).await,
            Err(RegistryError::SchemaNotFound(_))
        ));
    }
}
