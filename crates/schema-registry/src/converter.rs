//! Connect level converter: Connect data to framed Avro bytes and back.

use crate::config::ConverterConfig;
use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::serializer::{AvroDeserializer, AvroSerializer};
use avro_connect_types::AvroData;
use bytes::Bytes;
use connect_core::{ConnectValue, SchemaAndValue, SchemaRef};
use std::sync::Arc;
use tracing::debug;

/// Converts Connect records to registry-framed Avro and back.
///
/// One converter owns one [`AvroData`], so its translation caches are shared
/// by every record it handles.
pub struct AvroConverter {
    config: ConverterConfig,
    avro_data: AvroData,
    serializer: AvroSerializer,
    deserializer: AvroDeserializer,
}

impl AvroConverter {
    pub fn new(registry: Arc<dyn SchemaRegistry>, config: ConverterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            avro_data: AvroData::new(config.avro),
            serializer: AvroSerializer::with_compression(registry.clone(), config.compression),
            deserializer: AvroDeserializer::new(registry),
            config,
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn avro_data(&self) -> &AvroData {
        &self.avro_data
    }

    /// Serialize a Connect value for `topic`. A null value has no bytes.
    pub async fn from_connect_data(
        &self,
        topic: &str,
        schema: &SchemaRef,
        value: &ConnectValue,
    ) -> Result<Option<Bytes>> {
        if value.is_null() {
            return Ok(None);
        }
        let avro = self.avro_data.from_connect_schema(schema)?;
        let avro_value = self.avro_data.from_connect_data(schema, value)?;
        let subject = self.config.subject(topic, &avro)?;
        let bytes = self.serializer.serialize(&subject, &avro, &avro_value).await?;
        Ok(Some(bytes))
    }

    /// Deserialize bytes read from `topic`. Absent bytes are a null record.
    pub async fn to_connect_data(&self, topic: &str, bytes: Option<&[u8]>) -> Result<Option<SchemaAndValue>> {
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        let record = self.deserializer.deserialize(bytes).await?;
        debug!("Decoding record from topic '{}' with schema {}", topic, record.schema_id);
        Ok(Some(self.avro_data.to_connect_data(&record.schema, &record.value)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemorySchemaRegistry;
    use connect_core::{Field, SchemaBuilder, Struct};

    fn order_schema() -> SchemaRef {
        SchemaBuilder::struct_()
            .name("shop.Order")
            .field(Field::new("id", SchemaBuilder::int64().build().unwrap()))
            .field(Field::new("note", SchemaBuilder::string().optional().build().unwrap()))
            .build()
            .unwrap()
    }

    fn converter(registry: Arc<InMemorySchemaRegistry>) -> AvroConverter {
        AvroConverter::new(registry, ConverterConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_struct_round_trip() {
        let registry = Arc::new(InMemorySchemaRegistry::new());
        let converter = converter(registry.clone());
        let schema = order_schema();
        let value = ConnectValue::Struct(
            Struct::new(schema.clone())
                .unwrap()
                .with("id", ConnectValue::Int64(42))
                .unwrap(),
        );

        let bytes = converter
            .from_connect_data("orders", &schema, &value)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(registry.versions("orders-value").await.len(), 1);

        let back = converter
            .to_connect_data("orders", Some(bytes.as_ref()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(back.schema.name.as_deref(), Some("shop.Order"));
        let fields = back.value.as_struct().unwrap();
        assert_eq!(fields.get("id"), Some(&ConnectValue::Int64(42)));
        assert_eq!(fields.get("note"), Some(&ConnectValue::Null));
    }

    #[tokio::test]
    async fn test_null_has_no_bytes() {
        let converter = converter(Arc::new(InMemorySchemaRegistry::new()));
        let schema = SchemaBuilder::string().optional().build().unwrap();
        assert!(converter
            .from_connect_data("t", &schema, &ConnectValue::Null)
            .await
            .unwrap()
            .is_none());
        assert!(converter.to_connect_data("t", None).await.unwrap().is_none());
    }
}
