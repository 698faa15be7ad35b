//! Binary datum encoding backed by the `apache-avro` crate.
//!
//! The schema is handed to `apache-avro` without logical type annotations so
//! decoded values stay in their base representation, which is what [`Value`]
//! models.

use crate::default::decode_default;
use crate::error::{AvroSchemaError, Result};
use crate::schema::{Names, PrimitiveType, Schema};
use crate::value::{Record, Value};
use crate::writer::{to_json_with, WriteOptions};
use apache_avro::types::Value as AvroValue;
use apache_avro::Schema as AvroSchema;
use std::collections::HashMap;
use std::io::Cursor;

/// Encoder/decoder for datums of one schema.
#[derive(Debug, Clone)]
pub struct DatumCodec {
    schema: Schema,
    names: Names,
    avro: AvroSchema,
}

impl DatumCodec {
    pub fn new(schema: &Schema) -> Result<Self> {
        let text = to_json_with(
            schema,
            WriteOptions {
                strip_logical_types: true,
            },
        )
        .to_string();
        let avro = AvroSchema::parse_str(&text)
            .map_err(|e| AvroSchemaError::Codec(format!("schema rejected by encoder: {e}")))?;
        Ok(Self {
            schema: schema.clone(),
            names: Names::collect(schema),
            avro,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Encode one datum, without any container or framing.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let avro_value = to_avro_value(value, &self.schema, &self.names)?;
        apache_avro::to_avro_datum(&self.avro, avro_value)
            .map_err(|e| AvroSchemaError::Codec(format!("failed to encode datum: {e}")))
    }

    /// Decode one datum written with this schema.
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let mut cursor = Cursor::new(bytes);
        let avro_value = apache_avro::from_avro_datum(&self.avro, &mut cursor, None)
            .map_err(|e| AvroSchemaError::Codec(format!("failed to decode datum: {e}")))?;
        from_avro_value(avro_value, &self.schema, &self.names)
    }
}

fn codec_mismatch(value: &Value, schema: &Schema) -> AvroSchemaError {
    AvroSchemaError::ValueMismatch(format!(
        "cannot encode {} value as {}",
        value.kind(),
        schema.type_name()
    ))
}

fn to_avro_value(value: &Value, schema: &Schema, names: &Names) -> Result<AvroValue> {
    let schema = names.resolve(schema)?;
    let avro_value = match (schema, value) {
        (Schema::Union(u), value) => {
            let index = value
                .union_branch(&u.variants, names)?
                .ok_or_else(|| codec_mismatch(value, schema))?;
            let inner = to_avro_value(value, &u.variants[index], names)?;
            AvroValue::Union(index as u32, Box::new(inner))
        }
        (Schema::Primitive(p), value) => match (p.kind, value) {
            (PrimitiveType::Null, Value::Null) => AvroValue::Null,
            (PrimitiveType::Boolean, Value::Boolean(b)) => AvroValue::Boolean(*b),
            (PrimitiveType::Int, Value::Int(i)) => AvroValue::Int(*i),
            (PrimitiveType::Long, Value::Long(l)) => AvroValue::Long(*l),
            (PrimitiveType::Float, Value::Float(f)) => AvroValue::Float(*f),
            (PrimitiveType::Double, Value::Double(d)) => AvroValue::Double(*d),
            (PrimitiveType::Bytes, Value::Bytes(b)) => AvroValue::Bytes(b.clone()),
            (PrimitiveType::String, Value::String(s)) => AvroValue::String(s.clone()),
            _ => return Err(codec_mismatch(value, schema)),
        },
        (Schema::Fixed(f), Value::Bytes(bytes)) if bytes.len() == f.size => {
            AvroValue::Fixed(f.size, bytes.clone())
        }
        (Schema::Enum(e), Value::String(symbol)) => {
            let index = e
                .symbols
                .iter()
                .position(|s| s == symbol)
                .ok_or_else(|| codec_mismatch(value, schema))?;
            AvroValue::Enum(index as u32, symbol.clone())
        }
        (Schema::Array(a), Value::Array(items)) => AvroValue::Array(
            items
                .iter()
                .map(|item| to_avro_value(item, &a.items, names))
                .collect::<Result<_>>()?,
        ),
        (Schema::Map(m), Value::Map(entries)) => AvroValue::Map(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_avro_value(v, &m.values, names)?)))
                .collect::<Result<HashMap<_, _>>>()?,
        ),
        (Schema::Record(r), Value::Record(record)) => {
            let mut fields = Vec::with_capacity(r.fields.len());
            for field in &r.fields {
                let field_value = match (record.get(&field.name), &field.default) {
                    (Some(v), _) => v.clone(),
                    (None, Some(default)) => decode_default(default, &field.schema, names)?,
                    (None, None) => {
                        return Err(AvroSchemaError::ValueMismatch(format!(
                            "record '{}' is missing field '{}'",
                            r.name, field.name
                        )))
                    }
                };
                fields.push((field.name.clone(), to_avro_value(&field_value, &field.schema, names)?));
            }
            AvroValue::Record(fields)
        }
        _ => return Err(codec_mismatch(value, schema)),
    };
    Ok(avro_value)
}

fn from_avro_value(avro_value: AvroValue, schema: &Schema, names: &Names) -> Result<Value> {
    let schema = names.resolve(schema)?;
    let value = match (schema, avro_value) {
        (Schema::Union(u), AvroValue::Union(index, inner)) => {
            let variant = u.variants.get(index as usize).ok_or_else(|| {
                AvroSchemaError::Codec(format!("union index {index} out of range"))
            })?;
            return from_avro_value(*inner, variant, names);
        }
        (_, AvroValue::Null) => Value::Null,
        (_, AvroValue::Boolean(b)) => Value::Boolean(b),
        (_, AvroValue::Int(i)) => Value::Int(i),
        (_, AvroValue::Long(l)) => Value::Long(l),
        (_, AvroValue::Float(f)) => Value::Float(f),
        (_, AvroValue::Double(d)) => Value::Double(d),
        (_, AvroValue::Bytes(b)) | (_, AvroValue::Fixed(_, b)) => Value::Bytes(b),
        (_, AvroValue::String(s)) | (_, AvroValue::Enum(_, s)) => Value::String(s),
        (Schema::Array(a), AvroValue::Array(items)) => Value::Array(
            items
                .into_iter()
                .map(|item| from_avro_value(item, &a.items, names))
                .collect::<Result<_>>()?,
        ),
        (Schema::Map(m), AvroValue::Map(entries)) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| Ok((k, from_avro_value(v, &m.values, names)?)))
                .collect::<Result<_>>()?,
        ),
        (Schema::Record(r), AvroValue::Record(fields)) => {
            let mut record = Record::new();
            for (name, field_value) in fields {
                let field = r.field(&name).ok_or_else(|| {
                    AvroSchemaError::Codec(format!("decoded unknown field '{name}' of '{}'", r.name))
                })?;
                record.put(name, from_avro_value(field_value, &field.schema, names)?);
            }
            Value::Record(record)
        }
        (schema, other) => {
            return Err(AvroSchemaError::Codec(format!(
                "unexpected decoded value {other:?} for {}",
                schema.type_name()
            )))
        }
    };
    Ok(value)
}
