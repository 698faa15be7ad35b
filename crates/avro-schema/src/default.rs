//! Conversion between JSON default literals and [`Value`]s.
//!
//! Field defaults use Avro's JSON datum encoding: a union
//! default is written against the union's first member, `bytes` and `fixed`
//! are strings whose code points are the byte values.

use crate::error::{AvroSchemaError, Result};
use crate::schema::{Names, PrimitiveType, Schema};
use crate::value::{Record, Value};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::BTreeMap;

/// How union members are chosen while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnionMode {
    /// Only the first member, as field defaults require
    First,
    /// First member the literal decodes against
    Any,
}

/// Decode a field default.
pub fn decode_default(json: &JsonValue, schema: &Schema, names: &Names) -> Result<Value> {
    decode(json, schema, names, UnionMode::First)
}

/// Decode a JSON literal as a datum, trying every union member in order.
pub fn decode_json_datum(json: &JsonValue, schema: &Schema, names: &Names) -> Result<Value> {
    decode(json, schema, names, UnionMode::Any)
}

fn mismatch(json: &JsonValue, schema: &Schema) -> AvroSchemaError {
    AvroSchemaError::ValueMismatch(format!("{json} is not a valid {}", schema.type_name()))
}

fn decode(json: &JsonValue, schema: &Schema, names: &Names, mode: UnionMode) -> Result<Value> {
    let schema = names.resolve(schema)?;
    match schema {
        Schema::Primitive(p) => decode_primitive(json, p.kind).ok_or_else(|| mismatch(json, schema)),
        Schema::Fixed(f) => {
            let bytes = json
                .as_str()
                .and_then(latin1_bytes)
                .ok_or_else(|| mismatch(json, schema))?;
            if bytes.len() != f.size {
                return Err(AvroSchemaError::ValueMismatch(format!(
                    "fixed '{}' needs {} bytes, default has {}",
                    f.name,
                    f.size,
                    bytes.len()
                )));
            }
            Ok(Value::Bytes(bytes))
        }
        Schema::Enum(e) => match json.as_str() {
            Some(symbol) if e.symbols.iter().any(|s| s == symbol) => {
                Ok(Value::String(symbol.to_string()))
            }
            _ => Err(mismatch(json, schema)),
        },
        Schema::Array(a) => {
            let items = json.as_array().ok_or_else(|| mismatch(json, schema))?;
            items
                .iter()
                .map(|item| decode(item, &a.items, names, mode))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)
        }
        Schema::Map(m) => {
            let entries = json.as_object().ok_or_else(|| mismatch(json, schema))?;
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), decode(v, &m.values, names, mode)?)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Value::Map)
        }
        Schema::Record(r) => {
            let object = json.as_object().ok_or_else(|| mismatch(json, schema))?;
            let mut record = Record::new();
            for field in &r.fields {
                let value = match (object.get(&field.name), &field.default) {
                    (Some(value), _) => decode(value, &field.schema, names, mode)?,
                    (None, Some(default)) => decode(default, &field.schema, names, UnionMode::First)?,
                    (None, None) => {
                        return Err(AvroSchemaError::ValueMismatch(format!(
                            "missing field '{}' of '{}'",
                            field.name, r.name
                        )))
                    }
                };
                record.put(field.name.clone(), value);
            }
            if let Some(extra) = object.keys().find(|k| r.field(k).is_none()) {
                return Err(AvroSchemaError::ValueMismatch(format!(
                    "'{}' has no field '{extra}'",
                    r.name
                )));
            }
            Ok(Value::Record(record))
        }
        Schema::Union(u) => match mode {
            UnionMode::First => {
                let first = u
                    .variants
                    .first()
                    .ok_or_else(|| AvroSchemaError::InvalidUnion("empty union".to_string()))?;
                decode(json, first, names, mode)
            }
            UnionMode::Any => u
                .variants
                .iter()
                .find_map(|variant| decode(json, variant, names, mode).ok())
                .ok_or_else(|| mismatch(json, schema)),
        },
        Schema::Ref(name) => Err(AvroSchemaError::UnknownType(name.fullname())),
    }
}

fn decode_primitive(json: &JsonValue, kind: PrimitiveType) -> Option<Value> {
    match kind {
        PrimitiveType::Null => json.is_null().then_some(Value::Null),
        PrimitiveType::Boolean => json.as_bool().map(Value::Boolean),
        PrimitiveType::Int => json
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int),
        PrimitiveType::Long => json.as_i64().map(Value::Long),
        PrimitiveType::Float => decode_float(json).map(|f| Value::Float(f as f32)),
        PrimitiveType::Double => decode_float(json).map(Value::Double),
        PrimitiveType::Bytes => json.as_str().and_then(latin1_bytes).map(Value::Bytes),
        PrimitiveType::String => json.as_str().map(|s| Value::String(s.to_string())),
    }
}

fn decode_float(json: &JsonValue) -> Option<f64> {
    match json {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn latin1_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

/// Encode a value as a JSON literal for `schema`.
///
/// For a union the first member the value matches is used; callers writing a
/// field default must place that member first.
pub fn encode_default(value: &Value, schema: &Schema, names: &Names) -> Result<JsonValue> {
    let schema = names.resolve(schema)?;
    let json = match (schema, value) {
        (Schema::Union(u), value) => {
            let index = value
                .union_branch(&u.variants, names)?
                .ok_or_else(|| value_mismatch(value, schema))?;
            return encode_default(value, &u.variants[index], names);
        }
        (_, Value::Null) => JsonValue::Null,
        (_, Value::Boolean(b)) => JsonValue::Bool(*b),
        (_, Value::Int(i)) => JsonValue::from(*i),
        (_, Value::Long(l)) => JsonValue::from(*l),
        (_, Value::Float(f)) => encode_float(*f as f64, &format!("{f:?}")),
        (_, Value::Double(d)) => encode_float(*d, &format!("{d:?}")),
        (_, Value::Bytes(bytes)) => JsonValue::String(latin1_string(bytes)),
        (_, Value::String(s)) => JsonValue::String(s.clone()),
        (Schema::Array(a), Value::Array(items)) => JsonValue::Array(
            items
                .iter()
                .map(|item| encode_default(item, &a.items, names))
                .collect::<Result<_>>()?,
        ),
        (Schema::Map(m), Value::Map(entries)) => JsonValue::Object(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), encode_default(v, &m.values, names)?)))
                .collect::<Result<Map<_, _>>>()?,
        ),
        (Schema::Record(r), Value::Record(record)) => {
            let mut object = Map::new();
            for field in &r.fields {
                if let Some(value) = record.get(&field.name) {
                    object.insert(field.name.clone(), encode_default(value, &field.schema, names)?);
                }
            }
            JsonValue::Object(object)
        }
        _ => return Err(value_mismatch(value, schema)),
    };
    Ok(json)
}

fn value_mismatch(value: &Value, schema: &Schema) -> AvroSchemaError {
    AvroSchemaError::ValueMismatch(format!(
        "{} value for {} schema",
        value.kind(),
        schema.type_name()
    ))
}

/// Shortest decimal text for finite floats, the special names otherwise.
fn encode_float(value: f64, shortest: &str) -> JsonValue {
    if value.is_nan() {
        JsonValue::String("NaN".to_string())
    } else if value.is_infinite() {
        let name = if value > 0.0 { "Infinity" } else { "-Infinity" };
        JsonValue::String(name.to_string())
    } else {
        serde_json::from_str::<Number>(shortest)
            .ok()
            .or_else(|| Number::from_f64(value))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}
