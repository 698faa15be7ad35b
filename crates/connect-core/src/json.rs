//! JSON envelope format for Connect schemas and values.
//!
//! Schemas use the layout of Kafka Connect's JSON converter
//! (`{"type":"struct","fields":[{"field":"a","type":"int32","optional":false}]}`),
//! extended with `doc`, `version`, `parameters`, `default`, `field_doc` and
//! `field_default`, and a `reference` type for recursive structs.
//!
//! Values are plain JSON: bytes are base64, maps with string keys are objects
//! and other maps are arrays of `[key, value]` pairs.

use crate::error::{ConnectError, Result};
use crate::schema::{ConnectSchema, Field, SchemaKind, SchemaRef, StructIndex};
use crate::value::{child_path, ConnectValue, Struct};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Map, Number, Value as JsonValue};
use std::sync::Arc;

/// Render a schema in the envelope format.
pub fn schema_to_json(schema: &SchemaRef) -> Result<JsonValue> {
    let structs = StructIndex::collect(schema);
    write_schema(schema, &structs)
}

fn write_schema(schema: &SchemaRef, structs: &StructIndex) -> Result<JsonValue> {
    let mut obj = Map::new();
    obj.insert("type".into(), schema.type_name().into());
    match &schema.kind {
        SchemaKind::Array(items) => {
            obj.insert("items".into(), write_schema(items, structs)?);
        }
        SchemaKind::Map { key, value } => {
            obj.insert("keys".into(), write_schema(key, structs)?);
            obj.insert("values".into(), write_schema(value, structs)?);
        }
        SchemaKind::Struct(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                let mut f = match write_schema(&field.schema, structs)? {
                    JsonValue::Object(f) => f,
                    _ => Map::new(),
                };
                f.insert("field".into(), field.name.as_str().into());
                if let Some(doc) = &field.doc {
                    f.insert("field_doc".into(), doc.as_str().into());
                }
                if let Some(default) = &field.default {
                    f.insert(
                        "field_default".into(),
                        write_value(&field.schema, default, structs, &field.name)?,
                    );
                }
                out.push(JsonValue::Object(f));
            }
            obj.insert("fields".into(), JsonValue::Array(out));
        }
        _ => {}
    }
    obj.insert("optional".into(), schema.optional.into());
    if let SchemaKind::Reference(name) = &schema.kind {
        obj.insert("name".into(), name.as_str().into());
    } else if let Some(name) = &schema.name {
        obj.insert("name".into(), name.as_str().into());
    }
    if let Some(version) = schema.version {
        obj.insert("version".into(), version.into());
    }
    if let Some(doc) = &schema.doc {
        obj.insert("doc".into(), doc.as_str().into());
    }
    if !schema.parameters.is_empty() {
        let params: Map<String, JsonValue> = schema
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
            .collect();
        obj.insert("parameters".into(), JsonValue::Object(params));
    }
    if let Some(default) = &schema.default {
        obj.insert("default".into(), write_value(schema, default, structs, "<default>")?);
    }
    Ok(JsonValue::Object(obj))
}

/// Parse a schema from the envelope format.
pub fn schema_from_json(json: &JsonValue) -> Result<SchemaRef> {
    let schema = read_schema(json)?;
    let structs = StructIndex::collect(&schema);
    // Defaults are attached after the whole graph exists so references resolve.
    attach_defaults(schema, json, &structs)
}

fn invalid(message: impl Into<String>) -> ConnectError {
    ConnectError::InvalidSchema(message.into())
}

fn read_schema(json: &JsonValue) -> Result<SchemaRef> {
    let obj = json
        .as_object()
        .ok_or_else(|| invalid(format!("schema must be an object, found {json}")))?;
    let type_name = obj
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| invalid("schema without 'type'"))?;
    let kind = match type_name {
        "int8" => SchemaKind::Int8,
        "int16" => SchemaKind::Int16,
        "int32" => SchemaKind::Int32,
        "int64" => SchemaKind::Int64,
        "float" => SchemaKind::Float32,
        "double" => SchemaKind::Float64,
        "boolean" => SchemaKind::Boolean,
        "string" => SchemaKind::String,
        "bytes" => SchemaKind::Bytes,
        "array" => {
            let items = obj.get("items").ok_or_else(|| invalid("array without 'items'"))?;
            SchemaKind::Array(read_schema(items)?)
        }
        "map" => {
            let key = obj.get("keys").ok_or_else(|| invalid("map without 'keys'"))?;
            let value = obj.get("values").ok_or_else(|| invalid("map without 'values'"))?;
            SchemaKind::Map {
                key: read_schema(key)?,
                value: read_schema(value)?,
            }
        }
        "struct" => {
            let fields = obj
                .get("fields")
                .and_then(JsonValue::as_array)
                .ok_or_else(|| invalid("struct without 'fields'"))?;
            let mut out: Vec<Field> = Vec::with_capacity(fields.len());
            for (index, field) in fields.iter().enumerate() {
                let name = field
                    .get("field")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| invalid("struct field without 'field'"))?;
                if out.iter().any(|f| f.name == name) {
                    return Err(invalid(format!("duplicate field '{name}'")));
                }
                out.push(Field {
                    name: name.to_string(),
                    index,
                    schema: read_schema(field)?,
                    doc: field.get("field_doc").and_then(JsonValue::as_str).map(str::to_string),
                    default: None,
                });
            }
            SchemaKind::Struct(out)
        }
        "reference" => {
            let name = obj
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| invalid("reference without 'name'"))?;
            SchemaKind::Reference(name.to_string())
        }
        other => return Err(invalid(format!("unknown type '{other}'"))),
    };

    let mut schema = ConnectSchema::new(kind);
    schema.optional = obj.get("optional").and_then(JsonValue::as_bool).unwrap_or(false);
    if !matches!(schema.kind, SchemaKind::Reference(_)) {
        schema.name = obj.get("name").and_then(JsonValue::as_str).map(str::to_string);
    }
    schema.version = obj
        .get("version")
        .and_then(JsonValue::as_i64)
        .and_then(|v| i32::try_from(v).ok());
    schema.doc = obj.get("doc").and_then(JsonValue::as_str).map(str::to_string);
    if let Some(params) = obj.get("parameters") {
        let params = params
            .as_object()
            .ok_or_else(|| invalid("'parameters' must be an object"))?;
        for (key, value) in params {
            let value = value
                .as_str()
                .ok_or_else(|| invalid(format!("parameter '{key}' must be a string")))?;
            schema.parameters.insert(key.clone(), value.to_string());
        }
    }
    Ok(Arc::new(schema))
}

fn attach_defaults(schema: SchemaRef, json: &JsonValue, structs: &StructIndex) -> Result<SchemaRef> {
    let mut owned = (*schema).clone();
    match &mut owned.kind {
        SchemaKind::Array(items) => {
            if let Some(items_json) = json.get("items") {
                *items = attach_defaults(items.clone(), items_json, structs)?;
            }
        }
        SchemaKind::Map { key, value } => {
            if let (Some(k), Some(v)) = (json.get("keys"), json.get("values")) {
                *key = attach_defaults(key.clone(), k, structs)?;
                *value = attach_defaults(value.clone(), v, structs)?;
            }
        }
        SchemaKind::Struct(fields) => {
            let fields_json = json.get("fields").and_then(JsonValue::as_array);
            for (field, field_json) in fields.iter_mut().zip(fields_json.into_iter().flatten()) {
                field.schema = attach_defaults(field.schema.clone(), field_json, structs)?;
                if let Some(default) = field_json.get("field_default") {
                    field.default = Some(read_value(&field.schema, default, structs, &field.name)?);
                }
            }
        }
        _ => {}
    }
    if let Some(default) = json.get("default") {
        owned.default = Some(read_value(&schema, default, structs, "<default>")?);
    }
    if owned == *schema {
        return Ok(schema);
    }
    Ok(Arc::new(owned))
}

/// Render a value of `schema` as JSON.
pub fn value_to_json(schema: &SchemaRef, value: &ConnectValue) -> Result<JsonValue> {
    let structs = StructIndex::collect(schema);
    write_value(schema, value, &structs, "")
}

/// Parse a JSON value against `schema`.
pub fn value_from_json(schema: &SchemaRef, json: &JsonValue) -> Result<ConnectValue> {
    let structs = StructIndex::collect(schema);
    read_value(schema, json, &structs, "")
}

fn float_json(value: f64, shortest: String) -> JsonValue {
    if value.is_finite() {
        serde_json::from_str::<Number>(&shortest)
            .ok()
            .or_else(|| Number::from_f64(value))
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    } else if value.is_nan() {
        json!("NaN")
    } else if value > 0.0 {
        json!("Infinity")
    } else {
        json!("-Infinity")
    }
}

fn write_value(
    schema: &SchemaRef,
    value: &ConnectValue,
    structs: &StructIndex,
    path: &str,
) -> Result<JsonValue> {
    let schema = structs.resolve(schema)?;
    let json = match (&schema.kind, value) {
        (_, ConnectValue::Null) => JsonValue::Null,
        (_, ConnectValue::Boolean(b)) => JsonValue::Bool(*b),
        (_, ConnectValue::Int8(i)) => json!(i),
        (_, ConnectValue::Int16(i)) => json!(i),
        (_, ConnectValue::Int32(i)) => json!(i),
        (_, ConnectValue::Int64(i)) => json!(i),
        (_, ConnectValue::Float32(f)) => float_json(*f as f64, format!("{f:?}")),
        (_, ConnectValue::Float64(f)) => float_json(*f, format!("{f:?}")),
        (_, ConnectValue::String(s)) => JsonValue::String(s.clone()),
        (_, ConnectValue::Bytes(b)) => JsonValue::String(STANDARD.encode(b)),
        (SchemaKind::Array(items), ConnectValue::Array(values)) => JsonValue::Array(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| write_value(items, v, structs, &child_path(path, &i.to_string())))
                .collect::<Result<_>>()?,
        ),
        (SchemaKind::Map { key, value: val }, ConnectValue::Map(entries)) => {
            if matches!(key.kind, SchemaKind::String) {
                let mut obj = Map::new();
                for (k, v) in entries {
                    let k = k
                        .as_str()
                        .ok_or_else(|| ConnectError::invalid_value(path, "map key is not a string"))?;
                    obj.insert(k.to_string(), write_value(val, v, structs, &child_path(path, k))?);
                }
                JsonValue::Object(obj)
            } else {
                let mut pairs = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    pairs.push(JsonValue::Array(vec![
                        write_value(key, k, structs, &child_path(path, "<key>"))?,
                        write_value(val, v, structs, &child_path(path, "<value>"))?,
                    ]));
                }
                JsonValue::Array(pairs)
            }
        }
        (SchemaKind::Struct(_), ConnectValue::Struct(s)) => {
            let mut obj = Map::new();
            for (field, field_value) in s.iter() {
                obj.insert(
                    field.name.clone(),
                    write_value(&field.schema, field_value, structs, &child_path(path, &field.name))?,
                );
            }
            JsonValue::Object(obj)
        }
        (_, value) => {
            return Err(ConnectError::invalid_value(
                path,
                format!("{} value for {} schema", value.kind(), schema.type_name()),
            ))
        }
    };
    Ok(json)
}

fn read_float(json: &JsonValue) -> Option<f64> {
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

fn read_value(
    schema: &SchemaRef,
    json: &JsonValue,
    structs: &StructIndex,
    path: &str,
) -> Result<ConnectValue> {
    if json.is_null() {
        return if schema.optional {
            Ok(ConnectValue::Null)
        } else {
            Err(ConnectError::invalid_value(path, "null for a required schema"))
        };
    }
    let resolved = structs.resolve(schema)?;
    let mismatch = || {
        ConnectError::invalid_value(path, format!("{json} is not a valid {}", resolved.type_name()))
    };
    let value = match &resolved.kind {
        SchemaKind::Int8 => ConnectValue::Int8(
            json.as_i64().and_then(|i| i8::try_from(i).ok()).ok_or_else(mismatch)?,
        ),
        SchemaKind::Int16 => ConnectValue::Int16(
            json.as_i64().and_then(|i| i16::try_from(i).ok()).ok_or_else(mismatch)?,
        ),
        SchemaKind::Int32 => ConnectValue::Int32(
            json.as_i64().and_then(|i| i32::try_from(i).ok()).ok_or_else(mismatch)?,
        ),
        SchemaKind::Int64 => ConnectValue::Int64(json.as_i64().ok_or_else(mismatch)?),
        SchemaKind::Float32 => ConnectValue::Float32(read_float(json).ok_or_else(mismatch)? as f32),
        SchemaKind::Float64 => ConnectValue::Float64(read_float(json).ok_or_else(mismatch)?),
        SchemaKind::Boolean => ConnectValue::Boolean(json.as_bool().ok_or_else(mismatch)?),
        SchemaKind::String => ConnectValue::String(json.as_str().ok_or_else(mismatch)?.to_string()),
        SchemaKind::Bytes => ConnectValue::Bytes(STANDARD.decode(json.as_str().ok_or_else(mismatch)?)?),
        SchemaKind::Array(items) => ConnectValue::Array(
            json.as_array()
                .ok_or_else(mismatch)?
                .iter()
                .enumerate()
                .map(|(i, v)| read_value(items, v, structs, &child_path(path, &i.to_string())))
                .collect::<Result<_>>()?,
        ),
        SchemaKind::Map { key, value } => {
            let mut entries = Vec::new();
            match json {
                JsonValue::Object(obj) if matches!(key.kind, SchemaKind::String) => {
                    for (k, v) in obj {
                        entries.push((
                            ConnectValue::String(k.clone()),
                            read_value(value, v, structs, &child_path(path, k))?,
                        ));
                    }
                }
                JsonValue::Array(pairs) => {
                    for pair in pairs {
                        let (k, v) = match pair.as_array().map(Vec::as_slice) {
                            Some([k, v]) => (k, v),
                            _ => return Err(mismatch()),
                        };
                        entries.push((
                            read_value(key, k, structs, &child_path(path, "<key>"))?,
                            read_value(value, v, structs, &child_path(path, "<value>"))?,
                        ));
                    }
                }
                _ => return Err(mismatch()),
            }
            ConnectValue::Map(entries)
        }
        SchemaKind::Struct(fields) => {
            let obj = json.as_object().ok_or_else(mismatch)?;
            if let Some(extra) = obj.keys().find(|k| resolved.field(k).is_none()) {
                return Err(ConnectError::invalid_value(
                    child_path(path, extra),
                    "no such field",
                ));
            }
            let mut out = Struct::new(resolved.clone())?;
            for field in fields {
                let field_path = child_path(path, &field.name);
                let field_value = match obj.get(&field.name) {
                    Some(v) => read_value(&field.schema, v, structs, &field_path)?,
                    None => match &field.default {
                        Some(default) => default.clone(),
                        None => read_value(&field.schema, &JsonValue::Null, structs, &field_path)?,
                    },
                };
                out.put(&field.name, field_value)?;
            }
            ConnectValue::Struct(out)
        }
        SchemaKind::Reference(name) => return Err(ConnectError::UnknownReference(name.clone())),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    #[test]
    fn test_schema_envelope_round_trip() {
        let text = r#"{"type":"struct","fields":[
            {"type":"string","optional":false,"field":"firstName","field_doc":"First Name"},
            {"type":"int32","optional":true,"field":"age","field_default":null},
            {"type":"map","keys":{"type":"int32","optional":false},"values":{"type":"bytes","optional":false},"optional":false,"field":"blobs"}
        ],"optional":false,"name":"P","version":2,"doc":"person","parameters":{"k":"v"}}"#;
        let json: JsonValue = serde_json::from_str(text).unwrap();
        let schema = schema_from_json(&json).unwrap();
        assert_eq!(schema.name.as_deref(), Some("P"));
        assert_eq!(schema.version, Some(2));
        assert_eq!(schema.fields()[0].doc.as_deref(), Some("First Name"));
        assert_eq!(schema.fields()[1].default, Some(ConnectValue::Null));
        assert_eq!(schema_to_json(&schema).unwrap(), json);
    }

    #[test]
    fn test_values_use_base64_and_pairs() {
        let schema = SchemaBuilder::map(
            SchemaBuilder::int32().build().unwrap(),
            SchemaBuilder::bytes().build().unwrap(),
        )
        .build()
        .unwrap();
        let value = ConnectValue::Map(vec![(ConnectValue::Int32(7), ConnectValue::Bytes(b"hi".to_vec()))]);
        let json = value_to_json(&schema, &value).unwrap();
        assert_eq!(json, json!([[7, "aGk="]]));
        assert_eq!(value_from_json(&schema, &json).unwrap(), value);
    }

    #[test]
    fn test_struct_value_fills_defaults() {
        let schema = SchemaBuilder::struct_()
            .name("R")
            .field(Field::new("a", SchemaBuilder::int32().build().unwrap()))
            .field(
                Field::new("b", SchemaBuilder::string().build().unwrap())
                    .with_default(ConnectValue::String("x".into())),
            )
            .build()
            .unwrap();
        let value = value_from_json(&schema, &json!({"a": 1})).unwrap();
        let s = value.as_struct().unwrap();
        assert_eq!(s.get("b"), Some(&ConnectValue::String("x".into())));
        assert!(value_from_json(&schema, &json!({"b": "y"})).is_err());
        assert!(value_from_json(&schema, &json!({"a": 1, "c": 2})).is_err());
    }

    #[test]
    fn test_float32_keeps_short_text() {
        let schema = SchemaBuilder::float32().build().unwrap();
        let json = value_to_json(&schema, &ConnectValue::Float32(9.18)).unwrap();
        assert_eq!(json.to_string(), "9.18");
    }
}
