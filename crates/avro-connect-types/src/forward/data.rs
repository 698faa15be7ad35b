//! Avro values → Connect values.

use crate::error::{ConversionError, Result};
use crate::{child_path, DataContext};
use avro_schema::{ArraySchema, Names, PrimitiveType, Record, RecordSchema, Schema, UnionSchema, Value};
use connect_core::{ConnectValue, Field, SchemaKind, SchemaRef, StructIndex, Struct};

/// Convert `value` of Avro schema `avro` to a value of its translation `connect`.
pub fn to_connect_value(avro: &Schema, connect: &SchemaRef, value: &Value) -> Result<ConnectValue> {
    let names = Names::collect(avro);
    let structs = StructIndex::collect(connect);
    let ctx = DataContext {
        names: &names,
        structs: &structs,
    };
    avro_to_connect(avro, connect, value, &ctx, "")
}

pub(crate) fn avro_to_connect(
    avro: &Schema,
    connect: &SchemaRef,
    value: &Value,
    ctx: &DataContext<'_>,
    path: &str,
) -> Result<ConnectValue> {
    let avro = ctx.names.resolve(avro)?;
    if let Schema::Union(u) = avro {
        return union_to_connect(u, connect, value, ctx, path);
    }
    let connect = ctx.structs.resolve(connect)?;

    match (avro, value) {
        (Schema::Primitive(p), value) => primitive(p.kind, &connect.kind, value, path),
        (Schema::Fixed(f), Value::Bytes(bytes)) if bytes.len() == f.size => {
            Ok(ConnectValue::Bytes(bytes.clone()))
        }
        (Schema::Enum(e), Value::String(symbol)) if e.symbols.contains(symbol) => {
            Ok(ConnectValue::String(symbol.clone()))
        }
        (Schema::Array(a), Value::Array(items)) => array(a, connect, items, ctx, path),
        (Schema::Map(m), Value::Map(entries)) => {
            let SchemaKind::Map { value: values, .. } = &connect.kind else {
                return Err(ConversionError::mismatch(path, "map schema did not translate to a map"));
            };
            let mut out = Vec::with_capacity(entries.len());
            for (key, entry) in entries {
                let entry_path = child_path(path, key);
                out.push((
                    ConnectValue::String(key.clone()),
                    avro_to_connect(&m.values, values, entry, ctx, &entry_path)?,
                ));
            }
            Ok(ConnectValue::Map(out))
        }
        (Schema::Record(r), Value::Record(record)) => record_to_connect(r, connect, record, ctx, path),
        (schema, value) => Err(ConversionError::mismatch(
            path,
            format!("{} value for {} schema", value.kind(), schema.type_name()),
        )),
    }
}

fn primitive(kind: PrimitiveType, target: &SchemaKind, value: &Value, path: &str) -> Result<ConnectValue> {
    let out = match (kind, value) {
        (PrimitiveType::Null, Value::Null) => ConnectValue::Null,
        (PrimitiveType::Boolean, Value::Boolean(b)) => ConnectValue::Boolean(*b),
        (PrimitiveType::Int, Value::Int(i)) => match target {
            SchemaKind::Int8 => i8::try_from(*i)
                .map(ConnectValue::Int8)
                .map_err(|_| ConversionError::mismatch(path, format!("{i} out of range for int8")))?,
            SchemaKind::Int16 => i16::try_from(*i)
                .map(ConnectValue::Int16)
                .map_err(|_| ConversionError::mismatch(path, format!("{i} out of range for int16")))?,
            _ => ConnectValue::Int32(*i),
        },
        (PrimitiveType::Long, Value::Long(l)) => ConnectValue::Int64(*l),
        (PrimitiveType::Float, Value::Float(f)) => ConnectValue::Float32(*f),
        (PrimitiveType::Double, Value::Double(d)) => ConnectValue::Float64(*d),
        (PrimitiveType::Bytes, Value::Bytes(b)) => ConnectValue::Bytes(b.clone()),
        (PrimitiveType::String, Value::String(s)) => ConnectValue::String(s.clone()),
        (kind, value) => {
            return Err(ConversionError::mismatch(
                path,
                format!("{} value for {} schema", value.kind(), kind.as_str()),
            ))
        }
    };
    Ok(out)
}

fn array(
    a: &ArraySchema,
    connect: &SchemaRef,
    items: &[Value],
    ctx: &DataContext<'_>,
    path: &str,
) -> Result<ConnectValue> {
    match &connect.kind {
        SchemaKind::Array(item_schema) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item_path = child_path(path, &index.to_string());
                out.push(avro_to_connect(&a.items, item_schema, item, ctx, &item_path)?);
            }
            Ok(ConnectValue::Array(out))
        }
        // Key/value records of a map with non-string keys
        SchemaKind::Map { key, value } => {
            let Schema::Record(entry) = ctx.names.resolve(&a.items)? else {
                return Err(ConversionError::mismatch(path, "map entries must be records"));
            };
            let [key_field, value_field] = entry.fields.as_slice() else {
                return Err(ConversionError::mismatch(path, "map entry record needs two fields"));
            };
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let item_path = child_path(path, &index.to_string());
                let Value::Record(record) = item else {
                    return Err(ConversionError::mismatch(&item_path, "map entry is not a record"));
                };
                let part = |field: &avro_schema::RecordField| {
                    record.get(&field.name).ok_or_else(|| {
                        ConversionError::mismatch(&item_path, format!("map entry without {}", field.name))
                    })
                };
                out.push((
                    avro_to_connect(&key_field.schema, key, part(key_field)?, ctx, &item_path)?,
                    avro_to_connect(&value_field.schema, value, part(value_field)?, ctx, &item_path)?,
                ));
            }
            Ok(ConnectValue::Map(out))
        }
        other => Err(ConversionError::mismatch(
            path,
            format!("array schema translated to {}", other.type_name()),
        )),
    }
}

fn record_to_connect(
    r: &RecordSchema,
    connect: &SchemaRef,
    record: &Record,
    ctx: &DataContext<'_>,
    path: &str,
) -> Result<ConnectValue> {
    if let Some((unknown, _)) = record.fields.iter().find(|(name, _)| r.field(name).is_none()) {
        return Err(ConversionError::mismatch(
            path,
            format!("unknown field '{unknown}' for record {}", r.name),
        ));
    }
    let fields: &[Field] = connect.fields();
    if fields.len() != r.fields.len() {
        return Err(ConversionError::mismatch(
            path,
            format!("record {} and its struct differ in field count", r.name),
        ));
    }

    let mut out = Struct::new(connect.clone())?;
    for (avro_field, connect_field) in r.fields.iter().zip(fields) {
        let field_path = child_path(path, &avro_field.name);
        let converted = match record.get(&avro_field.name) {
            Some(value) => {
                avro_to_connect(&avro_field.schema, &connect_field.schema, value, ctx, &field_path)?
            }
            None => connect_field.default.clone().ok_or_else(|| {
                ConversionError::mismatch(&field_path, "field is missing and has no default")
            })?,
        };
        out.put(&connect_field.name, converted)?;
    }
    Ok(ConnectValue::Struct(out))
}

fn union_to_connect(
    u: &UnionSchema,
    connect: &SchemaRef,
    value: &Value,
    ctx: &DataContext<'_>,
    path: &str,
) -> Result<ConnectValue> {
    let branch = value.union_branch(&u.variants, ctx.names)?.ok_or_else(|| {
        ConversionError::mismatch(path, format!("{} value matches no union member", value.kind()))
    })?;
    let variant = &u.variants[branch];
    if variant.is_null() {
        return Ok(ConnectValue::Null);
    }
    if u.is_optional() {
        return avro_to_connect(variant, connect, value, ctx, path);
    }

    // General union: one populated field, at the member's position among the non-null members.
    let connect = ctx.structs.resolve(connect)?;
    let position = u.variants[..branch].iter().filter(|v| !v.is_null()).count();
    let field = connect.fields().get(position).ok_or_else(|| {
        ConversionError::mismatch(path, format!("union struct has no field for member {branch}"))
    })?;
    let member_path = child_path(path, &field.name);
    let member = avro_to_connect(variant, &field.schema, value, ctx, &member_path)?;
    let mut out = Struct::new(connect.clone())?;
    out.put(&field.name, member)?;
    Ok(ConnectValue::Struct(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AvroDataConfig;
    use crate::forward::to_connect_schema;
    use avro_schema::parse_str;

    fn convert(text: &str, value: Value) -> Result<ConnectValue> {
        let avro = parse_str(text).unwrap();
        let connect = to_connect_schema(&avro, &AvroDataConfig::default()).unwrap();
        to_connect_value(&avro, &connect, &value)
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let value = convert(
            r#"{"type":"record","name":"R","fields":[
                {"name":"a","type":"int"},
                {"name":"b","type":"string","default":"x"},
                {"name":"c","type":["null","long"],"default":null}]}"#,
            Record::new().with("a", Value::Int(1)).into(),
        )
        .unwrap();
        let s = value.as_struct().unwrap();
        assert_eq!(s.get("a"), Some(&ConnectValue::Int32(1)));
        assert_eq!(s.get("b"), Some(&ConnectValue::String("x".into())));
        assert_eq!(s.get("c"), Some(&ConnectValue::Null));
    }

    #[test]
    fn test_missing_required_field_is_mismatch() {
        let result = convert(
            r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#,
            Record::new().into(),
        );
        assert!(matches!(result, Err(ConversionError::SchemaValueMismatch { .. })));
    }

    #[test]
    fn test_missing_nullable_field_without_default_is_mismatch() {
        let text = r#"{"type":"record","name":"R","fields":[{"name":"a","type":["null","long"]}]}"#;
        let result = convert(text, Record::new().into());
        assert!(matches!(
            result,
            Err(ConversionError::SchemaValueMismatch { path, .. }) if path == "a"
        ));

        let explicit = convert(text, Record::new().with("a", Value::Null).into()).unwrap();
        assert_eq!(explicit.as_struct().unwrap().get("a"), Some(&ConnectValue::Null));
    }

    #[test]
    fn test_unknown_field_is_mismatch() {
        let result = convert(
            r#"{"type":"record","name":"R","fields":[{"name":"a","type":"int"}]}"#,
            Record::new().with("a", Value::Int(1)).with("z", Value::Int(2)).into(),
        );
        assert!(matches!(result, Err(ConversionError::SchemaValueMismatch { .. })));
    }

    #[test]
    fn test_general_union_populates_one_field() {
        let value = convert(r#"["null","int","string"]"#, Value::String("hi".into())).unwrap();
        let s = value.as_struct().unwrap();
        assert_eq!(s.get("int"), Some(&ConnectValue::Null));
        assert_eq!(s.get("string"), Some(&ConnectValue::String("hi".into())));
        assert_eq!(convert(r#"["null","int","string"]"#, Value::Null).unwrap(), ConnectValue::Null);
    }

    #[test]
    fn test_value_outside_union_is_mismatch() {
        let result = convert(r#"["int","string"]"#, Value::Long(3));
        assert!(matches!(result, Err(ConversionError::SchemaValueMismatch { .. })));
    }

    #[test]
    fn test_narrow_ints_are_range_checked() {
        let text = r#"{"type":"int","connect.type":"int8"}"#;
        assert_eq!(convert(text, Value::Int(-5)).unwrap(), ConnectValue::Int8(-5));
        assert!(convert(text, Value::Int(300)).is_err());
    }

    #[test]
    fn test_enum_symbol_is_checked() {
        let text = r#"{"type":"enum","name":"E","symbols":["A","B"]}"#;
        assert_eq!(convert(text, Value::String("B".into())).unwrap(), ConnectValue::String("B".into()));
        assert!(convert(text, Value::String("C".into())).is_err());
    }

    #[test]
    fn test_map_entries_become_map() {
        let value = convert(
            r#"{"type":"array","items":{"type":"record","name":"io.avrobridge.MapEntry","fields":[
                {"name":"key","type":"int"},{"name":"value","type":"string"}]}}"#,
            Value::Array(vec![Record::new()
                .with("key", Value::Int(1))
                .with("value", Value::String("one".into()))
                .into()]),
        )
        .unwrap();
        assert_eq!(
            value,
            ConnectValue::Map(vec![(ConnectValue::Int32(1), ConnectValue::String("one".into()))])
        );
    }
}
