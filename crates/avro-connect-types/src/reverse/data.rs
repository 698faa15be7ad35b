//! Connect values → Avro values.

use crate::error::{ConversionError, Result};
use crate::params::{is_union_struct, union_layout, UnionMember};
use crate::{child_path, DataContext};
use avro_schema::{Names, PrimitiveType, Record, RecordSchema, Schema, UnionSchema, Value};
use connect_core::{ConnectValue, SchemaKind, SchemaRef, StructIndex, Struct};
use std::collections::BTreeMap;

/// Convert `value` of Connect schema `connect` to a value of its translation `avro`.
pub fn from_connect_value(connect: &SchemaRef, avro: &Schema, value: &ConnectValue) -> Result<Value> {
    let names = Names::collect(avro);
    let structs = StructIndex::collect(connect);
    let ctx = DataContext {
        names: &names,
        structs: &structs,
    };
    connect_to_avro(connect, avro, value, &ctx, "")
}

pub(crate) fn connect_to_avro(
    connect: &SchemaRef,
    avro: &Schema,
    value: &ConnectValue,
    ctx: &DataContext<'_>,
    path: &str,
) -> Result<Value> {
    let avro = ctx.names.resolve(avro)?;
    if let Schema::Union(u) = avro {
        return union_from_connect(connect, u, value, ctx, path);
    }
    if value.is_null() {
        return Err(ConversionError::mismatch(
            path,
            format!("null value for required {} schema", avro.type_name()),
        ));
    }
    let connect = ctx.structs.resolve(connect)?;

    match (avro, &connect.kind, value) {
        (Schema::Primitive(p), _, value) => primitive(p.kind, value, path),
        (Schema::Enum(e), _, ConnectValue::String(symbol)) => {
            if e.symbols.contains(symbol) {
                Ok(Value::String(symbol.clone()))
            } else {
                Err(ConversionError::mismatch(
                    path,
                    format!("'{symbol}' is not a symbol of enum {}", e.name),
                ))
            }
        }
        (Schema::Fixed(f), _, ConnectValue::Bytes(bytes)) => {
            if bytes.len() == f.size {
                Ok(Value::Bytes(bytes.clone()))
            } else {
                Err(ConversionError::mismatch(
                    path,
                    format!("{} bytes for fixed {} of size {}", bytes.len(), f.name, f.size),
                ))
            }
        }
        (Schema::Array(a), SchemaKind::Array(items), ConnectValue::Array(values)) => {
            let mut out = Vec::with_capacity(values.len());
            for (index, item) in values.iter().enumerate() {
                let item_path = child_path(path, &index.to_string());
                out.push(connect_to_avro(items, &a.items, item, ctx, &item_path)?);
            }
            Ok(Value::Array(out))
        }
        (Schema::Array(a), SchemaKind::Map { key, value: values }, ConnectValue::Map(entries)) => {
            let Schema::Record(entry) = ctx.names.resolve(&a.items)? else {
                return Err(ConversionError::mismatch(path, "map entries must be records"));
            };
            let [key_field, value_field] = entry.fields.as_slice() else {
                return Err(ConversionError::mismatch(path, "map entry record needs two fields"));
            };
            let mut out = Vec::with_capacity(entries.len());
            for (index, (k, v)) in entries.iter().enumerate() {
                let item_path = child_path(path, &index.to_string());
                let record = Record::new()
                    .with(
                        key_field.name.clone(),
                        connect_to_avro(key, &key_field.schema, k, ctx, &item_path)?,
                    )
                    .with(
                        value_field.name.clone(),
                        connect_to_avro(values, &value_field.schema, v, ctx, &item_path)?,
                    );
                out.push(Value::Record(record));
            }
            Ok(Value::Array(out))
        }
        (Schema::Map(m), SchemaKind::Map { value: values, .. }, ConnectValue::Map(entries)) => {
            let mut out = BTreeMap::new();
            for (k, v) in entries {
                let ConnectValue::String(key) = k else {
                    return Err(ConversionError::mismatch(
                        path,
                        format!("{} map key for an Avro map", k.kind()),
                    ));
                };
                let entry_path = child_path(path, key);
                out.insert(key.clone(), connect_to_avro(values, &m.values, v, ctx, &entry_path)?);
            }
            Ok(Value::Map(out))
        }
        (Schema::Record(r), SchemaKind::Struct(_), ConnectValue::Struct(s)) => {
            record_from_connect(connect, r, s, ctx, path)
        }
        (schema, _, value) => Err(ConversionError::mismatch(
            path,
            format!("{} value for {} schema", value.kind(), schema.type_name()),
        )),
    }
}

fn primitive(kind: PrimitiveType, value: &ConnectValue, path: &str) -> Result<Value> {
    let out = match (kind, value) {
        (PrimitiveType::Boolean, ConnectValue::Boolean(b)) => Value::Boolean(*b),
        (PrimitiveType::Int, ConnectValue::Int8(i)) => Value::Int(i32::from(*i)),
        (PrimitiveType::Int, ConnectValue::Int16(i)) => Value::Int(i32::from(*i)),
        (PrimitiveType::Int, ConnectValue::Int32(i)) => Value::Int(*i),
        (PrimitiveType::Long, ConnectValue::Int64(l)) => Value::Long(*l),
        (PrimitiveType::Float, ConnectValue::Float32(f)) => Value::Float(*f),
        (PrimitiveType::Double, ConnectValue::Float64(d)) => Value::Double(*d),
        (PrimitiveType::Bytes, ConnectValue::Bytes(b)) => Value::Bytes(b.clone()),
        (PrimitiveType::String, ConnectValue::String(s)) => Value::String(s.clone()),
        (kind, value) => {
            return Err(ConversionError::mismatch(
                path,
                format!("{} value for {} schema", value.kind(), kind.as_str()),
            ))
        }
    };
    Ok(out)
}

fn record_from_connect(
    connect: &SchemaRef,
    r: &RecordSchema,
    value: &Struct,
    ctx: &DataContext<'_>,
    path: &str,
) -> Result<Value> {
    let fields = connect.fields();
    if fields.len() != r.fields.len() {
        return Err(ConversionError::mismatch(
            path,
            format!("struct and record {} differ in field count", r.name),
        ));
    }
    let null = ConnectValue::Null;
    let mut record = Record::new();
    for (avro_field, connect_field) in r.fields.iter().zip(fields) {
        let field_path = child_path(path, &connect_field.name);
        let mut field_value = value.get(&connect_field.name).unwrap_or(&null);
        if field_value.is_null() && !connect_field.schema.optional {
            field_value = connect_field.default.as_ref().ok_or_else(|| {
                ConversionError::mismatch(&field_path, "required field is null and has no default")
            })?;
        }
        let converted = connect_to_avro(&connect_field.schema, &avro_field.schema, field_value, ctx, &field_path)?;
        record.put(avro_field.name.clone(), converted);
    }
    Ok(Value::Record(record))
}

fn union_from_connect(
    connect: &SchemaRef,
    u: &UnionSchema,
    value: &ConnectValue,
    ctx: &DataContext<'_>,
    path: &str,
) -> Result<Value> {
    if value.is_null() {
        return match u.null_index() {
            Some(_) => Ok(Value::Null),
            None => Err(ConversionError::mismatch(path, "null value for a union without null")),
        };
    }
    let resolved = ctx.structs.resolve(connect)?;

    if is_union_struct(resolved) {
        let ConnectValue::Struct(s) = value else {
            return Err(ConversionError::mismatch(
                path,
                format!("{} value for a union struct", value.kind()),
            ));
        };
        let populated: Vec<_> = s.iter().filter(|(_, v)| !v.is_null()).collect();
        let (field, member_value) = match populated.as_slice() {
            [] => return Err(ConversionError::unresolved_union(path)),
            [one] => *one,
            many => {
                return Err(ConversionError::mismatch(
                    path,
                    format!("{} union branches set, expected exactly one", many.len()),
                ))
            }
        };
        let index = resolved
            .fields()
            .iter()
            .position(|f| f.name == field.name)
            .ok_or_else(|| ConversionError::unresolved_union(path))?;
        let layout = union_layout(resolved)?;
        let member = layout
            .iter()
            .position(|m| *m == UnionMember::Field(index))
            .and_then(|position| u.variants.get(position))
            .ok_or_else(|| ConversionError::unresolved_union(path))?;
        let member_path = child_path(path, &field.name);
        return connect_to_avro(&resolved.fields()[index].schema, member, member_value, ctx, &member_path);
    }

    // Optional wrapper: the value belongs to the single non-null member.
    if u.is_optional() {
        if let Some(member) = u.non_null_variants().next() {
            return connect_to_avro(connect, member, value, ctx, path);
        }
    }
    for member in u.non_null_variants() {
        if let Ok(converted) = connect_to_avro(connect, member, value, ctx, path) {
            return Ok(converted);
        }
    }
    Err(ConversionError::unresolved_union(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AvroDataConfig;
    use crate::reverse::from_connect_schema;
    use connect_core::{Field, SchemaBuilder};

    fn person() -> SchemaRef {
        SchemaBuilder::struct_()
            .name("P")
            .field(Field::new("name", SchemaBuilder::string().build().unwrap()))
            .field(
                Field::new("age", SchemaBuilder::int16().build().unwrap())
                    .with_default(ConnectValue::Int16(18)),
            )
            .field(Field::new("nick", SchemaBuilder::string().optional().build().unwrap()))
            .build()
            .unwrap()
    }

    fn convert(schema: &SchemaRef, value: &ConnectValue) -> Result<Value> {
        let avro = from_connect_schema(schema, &AvroDataConfig::default()).unwrap();
        from_connect_value(schema, &avro, value)
    }

    #[test]
    fn test_struct_to_record() {
        let schema = person();
        let value = Struct::new(schema.clone())
            .unwrap()
            .with("name", ConnectValue::String("Ada".into()))
            .unwrap()
            .with("age", ConnectValue::Int16(36))
            .unwrap();
        let record = convert(&schema, &ConnectValue::Struct(value)).unwrap();
        assert_eq!(
            record,
            Value::Record(
                Record::new()
                    .with("name", Value::String("Ada".into()))
                    .with("age", Value::Int(36))
                    .with("nick", Value::Null)
            )
        );
    }

    #[test]
    fn test_null_required_field_uses_default() {
        let schema = person();
        let value = Struct::new(schema.clone())
            .unwrap()
            .with("name", ConnectValue::String("Ada".into()))
            .unwrap();
        let Value::Record(record) = convert(&schema, &ConnectValue::Struct(value)).unwrap() else {
            panic!("expected record")
        };
        assert_eq!(record.get("age"), Some(&Value::Int(18)));
    }

    #[test]
    fn test_null_required_field_without_default_fails() {
        let schema = person();
        let value = Struct::new(schema.clone()).unwrap();
        let result = convert(&schema, &ConnectValue::Struct(value));
        assert!(matches!(result, Err(ConversionError::SchemaValueMismatch { .. })));
    }

    #[test]
    fn test_non_string_keys_become_entries() {
        let schema = SchemaBuilder::map(
            SchemaBuilder::int32().build().unwrap(),
            SchemaBuilder::string().build().unwrap(),
        )
        .build()
        .unwrap();
        let value = ConnectValue::Map(vec![(ConnectValue::Int32(1), ConnectValue::String("one".into()))]);
        assert_eq!(
            convert(&schema, &value).unwrap(),
            Value::Array(vec![Value::Record(
                Record::new()
                    .with("key", Value::Int(1))
                    .with("value", Value::String("one".into()))
            )])
        );
    }
}
