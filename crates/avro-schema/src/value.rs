//! Generic Avro datum values.
//!
//! Values are untyped: a [`Record`] carries field names but no schema, an enum
//! symbol is a [`Value::String`] and a fixed is [`Value::Bytes`]. Matching a
//! value against a schema is structural.

use crate::error::Result;
use crate::schema::{Names, PrimitiveType, Schema};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// `bytes` or `fixed`
    Bytes(Vec<u8>),
    /// `string` or an enum symbol
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(Record),
}

/// Field values of a record, in schema field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Record::put`].
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.put(name, value);
        self
    }

    /// Set a field, replacing any previous value.
    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    /// Whether this value is a valid datum of `schema`.
    ///
    /// A record matches when every value names a schema field that it matches,
    /// and every schema field left out has a default.
    pub fn matches(&self, schema: &Schema, names: &Names) -> Result<bool> {
        let schema = names.resolve(schema)?;
        let matched = match (schema, self) {
            (Schema::Primitive(p), value) => matches!(
                (p.kind, value),
                (PrimitiveType::Null, Value::Null)
                    | (PrimitiveType::Boolean, Value::Boolean(_))
                    | (PrimitiveType::Int, Value::Int(_))
                    | (PrimitiveType::Long, Value::Long(_))
                    | (PrimitiveType::Float, Value::Float(_))
                    | (PrimitiveType::Double, Value::Double(_))
                    | (PrimitiveType::Bytes, Value::Bytes(_))
                    | (PrimitiveType::String, Value::String(_))
            ),
            (Schema::Fixed(f), Value::Bytes(bytes)) => bytes.len() == f.size,
            (Schema::Enum(e), Value::String(symbol)) => e.symbols.contains(symbol),
            (Schema::Array(a), Value::Array(items)) => {
                for item in items {
                    if !item.matches(&a.items, names)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Schema::Map(m), Value::Map(entries)) => {
                for value in entries.values() {
                    if !value.matches(&m.values, names)? {
                        return Ok(false);
                    }
                }
                true
            }
            (Schema::Record(r), Value::Record(record)) => {
                for (name, value) in &record.fields {
                    match r.field(name) {
                        Some(field) if value.matches(&field.schema, names)? => {}
                        _ => return Ok(false),
                    }
                }
                r.fields
                    .iter()
                    .all(|f| f.default.is_some() || record.get(&f.name).is_some())
            }
            (Schema::Union(u), value) => {
                for variant in &u.variants {
                    if value.matches(variant, names)? {
                        return Ok(true);
                    }
                }
                false
            }
            _ => false,
        };
        Ok(matched)
    }

    /// Index of the first union member this value matches.
    pub fn union_branch(&self, variants: &[Schema], names: &Names) -> Result<Option<usize>> {
        for (index, variant) in variants.iter().enumerate() {
            if self.matches(variant, names)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn test_record_put_replaces() {
        let mut record = Record::new().with("a", Value::Int(1));
        record.put("a", Value::Int(2));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_union_branch_is_first_structural_match() {
        let schema = parse_str(
            r#"["null",
                {"type":"record","name":"A","fields":[{"name":"x","type":"int"}]},
                {"type":"record","name":"B","fields":[{"name":"x","type":"int"},{"name":"y","type":"string","default":""}]}]"#,
        )
        .unwrap();
        let names = Names::collect(&schema);
        let Schema::Union(union) = &schema else {
            panic!("expected union")
        };

        let only_x = Value::Record(Record::new().with("x", Value::Int(1)));
        assert_eq!(only_x.union_branch(&union.variants, &names).unwrap(), Some(1));

        let with_y = Value::Record(
            Record::new()
                .with("x", Value::Int(1))
                .with("y", Value::String("b".into())),
        );
        assert_eq!(with_y.union_branch(&union.variants, &names).unwrap(), Some(2));
        assert_eq!(Value::Null.union_branch(&union.variants, &names).unwrap(), Some(0));
        assert_eq!(Value::Long(1).union_branch(&union.variants, &names).unwrap(), None);
    }

    #[test]
    fn test_enum_and_fixed_matching() {
        let schema = parse_str(
            r#"{"type":"record","name":"R","fields":[
                {"name":"e","type":{"type":"enum","name":"E","symbols":["A","B"]}},
                {"name":"f","type":{"type":"fixed","name":"F","size":2}}]}"#,
        )
        .unwrap();
        let names = Names::collect(&schema);
        let good = Value::Record(
            Record::new()
                .with("e", Value::String("B".into()))
                .with("f", Value::Bytes(vec![1, 2])),
        );
        let bad = Value::Record(
            Record::new()
                .with("e", Value::String("C".into()))
                .with("f", Value::Bytes(vec![1, 2])),
        );
        assert!(good.matches(&schema, &names).unwrap());
        assert!(!bad.matches(&schema, &names).unwrap());
    }
}
