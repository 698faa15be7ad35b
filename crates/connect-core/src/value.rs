//! Connect values.

use crate::error::{ConnectError, Result};
use crate::schema::{Field, SchemaKind, SchemaRef, StructIndex};

/// A value interpreted together with a [`SchemaRef`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectValue {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<ConnectValue>),
    /// Entries in insertion order; keys need not be strings
    Map(Vec<(ConnectValue, ConnectValue)>),
    Struct(Struct),
}

impl ConnectValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int8(_) => "int8",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float",
            Self::Float64(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Check this value against `schema`, resolving struct references within it.
    pub fn validate(&self, schema: &SchemaRef) -> Result<()> {
        validate_value(schema, self, &StructIndex::collect(schema), "")
    }
}

impl From<Struct> for ConnectValue {
    fn from(value: Struct) -> Self {
        Self::Struct(value)
    }
}

/// Field values of one struct schema, positionally aligned with its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Struct {
    schema: SchemaRef,
    values: Vec<ConnectValue>,
}

impl Struct {
    pub fn new(schema: SchemaRef) -> Result<Self> {
        match &schema.kind {
            SchemaKind::Struct(fields) => Ok(Self {
                values: vec![ConnectValue::Null; fields.len()],
                schema,
            }),
            _ => Err(ConnectError::InvalidSchema(format!(
                "struct values need a struct schema, not {}",
                schema.type_name()
            ))),
        }
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn put(&mut self, name: &str, value: ConnectValue) -> Result<()> {
        let field = self.lookup(name)?;
        let index = field.index;
        self.values[index] = value;
        Ok(())
    }

    /// Builder-style [`Struct::put`].
    pub fn with(mut self, name: &str, value: ConnectValue) -> Result<Self> {
        self.put(name, value)?;
        Ok(self)
    }

    /// Value of a field; unset fields read as [`ConnectValue::Null`].
    pub fn get(&self, name: &str) -> Option<&ConnectValue> {
        let field = self.schema.field(name)?;
        self.values.get(field.index)
    }

    /// Fields paired with their values, in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, &ConnectValue)> {
        self.schema.fields().iter().zip(self.values.iter())
    }

    fn lookup(&self, name: &str) -> Result<&Field> {
        self.schema.field(name).ok_or_else(|| {
            ConnectError::invalid_value(
                name,
                format!(
                    "no such field in struct {}",
                    self.schema.name.as_deref().unwrap_or("<anonymous>")
                ),
            )
        })
    }
}

/// Schema and value together, as produced by converters.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaAndValue {
    pub schema: SchemaRef,
    pub value: ConnectValue,
}

impl SchemaAndValue {
    pub fn new(schema: SchemaRef, value: ConnectValue) -> Self {
        Self { schema, value }
    }
}

pub(crate) fn child_path(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

/// Check `value` against `schema`.
pub fn validate_value(
    schema: &SchemaRef,
    value: &ConnectValue,
    structs: &StructIndex,
    path: &str,
) -> Result<()> {
    if value.is_null() {
        return if schema.optional {
            Ok(())
        } else {
            Err(ConnectError::invalid_value(path, "null for a required schema"))
        };
    }
    let resolved = structs.resolve(schema)?;
    let ok = match (&resolved.kind, value) {
        (SchemaKind::Int8, ConnectValue::Int8(_))
        | (SchemaKind::Int16, ConnectValue::Int16(_))
        | (SchemaKind::Int32, ConnectValue::Int32(_))
        | (SchemaKind::Int64, ConnectValue::Int64(_))
        | (SchemaKind::Float32, ConnectValue::Float32(_))
        | (SchemaKind::Float64, ConnectValue::Float64(_))
        | (SchemaKind::Boolean, ConnectValue::Boolean(_))
        | (SchemaKind::String, ConnectValue::String(_))
        | (SchemaKind::Bytes, ConnectValue::Bytes(_)) => true,
        (SchemaKind::Array(items), ConnectValue::Array(values)) => {
            for (i, item) in values.iter().enumerate() {
                validate_value(items, item, structs, &child_path(path, &i.to_string()))?;
            }
            true
        }
        (SchemaKind::Map { key, value: val }, ConnectValue::Map(entries)) => {
            for (k, v) in entries {
                validate_value(key, k, structs, &child_path(path, "<key>"))?;
                validate_value(val, v, structs, &child_path(path, "<value>"))?;
            }
            true
        }
        (SchemaKind::Struct(fields), ConnectValue::Struct(s)) => {
            if s.schema.fields().len() != fields.len()
                || s.schema.name != resolved.name
                || s.schema.fields().iter().zip(fields).any(|(a, b)| a.name != b.name)
            {
                return Err(ConnectError::invalid_value(
                    path,
                    "struct value was built for a different schema",
                ));
            }
            for (field, field_value) in fields.iter().zip(&s.values) {
                validate_value(&field.schema, field_value, structs, &child_path(path, &field.name))?;
            }
            true
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ConnectError::invalid_value(
            path,
            format!("{} value for {} schema", value.kind(), resolved.type_name()),
        ))
    }
}
