//! Connect schema definitions.
//!
//! A [`ConnectSchema`] is immutable once built and shared as a [`SchemaRef`].
//! Struct schemas may refer back to an enclosing struct by name through
//! [`SchemaKind::Reference`], which is how recursive types are expressed.

use crate::error::{ConnectError, Result};
use crate::value::{validate_value, ConnectValue};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Shared handle to an immutable schema.
pub type SchemaRef = Arc<ConnectSchema>;

/// The closed set of Connect schema kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaKind {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Boolean,
    String,
    Bytes,
    Array(SchemaRef),
    Map { key: SchemaRef, value: SchemaRef },
    Struct(Vec<Field>),
    /// Back-reference to an enclosing struct with this name
    Reference(String),
}

impl SchemaKind {
    /// Type keyword used in the JSON envelope format.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Array(_) => "array",
            Self::Map { .. } => "map",
            Self::Struct(_) => "struct",
            Self::Reference(_) => "reference",
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            Self::Array(_) | Self::Map { .. } | Self::Struct(_) | Self::Reference(_)
        )
    }
}

/// A struct field.
///
/// `doc` and `default` belong to this use of the field schema, so two fields
/// sharing one schema object may still document and default differently.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub index: usize,
    pub schema: SchemaRef,
    pub doc: Option<String>,
    pub default: Option<ConnectValue>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: SchemaRef) -> Self {
        Self {
            name: name.into(),
            index: 0,
            schema,
            doc: None,
            default: None,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_default(mut self, default: ConnectValue) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectSchema {
    pub kind: SchemaKind,
    pub optional: bool,
    pub default: Option<ConnectValue>,
    pub name: Option<String>,
    pub version: Option<i32>,
    pub doc: Option<String>,
    pub parameters: BTreeMap<String, String>,
}

impl ConnectSchema {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            kind,
            optional: false,
            default: None,
            name: None,
            version: None,
            doc: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Struct fields; empty for every other kind.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            SchemaKind::Struct(fields) => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Copy of this schema that also accepts null.
    pub fn to_optional(&self) -> ConnectSchema {
        let mut schema = self.clone();
        schema.optional = true;
        schema
    }
}

/// Fluent construction of a [`ConnectSchema`].
///
/// ```ignore
/// let person = SchemaBuilder::struct_()
///     .name("P")
///     .field(Field::new("firstName", SchemaBuilder::string().build()?).with_doc("First Name"))
///     .field(Field::new("age", SchemaBuilder::int32().build()?))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    schema: ConnectSchema,
    misplaced_field: Option<String>,
}

impl SchemaBuilder {
    pub fn new(kind: SchemaKind) -> Self {
        Self {
            schema: ConnectSchema::new(kind),
            misplaced_field: None,
        }
    }

    pub fn int8() -> Self {
        Self::new(SchemaKind::Int8)
    }

    pub fn int16() -> Self {
        Self::new(SchemaKind::Int16)
    }

    pub fn int32() -> Self {
        Self::new(SchemaKind::Int32)
    }

    pub fn int64() -> Self {
        Self::new(SchemaKind::Int64)
    }

    pub fn float32() -> Self {
        Self::new(SchemaKind::Float32)
    }

    pub fn float64() -> Self {
        Self::new(SchemaKind::Float64)
    }

    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    pub fn bytes() -> Self {
        Self::new(SchemaKind::Bytes)
    }

    pub fn array(items: SchemaRef) -> Self {
        Self::new(SchemaKind::Array(items))
    }

    pub fn map(key: SchemaRef, value: SchemaRef) -> Self {
        Self::new(SchemaKind::Map { key, value })
    }

    pub fn struct_() -> Self {
        Self::new(SchemaKind::Struct(Vec::new()))
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(SchemaKind::Reference(name.into()))
    }

    pub fn optional(mut self) -> Self {
        self.schema.optional = true;
        self
    }

    pub fn default_value(mut self, value: ConnectValue) -> Self {
        self.schema.default = Some(value);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.schema.name = Some(name.into());
        self
    }

    pub fn version(mut self, version: i32) -> Self {
        self.schema.version = Some(version);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.schema.doc = Some(doc.into());
        self
    }

    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.schema.parameters.insert(key.into(), value.into());
        self
    }

    /// Append a field. Only meaningful for struct builders; checked in `build`.
    pub fn field(mut self, field: Field) -> Self {
        match &mut self.schema.kind {
            SchemaKind::Struct(fields) => fields.push(field),
            _ => self.misplaced_field = Some(field.name),
        }
        self
    }

    pub fn build(mut self) -> Result<SchemaRef> {
        if let Some(field) = self.misplaced_field {
            return Err(ConnectError::InvalidSchema(format!(
                "cannot add field '{field}' to a {} schema",
                self.schema.type_name()
            )));
        }
        if let SchemaKind::Struct(fields) = &mut self.schema.kind {
            for (index, field) in fields.iter_mut().enumerate() {
                field.index = index;
            }
            for (i, field) in fields.iter().enumerate() {
                if fields[..i].iter().any(|f| f.name == field.name) {
                    return Err(ConnectError::InvalidSchema(format!(
                        "duplicate field '{}'",
                        field.name
                    )));
                }
            }
        }
        if let SchemaKind::Reference(name) = &self.schema.kind {
            if name.is_empty() {
                return Err(ConnectError::InvalidSchema("empty reference name".to_string()));
            }
        }

        let schema = Arc::new(self.schema);
        let structs = StructIndex::collect(&schema);
        if let Some(default) = &schema.default {
            validate_value(&schema, default, &structs, "<default>")?;
        }
        for field in schema.fields() {
            if let Some(default) = &field.default {
                validate_value(&field.schema, default, &structs, &field.name)?;
            }
        }
        Ok(schema)
    }
}

/// Named struct schemas of one schema graph, for resolving references.
#[derive(Debug, Clone, Default)]
pub struct StructIndex {
    structs: HashMap<String, SchemaRef>,
}

impl StructIndex {
    pub fn collect(schema: &SchemaRef) -> Self {
        let mut index = Self::default();
        index.visit(schema);
        index
    }

    fn visit(&mut self, schema: &SchemaRef) {
        match &schema.kind {
            SchemaKind::Struct(fields) => {
                if let Some(name) = &schema.name {
                    if self.structs.contains_key(name) {
                        return;
                    }
                    self.structs.insert(name.clone(), schema.clone());
                }
                for field in fields {
                    self.visit(&field.schema);
                }
            }
            SchemaKind::Array(items) => self.visit(items),
            SchemaKind::Map { key, value } => {
                self.visit(key);
                self.visit(value);
            }
            _ => {}
        }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaRef> {
        self.structs.get(name)
    }

    /// Follow a reference to its struct; other schemas resolve to themselves.
    pub fn resolve<'a>(&'a self, schema: &'a SchemaRef) -> Result<&'a SchemaRef> {
        match &schema.kind {
            SchemaKind::Reference(name) => self
                .structs
                .get(name)
                .ok_or_else(|| ConnectError::UnknownReference(name.clone())),
            _ => Ok(schema),
        }
    }
}
