//! Avro schema model.
//!
//! Named types (record, enum, fixed) and complex types are held behind `Arc`,
//! so a type referenced more than once in a schema graph is the same object at
//! every use site. A reference to a named type that is still being defined
//! (a recursive reference) is kept as [`Schema::Ref`].

use crate::error::{AvroSchemaError, Result};
use crate::name::Name;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Custom attributes on a schema node or record field, in declaration order.
pub type Props = serde_json::Map<String, JsonValue>;

/// The eight primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bytes => "bytes",
            Self::String => "string",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "bytes" => Some(Self::Bytes),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// Logical type layered on a primitive or fixed base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Decimal { precision: u32, scale: u32 },
    Uuid,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    LocalTimestampMillis,
    LocalTimestampMicros,
    Duration,
}

impl LogicalType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Decimal { .. } => "decimal",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::TimeMillis => "time-millis",
            Self::TimeMicros => "time-micros",
            Self::TimestampMillis => "timestamp-millis",
            Self::TimestampMicros => "timestamp-micros",
            Self::LocalTimestampMillis => "local-timestamp-millis",
            Self::LocalTimestampMicros => "local-timestamp-micros",
            Self::Duration => "duration",
        }
    }

    /// Build a logical type from its name; decimal needs precision/scale.
    pub fn from_name(name: &str, precision: Option<u32>, scale: Option<u32>) -> Option<Self> {
        let logical = match name {
            "decimal" => {
                let precision = precision.filter(|p| *p > 0)?;
                let scale = scale.unwrap_or(0);
                if scale > precision {
                    return None;
                }
                Self::Decimal { precision, scale }
            }
            "uuid" => Self::Uuid,
            "date" => Self::Date,
            "time-millis" => Self::TimeMillis,
            "time-micros" => Self::TimeMicros,
            "timestamp-millis" => Self::TimestampMillis,
            "timestamp-micros" => Self::TimestampMicros,
            "local-timestamp-millis" => Self::LocalTimestampMillis,
            "local-timestamp-micros" => Self::LocalTimestampMicros,
            "duration" => Self::Duration,
            _ => return None,
        };
        Some(logical)
    }

    /// Whether this logical type may decorate the given primitive.
    pub fn supports_primitive(&self, base: PrimitiveType) -> bool {
        matches!(
            (self, base),
            (Self::Decimal { .. }, PrimitiveType::Bytes)
                | (Self::Uuid, PrimitiveType::String)
                | (Self::Date | Self::TimeMillis, PrimitiveType::Int)
                | (
                    Self::TimeMicros
                        | Self::TimestampMillis
                        | Self::TimestampMicros
                        | Self::LocalTimestampMillis
                        | Self::LocalTimestampMicros,
                    PrimitiveType::Long
                )
        )
    }

    /// Whether this logical type may decorate a fixed of the given size.
    pub fn supports_fixed(&self, size: usize) -> bool {
        match self {
            Self::Decimal { .. } => true,
            Self::Duration => size == 12,
            _ => false,
        }
    }
}

/// A primitive, possibly decorated with a logical type and custom properties.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSchema {
    pub kind: PrimitiveType,
    pub logical: Option<LogicalType>,
    pub props: Props,
}

impl PrimitiveSchema {
    pub fn new(kind: PrimitiveType) -> Self {
        Self {
            kind,
            logical: None,
            props: Props::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub size: usize,
    pub logical: Option<LogicalType>,
    pub props: Props,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
    /// Symbol used by readers when they meet an unknown symbol
    pub default: Option<String>,
    pub props: Props,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: Schema,
    pub props: Props,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSchema {
    pub values: Schema,
    pub props: Props,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: Name,
    pub doc: Option<String>,
    pub fields: Vec<RecordField>,
    pub props: Props,
}

impl RecordSchema {
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A record field. `doc` is the use-site documentation, distinct from the
/// documentation of the field's type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub schema: Schema,
    pub doc: Option<String>,
    /// Default value in the JSON default encoding
    pub default: Option<JsonValue>,
    pub props: Props,
}

impl RecordField {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            doc: None,
            default: None,
            props: Props::new(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    pub variants: Vec<Schema>,
}

impl UnionSchema {
    /// Position of the `null` member, if any.
    pub fn null_index(&self) -> Option<usize> {
        self.variants.iter().position(Schema::is_null)
    }

    /// Two members, one of them `null`.
    pub fn is_optional(&self) -> bool {
        self.variants.len() == 2 && self.null_index().is_some()
    }

    /// Members other than `null`, in declaration order.
    pub fn non_null_variants(&self) -> impl Iterator<Item = &Schema> {
        self.variants.iter().filter(|s| !s.is_null())
    }
}

/// A node of an Avro schema graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Primitive(PrimitiveSchema),
    Fixed(Arc<FixedSchema>),
    Enum(Arc<EnumSchema>),
    Array(Arc<ArraySchema>),
    Map(Arc<MapSchema>),
    Record(Arc<RecordSchema>),
    Union(Arc<UnionSchema>),
    /// Reference to a named type still being defined (recursive types)
    Ref(Name),
}

impl Schema {
    pub fn primitive(kind: PrimitiveType) -> Self {
        Self::Primitive(PrimitiveSchema::new(kind))
    }

    pub fn null() -> Self {
        Self::primitive(PrimitiveType::Null)
    }

    pub fn boolean() -> Self {
        Self::primitive(PrimitiveType::Boolean)
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveType::Int)
    }

    pub fn long() -> Self {
        Self::primitive(PrimitiveType::Long)
    }

    pub fn float() -> Self {
        Self::primitive(PrimitiveType::Float)
    }

    pub fn double() -> Self {
        Self::primitive(PrimitiveType::Double)
    }

    pub fn bytes() -> Self {
        Self::primitive(PrimitiveType::Bytes)
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveType::String)
    }

    pub fn array(items: Schema) -> Self {
        Self::Array(Arc::new(ArraySchema {
            items,
            props: Props::new(),
        }))
    }

    pub fn map(values: Schema) -> Self {
        Self::Map(Arc::new(MapSchema {
            values,
            props: Props::new(),
        }))
    }

    pub fn union(variants: Vec<Schema>) -> Self {
        Self::Union(Arc::new(UnionSchema { variants }))
    }

    pub fn record(record: RecordSchema) -> Self {
        Self::Record(Arc::new(record))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Primitive(p) if p.kind == PrimitiveType::Null)
    }

    /// Name of a named type, or of the type a `Ref` points to.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Self::Fixed(f) => Some(&f.name),
            Self::Enum(e) => Some(&e.name),
            Self::Record(r) => Some(&r.name),
            Self::Ref(name) => Some(name),
            _ => None,
        }
    }

    /// Type-level documentation.
    pub fn doc(&self) -> Option<&str> {
        match self {
            Self::Fixed(f) => f.doc.as_deref(),
            Self::Enum(e) => e.doc.as_deref(),
            Self::Record(r) => r.doc.as_deref(),
            _ => None,
        }
    }

    /// The `type` keyword for this node ("record", "int", ...).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.kind.as_str(),
            Self::Fixed(_) => "fixed",
            Self::Enum(_) => "enum",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Union(_) => "union",
            Self::Ref(_) => "reference",
        }
    }

    pub fn as_record(&self) -> Option<&Arc<RecordSchema>> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Custom properties of this node. Unions and references carry none.
    pub fn props(&self) -> Option<&Props> {
        match self {
            Self::Primitive(p) => Some(&p.props),
            Self::Fixed(f) => Some(&f.props),
            Self::Enum(e) => Some(&e.props),
            Self::Array(a) => Some(&a.props),
            Self::Map(m) => Some(&m.props),
            Self::Record(r) => Some(&r.props),
            Self::Union(_) | Self::Ref(_) => None,
        }
    }

    /// Pointer identity of the shared node, for complex and named types.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Self::Fixed(f) => Some(Arc::as_ptr(f) as usize),
            Self::Enum(e) => Some(Arc::as_ptr(e) as usize),
            Self::Array(a) => Some(Arc::as_ptr(a) as usize),
            Self::Map(m) => Some(Arc::as_ptr(m) as usize),
            Self::Record(r) => Some(Arc::as_ptr(r) as usize),
            Self::Union(u) => Some(Arc::as_ptr(u) as usize),
            Self::Primitive(_) | Self::Ref(_) => None,
        }
    }

    /// Same shared node (both sides named/complex) or equal value (primitives, refs).
    pub fn same_node(&self, other: &Schema) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self == other,
            _ => false,
        }
    }
}

/// Named types of one schema graph, keyed by full name.
///
/// Used to resolve [`Schema::Ref`] nodes while walking values.
#[derive(Debug, Clone, Default)]
pub struct Names {
    types: HashMap<String, Schema>,
}

impl Names {
    /// Collect every named type defined in `schema`.
    pub fn collect(schema: &Schema) -> Self {
        let mut names = Self::default();
        names.visit(schema);
        names
    }

    fn visit(&mut self, schema: &Schema) {
        match schema {
            Schema::Fixed(f) => {
                self.types.entry(f.name.fullname()).or_insert_with(|| schema.clone());
            }
            Schema::Enum(e) => {
                self.types.entry(e.name.fullname()).or_insert_with(|| schema.clone());
            }
            Schema::Record(r) => {
                let fullname = r.name.fullname();
                if self.types.contains_key(&fullname) {
                    return;
                }
                self.types.insert(fullname, schema.clone());
                for field in &r.fields {
                    self.visit(&field.schema);
                }
            }
            Schema::Array(a) => self.visit(&a.items),
            Schema::Map(m) => self.visit(&m.values),
            Schema::Union(u) => u.variants.iter().for_each(|v| self.visit(v)),
            Schema::Primitive(_) | Schema::Ref(_) => {}
        }
    }

    pub fn get(&self, fullname: &str) -> Option<&Schema> {
        self.types.get(fullname)
    }

    pub fn insert(&mut self, schema: Schema) {
        if let Some(name) = schema.name() {
            self.types.insert(name.fullname(), schema);
        }
    }

    /// Follow a `Ref` to its definition; other nodes resolve to themselves.
    pub fn resolve<'a>(&'a self, schema: &'a Schema) -> Result<&'a Schema> {
        match schema {
            Schema::Ref(name) => self
                .types
                .get(&name.fullname())
                .ok_or_else(|| AvroSchemaError::UnknownType(name.fullname())),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked_list() -> Schema {
        Schema::record(RecordSchema {
            name: Name::new("demo.Node"),
            doc: None,
            fields: vec![
                RecordField::new("value", Schema::int()),
                RecordField::new(
                    "next",
                    Schema::union(vec![Schema::null(), Schema::Ref(Name::new("demo.Node"))]),
                ),
            ],
            props: Props::new(),
        })
    }

    #[test]
    fn test_names_resolve_recursive_reference() {
        let schema = linked_list();
        let names = Names::collect(&schema);
        let node_ref = Schema::Ref(Name::new("demo.Node"));
        let resolved = names.resolve(&node_ref).unwrap();
        assert!(resolved.same_node(&schema));
    }

    #[test]
    fn test_unknown_reference_is_an_error() {
        let names = Names::default();
        assert!(names.resolve(&Schema::Ref(Name::new("missing.Type"))).is_err());
    }

    #[test]
    fn test_union_helpers() {
        let union = UnionSchema {
            variants: vec![Schema::string(), Schema::null()],
        };
        assert_eq!(union.null_index(), Some(1));
        assert!(union.is_optional());
        assert_eq!(union.non_null_variants().count(), 1);
    }

    #[test]
    fn test_logical_type_bases() {
        assert!(LogicalType::Date.supports_primitive(PrimitiveType::Int));
        assert!(!LogicalType::Date.supports_primitive(PrimitiveType::Long));
        assert!(LogicalType::Duration.supports_fixed(12));
        assert!(!LogicalType::Duration.supports_fixed(16));
        assert_eq!(LogicalType::from_name("decimal", Some(4), Some(6)), None);
    }
}
