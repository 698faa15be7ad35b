//! Connect schema → Avro schema.

use crate::config::AvroDataConfig;
use crate::error::{ConversionError, Result};
use crate::naming::{scrub_name, NamingResolver};
use crate::params::{
    is_union_struct, json_param, union_layout, UnionMember, AVRO_PARAM_PREFIX, CONNECT_DEFAULT,
    CONNECT_DOC, CONNECT_NAME, CONNECT_PARAMETERS, CONNECT_TYPE, CONNECT_VERSION, ENUM_DEFAULT,
    ENUM_SYMBOLS, FIELD_PROP_PREFIX, FIXED_SIZE, LOGICAL_PRECISION, LOGICAL_SCALE, LOGICAL_TYPE,
    MAP_ENTRY_KEY, MAP_ENTRY_VALUE, NULL_LAST, PROP_PREFIX,
};
use crate::reverse::data::connect_to_avro;
use crate::DataContext;
use avro_schema::{
    encode_default, ArraySchema, EnumSchema, FixedSchema, LogicalType, MapSchema, Name, Names,
    PrimitiveSchema, PrimitiveType, Props, RecordField, RecordSchema, Schema,
};
use connect_core::{ConnectSchema, ConnectValue, Field, SchemaKind, SchemaRef, StructIndex};
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Translate a Connect schema graph to an Avro schema.
pub fn from_connect_schema(schema: &SchemaRef, config: &AvroDataConfig) -> Result<Schema> {
    debug!("Translating Connect {} schema to Avro", schema.type_name());
    let mut translator = FromConnect::new(schema, config);
    translator.translate(schema)
}

/// State of one translation call.
struct FromConnect<'a> {
    config: &'a AvroDataConfig,
    structs: StructIndex,
    naming: NamingResolver,
    /// Finished named types by Avro full name, with the Connect schema each came from
    defined: HashMap<String, (SchemaRef, Schema)>,
    /// Avro full names of records being translated
    in_progress: HashSet<String>,
    /// Connect struct name → Avro name, for references
    record_names: HashMap<String, Name>,
    /// Entry arrays by the address of the Connect map schema
    map_entries: HashMap<usize, Schema>,
    /// Named types available to default conversion
    names: Names,
}

impl<'a> FromConnect<'a> {
    fn new(root: &SchemaRef, config: &'a AvroDataConfig) -> Self {
        Self {
            config,
            structs: StructIndex::collect(root),
            naming: NamingResolver::new(),
            defined: HashMap::new(),
            in_progress: HashSet::new(),
            record_names: HashMap::new(),
            map_entries: HashMap::new(),
            names: Names::default(),
        }
    }

    fn metadata(&self) -> bool {
        self.config.attach_provenance_metadata
    }

    fn doc(&self, doc: &Option<String>) -> Option<String> {
        if self.config.keeps_docs() {
            doc.clone()
        } else {
            None
        }
    }

    fn translate(&mut self, schema: &SchemaRef) -> Result<Schema> {
        if is_union_struct(schema) {
            return self.union(schema);
        }
        let base = self.translate_required(schema)?;
        if !schema.optional {
            return Ok(base);
        }
        let variants = if schema.parameter(NULL_LAST) == Some("true") {
            vec![base, Schema::null()]
        } else {
            vec![Schema::null(), base]
        };
        Ok(Schema::union(variants))
    }

    fn translate_required(&mut self, schema: &SchemaRef) -> Result<Schema> {
        let kind = match &schema.kind {
            SchemaKind::Int8 | SchemaKind::Int16 => {
                let mut primitive = PrimitiveSchema::new(PrimitiveType::Int);
                if self.metadata() {
                    primitive
                        .props
                        .insert(CONNECT_TYPE.to_string(), JsonValue::from(schema.type_name()));
                } else {
                    warn!(
                        "Writing {} as Avro int without connect metadata; the width is lost",
                        schema.type_name()
                    );
                }
                return self.primitive(schema, primitive);
            }
            SchemaKind::Int32 => PrimitiveType::Int,
            SchemaKind::Int64 => PrimitiveType::Long,
            SchemaKind::Float32 => PrimitiveType::Float,
            SchemaKind::Float64 => PrimitiveType::Double,
            SchemaKind::Boolean => PrimitiveType::Boolean,
            SchemaKind::String if schema.parameter(ENUM_SYMBOLS).is_some() => {
                return self.enumeration(schema)
            }
            SchemaKind::String => PrimitiveType::String,
            SchemaKind::Bytes if schema.parameter(FIXED_SIZE).is_some() => return self.fixed(schema),
            SchemaKind::Bytes => PrimitiveType::Bytes,
            SchemaKind::Array(items) => {
                let items = self.translate(items)?;
                let array = Schema::Array(Arc::new(ArraySchema {
                    items,
                    props: self.props(schema, false),
                }));
                return self.attach_default(schema, array);
            }
            SchemaKind::Map { key, value } => return self.map(schema, key, value),
            SchemaKind::Struct(_) if is_union_struct(schema) => return self.union(schema),
            SchemaKind::Struct(_) => return self.record(schema),
            SchemaKind::Reference(name) => return self.reference(name),
        };
        self.primitive(schema, PrimitiveSchema::new(kind))
    }

    fn primitive(&mut self, schema: &SchemaRef, mut primitive: PrimitiveSchema) -> Result<Schema> {
        if let Some(logical) = logical_type(schema)? {
            if !logical.supports_primitive(primitive.kind) {
                return Err(ConversionError::UnsupportedSchemaKind(format!(
                    "logical type {} on {}",
                    logical.name(),
                    primitive.kind.as_str()
                )));
            }
            primitive.logical = Some(logical);
        }
        primitive.props.extend(self.props(schema, false));
        self.attach_default(schema, Schema::Primitive(primitive))
    }

    fn enumeration(&mut self, schema: &SchemaRef) -> Result<Schema> {
        let name = type_name(schema)?;
        let fullname = name.fullname();
        if let Some(existing) = self.existing(&fullname, schema)? {
            return Ok(existing);
        }
        let symbols: Vec<String> = schema
            .parameter(ENUM_SYMBOLS)
            .map(|text| serde_json::from_str::<Vec<String>>(text))
            .transpose()
            .map_err(|e| ConversionError::UnsupportedSchemaKind(format!("invalid {ENUM_SYMBOLS}: {e}")))?
            .unwrap_or_default();
        let enumeration = Schema::Enum(Arc::new(EnumSchema {
            doc: self.doc(&schema.doc),
            symbols,
            default: schema.parameter(ENUM_DEFAULT).map(str::to_string),
            props: self.named_props(schema, &name),
            name,
        }));
        let enumeration = self.attach_default(schema, enumeration)?;
        self.define(fullname, schema, enumeration.clone());
        Ok(enumeration)
    }

    fn fixed(&mut self, schema: &SchemaRef) -> Result<Schema> {
        let name = type_name(schema)?;
        let fullname = name.fullname();
        if let Some(existing) = self.existing(&fullname, schema)? {
            return Ok(existing);
        }
        let size = schema
            .parameter(FIXED_SIZE)
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| ConversionError::UnsupportedSchemaKind(format!("invalid {FIXED_SIZE}")))?;
        let logical = logical_type(schema)?;
        if let Some(logical) = logical {
            if !logical.supports_fixed(size) {
                return Err(ConversionError::UnsupportedSchemaKind(format!(
                    "logical type {} on fixed of size {size}",
                    logical.name()
                )));
            }
        }
        let fixed = Schema::Fixed(Arc::new(FixedSchema {
            doc: self.doc(&schema.doc),
            size,
            logical,
            props: self.named_props(schema, &name),
            name,
        }));
        let fixed = self.attach_default(schema, fixed)?;
        self.define(fullname, schema, fixed.clone());
        Ok(fixed)
    }

    fn map(&mut self, schema: &SchemaRef, key: &SchemaRef, value: &SchemaRef) -> Result<Schema> {
        let string_keys = key.kind == SchemaKind::String
            && !key.optional
            && key.name.is_none()
            && key.parameters.is_empty();
        if string_keys {
            let values = self.translate(value)?;
            let map = Schema::Map(Arc::new(MapSchema {
                values,
                props: self.props(schema, false),
            }));
            return self.attach_default(schema, map);
        }

        let address = Arc::as_ptr(schema) as usize;
        if let Some(existing) = self.map_entries.get(&address) {
            return Ok(existing.clone());
        }
        let entry = RecordSchema {
            name: Name::new(&self.naming.map_entry_name()),
            doc: None,
            fields: vec![
                RecordField::new(MAP_ENTRY_KEY, self.translate(key)?),
                RecordField::new(MAP_ENTRY_VALUE, self.translate(value)?),
            ],
            props: Props::new(),
        };
        let entry = Schema::record(entry);
        self.names.insert(entry.clone());
        let entries = Schema::Array(Arc::new(ArraySchema {
            items: entry,
            props: self.props(schema, false),
        }));
        let entries = self.attach_default(schema, entries)?;
        self.map_entries.insert(address, entries.clone());
        Ok(entries)
    }

    fn record(&mut self, schema: &SchemaRef) -> Result<Schema> {
        let name = type_name(schema)?;
        let fullname = name.fullname();
        if self.in_progress.contains(&fullname) {
            return Ok(Schema::Ref(name));
        }
        if let Some(existing) = self.existing(&fullname, schema)? {
            return Ok(existing);
        }
        if let Some(connect_name) = &schema.name {
            self.record_names.insert(connect_name.clone(), name.clone());
        }
        self.in_progress.insert(fullname.clone());

        let mut fields = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            fields.push(self.record_field(schema, field)?);
        }
        let record = Schema::record(RecordSchema {
            doc: self.doc(&schema.doc),
            fields,
            props: self.named_props(schema, &name),
            name,
        });
        self.in_progress.remove(&fullname);
        let record = self.attach_default(schema, record)?;
        self.define(fullname, schema, record.clone());
        Ok(record)
    }

    fn record_field(&mut self, owner: &SchemaRef, field: &Field) -> Result<RecordField> {
        let mut avro = self.translate(&field.schema)?;
        let mut default = None;
        match &field.default {
            Some(value) => (avro, default) = self.field_default(field, avro, value)?,
            None if !self.config.enhanced_fidelity && null_first(&avro) => {
                default = Some(JsonValue::Null);
            }
            None => {}
        }
        let mut out = RecordField::new(field.name.clone(), avro);
        out.doc = self.doc(&field.doc);
        out.default = default;
        let prefix = format!("{FIELD_PROP_PREFIX}{}.", field.name);
        for (key, value) in &owner.parameters {
            if let Some(prop) = key.strip_prefix(&prefix) {
                out.props.insert(prop.to_string(), json_param(value));
            }
        }
        Ok(out)
    }

    /// Encode a field default, reordering an optional union so the default's
    /// member comes first. Defaults no union member order can carry are dropped.
    fn field_default(
        &self,
        field: &Field,
        avro: Schema,
        value: &ConnectValue,
    ) -> Result<(Schema, Option<JsonValue>)> {
        let mut names = self.names.clone();
        names.insert(avro.clone());
        let mut avro = avro;
        let converted = {
            let ctx = DataContext {
                names: &names,
                structs: &self.structs,
            };
            connect_to_avro(&field.schema, &avro, value, &ctx, &field.name)?
        };
        if let Schema::Union(u) = &avro {
            match converted.union_branch(&u.variants, &names)? {
                Some(0) => {}
                Some(branch) if u.is_optional() => {
                    debug!("Writing field '{}' as [X, null] to carry its default", field.name);
                    avro = Schema::union(vec![u.variants[branch].clone(), u.variants[1 - branch].clone()]);
                }
                _ => {
                    warn!(
                        "Dropping default of field '{}': it does not match the first union member",
                        field.name
                    );
                    return Ok((avro, None));
                }
            }
        }
        let json = encode_default(&converted, &avro, &names)?;
        Ok((avro, Some(json)))
    }

    fn union(&mut self, schema: &SchemaRef) -> Result<Schema> {
        let fields = schema.fields();
        let mut variants = Vec::with_capacity(fields.len() + 1);
        let mut seen = HashSet::new();
        for member in union_layout(schema)? {
            let variant = match member {
                UnionMember::Null => Schema::null(),
                UnionMember::Field(index) => self.translate_required(&fields[index].schema)?,
            };
            if matches!(variant, Schema::Union(_)) {
                return Err(ConversionError::UnsupportedSchemaKind(format!(
                    "union {} nests another union",
                    schema.name.as_deref().unwrap_or("<anonymous>")
                )));
            }
            let key = variant
                .name()
                .map_or_else(|| variant.type_name().to_string(), Name::fullname);
            if !seen.insert(key.clone()) {
                return Err(ConversionError::UnsupportedSchemaKind(format!(
                    "union {} lists {key} twice",
                    schema.name.as_deref().unwrap_or("<anonymous>")
                )));
            }
            variants.push(variant);
        }
        if variants.is_empty() {
            return Err(ConversionError::UnsupportedSchemaKind("empty union".to_string()));
        }
        Ok(Schema::union(variants))
    }

    fn reference(&mut self, name: &str) -> Result<Schema> {
        if let Some(avro_name) = self.record_names.get(name) {
            let fullname = avro_name.fullname();
            if self.in_progress.contains(&fullname) {
                return Ok(Schema::Ref(avro_name.clone()));
            }
            if let Some((_, defined)) = self.defined.get(&fullname) {
                return Ok(defined.clone());
            }
        }
        let target = self
            .structs
            .get(name)
            .cloned()
            .ok_or_else(|| connect_core::ConnectError::UnknownReference(name.to_string()))?;
        self.translate_required(&target)
    }

    /// A finished named type, if `fullname` is taken by an equal definition.
    fn existing(&self, fullname: &str, schema: &SchemaRef) -> Result<Option<Schema>> {
        match self.defined.get(fullname) {
            Some((previous, avro)) if same_definition(previous, schema) => Ok(Some(avro.clone())),
            Some(_) => Err(ConversionError::NameConflict(fullname.to_string())),
            None => Ok(None),
        }
    }

    fn define(&mut self, fullname: String, schema: &SchemaRef, avro: Schema) {
        self.names.insert(avro.clone());
        self.defined.insert(fullname, (schema.clone(), avro));
    }

    /// Custom properties and, with metadata, the `connect.*` description.
    fn props(&self, schema: &ConnectSchema, named: bool) -> Props {
        let mut props = Props::new();
        for (key, value) in &schema.parameters {
            if let Some(prop) = key.strip_prefix(PROP_PREFIX) {
                props.insert(prop.to_string(), json_param(value));
            }
        }
        if !self.metadata() {
            return props;
        }
        if !named {
            if let Some(name) = &schema.name {
                props.insert(CONNECT_NAME.to_string(), JsonValue::from(name.as_str()));
            }
            if let Some(doc) = &schema.doc {
                props.insert(CONNECT_DOC.to_string(), JsonValue::from(doc.as_str()));
            }
        }
        if let Some(version) = schema.version {
            props.insert(CONNECT_VERSION.to_string(), JsonValue::from(version));
        }
        let parameters: serde_json::Map<String, JsonValue> = schema
            .parameters
            .iter()
            .filter(|(key, _)| !key.starts_with(AVRO_PARAM_PREFIX))
            .map(|(key, value)| (key.clone(), JsonValue::from(value.as_str())))
            .collect();
        if !parameters.is_empty() {
            props.insert(CONNECT_PARAMETERS.to_string(), JsonValue::Object(parameters));
        }
        props
    }

    /// [`Self::props`] for a named type, recording the Connect name when scrubbing changed it.
    fn named_props(&self, schema: &ConnectSchema, name: &Name) -> Props {
        let mut props = self.props(schema, true);
        if let Some(original) = &schema.name {
            if self.metadata() && *original != name.fullname() {
                props.insert(CONNECT_NAME.to_string(), JsonValue::from(original.as_str()));
            }
        }
        props
    }

    /// With metadata, record the schema-level default as `connect.default`.
    fn attach_default(&self, schema: &SchemaRef, avro: Schema) -> Result<Schema> {
        let Some(default) = schema.default.as_ref().filter(|_| self.metadata()) else {
            return Ok(avro);
        };
        if default.is_null() {
            return Ok(avro);
        }
        let mut names = self.names.clone();
        names.insert(avro.clone());
        let ctx = DataContext {
            names: &names,
            structs: &self.structs,
        };
        let value = connect_to_avro(schema, &avro, default, &ctx, CONNECT_DEFAULT)?;
        let json = encode_default(&value, &avro, &names)?;
        Ok(with_prop(avro, CONNECT_DEFAULT, json))
    }
}

fn type_name(schema: &ConnectSchema) -> Result<Name> {
    let name = schema.name.as_deref().ok_or_else(|| {
        ConversionError::MissingRequiredName(format!(
            "{} schema needs a name to become a named Avro type",
            schema.type_name()
        ))
    })?;
    scrub_name(name)
}

fn logical_type(schema: &ConnectSchema) -> Result<Option<LogicalType>> {
    let Some(name) = schema.parameter(LOGICAL_TYPE) else {
        return Ok(None);
    };
    let precision = schema.parameter(LOGICAL_PRECISION).and_then(|p| p.parse().ok());
    let scale = schema.parameter(LOGICAL_SCALE).and_then(|s| s.parse().ok());
    LogicalType::from_name(name, precision, scale)
        .map(Some)
        .ok_or_else(|| ConversionError::UnsupportedSchemaKind(format!("logical type {name}")))
}

fn null_first(schema: &Schema) -> bool {
    matches!(schema, Schema::Union(u) if u.variants.first().is_some_and(Schema::is_null))
}

/// Equal apart from how the use site made it optional.
fn same_definition(a: &ConnectSchema, b: &ConnectSchema) -> bool {
    let strip = |schema: &ConnectSchema| {
        let mut schema = schema.clone();
        schema.optional = false;
        schema.parameters.remove(NULL_LAST);
        schema
    };
    strip(a) == strip(b)
}

fn with_prop(schema: Schema, key: &str, value: JsonValue) -> Schema {
    match schema {
        Schema::Primitive(mut p) => {
            p.props.insert(key.to_string(), value);
            Schema::Primitive(p)
        }
        Schema::Fixed(f) => {
            let mut f = (*f).clone();
            f.props.insert(key.to_string(), value);
            Schema::Fixed(Arc::new(f))
        }
        Schema::Enum(e) => {
            let mut e = (*e).clone();
            e.props.insert(key.to_string(), value);
            Schema::Enum(Arc::new(e))
        }
        Schema::Array(a) => {
            let mut a = (*a).clone();
            a.props.insert(key.to_string(), value);
            Schema::Array(Arc::new(a))
        }
        Schema::Map(m) => {
            let mut m = (*m).clone();
            m.props.insert(key.to_string(), value);
            Schema::Map(Arc::new(m))
        }
        Schema::Record(r) => {
            let mut r = (*r).clone();
            r.props.insert(key.to_string(), value);
            Schema::Record(Arc::new(r))
        }
        other @ (Schema::Union(_) | Schema::Ref(_)) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avro_schema::to_json_string;
    use connect_core::SchemaBuilder;

    fn translate(schema: &SchemaRef, config: AvroDataConfig) -> Result<Schema> {
        from_connect_schema(schema, &config)
    }

    fn string() -> SchemaRef {
        SchemaBuilder::string().build().unwrap()
    }

    #[test]
    fn test_struct_becomes_record() {
        let schema = SchemaBuilder::struct_()
            .name("com.example.P")
            .doc("person")
            .field(Field::new("firstName", string()).with_doc("First Name"))
            .field(Field::new("age", SchemaBuilder::int32().optional().build().unwrap()))
            .build()
            .unwrap();
        let avro = translate(&schema, AvroDataConfig::default()).unwrap();
        assert_eq!(
            to_json_string(&avro),
            r#"{"type":"record","name":"P","namespace":"com.example","doc":"person","fields":[{"name":"firstName","type":"string","doc":"First Name"},{"name":"age","type":["null","int"],"default":null}]}"#
        );
    }

    #[test]
    fn test_nameless_struct_is_rejected() {
        let schema = SchemaBuilder::struct_()
            .field(Field::new("a", string()))
            .build()
            .unwrap();
        assert!(matches!(
            translate(&schema, AvroDataConfig::default()),
            Err(ConversionError::MissingRequiredName(_))
        ));
    }

    #[test]
    fn test_enum_without_name_is_rejected() {
        let schema = SchemaBuilder::string()
            .parameter(ENUM_SYMBOLS, r#"["A","B"]"#)
            .build()
            .unwrap();
        assert!(matches!(
            translate(&schema, AvroDataConfig::default()),
            Err(ConversionError::MissingRequiredName(_))
        ));
    }

    #[test]
    fn test_invalid_names_are_scrubbed() {
        let schema = SchemaBuilder::struct_()
            .name("my-topic-value")
            .build()
            .unwrap();
        let avro = translate(&schema, AvroDataConfig::default()).unwrap();
        assert_eq!(
            to_json_string(&avro),
            r#"{"type":"record","name":"my_topic_value","fields":[],"connect.name":"my-topic-value"}"#
        );
    }

    #[test]
    fn test_narrow_ints_carry_connect_type() {
        let schema = SchemaBuilder::int8().build().unwrap();
        let with_metadata = translate(&schema, AvroDataConfig::default()).unwrap();
        assert_eq!(to_json_string(&with_metadata), r#"{"type":"int","connect.type":"int8"}"#);

        let plain = AvroDataConfig::builder().attach_provenance_metadata(false).build();
        assert_eq!(to_json_string(&translate(&schema, plain).unwrap()), r#""int""#);
    }

    #[test]
    fn test_conflicting_definitions_are_rejected() {
        let a = SchemaBuilder::struct_()
            .name("Dup")
            .field(Field::new("x", string()))
            .build()
            .unwrap();
        let b = SchemaBuilder::struct_()
            .name("Dup")
            .field(Field::new("y", string()))
            .build()
            .unwrap();
        let outer = SchemaBuilder::struct_()
            .name("Outer")
            .field(Field::new("a", a))
            .field(Field::new("b", b))
            .build()
            .unwrap();
        assert!(matches!(
            translate(&outer, AvroDataConfig::default()),
            Err(ConversionError::NameConflict(name)) if name == "Dup"
        ));
    }

    #[test]
    fn test_repeated_struct_is_written_once() {
        let inner = SchemaBuilder::struct_()
            .name("Inner")
            .field(Field::new("x", string()))
            .build()
            .unwrap();
        let outer = SchemaBuilder::struct_()
            .name("Outer")
            .field(Field::new("a", inner.clone()))
            .field(Field::new("b", Arc::new(inner.to_optional())))
            .build()
            .unwrap();
        let avro = translate(&outer, AvroDataConfig::default()).unwrap();
        assert_eq!(
            to_json_string(&avro),
            r#"{"type":"record","name":"Outer","fields":[{"name":"a","type":{"type":"record","name":"Inner","fields":[{"name":"x","type":"string"}]}},{"name":"b","type":["null","Inner"],"default":null}]}"#
        );
    }

    #[test]
    fn test_non_string_keyed_map_becomes_entry_array() {
        let schema = SchemaBuilder::map(SchemaBuilder::int64().build().unwrap(), string())
            .build()
            .unwrap();
        let avro = translate(&schema, AvroDataConfig::default()).unwrap();
        assert_eq!(
            to_json_string(&avro),
            r#"{"type":"array","items":{"type":"record","name":"MapEntry","namespace":"io.avrobridge","fields":[{"name":"key","type":"long"},{"name":"value","type":"string"}]}}"#
        );
    }

    #[test]
    fn test_non_null_default_puts_member_first() {
        let schema = SchemaBuilder::struct_()
            .name("R")
            .field(
                Field::new("s", SchemaBuilder::string().optional().build().unwrap())
                    .with_default(ConnectValue::String("x".into())),
            )
            .build()
            .unwrap();
        let avro = translate(&schema, AvroDataConfig::default()).unwrap();
        assert_eq!(
            to_json_string(&avro),
            r#"{"type":"record","name":"R","fields":[{"name":"s","type":["string","null"],"default":"x"}]}"#
        );
    }
}
