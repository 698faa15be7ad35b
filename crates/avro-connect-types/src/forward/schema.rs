//! Avro schema → Connect schema.

use crate::config::AvroDataConfig;
use crate::error::{ConversionError, Result};
use crate::forward::data::avro_to_connect;
use crate::naming::{member_field_names, NamingResolver};
use crate::params::{
    is_map_entry_name, layout_param, CONNECT_DEFAULT, CONNECT_DOC, CONNECT_NAME,
    CONNECT_PARAMETERS, CONNECT_PROP_PREFIX, CONNECT_TYPE, CONNECT_VERSION, ENUM_DEFAULT,
    ENUM_SYMBOLS, FIELD_PROP_PREFIX, FIXED_SIZE, LOGICAL_PRECISION, LOGICAL_SCALE, LOGICAL_TYPE,
    MAP_ENTRY_KEY, MAP_ENTRY_VALUE, NULL_LAST, PROP_PREFIX, UNION_MEMBERS,
};
use crate::DataContext;
use avro_schema::{
    decode_default, ArraySchema, EnumSchema, FixedSchema, LogicalType, MapSchema, Names,
    PrimitiveSchema, PrimitiveType, Props, RecordSchema, Schema, UnionSchema,
};
use connect_core::{ConnectSchema, Field, SchemaKind, SchemaRef, StructIndex};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How a schema is used: alone, or as the non-null member of an optional union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Presence {
    Required,
    /// `["null", X]`
    Optional,
    /// `[X, "null"]`, distinguished only under enhanced fidelity
    OptionalNullLast,
}

/// Translate an Avro schema graph to a Connect schema.
pub fn to_connect_schema(schema: &Schema, config: &AvroDataConfig) -> Result<SchemaRef> {
    debug!("Translating Avro {} schema to Connect", schema.type_name());
    let mut translator = ToConnect::new(schema, config);
    translator.translate(schema, &mut Vec::new())
}

/// State of one translation call.
struct ToConnect<'a> {
    config: &'a AvroDataConfig,
    names: Names,
    naming: NamingResolver,
    /// Finished named types by Avro full name
    named: HashMap<String, SchemaRef>,
    /// Optional forms of finished named types
    variants: HashMap<(String, Presence), SchemaRef>,
    /// Named types being translated: Avro full name → Connect name
    in_progress: HashMap<String, String>,
}

impl<'a> ToConnect<'a> {
    fn new(root: &Schema, config: &'a AvroDataConfig) -> Self {
        Self {
            config,
            names: Names::collect(root),
            naming: NamingResolver::new(),
            named: HashMap::new(),
            variants: HashMap::new(),
            in_progress: HashMap::new(),
        }
    }

    fn metadata(&self) -> bool {
        self.config.attach_provenance_metadata
    }

    fn enhanced(&self) -> bool {
        self.config.enhanced_fidelity
    }

    fn doc(&self, doc: &Option<String>) -> Option<String> {
        if self.config.keeps_docs() {
            doc.clone()
        } else {
            None
        }
    }

    fn translate(&mut self, schema: &Schema, path: &mut Vec<String>) -> Result<SchemaRef> {
        if let Some(name) = schema.name() {
            let fullname = name.fullname();
            if let Some(connect_name) = self.in_progress.get(&fullname) {
                debug!("Recursive reference to {}", fullname);
                let reference = ConnectSchema::new(SchemaKind::Reference(connect_name.clone()));
                return Ok(Arc::new(reference));
            }
            if let Some(done) = self.named.get(&fullname) {
                return Ok(done.clone());
            }
        }

        match schema {
            Schema::Ref(_) => {
                let resolved = self.names.resolve(schema)?.clone();
                self.translate(&resolved, path)
            }
            Schema::Primitive(p) => self.primitive(schema, p),
            Schema::Fixed(f) => self.fixed(schema, f),
            Schema::Enum(e) => self.enumeration(schema, e),
            Schema::Array(a) => self.array(schema, a, path),
            Schema::Map(m) => self.map(schema, m, path),
            Schema::Record(r) => self.record(schema, r),
            Schema::Union(u) => self.union(u, path),
        }
    }

    /// Translate `schema` as used with the given presence, sharing the
    /// optional form of a named type between its use sites.
    fn with_presence(
        &mut self,
        schema: &Schema,
        presence: Presence,
        path: &mut Vec<String>,
    ) -> Result<SchemaRef> {
        let base = self.translate(schema, path)?;
        if presence == Presence::Required {
            return Ok(base);
        }
        let key = match schema {
            Schema::Ref(_) => None,
            other => other.name().map(|n| (n.fullname(), presence)),
        };
        if let Some(hit) = key.as_ref().and_then(|k| self.variants.get(k)) {
            return Ok(hit.clone());
        }
        let mut variant = base.to_optional();
        if presence == Presence::OptionalNullLast {
            variant.parameters.insert(NULL_LAST.to_string(), "true".to_string());
        }
        let variant = Arc::new(variant);
        if let Some(key) = key {
            self.variants.insert(key, variant.clone());
        }
        Ok(variant)
    }

    fn primitive(&mut self, node: &Schema, p: &PrimitiveSchema) -> Result<SchemaRef> {
        let kind = match p.kind {
            PrimitiveType::Null => {
                return Err(ConversionError::UnsupportedSchemaKind(
                    "null is only supported as a union member".to_string(),
                ))
            }
            PrimitiveType::Boolean => SchemaKind::Boolean,
            PrimitiveType::Int => {
                let narrow = p
                    .props
                    .get(CONNECT_TYPE)
                    .and_then(JsonValue::as_str)
                    .filter(|_| self.metadata());
                match narrow {
                    Some("int8") => SchemaKind::Int8,
                    Some("int16") => SchemaKind::Int16,
                    _ => SchemaKind::Int32,
                }
            }
            PrimitiveType::Long => SchemaKind::Int64,
            PrimitiveType::Float => SchemaKind::Float32,
            PrimitiveType::Double => SchemaKind::Float64,
            PrimitiveType::Bytes => SchemaKind::Bytes,
            PrimitiveType::String => SchemaKind::String,
        };
        let mut out = ConnectSchema::new(kind);
        if let Some(logical) = p.logical {
            logical_params(&mut out, logical);
        }
        let default = self.apply_props(&mut out, &p.props)?;
        self.finish(out, node, default)
    }

    fn fixed(&mut self, node: &Schema, f: &FixedSchema) -> Result<SchemaRef> {
        let mut out = ConnectSchema::new(SchemaKind::Bytes);
        out.name = Some(f.name.fullname());
        out.doc = self.doc(&f.doc);
        out.parameters.insert(FIXED_SIZE.to_string(), f.size.to_string());
        if let Some(logical) = f.logical {
            logical_params(&mut out, logical);
        }
        let default = self.apply_props(&mut out, &f.props)?;
        let out = self.finish(out, node, default)?;
        self.named.insert(f.name.fullname(), out.clone());
        Ok(out)
    }

    fn enumeration(&mut self, node: &Schema, e: &EnumSchema) -> Result<SchemaRef> {
        let mut out = ConnectSchema::new(SchemaKind::String);
        out.name = Some(e.name.fullname());
        out.doc = self.doc(&e.doc);
        let symbols = JsonValue::from(e.symbols.clone());
        out.parameters.insert(ENUM_SYMBOLS.to_string(), symbols.to_string());
        if let Some(default) = &e.default {
            out.parameters.insert(ENUM_DEFAULT.to_string(), default.clone());
        }
        let default = self.apply_props(&mut out, &e.props)?;
        let out = self.finish(out, node, default)?;
        self.named.insert(e.name.fullname(), out.clone());
        Ok(out)
    }

    fn array(
        &mut self,
        node: &Schema,
        a: &ArraySchema,
        path: &mut Vec<String>,
    ) -> Result<SchemaRef> {
        let mut out = match self.map_entry_parts(&a.items)? {
            Some((key, value)) => {
                path.push(MAP_ENTRY_KEY.to_string());
                let key = self.translate(&key, path);
                path.pop();
                path.push(MAP_ENTRY_VALUE.to_string());
                let value = self.translate(&value, path);
                path.pop();
                ConnectSchema::new(SchemaKind::Map {
                    key: key?,
                    value: value?,
                })
            }
            None => {
                path.push("items".to_string());
                let items = self.translate(&a.items, path);
                path.pop();
                ConnectSchema::new(SchemaKind::Array(items?))
            }
        };
        let default = self.apply_props(&mut out, &a.props)?;
        self.finish(out, node, default)
    }

    /// Key and value schemas when `items` is a synthesized map entry record.
    fn map_entry_parts(&self, items: &Schema) -> Result<Option<(Schema, Schema)>> {
        let Schema::Record(r) = self.names.resolve(items)? else {
            return Ok(None);
        };
        let is_entry = is_map_entry_name(&r.name.fullname())
            && r.fields.len() == 2
            && r.fields[0].name == MAP_ENTRY_KEY
            && r.fields[1].name == MAP_ENTRY_VALUE;
        Ok(is_entry.then(|| (r.fields[0].schema.clone(), r.fields[1].schema.clone())))
    }

    fn map(&mut self, node: &Schema, m: &MapSchema, path: &mut Vec<String>) -> Result<SchemaRef> {
        path.push("values".to_string());
        let value = self.translate(&m.values, path);
        path.pop();
        let mut out = ConnectSchema::new(SchemaKind::Map {
            key: Arc::new(ConnectSchema::new(SchemaKind::String)),
            value: value?,
        });
        let default = self.apply_props(&mut out, &m.props)?;
        self.finish(out, node, default)
    }

    fn record(&mut self, node: &Schema, r: &RecordSchema) -> Result<SchemaRef> {
        let fullname = r.name.fullname();
        let connect_name = r
            .props
            .get(CONNECT_NAME)
            .and_then(JsonValue::as_str)
            .filter(|_| self.metadata())
            .map_or_else(|| fullname.clone(), str::to_string);
        self.in_progress.insert(fullname.clone(), connect_name.clone());

        let mut path = vec![r.name.name.clone()];
        let mut fields = Vec::with_capacity(r.fields.len());
        let mut field_params = Vec::new();
        for (index, field) in r.fields.iter().enumerate() {
            path.push(field.name.clone());
            let schema = self.translate(&field.schema, &mut path)?;
            path.pop();
            let default = match &field.default {
                Some(json) => Some(self.field_default(json, &field.schema, &schema, &field.name)?),
                None => None,
            };
            if self.enhanced() {
                for (key, value) in &field.props {
                    field_params.push((
                        format!("{FIELD_PROP_PREFIX}{}.{key}", field.name),
                        value.to_string(),
                    ));
                }
            }
            fields.push(Field {
                name: field.name.clone(),
                index,
                schema,
                doc: self.doc(&field.doc),
                default,
            });
        }

        let mut out = ConnectSchema::new(SchemaKind::Struct(fields));
        out.name = Some(connect_name);
        out.doc = self.doc(&r.doc);
        out.parameters.extend(field_params);
        let default = self.apply_props(&mut out, &r.props)?;
        self.in_progress.remove(&fullname);
        let out = self.finish(out, node, default)?;
        self.named.insert(fullname, out.clone());
        Ok(out)
    }

    fn field_default(
        &self,
        json: &JsonValue,
        avro: &Schema,
        connect: &SchemaRef,
        field: &str,
    ) -> Result<connect_core::ConnectValue> {
        let value = decode_default(json, avro, &self.names)?;
        let structs = StructIndex::collect(connect);
        let ctx = DataContext {
            names: &self.names,
            structs: &structs,
        };
        avro_to_connect(avro, connect, &value, &ctx, field)
    }

    fn union(&mut self, u: &UnionSchema, path: &mut Vec<String>) -> Result<SchemaRef> {
        if u.is_optional() {
            let presence = if u.null_index() == Some(1) && self.enhanced() {
                Presence::OptionalNullLast
            } else {
                Presence::Optional
            };
            let member = u.non_null_variants().next().ok_or_else(|| {
                ConversionError::UnsupportedSchemaKind("optional union without a member".to_string())
            })?;
            return self.with_presence(member, presence, path);
        }
        if u.non_null_variants().next().is_none() {
            return Err(ConversionError::UnsupportedSchemaKind(
                "union without a non-null member".to_string(),
            ));
        }

        let name = self.naming.union_struct_name(path);
        let field_names = member_field_names(&u.variants);
        let mut fields = Vec::with_capacity(field_names.len());
        let mut layout: Vec<Option<&str>> = Vec::with_capacity(u.variants.len());
        let mut members = field_names.iter();
        for variant in &u.variants {
            if variant.is_null() {
                layout.push(None);
                continue;
            }
            let field_name = members.next().ok_or_else(|| {
                ConversionError::UnsupportedSchemaKind("union member without a field name".to_string())
            })?;
            path.push(field_name.clone());
            let schema = self.with_presence(variant, Presence::Optional, path);
            path.pop();
            fields.push(Field {
                name: field_name.clone(),
                index: fields.len(),
                schema: schema?,
                doc: None,
                default: None,
            });
            layout.push(Some(field_name.as_str()));
        }

        let mut out = ConnectSchema::new(SchemaKind::Struct(fields));
        out.name = Some(name);
        out.optional = u.null_index().is_some();
        if self.enhanced() {
            out.parameters.insert(UNION_MEMBERS.to_string(), layout_param(&layout));
        }
        Ok(Arc::new(out))
    }

    /// Move custom properties onto `out`; returns a `connect.default` literal.
    fn apply_props(&self, out: &mut ConnectSchema, props: &Props) -> Result<Option<JsonValue>> {
        if let Some(logical) = props.get("logicalType") {
            return Err(ConversionError::UnsupportedSchemaKind(format!(
                "logical type {logical} on {}",
                out.type_name()
            )));
        }
        let mut connect_default = None;
        for (key, value) in props {
            if self.metadata() && key.starts_with(CONNECT_PROP_PREFIX) {
                match key.as_str() {
                    CONNECT_NAME => out.name = value.as_str().map(str::to_string),
                    CONNECT_DOC => {
                        if self.config.keeps_docs() {
                            out.doc = value.as_str().map(str::to_string);
                        }
                    }
                    CONNECT_VERSION => {
                        out.version = value.as_i64().and_then(|v| i32::try_from(v).ok());
                    }
                    CONNECT_PARAMETERS => {
                        if let Some(params) = value.as_object() {
                            for (k, v) in params {
                                let v = v.as_str().map_or_else(|| v.to_string(), str::to_string);
                                out.parameters.insert(k.clone(), v);
                            }
                        }
                    }
                    CONNECT_DEFAULT => connect_default = Some(value.clone()),
                    CONNECT_TYPE => {}
                    _ => self.keep_prop(out, key, value),
                }
            } else {
                self.keep_prop(out, key, value);
            }
        }
        Ok(connect_default)
    }

    fn keep_prop(&self, out: &mut ConnectSchema, key: &str, value: &JsonValue) {
        if self.enhanced() {
            out.parameters
                .insert(format!("{PROP_PREFIX}{key}"), value.to_string());
        }
    }

    /// Seal the schema, decoding a `connect.default` literal against `node`.
    fn finish(
        &self,
        out: ConnectSchema,
        node: &Schema,
        default: Option<JsonValue>,
    ) -> Result<SchemaRef> {
        let out = Arc::new(out);
        let Some(json) = default else {
            return Ok(out);
        };
        let value = self.field_default(&json, node, &out, CONNECT_DEFAULT)?;
        let mut with_default = (*out).clone();
        with_default.default = Some(value);
        Ok(Arc::new(with_default))
    }
}

fn logical_params(out: &mut ConnectSchema, logical: LogicalType) {
    out.parameters
        .insert(LOGICAL_TYPE.to_string(), logical.name().to_string());
    if let LogicalType::Decimal { precision, scale } = logical {
        out.parameters
            .insert(LOGICAL_PRECISION.to_string(), precision.to_string());
        out.parameters
            .insert(LOGICAL_SCALE.to_string(), scale.to_string());
    }
}
