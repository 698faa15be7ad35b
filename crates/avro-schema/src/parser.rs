//! Parse Avro schema JSON text into a [`Schema`] graph.
//!
//! Named types are registered as they are defined. A later reference to a
//! completed type clones its `Arc`, so both use sites share one object; a
//! reference to a type whose definition is still open becomes [`Schema::Ref`].

use crate::default::decode_default;
use crate::error::{AvroSchemaError, Result};
use crate::name::{is_valid_identifier, Name};
use crate::schema::{
    ArraySchema, EnumSchema, FixedSchema, LogicalType, MapSchema, Names, PrimitiveSchema,
    PrimitiveType, Props, RecordField, RecordSchema, Schema, UnionSchema,
};
use serde_json::{Map, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Parse schema text.
pub fn parse_str(text: &str) -> Result<Schema> {
    let json: JsonValue = serde_json::from_str(text)?;
    parse_json(&json)
}

/// Parse an already-decoded schema JSON document.
pub fn parse_json(json: &JsonValue) -> Result<Schema> {
    let mut parser = Parser::default();
    let schema = parser.parse(json, None)?;
    validate_defaults(&schema, &Names::collect(&schema))?;
    Ok(schema)
}

#[derive(Default)]
struct Parser {
    defined: HashMap<String, Schema>,
    in_progress: HashSet<String>,
}

impl Parser {
    fn parse(&mut self, json: &JsonValue, enclosing: Option<&str>) -> Result<Schema> {
        match json {
            JsonValue::String(s) => self.parse_name(s, enclosing),
            JsonValue::Array(members) => self.parse_union(members, enclosing),
            JsonValue::Object(obj) => self.parse_object(obj, enclosing),
            other => Err(AvroSchemaError::Parse(format!(
                "expected a schema, found {other}"
            ))),
        }
    }

    fn parse_name(&self, s: &str, enclosing: Option<&str>) -> Result<Schema> {
        if let Some(kind) = PrimitiveType::parse(s) {
            return Ok(Schema::primitive(kind));
        }
        // Unqualified names are looked up in the enclosing namespace first.
        let mut candidates = Vec::with_capacity(2);
        if !s.contains('.') {
            if let Some(ns) = enclosing.filter(|ns| !ns.is_empty()) {
                candidates.push(format!("{ns}.{s}"));
            }
        }
        candidates.push(s.to_string());

        for candidate in candidates {
            if let Some(schema) = self.defined.get(&candidate) {
                return Ok(schema.clone());
            }
            if self.in_progress.contains(&candidate) {
                debug!("Recursive reference to '{}'", candidate);
                return Ok(Schema::Ref(Name::new(&candidate)));
            }
        }
        Err(AvroSchemaError::UnknownType(s.to_string()))
    }

    fn parse_union(&mut self, members: &[JsonValue], enclosing: Option<&str>) -> Result<Schema> {
        let mut variants = Vec::with_capacity(members.len());
        let mut seen = HashSet::new();
        for member in members {
            let variant = self.parse(member, enclosing)?;
            let key = match &variant {
                Schema::Union(_) => {
                    return Err(AvroSchemaError::InvalidUnion(
                        "unions may not immediately contain other unions".to_string(),
                    ))
                }
                other => match other.name() {
                    Some(name) => name.fullname(),
                    None => other.type_name().to_string(),
                },
            };
            if !seen.insert(key.clone()) {
                return Err(AvroSchemaError::InvalidUnion(format!(
                    "duplicate member '{key}'"
                )));
            }
            variants.push(variant);
        }
        Ok(Schema::Union(Arc::new(UnionSchema { variants })))
    }

    fn parse_object(&mut self, obj: &Map<String, JsonValue>, enclosing: Option<&str>) -> Result<Schema> {
        let type_name = match obj.get("type") {
            Some(JsonValue::String(t)) => t.as_str(),
            Some(other) => {
                return Err(AvroSchemaError::Parse(format!(
                    "'type' must be a string, found {other}"
                )))
            }
            None => return Err(AvroSchemaError::Parse("missing 'type'".to_string())),
        };

        match type_name {
            "record" | "error" => self.parse_record(obj, enclosing),
            "enum" => self.parse_enum(obj, enclosing),
            "fixed" => self.parse_fixed(obj, enclosing),
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| AvroSchemaError::Parse("array without 'items'".to_string()))?;
                let items = self.parse(items, enclosing)?;
                Ok(Schema::Array(Arc::new(ArraySchema {
                    items,
                    props: collect_props(obj, &["type", "items"]),
                })))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| AvroSchemaError::Parse("map without 'values'".to_string()))?;
                let values = self.parse(values, enclosing)?;
                Ok(Schema::Map(Arc::new(MapSchema {
                    values,
                    props: collect_props(obj, &["type", "values"]),
                })))
            }
            other => match PrimitiveType::parse(other) {
                Some(kind) => {
                    let mut props = collect_props(obj, &["type"]);
                    let logical = take_logical(&mut props, |l| l.supports_primitive(kind));
                    Ok(Schema::Primitive(PrimitiveSchema {
                        kind,
                        logical,
                        props,
                    }))
                }
                // {"type": "some.Named"} is a reference written as an object.
                None => self.parse_name(other, enclosing),
            },
        }
    }

    fn define_name(&self, obj: &Map<String, JsonValue>, enclosing: Option<&str>) -> Result<Name> {
        let name = obj
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| AvroSchemaError::Parse("named type without 'name'".to_string()))?;
        let namespace = obj.get("namespace").and_then(JsonValue::as_str);
        let name = Name::resolve(name, namespace, enclosing)?;
        let fullname = name.fullname();
        if PrimitiveType::parse(&name.name).is_some() && name.namespace.is_none() {
            return Err(AvroSchemaError::InvalidName(fullname));
        }
        if self.defined.contains_key(&fullname) || self.in_progress.contains(&fullname) {
            return Err(AvroSchemaError::DuplicateName(fullname));
        }
        Ok(name)
    }

    fn parse_record(&mut self, obj: &Map<String, JsonValue>, enclosing: Option<&str>) -> Result<Schema> {
        let name = self.define_name(obj, enclosing)?;
        let fullname = name.fullname();
        self.in_progress.insert(fullname.clone());

        let field_values = obj
            .get("fields")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| AvroSchemaError::Parse(format!("record '{fullname}' without 'fields'")))?;

        let mut fields: Vec<RecordField> = Vec::with_capacity(field_values.len());
        for field in field_values {
            let field_obj = field.as_object().ok_or_else(|| {
                AvroSchemaError::Parse(format!("field of '{fullname}' is not an object"))
            })?;
            let field_name = field_obj
                .get("name")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| AvroSchemaError::Parse(format!("field of '{fullname}' without 'name'")))?;
            if !is_valid_identifier(field_name) {
                return Err(AvroSchemaError::InvalidName(field_name.to_string()));
            }
            if fields.iter().any(|f| f.name == field_name) {
                return Err(AvroSchemaError::Parse(format!(
                    "duplicate field '{field_name}' in '{fullname}'"
                )));
            }
            let field_type = field_obj.get("type").ok_or_else(|| {
                AvroSchemaError::Parse(format!("field '{field_name}' without 'type'"))
            })?;
            let schema = self.parse(field_type, name.namespace.as_deref())?;
            fields.push(RecordField {
                name: field_name.to_string(),
                schema,
                doc: string_attr(field_obj, "doc"),
                default: field_obj.get("default").cloned(),
                props: collect_props(field_obj, &["name", "type", "doc", "default"]),
            });
        }

        let schema = Schema::Record(Arc::new(RecordSchema {
            doc: string_attr(obj, "doc"),
            props: collect_props(obj, &["type", "name", "namespace", "doc", "fields"]),
            name,
            fields,
        }));
        self.in_progress.remove(&fullname);
        self.defined.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_enum(&mut self, obj: &Map<String, JsonValue>, enclosing: Option<&str>) -> Result<Schema> {
        let name = self.define_name(obj, enclosing)?;
        let fullname = name.fullname();
        let symbols: Vec<String> = obj
            .get("symbols")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| AvroSchemaError::Parse(format!("enum '{fullname}' without 'symbols'")))?
            .iter()
            .map(|s| {
                s.as_str()
                    .filter(|s| is_valid_identifier(s))
                    .map(str::to_string)
                    .ok_or_else(|| AvroSchemaError::Parse(format!("invalid symbol {s} in '{fullname}'")))
            })
            .collect::<Result<_>>()?;
        let unique: HashSet<&String> = symbols.iter().collect();
        if unique.len() != symbols.len() {
            return Err(AvroSchemaError::Parse(format!("duplicate symbol in '{fullname}'")));
        }
        let default = string_attr(obj, "default");
        if let Some(default) = &default {
            if !symbols.contains(default) {
                return Err(AvroSchemaError::Parse(format!(
                    "default symbol '{default}' is not a symbol of '{fullname}'"
                )));
            }
        }

        let schema = Schema::Enum(Arc::new(EnumSchema {
            doc: string_attr(obj, "doc"),
            props: collect_props(obj, &["type", "name", "namespace", "doc", "symbols", "default"]),
            name,
            symbols,
            default,
        }));
        self.defined.insert(fullname, schema.clone());
        Ok(schema)
    }

    fn parse_fixed(&mut self, obj: &Map<String, JsonValue>, enclosing: Option<&str>) -> Result<Schema> {
        let name = self.define_name(obj, enclosing)?;
        let fullname = name.fullname();
        let size = obj
            .get("size")
            .and_then(JsonValue::as_u64)
            .ok_or_else(|| AvroSchemaError::Parse(format!("fixed '{fullname}' without a valid 'size'")))?
            as usize;
        let mut props = collect_props(obj, &["type", "name", "namespace", "doc", "size"]);
        let logical = take_logical(&mut props, |l| l.supports_fixed(size));

        let schema = Schema::Fixed(Arc::new(FixedSchema {
            doc: string_attr(obj, "doc"),
            name,
            size,
            logical,
            props,
        }));
        self.defined.insert(fullname, schema.clone());
        Ok(schema)
    }
}

fn string_attr(obj: &Map<String, JsonValue>, key: &str) -> Option<String> {
    obj.get(key).and_then(JsonValue::as_str).map(str::to_string)
}

fn collect_props(obj: &Map<String, JsonValue>, reserved: &[&str]) -> Props {
    obj.iter()
        .filter(|(k, _)| !reserved.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Lift a recognised, well-formed `logicalType` out of the properties.
///
/// Unknown or misapplied logical types stay behind as plain properties, which
/// Avro readers ignore.
fn take_logical(props: &mut Props, applies: impl Fn(&LogicalType) -> bool) -> Option<LogicalType> {
    let name = props.get("logicalType")?.as_str()?.to_string();
    let precision = props
        .get("precision")
        .and_then(JsonValue::as_u64)
        .and_then(|p| u32::try_from(p).ok());
    let scale = props
        .get("scale")
        .and_then(JsonValue::as_u64)
        .and_then(|s| u32::try_from(s).ok());
    let logical = LogicalType::from_name(&name, precision, scale).filter(|l| applies(l))?;

    props.remove("logicalType");
    if matches!(logical, LogicalType::Decimal { .. }) {
        props.remove("precision");
        props.remove("scale");
    }
    Some(logical)
}

fn validate_defaults(schema: &Schema, names: &Names) -> Result<()> {
    let mut visited = HashSet::new();
    validate_defaults_inner(schema, names, &mut visited)
}

fn validate_defaults_inner(schema: &Schema, names: &Names, visited: &mut HashSet<String>) -> Result<()> {
    match schema {
        Schema::Record(record) => {
            if !visited.insert(record.name.fullname()) {
                return Ok(());
            }
            for field in &record.fields {
                if let Some(default) = &field.default {
                    decode_default(default, &field.schema, names).map_err(|e| {
                        AvroSchemaError::InvalidDefault {
                            field: format!("{}.{}", record.name, field.name),
                            message: e.to_string(),
                        }
                    })?;
                }
                validate_defaults_inner(&field.schema, names, visited)?;
            }
            Ok(())
        }
        Schema::Array(a) => validate_defaults_inner(&a.items, names, visited),
        Schema::Map(m) => validate_defaults_inner(&m.values, names, visited),
        Schema::Union(u) => u
            .variants
            .iter()
            .try_for_each(|v| validate_defaults_inner(v, names, visited)),
        Schema::Primitive(_) | Schema::Fixed(_) | Schema::Enum(_) | Schema::Ref(_) => Ok(()),
    }
}
