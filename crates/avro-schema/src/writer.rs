//! Render a [`Schema`] back to JSON text.
//!
//! Attribute order follows the reference Java writer so text produced here
//! compares equal to text produced by the wider Avro ecosystem. A named type is
//! written in full at its first occurrence and by name afterwards.

use crate::schema::{LogicalType, Props, Schema};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Leave out `logicalType` annotations, writing base types only
    pub strip_logical_types: bool,
}

/// Compact JSON text of `schema`.
pub fn to_json_string(schema: &Schema) -> String {
    to_json(schema).to_string()
}

/// JSON document of `schema`.
pub fn to_json(schema: &Schema) -> JsonValue {
    to_json_with(schema, WriteOptions::default())
}

pub fn to_json_with(schema: &Schema, options: WriteOptions) -> JsonValue {
    let mut writer = Writer {
        options,
        written: HashSet::new(),
    };
    writer.write(schema, None)
}

struct Writer {
    options: WriteOptions,
    written: HashSet<String>,
}

impl Writer {
    fn write(&mut self, schema: &Schema, enclosing: Option<&str>) -> JsonValue {
        if let Some(name) = schema.name() {
            let fullname = name.fullname();
            let already = !self.written.insert(fullname.clone());
            if already || matches!(schema, Schema::Ref(_)) {
                let reference = if name.namespace.as_deref() == enclosing {
                    name.name.clone()
                } else {
                    fullname
                };
                return JsonValue::String(reference);
            }
        }

        match schema {
            Schema::Primitive(p) => {
                let logical = p.logical.filter(|_| !self.options.strip_logical_types);
                if logical.is_none() && p.props.is_empty() {
                    return JsonValue::String(p.kind.as_str().to_string());
                }
                let mut obj = Map::new();
                obj.insert("type".into(), p.kind.as_str().into());
                if let Some(logical) = logical {
                    write_logical(&mut obj, logical);
                }
                append_props(&mut obj, &p.props);
                JsonValue::Object(obj)
            }
            Schema::Fixed(f) => {
                let mut obj = Map::new();
                obj.insert("type".into(), "fixed".into());
                write_name(&mut obj, &f.name.name, f.name.namespace.as_deref(), enclosing);
                if let Some(doc) = &f.doc {
                    obj.insert("doc".into(), doc.as_str().into());
                }
                obj.insert("size".into(), f.size.into());
                if let Some(logical) = f.logical.filter(|_| !self.options.strip_logical_types) {
                    write_logical(&mut obj, logical);
                }
                append_props(&mut obj, &f.props);
                JsonValue::Object(obj)
            }
            Schema::Enum(e) => {
                let mut obj = Map::new();
                obj.insert("type".into(), "enum".into());
                write_name(&mut obj, &e.name.name, e.name.namespace.as_deref(), enclosing);
                if let Some(doc) = &e.doc {
                    obj.insert("doc".into(), doc.as_str().into());
                }
                obj.insert(
                    "symbols".into(),
                    JsonValue::Array(e.symbols.iter().map(|s| s.as_str().into()).collect()),
                );
                append_props(&mut obj, &e.props);
                if let Some(default) = &e.default {
                    obj.insert("default".into(), default.as_str().into());
                }
                JsonValue::Object(obj)
            }
            Schema::Array(a) => {
                let mut obj = Map::new();
                obj.insert("type".into(), "array".into());
                obj.insert("items".into(), self.write(&a.items, enclosing));
                append_props(&mut obj, &a.props);
                JsonValue::Object(obj)
            }
            Schema::Map(m) => {
                let mut obj = Map::new();
                obj.insert("type".into(), "map".into());
                obj.insert("values".into(), self.write(&m.values, enclosing));
                append_props(&mut obj, &m.props);
                JsonValue::Object(obj)
            }
            Schema::Record(r) => {
                let mut obj = Map::new();
                obj.insert("type".into(), "record".into());
                write_name(&mut obj, &r.name.name, r.name.namespace.as_deref(), enclosing);
                if let Some(doc) = &r.doc {
                    obj.insert("doc".into(), doc.as_str().into());
                }
                let namespace = r.name.namespace.as_deref();
                let fields = r
                    .fields
                    .iter()
                    .map(|field| {
                        let mut f = Map::new();
                        f.insert("name".into(), field.name.as_str().into());
                        f.insert("type".into(), self.write(&field.schema, namespace));
                        if let Some(doc) = &field.doc {
                            f.insert("doc".into(), doc.as_str().into());
                        }
                        if let Some(default) = &field.default {
                            f.insert("default".into(), default.clone());
                        }
                        append_props(&mut f, &field.props);
                        JsonValue::Object(f)
                    })
                    .collect();
                obj.insert("fields".into(), JsonValue::Array(fields));
                append_props(&mut obj, &r.props);
                JsonValue::Object(obj)
            }
            Schema::Union(u) => JsonValue::Array(
                u.variants
                    .iter()
                    .map(|variant| self.write(variant, enclosing))
                    .collect(),
            ),
            // Handled above with the other names.
            Schema::Ref(name) => JsonValue::String(name.fullname()),
        }
    }
}

fn write_name(obj: &mut Map<String, JsonValue>, name: &str, namespace: Option<&str>, enclosing: Option<&str>) {
    obj.insert("name".into(), name.into());
    if namespace != enclosing {
        obj.insert("namespace".into(), namespace.unwrap_or("").into());
    }
}

fn write_logical(obj: &mut Map<String, JsonValue>, logical: LogicalType) {
    obj.insert("logicalType".into(), logical.name().into());
    if let LogicalType::Decimal { precision, scale } = logical {
        obj.insert("precision".into(), precision.into());
        obj.insert("scale".into(), scale.into());
    }
}

fn append_props(obj: &mut Map<String, JsonValue>, props: &Props) {
    for (key, value) in props {
        obj.insert(key.clone(), value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn test_text_is_reproduced() {
        let texts = [
            r#"{"type":"record","name":"P","namespace":"demo","doc":"A person","fields":[{"name":"firstName","type":"string","doc":"First Name"},{"name":"age","type":["null","int"],"default":null}]}"#,
            r#"{"type":"record","name":"R","fields":[{"name":"a","type":{"type":"enum","name":"E","symbols":["A","B"],"default":"A"},"default":"B"},{"name":"b","type":"E"}]}"#,
            r#"{"type":"record","name":"R","namespace":"x","fields":[{"name":"inner","type":{"type":"record","name":"I","namespace":"","fields":[{"name":"f","type":{"type":"fixed","name":"F","size":4}}]}}]}"#,
            r#"{"type":"record","name":"T","fields":[{"name":"d","type":{"type":"bytes","logicalType":"decimal","precision":9,"scale":2}},{"name":"s","type":{"type":"string","avro.java.string":"String"},"aliases":["t"]}]}"#,
            r#"{"type":"record","name":"Node","fields":[{"name":"next","type":["null","Node"],"default":null}]}"#,
        ];
        for text in texts {
            let schema = parse_str(text).unwrap();
            assert_eq!(to_json_string(&schema), text);
        }
    }

    #[test]
    fn test_strip_logical_types() {
        let schema = parse_str(r#"{"type":"int","logicalType":"date"}"#).unwrap();
        let json = to_json_with(
            &schema,
            WriteOptions {
                strip_logical_types: true,
            },
        );
        assert_eq!(json, JsonValue::from("int"));
    }
}
