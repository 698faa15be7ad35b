//! Connect schema parameters and Avro properties used to carry what the other
//! model cannot express natively.

use crate::error::{ConversionError, Result};
use connect_core::ConnectSchema;
use serde_json::Value as JsonValue;

/// Prefix of every parameter this crate owns.
pub const AVRO_PARAM_PREFIX: &str = "avro.";

pub const LOGICAL_TYPE: &str = "avro.logical.type";
pub const LOGICAL_PRECISION: &str = "avro.logical.precision";
pub const LOGICAL_SCALE: &str = "avro.logical.scale";

/// JSON array of enum symbols, in declaration order
pub const ENUM_SYMBOLS: &str = "avro.enum.symbols";
pub const ENUM_DEFAULT: &str = "avro.enum.default";

pub const FIXED_SIZE: &str = "avro.fixed.size";

/// JSON array giving the union member order: `null` for the null member, a
/// field name of the union struct for every other member.
pub const UNION_MEMBERS: &str = "avro.union.members";

/// Set on a two-member optional union written as `[X, "null"]`.
pub const NULL_LAST: &str = "avro.optional.null_last";

/// `avro.prop.<key>` holds the JSON text of a custom schema property.
pub const PROP_PREFIX: &str = "avro.prop.";

/// `avro.field.prop.<field>.<key>` holds the JSON text of a field property.
pub const FIELD_PROP_PREFIX: &str = "avro.field.prop.";

// Avro-side properties describing the Connect schema.
pub const CONNECT_NAME: &str = "connect.name";
pub const CONNECT_DOC: &str = "connect.doc";
pub const CONNECT_VERSION: &str = "connect.version";
pub const CONNECT_PARAMETERS: &str = "connect.parameters";
pub const CONNECT_TYPE: &str = "connect.type";
pub const CONNECT_DEFAULT: &str = "connect.default";
pub const CONNECT_PROP_PREFIX: &str = "connect.";

/// Namespace of synthesized types.
pub const BRIDGE_NAMESPACE: &str = "io.avrobridge";
pub const UNION_STRUCT_NAME: &str = "io.avrobridge.Union";
pub const MAP_ENTRY_NAME: &str = "io.avrobridge.MapEntry";
pub const MAP_ENTRY_KEY: &str = "key";
pub const MAP_ENTRY_VALUE: &str = "value";

/// Whether `schema` is a synthesized union struct: named exactly
/// [`UNION_STRUCT_NAME`], or that name followed by a `.` path or `_n` suffix.
pub fn is_union_struct(schema: &ConnectSchema) -> bool {
    schema
        .name
        .as_deref()
        .is_some_and(|name| match name.strip_prefix(UNION_STRUCT_NAME) {
            Some("") => true,
            Some(rest) => rest.starts_with('.') || is_numeric_suffix(rest),
            None => false,
        })
}

fn is_numeric_suffix(rest: &str) -> bool {
    rest.strip_prefix('_')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

pub fn is_map_entry_name(fullname: &str) -> bool {
    fullname.starts_with(MAP_ENTRY_NAME)
}

/// One member of a union struct's Avro union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionMember {
    Null,
    /// Index of the union struct field holding this member
    Field(usize),
}

/// Avro member order of a union struct.
///
/// Without a recorded order, `null` comes first (when the struct is optional)
/// followed by the fields in order.
pub fn union_layout(schema: &ConnectSchema) -> Result<Vec<UnionMember>> {
    let fields = schema.fields();
    let layout = match schema.parameter(UNION_MEMBERS) {
        Some(text) => {
            let members: Vec<JsonValue> = serde_json::from_str(text).map_err(|e| {
                ConversionError::UnsupportedSchemaKind(format!("invalid {UNION_MEMBERS}: {e}"))
            })?;
            members
                .iter()
                .map(|member| match member {
                    JsonValue::Null => Ok(UnionMember::Null),
                    JsonValue::String(name) => fields
                        .iter()
                        .position(|f| f.name == *name)
                        .map(UnionMember::Field)
                        .ok_or_else(|| {
                            ConversionError::UnsupportedSchemaKind(format!(
                                "{UNION_MEMBERS} names unknown field '{name}'"
                            ))
                        }),
                    other => Err(ConversionError::UnsupportedSchemaKind(format!(
                        "invalid {UNION_MEMBERS} entry {other}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?
        }
        None => {
            let mut layout = Vec::with_capacity(fields.len() + 1);
            if schema.optional {
                layout.push(UnionMember::Null);
            }
            layout.extend((0..fields.len()).map(UnionMember::Field));
            layout
        }
    };

    let nulls = layout.iter().filter(|m| **m == UnionMember::Null).count();
    let covers_fields = (0..fields.len()).all(|i| layout.contains(&UnionMember::Field(i)));
    if nulls > 1 || layout.len() != fields.len() + nulls || !covers_fields {
        return Err(ConversionError::UnsupportedSchemaKind(format!(
            "union struct {} does not list each member exactly once",
            schema.name.as_deref().unwrap_or("<anonymous>")
        )));
    }
    Ok(layout)
}

/// Serialize a union layout for [`UNION_MEMBERS`].
pub fn layout_param(members: &[Option<&str>]) -> String {
    JsonValue::Array(
        members
            .iter()
            .map(|m| m.map_or(JsonValue::Null, |name| JsonValue::String(name.to_string())))
            .collect(),
    )
    .to_string()
}

/// Parse a JSON-valued parameter, falling back to a plain string.
pub fn json_param(text: &str) -> JsonValue {
    serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use connect_core::{Field, SchemaBuilder};

    fn union_struct(optional: bool, members: Option<&str>) -> ConnectSchema {
        let string = SchemaBuilder::string().optional().build().unwrap();
        let int = SchemaBuilder::int32().optional().build().unwrap();
        let mut builder = SchemaBuilder::struct_()
            .name(UNION_STRUCT_NAME)
            .field(Field::new("string", string))
            .field(Field::new("int", int));
        if optional {
            builder = builder.optional();
        }
        if let Some(members) = members {
            builder = builder.parameter(UNION_MEMBERS, members);
        }
        (*builder.build().unwrap()).clone()
    }

    #[test]
    fn test_default_layout_puts_null_first() {
        let layout = union_layout(&union_struct(true, None)).unwrap();
        assert_eq!(
            layout,
            vec![UnionMember::Null, UnionMember::Field(0), UnionMember::Field(1)]
        );
    }

    #[test]
    fn test_recorded_layout_is_followed() {
        let param = layout_param(&[Some("int"), None, Some("string")]);
        let layout = union_layout(&union_struct(true, Some(&param))).unwrap();
        assert_eq!(
            layout,
            vec![UnionMember::Field(1), UnionMember::Null, UnionMember::Field(0)]
        );
    }

    #[test]
    fn test_incomplete_layout_is_rejected() {
        assert!(union_layout(&union_struct(false, Some(r#"["int"]"#))).is_err());
        assert!(union_layout(&union_struct(false, Some(r#"["int","int","string"]"#))).is_err());
        assert!(union_layout(&union_struct(false, Some(r#"["nope","int"]"#))).is_err());
    }

    #[test]
    fn test_union_struct_detection() {
        assert!(is_union_struct(&union_struct(false, None)));
        let plain = SchemaBuilder::struct_().name("P").build().unwrap();
        assert!(!is_union_struct(&plain));

        let named = |name: &str| SchemaBuilder::struct_().name(name).build().unwrap();
        assert!(is_union_struct(&named("io.avrobridge.Union.R.u")));
        assert!(is_union_struct(&named("io.avrobridge.Union_2")));
        assert!(!is_union_struct(&named("io.avrobridge.UnionFoo")));
        assert!(!is_union_struct(&named("io.avrobridge.Union_x")));
    }
}
