//! Names of synthesized types and union member fields.
//!
//! A resolver lives for one top-level translation call and is never shared.

use crate::error::{ConversionError, Result};
use crate::params::{MAP_ENTRY_NAME, UNION_STRUCT_NAME};
use avro_schema::{is_valid_identifier, Name, Schema};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct NamingResolver {
    used: HashSet<String>,
}

impl NamingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the struct standing for a union at `path`.
    ///
    /// The path is the enclosing record's simple name followed by the field
    /// names (and `items`/`values` steps) leading to the union, so the same
    /// union position always yields the same name.
    pub fn union_struct_name(&mut self, path: &[String]) -> String {
        let mut base = UNION_STRUCT_NAME.to_string();
        for segment in path {
            base.push('.');
            base.push_str(segment);
        }
        self.claim(base)
    }

    /// Name of a synthesized key/value record for a non-string-keyed map.
    pub fn map_entry_name(&mut self) -> String {
        self.claim(MAP_ENTRY_NAME.to_string())
    }

    fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Field names of a union struct, one per non-null member in order.
///
/// Named members use their simple name in lowerCamel case, other members the
/// type keyword. A clash falls back to the full name with dots replaced,
/// then to a numeric suffix.
pub fn member_field_names(variants: &[Schema]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(variants.len());
    for variant in variants.iter().filter(|v| !v.is_null()) {
        let base = match variant.name() {
            Some(name) => lower_camel(&name.name),
            None => variant.type_name().to_string(),
        };
        let mut candidate = base.clone();
        if used.contains(&candidate) {
            if let Some(name) = variant.name() {
                candidate = name.fullname().replace('.', "_");
            }
        }
        let mut n = 2;
        while used.contains(&candidate) {
            candidate = format!("{base}_{n}");
            n += 1;
        }
        used.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Turn an arbitrary Connect schema name into a valid Avro name.
///
/// Each dotted component has invalid characters replaced with `_` and is
/// prefixed with `_` when it would start with a digit.
pub fn scrub_name(name: &str) -> Result<Name> {
    if name.trim().is_empty() {
        return Err(ConversionError::MissingRequiredName(
            "empty schema name".to_string(),
        ));
    }
    let components: Vec<String> = name.split('.').map(scrub_component).collect();
    let scrubbed = Name::new(&components.join("."));
    scrubbed.validate()?;
    Ok(scrubbed)
}

fn scrub_component(component: &str) -> String {
    if is_valid_identifier(component) {
        return component.to_string();
    }
    let mut out: String = component
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !out.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}
