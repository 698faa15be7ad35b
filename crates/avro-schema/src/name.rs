//! Namespace-qualified names for record, enum and fixed types.

use crate::error::{AvroSchemaError, Result};
use std::fmt;

/// A named type's name, split into simple name and optional namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    /// Simple name (no dots)
    pub name: String,
    /// Dotted namespace, `None` for the null namespace
    pub namespace: Option<String>,
}

impl Name {
    /// Build a name from a possibly dotted full name.
    ///
    /// `"a.b.Rec"` yields namespace `a.b` and simple name `Rec`.
    pub fn new(fullname: &str) -> Self {
        match fullname.rsplit_once('.') {
            Some((namespace, name)) => Self {
                name: name.to_string(),
                namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
            },
            None => Self {
                name: fullname.to_string(),
                namespace: None,
            },
        }
    }

    /// Resolve a name the way schema text does.
    ///
    /// A dotted name carries its own namespace. Otherwise the explicit
    /// namespace wins, then the enclosing one.
    pub fn resolve(
        name: &str,
        namespace: Option<&str>,
        enclosing_namespace: Option<&str>,
    ) -> Result<Self> {
        let resolved = if name.contains('.') {
            Self::new(name)
        } else {
            let namespace = namespace.or(enclosing_namespace).filter(|ns| !ns.is_empty());
            Self {
                name: name.to_string(),
                namespace: namespace.map(str::to_string),
            }
        };
        resolved.validate()?;
        Ok(resolved)
    }

    /// Full dotted name.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Check every component against the Avro identifier grammar.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_identifier(&self.name) {
            return Err(AvroSchemaError::InvalidName(self.fullname()));
        }
        if let Some(namespace) = &self.namespace {
            if !namespace.split('.').all(is_valid_identifier) {
                return Err(AvroSchemaError::InvalidName(self.fullname()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
