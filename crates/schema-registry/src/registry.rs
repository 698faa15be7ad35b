//! Schema registry interface and an in-memory implementation.

use crate::error::{RegistryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Registry of Avro schema texts, addressed by schema version id.
///
/// Implementations:
/// - In-memory (`InMemorySchemaRegistry`)
///
/// A remote registry client plugs in behind the same trait.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Register `definition` under `subject` and return its version id.
    ///
    /// Registering the same definition under the same subject again returns
    /// the id assigned the first time.
    async fn register_schema(&self, subject: &str, definition: &str) -> Result<Uuid>;

    /// Look up the schema text registered under `id`.
    async fn resolve_schema(&self, id: Uuid) -> Result<String>;
}

/// One registered schema version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredSchema {
    pub id: Uuid,
    pub subject: String,
    pub definition: String,
}

#[derive(Default)]
struct Entries {
    by_id: HashMap<Uuid, RegisteredSchema>,
    by_subject: HashMap<(String, String), Uuid>,
}

/// Registry held in process memory. Ids are random v4 UUIDs.
#[derive(Default)]
pub struct InMemorySchemaRegistry {
    entries: RwLock<Entries>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `definition` under a known id, e.g. one read from existing frames.
    ///
    /// Fails if `id` already names a different schema.
    pub async fn register_with_id(&self, id: Uuid, subject: &str, definition: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.by_id.get(&id) {
            if existing.subject == subject && existing.definition == definition {
                return Ok(());
            }
            return Err(RegistryError::InvalidConfig(format!(
                "schema id {id} is already registered under subject '{}'",
                existing.subject
            )));
        }
        entries.insert(RegisteredSchema {
            id,
            subject: subject.to_string(),
            definition: definition.to_string(),
        });
        Ok(())
    }

    /// All versions registered under `subject`, in no particular order.
    pub async fn versions(&self, subject: &str) -> Vec<RegisteredSchema> {
        let entries = self.entries.read().await;
        entries
            .by_id
            .values()
            .filter(|s| s.subject == subject)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Entries {
    fn insert(&mut self, schema: RegisteredSchema) {
        self.by_subject
            .insert((schema.subject.clone(), schema.definition.clone()), schema.id);
        self.by_id.insert(schema.id, schema);
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    async fn register_schema(&self, subject: &str, definition: &str) -> Result<Uuid> {
        let key = (subject.to_string(), definition.to_string());
        if let Some(id) = self.entries.read().await.by_subject.get(&key) {
            return Ok(*id);
        }

        let mut entries = self.entries.write().await;
        // Another writer may have registered it between the two locks.
        if let Some(id) = entries.by_subject.get(&key) {
            return Ok(*id);
        }
        let id = Uuid::new_v4();
        debug!("Registered schema {} under subject '{}'", id, subject);
        entries.insert(RegisteredSchema {
            id,
            subject: key.0,
            definition: key.1,
        });
        Ok(id)
    }

    async fn resolve_schema(&self, id: Uuid) -> Result<String> {
        self.entries
            .read()
            .await
            .by_id
            .get(&id)
            .map(|s| s.definition.clone())
            .ok_or(RegistryError::SchemaNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"{"type":"record","name":"R","fields":[]}"#;

    #[tokio::test]
    async fn test_register_is_idempotent_per_subject() {
        let registry = InMemorySchemaRegistry::new();
        let first = registry.register_schema("orders-value", SCHEMA).await.unwrap();
        let again = registry.register_schema("orders-value", SCHEMA).await.unwrap();
        let other = registry.register_schema("payments-value", SCHEMA).await.unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.versions("orders-value").await.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_returns_definition() {
        let registry = InMemorySchemaRegistry::new();
        let id = registry.register_schema("s", SCHEMA).await.unwrap();
        assert_eq!(registry.resolve_schema(id).await.unwrap(), SCHEMA);
    }

    #[tokio::test]
    async fn test_resolve_unknown_id() {
        let registry = InMemorySchemaRegistry::new();
        let result = registry.resolve_schema(Uuid::new_v4()).await;
        assert!(matches!(result, Err(RegistryError::SchemaNotFound(_))));
    }

    #[tokio::test]
    async fn test_register_with_known_id() {
        let registry = InMemorySchemaRegistry::new();
        let id = Uuid::new_v4();
        registry.register_with_id(id, "s", SCHEMA).await.unwrap();
        registry.register_with_id(id, "s", SCHEMA).await.unwrap();
        assert!(registry.register_with_id(id, "s", "\"int\"").await.is_err());
        assert_eq!(registry.register_schema("s", SCHEMA).await.unwrap(), id);
    }
}
