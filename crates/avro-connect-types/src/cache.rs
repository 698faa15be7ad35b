//! Size-bounded LRU memoization of schema translations.
//!
//! Lookups and inserts are serialized by one short-held mutex; translations
//! run outside it. Two callers missing on the same key may both translate,
//! and the first insert wins.

use crate::config::FidelityFlags;
use crate::error::{ConversionError, Result};
use avro_schema::Schema;
use connect_core::SchemaRef;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

struct LruTable<K, V> {
    entries: HashMap<K, (V, u64)>,
    /// Last-use tick → key, oldest first
    order: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V: Clone> LruTable<K, V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn get(&mut self, key: &K) -> Result<Option<V>> {
        let tick = self.next_tick();
        let Some((value, last_used)) = self.entries.get_mut(key) else {
            return Ok(None);
        };
        let previous = std::mem::replace(last_used, tick);
        let value = value.clone();
        if self.order.remove(&previous).is_none() {
            return Err(ConversionError::CacheCorruption(format!(
                "entry used at tick {previous} missing from recency order"
            )));
        }
        self.order.insert(tick, key.clone());
        Ok(Some(value))
    }

    /// Insert unless present; returns the value now cached.
    fn insert(&mut self, key: K, value: V, capacity: usize) -> Result<V> {
        if let Some(existing) = self.get(&key)? {
            return Ok(existing);
        }
        while self.entries.len() >= capacity {
            self.evict_oldest()?;
        }
        let tick = self.next_tick();
        self.order.insert(tick, key.clone());
        self.entries.insert(key, (value.clone(), tick));
        Ok(value)
    }

    fn evict_oldest(&mut self) -> Result<()> {
        let Some((tick, key)) = self.order.pop_first() else {
            return Err(ConversionError::CacheCorruption(format!(
                "{} entries but empty recency order",
                self.entries.len()
            )));
        };
        match self.entries.remove(&key) {
            Some((_, last_used)) if last_used == tick => Ok(()),
            _ => Err(ConversionError::CacheCorruption(format!(
                "recency order entry at tick {tick} does not match the table"
            ))),
        }
    }
}

/// Thread-safe LRU cache of translated schemas.
pub struct SchemaCache<K, V> {
    capacity: usize,
    table: Mutex<LruTable<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> SchemaCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            table: Mutex::new(LruTable::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &K) -> Result<Option<V>> {
        if self.capacity == 0 {
            return Ok(None);
        }
        self.table.lock().get(key)
    }

    /// Cache `value` unless another caller got there first; returns the winner.
    pub fn insert(&self, key: K, value: V) -> Result<V> {
        if self.capacity == 0 {
            return Ok(value);
        }
        self.table.lock().insert(key, value, self.capacity)
    }

    /// Return the cached value or compute, cache and return it.
    pub fn get_or_try_insert_with<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(hit) = self.get(&key)? {
            debug!("Schema cache hit");
            return Ok(hit);
        }
        debug!("Schema cache miss");
        let value = compute()?;
        self.insert(key, value)
    }

    pub fn clear(&self) {
        let mut table = self.table.lock();
        table.entries.clear();
        table.order.clear();
    }
}

/// Cache key for Avro → Connect translations.
///
/// Named and complex schemas compare by node identity; the key holds a clone
/// of the schema so the node cannot be freed and its address reused while
/// cached. Primitives and references compare by value.
#[derive(Debug, Clone)]
pub struct AvroSchemaKey {
    schema: Schema,
    flags: FidelityFlags,
}

impl AvroSchemaKey {
    pub fn new(schema: &Schema, flags: FidelityFlags) -> Self {
        Self {
            schema: schema.clone(),
            flags,
        }
    }
}

impl PartialEq for AvroSchemaKey {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags && self.schema.same_node(&other.schema)
    }
}

impl Eq for AvroSchemaKey {}

impl Hash for AvroSchemaKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flags.hash(state);
        match self.schema.identity() {
            Some(ptr) => ptr.hash(state),
            None => {
                self.schema.type_name().hash(state);
                if let Some(name) = self.schema.name() {
                    name.hash(state);
                }
            }
        }
    }
}

/// Cache key for Connect → Avro translations.
///
/// Primitive schemas compare by value, everything else by `Arc` identity.
#[derive(Debug, Clone)]
pub struct ConnectSchemaKey {
    schema: SchemaRef,
    flags: FidelityFlags,
}

impl ConnectSchemaKey {
    pub fn new(schema: &SchemaRef, flags: FidelityFlags) -> Self {
        Self {
            schema: schema.clone(),
            flags,
        }
    }

    fn by_value(&self) -> bool {
        self.schema.kind.is_primitive()
    }
}

impl PartialEq for ConnectSchemaKey {
    fn eq(&self, other: &Self) -> bool {
        if self.flags != other.flags {
            return false;
        }
        match (self.by_value(), other.by_value()) {
            (true, true) => self.schema == other.schema,
            (false, false) => Arc::ptr_eq(&self.schema, &other.schema),
            _ => false,
        }
    }
}

impl Eq for ConnectSchemaKey {}

impl Hash for ConnectSchemaKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flags.hash(state);
        if self.by_value() {
            self.schema.type_name().hash(state);
            self.schema.name.hash(state);
        } else {
            (Arc::as_ptr(&self.schema) as usize).hash(state);
        }
    }
}
