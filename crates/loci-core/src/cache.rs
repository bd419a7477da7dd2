//! Advisory per-value-type cache.
//!
//! Callers compute derived values for a resource (content length, digest,
//! parsed content) and store them here keyed by the value type and the
//! resource identity. The cache can be cleared at any moment; a concurrent
//! lookup then misses and recomputes.

use crate::resource::ResourceKey;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type CachedValue = Arc<dyn Any + Send + Sync>;

/// Concurrent cache of values computed from resources.
#[derive(Default)]
pub struct ResourceCache {
    entries: DashMap<(TypeId, ResourceKey), CachedValue>,
}

impl ResourceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value of type `T` for `key`.
    pub fn get<T>(&self, key: &ResourceKey) -> Option<T>
    where
        T: Any + Clone + Send + Sync,
    {
        let entry = self.entries.get(&(TypeId::of::<T>(), key.clone()))?;
        entry.value().downcast_ref::<T>().cloned()
    }

    /// Store a value of type `T` for `key`, replacing any previous one.
    pub fn insert<T>(&self, key: ResourceKey, value: T)
    where
        T: Any + Clone + Send + Sync,
    {
        self.entries.insert((TypeId::of::<T>(), key), Arc::new(value));
    }

    /// The cached value for `key`, computing and storing it on a miss.
    ///
    /// The computation runs without any lock held. Two concurrent misses
    /// may both compute; the last one stored wins. Errors are not cached.
    pub fn get_or_try_insert_with<T, E>(
        &self,
        key: &ResourceKey,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        T: Any + Clone + Send + Sync,
    {
        if let Some(value) = self.get::<T>(key) {
            trace!(resource = key.description(), "Cache hit");
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key.clone(), value.clone());
        Ok(value)
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every cached value of type `T`.
    pub fn clear_type<T: Any>(&self) {
        let type_id = TypeId::of::<T>();
        self.entries.retain(|(kind, _), _| *kind != type_id);
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
