//! Cached schema resolution.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

use super::config::Mappings;
use super::convention::Conventions;
use super::resolver::resolve;
use super::type_info::{TypeInfo, TypeKey};
use super::TypeSchema;
use crate::error::SchemaError;
use crate::record::Record;

static SHARED: LazyLock<SchemaFactory> = LazyLock::new(SchemaFactory::new);

/// Resolves and caches [`TypeSchema`]s for one configuration.
///
/// Several factories with different conventions or mappings can coexist;
/// each owns its own cache. Lookups take a read lock only; a miss resolves
/// outside the lock and the first schema inserted for a key wins.
#[derive(Debug, Default)]
pub struct SchemaFactory {
    conventions: Conventions,
    mappings: Arc<Mappings>,
    cache: RwLock<HashMap<TypeKey, Arc<TypeSchema>>>,
}

impl SchemaFactory {
    /// Creates a factory with default conventions and no mappings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default factory. It is never reconfigured.
    #[must_use]
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// Replaces the naming conventions.
    #[must_use]
    pub fn with_conventions(mut self, conventions: Conventions) -> Self {
        self.conventions = conventions;
        self.cache.get_mut().clear();
        self
    }

    /// Replaces the explicit mappings.
    #[must_use]
    pub fn with_mappings(mut self, mappings: impl Into<Arc<Mappings>>) -> Self {
        self.mappings = mappings.into();
        self.cache.get_mut().clear();
        self
    }

    #[must_use]
    pub const fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    #[must_use]
    pub fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    /// Returns the schema of the record type `T`.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaError`] raised by resolution on a cache miss.
    pub fn schema<T: Record>(&self) -> Result<Arc<TypeSchema>, SchemaError> {
        if let Some(hit) = self.cached(&TypeKey::Static(TypeId::of::<T>())) {
            return Ok(hit);
        }
        self.schema_for(&T::type_info())
    }

    /// Returns the schema described by `info`.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaError`] raised by resolution on a cache miss.
    pub fn schema_for(&self, info: &TypeInfo) -> Result<Arc<TypeSchema>, SchemaError> {
        if let Some(hit) = self.cached(info.key()) {
            return Ok(hit);
        }

        debug!(type_name = info.name(), "schema cache miss");
        let resolved = Arc::new(resolve(info, &self.conventions, &self.mappings)?);
        let mut cache = self.cache.write();
        Ok(Arc::clone(
            cache.entry(info.key().clone()).or_insert(resolved),
        ))
    }

    /// Returns the map-backed schema registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns the [`SchemaError`] raised by resolution on a cache miss.
    pub fn dynamic_schema(&self, name: &str) -> Result<Arc<TypeSchema>, SchemaError> {
        self.schema_for(&TypeInfo::dynamic(name))
    }

    /// Drops every cached schema.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        debug!(entries = cache.len(), "invalidating schema cache");
        cache.clear();
    }

    /// Number of cached schemas.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn cached(&self, key: &TypeKey) -> Option<Arc<TypeSchema>> {
        self.cache.read().get(key).cloned()
    }
}
