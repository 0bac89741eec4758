/// Runtime registry of statements, caches and mappers
///
/// A [`Configuration`] is assembled once, then shared read-only by every session a
/// [`SqlSessionFactory`](crate::session::SqlSessionFactory) opens. Statements and caches
/// must be registered before the mapper interfaces that use them: registering an
/// interface resolves all of its methods against the statements known at that moment.
use crate::binding::interface::MapperInterface;
use crate::binding::registry::{MapperRegistry, MapperTable};
use crate::cache::{CacheKey, CachedRows, LoggingCache, LruCache, PerpetualCache, SharedResultCache};
use crate::config::Settings;
use crate::error::{MapperError, Result};
use crate::mapping::MappedStatement;
use crate::reflection::{DefaultObjectFactory, ObjectFactory};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Lookup of registered statements by qualified id.
pub trait StatementRegistry {
    fn has_statement(&self, id: &str) -> bool;

    fn get_statement(&self, id: &str) -> Option<Arc<MappedStatement>>;
}

pub struct Configuration {
    settings: Settings,
    statements: HashMap<String, Arc<MappedStatement>>,
    caches: HashMap<String, SharedResultCache>,
    object_factory: Arc<dyn ObjectFactory>,
    mappers: MapperRegistry,
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("settings", &self.settings)
            .field("statements", &self.statements.len())
            .field("caches", &self.caches.len())
            .field("mappers", &self.mappers.names())
            .finish()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::new(Settings::default())
    }
}

impl Configuration {
    pub fn new(settings: Settings) -> Self {
        Configuration {
            settings,
            statements: HashMap::new(),
            caches: HashMap::new(),
            object_factory: Arc::new(DefaultObjectFactory),
            mappers: MapperRegistry::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn add_statement(&mut self, statement: MappedStatement) -> Result<()> {
        if self.statements.contains_key(statement.id()) {
            return Err(MapperError::configuration(format!(
                "mapped statements collection already contains value for {}",
                statement.id()
            )));
        }
        debug!(statement = statement.id(), command = ?statement.command_type(), "Registered statement");
        self.statements
            .insert(statement.id().to_string(), Arc::new(statement));
        Ok(())
    }

    pub fn statement(&self, id: &str) -> Result<Arc<MappedStatement>> {
        self.statements.get(id).cloned().ok_or_else(|| {
            MapperError::configuration(format!(
                "mapped statements collection does not contain value for {id}"
            ))
        })
    }

    pub fn statement_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.statements.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Build and register the result cache of `namespace`.
    ///
    /// `size` caps the number of cached queries; `None` uses the configured default.
    pub fn add_cache(&mut self, namespace: &str, size: Option<usize>) -> Result<SharedResultCache> {
        if self.caches.contains_key(namespace) {
            return Err(MapperError::configuration(format!(
                "caches collection already contains value for {namespace}"
            )));
        }
        let capacity = size.unwrap_or(self.settings.cache.default_size);
        if capacity == 0 {
            return Err(MapperError::configuration(format!(
                "cache for namespace '{namespace}' needs a capacity of at least one"
            )));
        }
        let cache = SharedResultCache::new(LoggingCache::new(LruCache::with_capacity(
            PerpetualCache::<CacheKey, CachedRows>::new(namespace),
            capacity,
        )));
        debug!(namespace, capacity, "Registered result cache");
        self.caches.insert(namespace.to_string(), cache.clone());
        Ok(cache)
    }

    pub fn cache(&self, namespace: &str) -> Option<SharedResultCache> {
        self.caches.get(namespace).cloned()
    }

    /// The cache of another namespace, for statements sharing it.
    pub fn resolve_cache_ref(&self, namespace: &str) -> Result<SharedResultCache> {
        self.cache(namespace).ok_or_else(|| {
            MapperError::configuration(format!(
                "No cache for namespace '{namespace}' could be found."
            ))
        })
    }

    pub fn object_factory(&self) -> &dyn ObjectFactory {
        self.object_factory.as_ref()
    }

    /// Replace the factory. Affects interfaces registered afterwards.
    pub fn set_object_factory(&mut self, factory: impl ObjectFactory + 'static) {
        self.object_factory = Arc::new(factory);
    }

    /// Register `interface` and resolve every method visible through it.
    ///
    /// Method-level failures do not fail registration; they are reported when the
    /// method is called.
    pub fn add_mapper(&mut self, interface: Arc<MapperInterface>) -> Result<()> {
        if self.mappers.has_mapper(interface.name()) {
            return Err(MapperError::configuration(format!(
                "type {} is already known to the mapper registry",
                interface.name()
            )));
        }
        let table = MapperTable::build(interface, self);
        self.mappers.insert(table)
    }

    pub fn has_mapper(&self, name: &str) -> bool {
        self.mappers.has_mapper(name)
    }

    pub fn mapper(&self, name: &str) -> Result<Arc<MapperTable>> {
        self.mappers.table(name)
    }

    pub fn mapper_registry(&self) -> &MapperRegistry {
        &self.mappers
    }
}

impl StatementRegistry for Configuration {
    fn has_statement(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    fn get_statement(&self, id: &str) -> Option<Arc<MappedStatement>> {
        self.statements.get(id).cloned()
    }
}
