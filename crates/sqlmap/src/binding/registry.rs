/// Registered mapper interfaces and their method tables
///
/// Registering an interface walks every method visible through it, inheritance
/// included, and resolves each one up front. The resulting [`MapperTable`] is immutable;
/// a method whose resolution or analysis failed keeps its error, and every call to it
/// reports that same error.
use crate::binding::interface::MapperInterface;
use crate::binding::method::{MapperMethod, MapperResult};
use crate::binding::signature::Argument;
use crate::configuration::Configuration;
use crate::error::{MapperError, Result};
use crate::session::SqlSession;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Resolved methods of one interface.
#[derive(Debug)]
pub struct MapperTable {
    interface: Arc<MapperInterface>,
    methods: HashMap<String, Result<Arc<MapperMethod>>>,
}

impl MapperTable {
    /// Resolve every method visible through `interface` against `configuration`.
    pub fn build(interface: Arc<MapperInterface>, configuration: &Configuration) -> Self {
        let methods: HashMap<_, _> = interface
            .visible_methods()
            .into_iter()
            .map(|visible| {
                let method = MapperMethod::new(&interface, &visible, configuration).map(Arc::new);
                if let Err(e) = &method {
                    debug!(
                        mapper = interface.name(),
                        method = visible.decl.name(),
                        error = %e,
                        "Mapper method failed to resolve"
                    );
                }
                (visible.decl.name().to_string(), method)
            })
            .collect();
        MapperTable { interface, methods }
    }

    pub fn interface(&self) -> &Arc<MapperInterface> {
        &self.interface
    }

    /// The resolved method, or the error its resolution produced.
    pub fn method(&self, name: &str) -> Result<Arc<MapperMethod>> {
        match self.methods.get(name) {
            Some(Ok(method)) => Ok(Arc::clone(method)),
            Some(Err(e)) => Err(e.clone()),
            None => Err(MapperError::configuration(format!(
                "{} has no method named '{name}'",
                self.interface.name()
            ))),
        }
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Interface name to method table.
#[derive(Debug, Default)]
pub struct MapperRegistry {
    tables: HashMap<String, Arc<MapperTable>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_mapper(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Add an already built table. An interface can be registered once.
    pub fn insert(&mut self, table: MapperTable) -> Result<()> {
        let name = table.interface().name().to_string();
        if self.tables.contains_key(&name) {
            return Err(MapperError::configuration(format!(
                "type {name} is already known to the mapper registry"
            )));
        }
        self.tables.insert(name, Arc::new(table));
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<Arc<MapperTable>> {
        self.tables.get(name).cloned().ok_or_else(|| {
            MapperError::configuration(format!("type {name} is not known to the mapper registry"))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A registered interface bound to one session.
pub struct MapperProxy<'s> {
    session: &'s mut SqlSession,
    table: Arc<MapperTable>,
}

impl<'s> MapperProxy<'s> {
    pub fn new(session: &'s mut SqlSession, table: Arc<MapperTable>) -> Self {
        MapperProxy { session, table }
    }

    pub fn interface(&self) -> &MapperInterface {
        self.table.interface()
    }

    /// Call `method` with `args` in declaration order.
    pub fn invoke(&mut self, method: &str, args: Vec<Argument<'_>>) -> Result<MapperResult> {
        let mapper_method = self.table.method(method)?;
        mapper_method.execute(self.session, args)
    }
}
