use std::{
    collections::{hash_map, HashMap},
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{
    builder::InjectorBuilder,
    dependency_graph::DependencyGraph,
    errors::RegisterError,
    pool::ResourcePool,
    registry::TypeRegistry,
    signature::Signature,
};

/// Builds and caches the dependency graphs of registered handlers
#[derive(Clone)]
pub struct Injector(pub Arc<InjectorInner>);
pub struct InjectorInner {
    registry: Arc<TypeRegistry>,
    pool: Arc<dyn ResourcePool>,
    handlers: RwLock<HashMap<&'static str, Arc<DependencyGraph>>>,
}
impl Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.0.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut map = f.debug_struct("Injector");
        for (name, graph) in handlers.iter() {
            map.field(name, graph);
        }
        map.finish()
    }
}

impl Injector {
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    /// Creates an injector resolving from a custom pool
    pub fn new(registry: Arc<TypeRegistry>, pool: Arc<dyn ResourcePool>) -> Self {
        Self(Arc::new(InjectorInner {
            registry,
            pool,
            handlers: RwLock::new(HashMap::new()),
        }))
    }

    /// Builds the dependency graph of a handler and stores it under the handler's name
    ///
    /// Registration is atomic: a handler whose graph fails to build is not stored.
    /// Graphs of different handlers may be built concurrently.
    pub fn register_handler(
        &self,
        signature: &Signature,
    ) -> Result<Arc<DependencyGraph>, RegisterError> {
        let name = signature.name();
        if self.graph(name).is_some() {
            return Err(RegisterError::DuplicateHandler(name));
        }

        let graph = match DependencyGraph::build(signature, &self.0.registry, self.0.pool.as_ref())
        {
            Ok(graph) => Arc::new(graph),
            Err(error) => {
                tracing::error!("Handler '{}' was not registered: {}", name, error);
                return Err(error.into());
            }
        };

        let mut handlers = self.0.handlers.write().unwrap_or_else(PoisonError::into_inner);
        match handlers.entry(name) {
            // Lost the race against a concurrent registration of the same name
            hash_map::Entry::Occupied(_) => Err(RegisterError::DuplicateHandler(name)),
            hash_map::Entry::Vacant(vacant) => {
                tracing::debug!(
                    "Registered handler '{}' with {} dependencies",
                    name,
                    graph.len()
                );
                Ok(vacant.insert(graph).clone())
            }
        }
    }

    /// The graph of a registered handler
    pub fn graph(&self, handler: &str) -> Option<Arc<DependencyGraph>> {
        self.0
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handler)
            .cloned()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.0.registry
    }

    pub fn pool(&self) -> &dyn ResourcePool {
        self.0.pool.as_ref()
    }
}
