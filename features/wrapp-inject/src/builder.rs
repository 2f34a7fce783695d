use std::sync::Arc;

use crate::{
    container::Injector,
    errors::PoolError,
    pool::MemoryPool,
    registry::{Component, ComponentBuilder, TypeRegistry},
    types::{DynValue, Injectable, TypeInfo},
};

/// Collects the type registry and the initial resource pool members.
///
/// ```ignore
/// let injector = Injector::builder()
///     .interface::<dyn Greeter>()
///     .component_with::<English>(|c| c.implements::<dyn Greeter>(|e| e as Arc<dyn Greeter>))
///     .component::<Settings>()
///     .add_instance(English::default())
///     .build()?;
/// ```
pub struct InjectorBuilder {
    registry: TypeRegistry,
    /// Canonical values, added to the pool once the registry is complete
    instances: Vec<(TypeInfo, Box<dyn DynValue>)>,
}
impl Default for InjectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectorBuilder {
    pub fn new() -> Self {
        InjectorBuilder {
            registry: TypeRegistry::new(),
            instances: Vec::new(),
        }
    }
}
impl InjectorBuilder {
    pub fn component<T: Component>(mut self) -> Self {
        self.registry = self.registry.component::<T>();
        self
    }

    pub fn component_with<T: Component>(
        mut self,
        configure: impl FnOnce(ComponentBuilder<T>) -> ComponentBuilder<T>,
    ) -> Self {
        self.registry = self.registry.component_with::<T>(configure);
        self
    }

    pub fn collection<T: Clone + Send + Sync + 'static>(mut self) -> Self {
        self.registry = self.registry.collection::<T>();
        self
    }

    pub fn interface<I: ?Sized + 'static>(mut self) -> Self {
        self.registry = self.registry.interface::<I>();
        self
    }

    pub fn context<T: ?Sized + 'static>(mut self) -> Self {
        self.registry = self.registry.context::<T>();
        self
    }

    /// Adds a canonical value to the resource pool
    pub fn add_instance<T: Injectable + Clone>(mut self, instance: T) -> Self {
        self.instances
            .push((TypeInfo::of::<T>(), Box::new(instance) as Box<dyn DynValue>));
        self
    }

    /// Builds an injector backed by a [`MemoryPool`]
    ///
    /// Fails if an instance was added for an unregistered type, or twice.
    pub fn build(self) -> Result<Injector, PoolError> {
        let InjectorBuilder {
            registry,
            instances,
        } = self;

        tracing::debug!("Building injector with {} pool instances", instances.len());

        let registry = Arc::new(registry);
        let pool = MemoryPool::new(registry.clone());
        for (info, instance) in instances {
            pool.add_erased(info, instance)?;
        }

        Ok(Injector::new(registry, Arc::new(pool)))
    }
}
