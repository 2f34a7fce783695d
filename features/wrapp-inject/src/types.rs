use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use crate::registry::TypeDescriptor;

/// All errors must be Send + Sync so they can cross request threads
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Type erased value shared with handlers
pub type SharedValue = Arc<dyn Any + Send + Sync + 'static>;

/// We assume that handlers are served on a multithreaded runtime
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// A value which can be copied without knowing its concrete type.
///
/// Implemented for every `Clone` injectable. Call the methods through
/// `<dyn DynValue as DynValue>` so the blanket impl is never picked for a reference.
pub trait DynValue: Any + Send + Sync {
    fn clone_boxed(&self) -> Box<dyn DynValue>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
    fn into_shared(self: Box<Self>) -> SharedValue;
}
impl<T: Clone + Send + Sync + 'static> DynValue for T {
    fn clone_boxed(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn into_shared(self: Box<Self>) -> SharedValue {
        Arc::new(*self)
    }
}

/// Canonical, pre-initialization state of a dependency
///
/// Carries the descriptor of its concrete type, so copies can be made
/// and capabilities looked up without going back to the registry.
pub struct Template {
    descriptor: Arc<TypeDescriptor>,
    value: Box<dyn DynValue>,
}
impl Template {
    pub(crate) fn new(descriptor: Arc<TypeDescriptor>, value: Box<dyn DynValue>) -> Self {
        Template { descriptor, value }
    }

    /// The concrete type held by this template
    pub fn info(&self) -> TypeInfo {
        self.descriptor.info()
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn downcast_ref<T: Injectable>(&self) -> Option<&T> {
        <dyn DynValue as DynValue>::as_any(&*self.value).downcast_ref()
    }

    /// Copies the template value into a new allocation
    pub(crate) fn copy_value(&self) -> Box<dyn DynValue> {
        <dyn DynValue as DynValue>::clone_boxed(&*self.value)
    }
}
impl Clone for Template {
    fn clone(&self) -> Self {
        Template {
            descriptor: self.descriptor.clone(),
            value: self.copy_value(),
        }
    }
}
impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Template").field(&self.info().type_name).finish()
    }
}

/// Prepared value of a dependency, as handed to a handler
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: SharedValue,
}

impl Instance {
    pub(crate) fn new(info: TypeInfo, instance: SharedValue) -> Self {
        Instance { info, instance }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Interface instances are stored as `Arc<dyn Trait>` inside the shared value
    pub fn as_interface<I: ?Sized + Injectable>(&self) -> Result<Arc<I>, &'static str> {
        self.instance
            .downcast_ref::<Arc<I>>()
            .cloned()
            .ok_or(self.info.type_name)
    }
}
impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
