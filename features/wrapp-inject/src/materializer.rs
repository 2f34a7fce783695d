use crate::{
    dependency_graph::DependencyEntry,
    types::{DynValue, Injectable, SharedValue, TypeInfo},
};

/// A fresh copy of a dependency, owned by a single invocation
pub struct Materialized {
    info: TypeInfo,
    value: Box<dyn DynValue>,
}
impl Materialized {
    pub fn info(&self) -> TypeInfo {
        self.info
    }

    pub fn downcast_ref<T: Injectable>(&self) -> Option<&T> {
        <dyn DynValue as DynValue>::as_any(&*self.value).downcast_ref()
    }

    pub fn downcast_mut<T: Injectable>(&mut self) -> Option<&mut T> {
        <dyn DynValue as DynValue>::as_any_mut(&mut *self.value).downcast_mut()
    }

    /// Takes the value out, returning the actual type name on mismatch
    pub fn downcast<T: Injectable>(self) -> Result<T, &'static str> {
        match <dyn DynValue as DynValue>::into_any(self.value).downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(self.info.type_name),
        }
    }

    pub(crate) fn value_mut(&mut self) -> &mut dyn DynValue {
        &mut *self.value
    }

    pub(crate) fn replace(&mut self, value: Box<dyn DynValue>) {
        self.value = value;
    }

    pub(crate) fn into_shared(self) -> SharedValue {
        <dyn DynValue as DynValue>::into_shared(self.value)
    }
}
impl std::fmt::Debug for Materialized {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Materialized").field(&self.info.type_name).finish()
    }
}

impl DependencyEntry {
    /// Copies the template into a new, independently owned value
    ///
    /// The template is never mutated and the initializer is not run.
    pub fn materialize(&self) -> Materialized {
        tracing::trace!("Materializing {}", self.info());
        Materialized {
            info: self.info(),
            value: self.template().copy_value(),
        }
    }
}
