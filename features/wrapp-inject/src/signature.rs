use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use crate::{
    errors::BuildError,
    registry::Component,
    types::{DynError, DynValue, Injectable, Instance, TypeInfo},
};

/// Declared parameter and return types of a handler or initializer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    name: &'static str,
    params: Vec<TypeInfo>,
    returns: Vec<TypeInfo>,
}
impl Signature {
    /// A free function, e.g. a request handler
    pub fn function(name: &'static str) -> Self {
        Signature {
            name,
            params: Vec::new(),
            returns: Vec::new(),
        }
    }

    /// A method - the receiver `R` becomes the first parameter
    pub fn method<R: ?Sized + 'static>(name: &'static str) -> Self {
        Signature {
            name,
            params: vec![TypeInfo::of::<R>()],
            returns: Vec::new(),
        }
    }

    pub fn param<T: ?Sized + 'static>(mut self) -> Self {
        self.params.push(TypeInfo::of::<T>());
        self
    }

    pub fn returns<T: ?Sized + 'static>(mut self) -> Self {
        self.returns.push(TypeInfo::of::<T>());
        self
    }

    /// Appends the error capability to the return types
    pub fn returns_error(self) -> Self {
        self.returns::<DynError>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    pub fn returns_types(&self) -> &[TypeInfo] {
        &self.returns
    }
}
impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params: Vec<_> = self.params.iter().map(|p| p.type_name).collect();
        let returns: Vec<_> = self.returns.iter().map(|r| r.type_name).collect();
        write!(f, "{}({}) -> ({})", self.name, params.join(", "), returns.join(", "))
    }
}

/// Checks the return shape of an initializer of `owner`
///
/// Accepted are: nothing, `owner`, an error, or `owner` followed by an error.
pub fn validate_initializer(owner: &TypeInfo, signature: &Signature) -> Result<(), BuildError> {
    let error = TypeInfo::of::<DynError>();
    let valid = match signature.returns_types() {
        [] => true,
        [only] => only == owner || *only == error,
        [first, second] => first == owner && *second == error,
        _ => false,
    };

    if valid {
        return Ok(());
    }

    Err(BuildError::InvalidInitializerSignature {
        method: signature.name(),
        owner: *owner,
        returns: signature.returns_types().to_vec(),
    })
}

type InitFn = Box<
    dyn Fn(&mut dyn Any, &Arguments) -> Result<Option<Box<dyn DynValue>>, DynError> + Send + Sync,
>;

/// Setup routine of a component, run on each materialized instance
pub struct Initializer {
    owner: TypeInfo,
    signature: Signature,
    run: InitFn,
}
impl Initializer {
    pub(crate) fn new<T, F>(signature: Signature, run: F) -> Self
    where
        T: Component,
        F: Fn(&mut T, &Arguments) -> Result<Option<T>, DynError> + Send + Sync + 'static,
    {
        let erased = move |receiver: &mut dyn Any,
                        arguments: &Arguments|
              -> Result<Option<Box<dyn DynValue>>, DynError> {
            let receiver = receiver.downcast_mut::<T>().ok_or_else(|| {
                DynError::from(format!("initializer receiver is not '{}'", type_name::<T>()))
            })?;
            let replacement = run(receiver, arguments)?;
            Ok(replacement.map(|value| Box::new(value) as Box<dyn DynValue>))
        };

        Initializer {
            owner: TypeInfo::of::<T>(),
            signature,
            run: Box::new(erased),
        }
    }

    /// The component this initializer belongs to
    pub fn owner(&self) -> TypeInfo {
        self.owner
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub(crate) fn invoke(
        &self,
        receiver: &mut dyn Any,
        arguments: &Arguments,
    ) -> Result<Option<Box<dyn DynValue>>, DynError> {
        (self.run)(receiver, arguments)
    }
}
impl std::fmt::Debug for Initializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initializer")
            .field("owner", &self.owner.type_name)
            .field("signature", &self.signature.to_string())
            .finish()
    }
}

/// Values available to one invocation, keyed by the type they are requested as
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: HashMap<TypeId, Instance>,
}
impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies a context value, such as the [`RequestId`](crate::RequestId)
    pub fn with_context<T: Injectable>(mut self, value: T) -> Self {
        self.insert(Instance::new(TypeInfo::of::<T>(), Arc::new(value)));
        self
    }

    pub(crate) fn insert(&mut self, instance: Instance) {
        self.values.insert(instance.info.type_id, instance);
    }

    pub fn contains(&self, ty: &TypeInfo) -> bool {
        self.values.contains_key(&ty.type_id)
    }

    pub fn instance(&self, ty: &TypeInfo) -> Option<&Instance> {
        self.values.get(&ty.type_id)
    }

    /// The value requested as the concrete type `T`
    pub fn get<T: Injectable>(&self) -> Option<Arc<T>> {
        self.values.get(&TypeId::of::<T>())?.downcast().ok()
    }

    /// The value requested as the interface `I`
    pub fn interface<I: ?Sized + Injectable>(&self) -> Option<Arc<I>> {
        self.values.get(&TypeId::of::<I>())?.as_interface().ok()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
