use std::{any::TypeId, collections::HashMap, marker::PhantomData, sync::Arc};

use crate::{
    classifier::ContextTypes,
    signature::{Arguments, Initializer, Signature},
    types::{DynError, DynValue, Injectable, SharedValue, Template, TypeInfo},
};

/// Any type which can be used as a struct dependency
///
/// `Default` provides the zero value, `Clone` the per-invocation copy.
pub trait Component: Clone + Default + Send + Sync + 'static {}
impl<T: Clone + Default + Send + Sync + 'static> Component for T {}

/// Shape of a registered dependency type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Struct,
    Collection,
    Interface,
}

type ZeroFn = fn() -> Box<dyn DynValue>;
type UpcastFn = Arc<dyn Fn(SharedValue) -> Option<SharedValue> + Send + Sync>;

fn zero<T: Default + Clone + Send + Sync + 'static>() -> Box<dyn DynValue> {
    Box::new(T::default())
}

/// An interface a component declares to implement
#[derive(Clone)]
struct Capability {
    interface: TypeInfo,
    upcast: UpcastFn,
}

/// Everything known about a registered type
pub struct TypeDescriptor {
    info: TypeInfo,
    kind: Kind,
    zero: Option<ZeroFn>,
    capabilities: Vec<Capability>,
    initializer: Option<Arc<Initializer>>,
}
impl TypeDescriptor {
    pub fn info(&self) -> TypeInfo {
        self.info
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns true if this type is, or declares to implement, `ty`
    pub fn satisfies(&self, ty: &TypeInfo) -> bool {
        self.info == *ty || self.implements(ty)
    }

    pub fn implements(&self, interface: &TypeInfo) -> bool {
        self.capabilities.iter().any(|c| c.interface == *interface)
    }

    /// Interfaces this type implements, in declaration order
    pub fn capabilities(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.capabilities.iter().map(|c| c.interface)
    }

    pub fn initializer(&self) -> Option<&Arc<Initializer>> {
        self.initializer.as_ref()
    }

    /// Exposes a shared value of this type as `Arc<dyn Interface>`
    pub(crate) fn upcast(&self, interface: &TypeInfo, value: SharedValue) -> Option<SharedValue> {
        let capability = self
            .capabilities
            .iter()
            .find(|c| c.interface == *interface)?;
        (capability.upcast)(value)
    }
}
impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.info.type_name)
            .field("kind", &self.kind)
            .field(
                "implements",
                &self.capabilities().map(|c| c.type_name).collect::<Vec<_>>(),
            )
            .field("initializer", &self.initializer.as_ref().map(|i| i.signature().name()))
            .finish()
    }
}

/// Registry of every type that may appear in a handler or initializer signature.
///
/// Types are declared up front, together with their zero value, the interfaces
/// they implement and an optional initializer. Types which are not declared are
/// never valid dependencies.
pub struct TypeRegistry {
    types: HashMap<TypeId, Arc<TypeDescriptor>>,
    pub(crate) context: ContextTypes,
}
impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            types: HashMap::new(),
            context: ContextTypes::default(),
        }
    }

    /// Registers a struct dependency without capabilities or initializer
    pub fn component<T: Component>(self) -> Self {
        self.component_with::<T>(|c| c)
    }

    /// Registers a struct dependency, declaring its capabilities and initializer
    pub fn component_with<T: Component>(
        mut self,
        configure: impl FnOnce(ComponentBuilder<T>) -> ComponentBuilder<T>,
    ) -> Self {
        let ComponentBuilder {
            capabilities,
            initializer,
            ..
        } = configure(ComponentBuilder::new());

        self.insert(TypeDescriptor {
            info: TypeInfo::of::<T>(),
            kind: Kind::Struct,
            zero: Some(zero::<T>),
            capabilities,
            initializer,
        });
        self
    }

    /// Registers `Vec<T>` as a collection dependency
    pub fn collection<T: Clone + Send + Sync + 'static>(mut self) -> Self {
        self.insert(TypeDescriptor {
            info: TypeInfo::of::<Vec<T>>(),
            kind: Kind::Collection,
            zero: Some(zero::<Vec<T>>),
            capabilities: Vec::new(),
            initializer: None,
        });
        self
    }

    /// Registers an interface, usually `dyn Trait`
    pub fn interface<I: ?Sized + 'static>(mut self) -> Self {
        self.insert(TypeDescriptor {
            info: TypeInfo::of::<I>(),
            kind: Kind::Interface,
            zero: None,
            capabilities: Vec::new(),
            initializer: None,
        });
        self
    }

    /// Registers a type supplied per request, which is never resolved from the pool
    pub fn context<T: ?Sized + 'static>(mut self) -> Self {
        self.context.insert(TypeInfo::of::<T>());
        self
    }

    fn insert(&mut self, descriptor: TypeDescriptor) {
        let info = descriptor.info;
        if self.types.insert(info.type_id, Arc::new(descriptor)).is_some() {
            tracing::warn!("Type {} was registered twice - keeping the last registration", info);
        }
    }

    pub fn descriptor(&self, ty: &TypeInfo) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(&ty.type_id)
    }

    /// Wraps `value` into a template, if its type is registered as struct or collection
    pub fn template<T: Injectable + Clone>(&self, value: T) -> Option<Template> {
        self.template_erased(TypeInfo::of::<T>(), Box::new(value))
    }

    pub(crate) fn template_erased(
        &self,
        info: TypeInfo,
        value: Box<dyn DynValue>,
    ) -> Option<Template> {
        let descriptor = self.descriptor(&info)?;
        if descriptor.kind == Kind::Interface {
            return None;
        }
        Some(Template::new(descriptor.clone(), value))
    }

    /// A fresh zero valued template for a struct or collection type
    pub fn zero_template(&self, ty: &TypeInfo) -> Option<Template> {
        let descriptor = self.descriptor(ty)?;
        let zero = descriptor.zero?;
        Some(Template::new(descriptor.clone(), zero()))
    }
}

/// Declares the capabilities and initializer of a component
pub struct ComponentBuilder<T> {
    capabilities: Vec<Capability>,
    initializer: Option<Arc<Initializer>>,
    _marker: PhantomData<fn() -> T>,
}
impl<T: Component> ComponentBuilder<T> {
    fn new() -> Self {
        ComponentBuilder {
            capabilities: Vec::new(),
            initializer: None,
            _marker: PhantomData,
        }
    }

    /// Declares that `T` implements the interface `I`
    ///
    /// `upcast` is usually just an unsizing cast, e.g. `|it| it as Arc<dyn Trait>`.
    pub fn implements<I: ?Sized + Injectable>(mut self, upcast: fn(Arc<T>) -> Arc<I>) -> Self {
        let erased: UpcastFn = Arc::new(move |value: SharedValue| {
            let concrete = Arc::downcast::<T>(value).ok()?;
            Some(Arc::new(upcast(concrete)) as SharedValue)
        });
        self.capabilities.push(Capability {
            interface: TypeInfo::of::<I>(),
            upcast: erased,
        });
        self
    }

    /// Attaches an initializer run on every materialized instance
    ///
    /// The receiver is passed mutably, the remaining parameters of `signature`
    /// are read from the arguments. A returned value replaces the receiver.
    pub fn initializer<F>(mut self, signature: Signature, run: F) -> Self
    where
        F: Fn(&mut T, &Arguments) -> Result<Option<T>, DynError> + Send + Sync + 'static,
    {
        self.initializer = Some(Arc::new(Initializer::new::<T, F>(signature, run)));
        self
    }
}
