use std::{any::TypeId, collections::HashSet};

use crate::{
    registry::{Kind, TypeRegistry},
    types::TypeInfo,
};

/// Whether a type can be injected, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A registered component
    Struct,
    /// A registered `Vec` of components
    Collection,
    /// A registered interface
    Interface,
    /// Scalars, plain values, functions, channels - anything not registered
    Invalid,
}

/// Identifier of the request currently being served
///
/// Supplied by the serving layer, never resolved from the resource pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

/// Types supplied by the request serving environment
///
/// [`RequestId`] is always part of the set.
#[derive(Debug, Clone)]
pub struct ContextTypes {
    types: HashSet<TypeId>,
}
impl Default for ContextTypes {
    fn default() -> Self {
        let mut context = ContextTypes {
            types: HashSet::new(),
        };
        context.insert(TypeInfo::of::<RequestId>());
        context
    }
}
impl ContextTypes {
    pub fn insert(&mut self, info: TypeInfo) {
        self.types.insert(info.type_id);
    }

    pub fn contains(&self, info: &TypeInfo) -> bool {
        self.types.contains(&info.type_id)
    }
}

impl TypeRegistry {
    /// Decides whether `ty` is a valid dependency shape
    pub fn classify(&self, ty: &TypeInfo) -> Classification {
        match self.descriptor(ty).map(|d| d.kind()) {
            Some(Kind::Struct) => Classification::Struct,
            Some(Kind::Collection) => Classification::Collection,
            Some(Kind::Interface) => Classification::Interface,
            None => Classification::Invalid,
        }
    }

    /// Context types are skipped while scanning dependencies
    pub fn is_context_type(&self, ty: &TypeInfo) -> bool {
        self.context.contains(ty)
    }
}
