use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{
    errors::PoolError,
    registry::{Kind, TypeRegistry},
    types::{DynValue, Injectable, Template, TypeInfo},
};

/// Source of canonical dependency values
///
/// Shared by all graph builds, so implementations must tolerate concurrent calls.
pub trait ResourcePool: Send + Sync {
    /// Returns a template for `requested`
    ///
    /// - For a struct or collection type: the canonical value, or a fresh zero value
    /// - For an interface: the single explicitly added member implementing it
    fn resolve(&self, requested: &TypeInfo) -> Result<Template, PoolError>;
}

struct Member {
    template: Template,
    /// Zero values created on demand never implement an interface
    synthesized: bool,
}

#[derive(Default)]
struct Members {
    /// Insertion order, used for reproducible candidate lists
    ordered: Vec<Member>,
    by_type: HashMap<TypeId, usize>,
}
impl Members {
    fn get(&self, ty: &TypeInfo) -> Option<&Template> {
        self.by_type
            .get(&ty.type_id)
            .map(|&index| &self.ordered[index].template)
    }

    fn push(&mut self, template: Template, synthesized: bool) -> &Template {
        let index = self.ordered.len();
        self.by_type.insert(template.info().type_id, index);
        self.ordered.push(Member {
            template,
            synthesized,
        });
        &self.ordered[index].template
    }
}

/// In memory resource pool
///
/// Zero values are created lazily under a write lock, so concurrent builders
/// always observe the same template for a type.
pub struct MemoryPool {
    registry: Arc<TypeRegistry>,
    members: RwLock<Members>,
}
impl MemoryPool {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        MemoryPool {
            registry,
            members: RwLock::new(Members::default()),
        }
    }

    /// Adds a canonical value
    pub fn add_instance<T: Injectable + Clone>(&self, value: T) -> Result<(), PoolError> {
        self.add_erased(TypeInfo::of::<T>(), Box::new(value))
    }

    pub(crate) fn add_erased(
        &self,
        info: TypeInfo,
        value: Box<dyn DynValue>,
    ) -> Result<(), PoolError> {
        let template = self
            .registry
            .template_erased(info, value)
            .ok_or(PoolError::Unregistered(info))?;

        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if members.get(&info).is_some() {
            return Err(PoolError::AlreadyPresent(info));
        }
        members.push(template, false);
        tracing::debug!("Added {} to the resource pool", info);
        Ok(())
    }

    /// Number of canonical values, including lazily created ones
    pub fn len(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn canonical(&self, requested: &TypeInfo) -> Result<Template, PoolError> {
        if let Some(existing) = self
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(requested)
        {
            return Ok(existing.clone());
        }

        // Check again under the write lock - another builder may have won the race
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = members.get(requested) {
            return Ok(existing.clone());
        }

        let zero = self
            .registry
            .zero_template(requested)
            .ok_or(PoolError::Unregistered(*requested))?;
        tracing::debug!("Created zero valued {} in the resource pool", requested);
        Ok(members.push(zero, true).clone())
    }

    fn implementation(&self, interface: &TypeInfo) -> Result<Template, PoolError> {
        let members = self.members.read().unwrap_or_else(PoisonError::into_inner);
        let candidates: Vec<&Template> = members
            .ordered
            .iter()
            .filter(|m| !m.synthesized)
            .map(|m| &m.template)
            .filter(|t| t.descriptor().implements(interface))
            .collect();

        match candidates.as_slice() {
            [] => Err(PoolError::NoImplementationFound(*interface)),
            [only] => Ok((*only).clone()),
            many => Err(PoolError::Ambiguous {
                interface: *interface,
                candidates: many.iter().map(|m| m.info()).collect(),
            }),
        }
    }
}

impl ResourcePool for MemoryPool {
    fn resolve(&self, requested: &TypeInfo) -> Result<Template, PoolError> {
        let descriptor = self
            .registry
            .descriptor(requested)
            .ok_or(PoolError::Unregistered(*requested))?;

        match descriptor.kind() {
            Kind::Interface => self.implementation(requested),
            Kind::Struct | Kind::Collection => self.canonical(requested),
        }
    }
}
