use std::{any::TypeId, collections::HashMap, sync::Arc};

use crate::{
    classifier::Classification,
    errors::{BuildError, PoolError},
    pool::ResourcePool,
    registry::TypeRegistry,
    signature::{validate_initializer, Initializer, Signature},
    types::{Template, TypeInfo},
};

/// Dependencies required to invoke one handler
///
/// Holds exactly one entry per concrete type. An entry is indexed under its
/// concrete type and under every interface it was requested as.
pub struct DependencyGraph {
    entries: Vec<DependencyEntry>,
    index: HashMap<TypeId, usize>,
    /// All keys, in the order they were first indexed
    keys: Vec<TypeInfo>,
}

/// One resolved dependency
pub struct DependencyEntry {
    template: Template,
    initializer: Option<InitializerDescriptor>,
}
impl DependencyEntry {
    /// The concrete type of this dependency
    pub fn info(&self) -> TypeInfo {
        self.template.info()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn initializer(&self) -> Option<&InitializerDescriptor> {
        self.initializer.as_ref()
    }

    /// True if this entry's concrete type is, or implements, `ty`
    fn satisfies(&self, ty: &TypeInfo) -> bool {
        self.template.descriptor().satisfies(ty)
    }
}
impl std::fmt::Debug for DependencyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyEntry")
            .field("type", &self.info().type_name)
            .field("initializer", &self.initializer.as_ref().map(|i| i.signature().name()))
            .finish()
    }
}

/// A validated initializer together with the dependencies it requires
#[derive(Debug, Clone)]
pub struct InitializerDescriptor {
    initializer: Arc<Initializer>,
    requires: Vec<TypeInfo>,
}
impl InitializerDescriptor {
    pub fn signature(&self) -> &Signature {
        self.initializer.signature()
    }

    pub(crate) fn initializer(&self) -> &Initializer {
        &self.initializer
    }

    /// Non context parameters of the initializer, each a key of the owning graph
    pub fn requires(&self) -> &[TypeInfo] {
        &self.requires
    }
}

impl DependencyGraph {
    /// Builds the graph for a handler
    ///
    /// Fails on the first invalid parameter, invalid initializer or pool error.
    pub fn build(
        signature: &Signature,
        registry: &TypeRegistry,
        pool: &dyn ResourcePool,
    ) -> Result<Self, BuildError> {
        let mut graph = DependencyGraph {
            entries: Vec::new(),
            index: HashMap::new(),
            keys: Vec::new(),
        };

        if let Err(error) = graph.scan(signature, registry, pool) {
            tracing::warn!("Dependency scan of '{}' failed: {}", signature.name(), error);
            return Err(error);
        }

        Ok(graph)
    }

    /// Scans the parameters of `signature`, adding every missing dependency
    ///
    /// Returns the non context parameters, which are all keys of the graph afterwards.
    fn scan(
        &mut self,
        signature: &Signature,
        registry: &TypeRegistry,
        pool: &dyn ResourcePool,
    ) -> Result<Vec<TypeInfo>, BuildError> {
        tracing::debug!("Scanning dependencies of {}", signature);
        let mut required = Vec::new();

        for (position, param) in signature.params().iter().enumerate() {
            // Supplied per request - never mapped as a dependency
            if registry.is_context_type(param) {
                continue;
            }
            required.push(*param);

            if self.index.contains_key(&param.type_id) {
                continue;
            }

            // Already resolved under another key
            if let Some(existing) = self.find_satisfying(param)? {
                self.alias(*param, existing);
                continue;
            }

            if registry.classify(param) == Classification::Invalid {
                return Err(BuildError::InvalidDependencyType {
                    method: signature.name(),
                    position,
                    dependency: *param,
                });
            }

            let template = pool
                .resolve(param)
                .map_err(|error| BuildError::from_pool(*param, error))?;

            if !template.descriptor().satisfies(param) {
                return Err(BuildError::ResourcePool {
                    requested: *param,
                    source: PoolError::Mismatch {
                        requested: *param,
                        actual: template.info(),
                    },
                });
            }

            if let Some(&existing) = self.index.get(&template.info().type_id) {
                self.alias(*param, existing);
                continue;
            }

            // Registered before scanning the initializer, which may require the dependency itself
            let index = self.push(template, *param);

            let Some(initializer) = self.entries[index]
                .template
                .descriptor()
                .initializer()
                .cloned()
            else {
                continue;
            };

            let owner = self.entries[index].info();
            validate_initializer(&owner, initializer.signature())?;

            let requires = self.scan(initializer.signature(), registry, pool)?;
            self.entries[index].initializer = Some(InitializerDescriptor {
                initializer,
                requires,
            });
        }

        Ok(required)
    }

    /// Searches the resolved entries for one satisfying `ty`
    fn find_satisfying(&self, ty: &TypeInfo) -> Result<Option<usize>, BuildError> {
        let matches: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.satisfies(ty))
            .map(|(index, _)| index)
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [index] => Ok(Some(*index)),
            many => Err(BuildError::AmbiguousImplementation {
                interface: *ty,
                candidates: many.iter().map(|&i| self.entries[i].info()).collect(),
            }),
        }
    }

    fn push(&mut self, template: Template, requested: TypeInfo) -> usize {
        let info = template.info();
        let index = self.entries.len();
        tracing::debug!("Adding dependency {} to satisfy {}", info, requested);

        self.entries.push(DependencyEntry {
            template,
            initializer: None,
        });
        self.alias(info, index);
        self.alias(requested, index);
        index
    }

    fn alias(&mut self, key: TypeInfo, index: usize) {
        if self.index.insert(key.type_id, index).is_none() {
            tracing::trace!("Indexing {} as {}", self.entries[index].info(), key);
            self.keys.push(key);
        }
    }
}

// Read access
impl DependencyGraph {
    pub fn get(&self, key: &TypeInfo) -> Option<&DependencyEntry> {
        self.index.get(&key.type_id).map(|&index| &self.entries[index])
    }

    pub fn get_of<T: ?Sized + 'static>(&self) -> Option<&DependencyEntry> {
        self.get(&TypeInfo::of::<T>())
    }

    /// The initializer of the dependency indexed under `key`
    pub fn initializer_of(&self, key: &TypeInfo) -> Option<&InitializerDescriptor> {
        self.get(key)?.initializer()
    }

    /// Distinct dependencies, in resolution order
    pub fn entries(&self) -> &[DependencyEntry] {
        &self.entries
    }

    pub fn keys(&self) -> &[TypeInfo] {
        &self.keys
    }

    /// Keys under which the entry at `index` is reachable
    pub(crate) fn keys_of(&self, index: usize) -> impl Iterator<Item = &TypeInfo> + '_ {
        self.keys
            .iter()
            .filter(move |key| self.index.get(&key.type_id) == Some(&index))
    }

    pub(crate) fn index_of(&self, key: &TypeInfo) -> Option<usize> {
        self.index.get(&key.type_id).copied()
    }

    pub fn contains(&self, key: &TypeInfo) -> bool {
        self.index.contains_key(&key.type_id)
    }

    /// Number of distinct dependencies
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for key in &self.keys {
            if let Some(entry) = self.get(key) {
                map.entry(&key.type_name, &entry.info().type_name);
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::MemoryPool;

    #[derive(Clone, Default)]
    struct Repo;

    #[derive(Clone, Default)]
    struct Audit;

    fn registry() -> Arc<TypeRegistry> {
        Arc::new(
            TypeRegistry::new()
                .component::<Audit>()
                .component_with::<Repo>(|c| {
                    c.initializer(
                        Signature::method::<Repo>("Repo::init").param::<Audit>(),
                        |_, _| Ok(None),
                    )
                }),
        )
    }

    #[test]
    fn entry_is_visible_to_its_own_initializer_scan() {
        let registry = registry();
        let pool = MemoryPool::new(registry.clone());
        let handler = Signature::function("handler").param::<Repo>();

        let graph = DependencyGraph::build(&handler, &registry, &pool).unwrap();

        assert_eq!(graph.len(), 2);
        let descriptor = graph.initializer_of(&TypeInfo::of::<Repo>()).unwrap();
        assert_eq!(
            descriptor.requires(),
            &[TypeInfo::of::<Repo>(), TypeInfo::of::<Audit>()]
        );
        assert_eq!(
            graph.keys(),
            &[TypeInfo::of::<Repo>(), TypeInfo::of::<Audit>()]
        );
    }

    #[test]
    fn debug_lists_keys_with_concrete_types() {
        let registry = registry();
        let pool = MemoryPool::new(registry.clone());
        let handler = Signature::function("handler").param::<Audit>();

        let graph = DependencyGraph::build(&handler, &registry, &pool).unwrap();

        let rendered = format!("{:?}", graph);
        assert!(rendered.contains(std::any::type_name::<Audit>()));
    }
}
