use std::sync::Arc;

use thiserror::Error;

use crate::types::{DynError, TypeInfo};

/// Errors while building the dependency graph of a handler
///
/// The first error aborts the whole build, no partial graph is returned.
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// A parameter is not a component, a collection of components or an interface
    #[error("Parameter {position} of '{method}' is '{dependency}', which is not a registered component, collection or interface")]
    InvalidDependencyType {
        method: &'static str,
        position: usize,
        dependency: TypeInfo,
    },
    /// The initializer returns something other than (), T, error or (T, error)
    #[error("Initializer '{method}' of '{owner}' returns {returns:?} - expected nothing, '{owner}', an error, or '{owner}' followed by an error")]
    InvalidInitializerSignature {
        method: &'static str,
        owner: TypeInfo,
        returns: Vec<TypeInfo>,
    },
    /// Nothing in the resource pool implements the requested interface
    #[error("No implementation found for '{0}'")]
    NoImplementationFound(TypeInfo),
    /// More than one candidate implements the requested interface
    #[error("'{interface}' is implemented by more than one dependency: {candidates:?}")]
    AmbiguousImplementation {
        interface: TypeInfo,
        candidates: Vec<TypeInfo>,
    },
    /// The resource pool failed
    #[error("Resource pool failed to resolve '{requested}' - error: {source}")]
    ResourcePool {
        requested: TypeInfo,
        #[source]
        source: PoolError,
    },
}
impl BuildError {
    /// Lifts a pool failure for `requested` into a build error
    pub(crate) fn from_pool(requested: TypeInfo, error: PoolError) -> Self {
        match error {
            PoolError::NoImplementationFound(interface) => Self::NoImplementationFound(interface),
            PoolError::Ambiguous {
                interface,
                candidates,
            } => Self::AmbiguousImplementation {
                interface,
                candidates,
            },
            source => Self::ResourcePool { requested, source },
        }
    }
}

/// Errors of the resource pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The type is not known to the registry
    #[error("'{0}' is not registered")]
    Unregistered(TypeInfo),
    /// No pool member implements the interface
    #[error("No pool member implements '{0}'")]
    NoImplementationFound(TypeInfo),
    /// Several pool members implement the interface
    #[error("'{interface}' is implemented by several pool members: {candidates:?}")]
    Ambiguous {
        interface: TypeInfo,
        candidates: Vec<TypeInfo>,
    },
    /// A canonical value for the type already exists
    #[error("'{0}' is already a member of the pool")]
    AlreadyPresent(TypeInfo),
    /// The pool returned a value that does not satisfy the request
    #[error("Resolved '{actual}' does not satisfy '{requested}'")]
    Mismatch {
        requested: TypeInfo,
        actual: TypeInfo,
    },
}

/// Errors while preparing the dependencies for one invocation
#[derive(Error, Debug, Clone)]
pub enum PrepareError {
    /// Initializers depend on each other in a loop
    #[error("Initializers form a cycle through {chain:?}")]
    CircularInitializer { chain: Vec<TypeInfo> },
    /// A context value required by an initializer was not supplied
    #[error("Initializer '{method}' requires '{context}' but it was not supplied")]
    MissingContext {
        method: &'static str,
        context: TypeInfo,
    },
    /// An initializer returned an error
    #[error("Initializer '{method}' failed - error: {error:?}")]
    InitializerFailed {
        method: &'static str,
        error: Arc<DynError>,
    },
    /// A dependency could not be exposed as one of its interfaces
    #[error("Failed to expose '{actual}' as '{interface}'")]
    UpcastFailed {
        interface: TypeInfo,
        actual: TypeInfo,
    },
}

/// Errors when registering a handler
#[derive(Error, Debug, Clone)]
pub enum RegisterError {
    /// A handler with the same name exists
    #[error("Handler '{0}' is already registered")]
    DuplicateHandler(&'static str),
    /// The dependency graph could not be built
    #[error(transparent)]
    Build(#[from] BuildError),
}
