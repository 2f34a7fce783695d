//! Wrapp Inject resolves the dependencies of request handlers.
//!
//! Given the signature of a handler it builds a [`DependencyGraph`] of every value
//! needed to call it, once, at registration. Per request the graph is
//! [prepared](DependencyGraph::prepare): every dependency is copied from its
//! template and initialized, so no state leaks between invocations.
//!
//! Wrapp Inject consists of the following parts:
//!
//! 1. [`TypeRegistry`] - declares components, collections, interfaces and context types
//! 2. [`ResourcePool`] - supplies canonical values, [`MemoryPool`] is the stock one
//! 3. [`DependencyGraph`] - scans a [`Signature`] recursively through initializers
//! 4. [`Injector`] - registers handlers and caches their graphs
//!
//! # Examples
//!
//! ```ignore
//! #[derive(Clone, Default)]
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Clone, Default)]
//! struct Users {
//!     table: String,
//! }
//!
//! let injector = Injector::builder()
//!     .component::<Database>()
//!     .component_with::<Users>(|c| {
//!         c.initializer(
//!             Signature::method::<Users>("Users::init").param::<Database>().returns_error(),
//!             |users, args| {
//!                 let db = args.get::<Database>().ok_or("database missing")?;
//!                 users.table = format!("{}/users", db.url);
//!                 Ok(None)
//!             },
//!         )
//!     })
//!     .add_instance(Database { url: "postgres://localhost".into() })
//!     .build()?;
//!
//! let graph = injector.register_handler(
//!     &Signature::function("list_users").param::<RequestId>().param::<Users>(),
//! )?;
//!
//! let args = graph.prepare(Arguments::new().with_context(RequestId("42".into())))?;
//! assert_eq!(args.get::<Users>().unwrap().table, "postgres://localhost/users");
//! ```

pub mod builder;
pub mod classifier;
pub mod container;
pub mod dependency_graph;
pub mod errors;
pub mod materializer;
pub mod pool;
mod prepare;
pub mod registry;
pub mod signature;
pub mod types;

pub use builder::InjectorBuilder;
pub use classifier::{Classification, ContextTypes, RequestId};
pub use container::Injector;
pub use dependency_graph::{DependencyEntry, DependencyGraph, InitializerDescriptor};
pub use errors::{BuildError, PoolError, PrepareError, RegisterError};
pub use materializer::Materialized;
pub use pool::{MemoryPool, ResourcePool};
pub use registry::{Component, ComponentBuilder, Kind, TypeDescriptor, TypeRegistry};
pub use signature::{validate_initializer, Arguments, Initializer, Signature};
pub use types::{DynError, DynValue, Injectable, Instance, SharedValue, Template, TypeInfo};
