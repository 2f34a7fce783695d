//! Graph building against a registry and a memory pool

use std::sync::Arc;

use rstest::*;
use wrapp_inject::{
    BuildError, DependencyGraph, MemoryPool, PoolError, RequestId, ResourcePool, Signature,
    Template, TypeInfo, TypeRegistry,
};

#[derive(Clone, Default, Debug, PartialEq)]
struct Account {
    balance: i64,
}

#[derive(Clone, Default, Debug, PartialEq)]
struct Database {
    url: String,
}

#[derive(Clone, Default, Debug, PartialEq)]
struct Config {
    dsn: String,
}

#[derive(Clone, Default, Debug, PartialEq)]
struct Row {
    id: u32,
}

#[derive(Clone, Default)]
struct Welcome;

/// Never registered
#[derive(Clone, Default)]
struct Plain;

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

#[derive(Clone, Default)]
struct English;
impl Greeter for English {
    fn greet(&self) -> String {
        "hello".into()
    }
}

#[derive(Clone, Default)]
struct French;
impl Greeter for French {
    fn greet(&self) -> String {
        "bonjour".into()
    }
}

#[fixture]
fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::new()
            .interface::<dyn Greeter>()
            .component::<Account>()
            .component::<Database>()
            .collection::<Row>()
            .component_with::<Config>(|c| {
                c.initializer(
                    Signature::method::<Config>("Config::init")
                        .param::<Database>()
                        .returns_error(),
                    |_, _| Ok(None),
                )
            })
            .component_with::<Welcome>(|c| {
                c.initializer(
                    Signature::method::<Welcome>("Welcome::init").param::<dyn Greeter>(),
                    |_, _| Ok(None),
                )
            })
            .component_with::<English>(|c| c.implements::<dyn Greeter>(|e| e as Arc<dyn Greeter>))
            .component_with::<French>(|c| c.implements::<dyn Greeter>(|f| f as Arc<dyn Greeter>)),
    )
}

fn build(
    registry: &Arc<TypeRegistry>,
    pool: &MemoryPool,
    signature: Signature,
) -> Result<DependencyGraph, BuildError> {
    DependencyGraph::build(&signature, registry, pool)
}

#[rstest]
fn synthesizes_struct_and_resolves_interface(registry: Arc<TypeRegistry>) {
    // Arrange
    let pool = MemoryPool::new(registry.clone());
    pool.add_instance(English).unwrap();
    let handler = Signature::function("greet")
        .param::<Account>()
        .param::<dyn Greeter>();

    // Act
    let graph = build(&registry, &pool, handler).unwrap();

    // Assert
    assert_eq!(graph.len(), 2);
    let account = graph.get_of::<Account>().unwrap();
    assert_eq!(
        account.template().downcast_ref::<Account>(),
        Some(&Account::default())
    );
    let greeter = graph.get_of::<dyn Greeter>().unwrap();
    assert_eq!(greeter.info(), TypeInfo::of::<English>());
    assert!(std::ptr::eq(greeter, graph.get_of::<English>().unwrap()));
}

#[rstest]
fn repeated_parameter_shares_one_entry(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    let handler = Signature::function("transfer")
        .param::<Account>()
        .param::<Account>();

    let graph = build(&registry, &pool, handler).unwrap();

    assert_eq!(graph.len(), 1);
    assert_eq!(graph.keys(), &[TypeInfo::of::<Account>()]);
}

#[rstest]
fn initializer_dependencies_join_the_graph(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    pool.add_instance(Database {
        url: "postgres://db".into(),
    })
    .unwrap();

    let graph = build(&registry, &pool, Signature::function("load").param::<Config>()).unwrap();

    assert_eq!(graph.len(), 2);
    assert_eq!(
        graph
            .get_of::<Database>()
            .unwrap()
            .template()
            .downcast_ref::<Database>()
            .unwrap()
            .url,
        "postgres://db"
    );
    let config = graph.get_of::<Config>().unwrap().template().descriptor();
    assert_eq!(
        config.initializer().unwrap().owner(),
        TypeInfo::of::<Config>()
    );
    let init = graph
        .initializer_of(&TypeInfo::of::<Config>())
        .expect("config has an initializer");
    assert_eq!(init.signature().name(), "Config::init");
    assert!(init.requires().contains(&TypeInfo::of::<Database>()));
    assert!(graph.initializer_of(&TypeInfo::of::<Database>()).is_none());
}

#[rstest]
fn same_type_at_different_depths_is_one_entry(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    let handler = Signature::function("migrate")
        .param::<Database>()
        .param::<Config>();

    let graph = build(&registry, &pool, handler).unwrap();

    assert_eq!(graph.len(), 2);
    let init = graph.initializer_of(&TypeInfo::of::<Config>()).unwrap();
    let nested = graph.get(&init.requires()[1]).unwrap();
    assert!(std::ptr::eq(nested, graph.get_of::<Database>().unwrap()));
}

#[rstest]
fn interface_parameter_reuses_existing_entry(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    // French is never added to the pool, only synthesized for the concrete request
    let handler = Signature::function("welcome")
        .param::<French>()
        .param::<dyn Greeter>();

    let graph = build(&registry, &pool, handler).unwrap();

    assert_eq!(graph.len(), 1);
    assert!(std::ptr::eq(
        graph.get_of::<French>().unwrap(),
        graph.get_of::<dyn Greeter>().unwrap()
    ));
    assert_eq!(
        graph.keys(),
        &[TypeInfo::of::<French>(), TypeInfo::of::<dyn Greeter>()]
    );
}

#[rstest]
fn initializer_interface_parameter_reuses_earlier_entry(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    let handler = Signature::function("welcome")
        .param::<English>()
        .param::<Welcome>();

    let graph = build(&registry, &pool, handler).unwrap();

    assert_eq!(graph.len(), 2);
    assert!(std::ptr::eq(
        graph.get_of::<dyn Greeter>().unwrap(),
        graph.get_of::<English>().unwrap()
    ));
    let init = graph.initializer_of(&TypeInfo::of::<Welcome>()).unwrap();
    assert_eq!(
        init.requires(),
        &[TypeInfo::of::<Welcome>(), TypeInfo::of::<dyn Greeter>()]
    );
}

#[rstest]
fn context_types_are_skipped(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    let handler = Signature::function("audit")
        .param::<RequestId>()
        .param::<Account>();

    let graph = build(&registry, &pool, handler).unwrap();

    assert_eq!(graph.len(), 1);
    assert!(!graph.contains(&TypeInfo::of::<RequestId>()));
}

#[rstest]
fn collections_resolve_to_empty_sequences(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());

    let graph = build(&registry, &pool, Signature::function("list").param::<Vec<Row>>()).unwrap();

    let rows = graph.get_of::<Vec<Row>>().unwrap().materialize();
    assert_eq!(rows.downcast::<Vec<Row>>().unwrap(), Vec::<Row>::new());
}

#[rstest]
#[case::plain_struct(Signature::function("handler").param::<Account>().param::<Plain>(), TypeInfo::of::<Plain>())]
#[case::scalar(Signature::function("handler").param::<Account>().param::<u32>(), TypeInfo::of::<u32>())]
#[case::element_without_vec(Signature::function("handler").param::<Account>().param::<Row>(), TypeInfo::of::<Row>())]
#[case::function(Signature::function("handler").param::<Account>().param::<fn() -> u8>(), TypeInfo::of::<fn() -> u8>())]
fn invalid_parameter_types_are_rejected(
    registry: Arc<TypeRegistry>,
    #[case] handler: Signature,
    #[case] offending: TypeInfo,
) {
    let pool = MemoryPool::new(registry.clone());

    let err = build(&registry, &pool, handler).unwrap_err();

    match err {
        BuildError::InvalidDependencyType {
            method,
            position,
            dependency,
        } => {
            assert_eq!(method, "handler");
            assert_eq!(position, 1);
            assert_eq!(dependency, offending);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn invalid_initializer_parameter_names_the_initializer() {
    let registry = Arc::new(TypeRegistry::new().component_with::<Config>(|c| {
        c.initializer(
            Signature::method::<Config>("Config::init").param::<Plain>(),
            |_, _| Ok(None),
        )
    }));
    let pool = MemoryPool::new(registry.clone());

    let err = build(&registry, &pool, Signature::function("load").param::<Config>()).unwrap_err();

    assert!(matches!(
        err,
        BuildError::InvalidDependencyType {
            method: "Config::init",
            position: 1,
            ..
        }
    ));
}

#[rstest]
fn invalid_initializer_return_shape_is_rejected() {
    let registry = Arc::new(TypeRegistry::new().component_with::<Config>(|c| {
        c.initializer(
            Signature::method::<Config>("Config::init")
                .returns::<String>()
                .returns_error(),
            |_, _| Ok(None),
        )
    }));
    let pool = MemoryPool::new(registry.clone());

    let err = build(&registry, &pool, Signature::function("load").param::<Config>()).unwrap_err();

    assert!(matches!(
        err,
        BuildError::InvalidInitializerSignature {
            method: "Config::init",
            ..
        }
    ));
}

#[rstest]
fn interface_without_pool_member_fails(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());

    let err = build(&registry, &pool, Signature::function("greet").param::<dyn Greeter>())
        .unwrap_err();

    assert!(
        matches!(err, BuildError::NoImplementationFound(interface) if interface == TypeInfo::of::<dyn Greeter>())
    );
}

#[rstest]
fn interface_with_several_pool_members_fails(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    pool.add_instance(English).unwrap();
    pool.add_instance(French).unwrap();

    let err = build(&registry, &pool, Signature::function("greet").param::<dyn Greeter>())
        .unwrap_err();

    match err {
        BuildError::AmbiguousImplementation { candidates, .. } => assert_eq!(
            candidates,
            vec![TypeInfo::of::<English>(), TypeInfo::of::<French>()]
        ),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn interface_satisfied_by_several_entries_fails(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    let handler = Signature::function("greet")
        .param::<English>()
        .param::<French>()
        .param::<dyn Greeter>();

    let err = build(&registry, &pool, handler).unwrap_err();

    assert!(matches!(err, BuildError::AmbiguousImplementation { .. }));
}

struct FailingPool;
impl ResourcePool for FailingPool {
    fn resolve(&self, requested: &TypeInfo) -> Result<Template, PoolError> {
        Err(PoolError::Unregistered(*requested))
    }
}

#[rstest]
fn pool_failures_are_wrapped_with_the_requested_type(registry: Arc<TypeRegistry>) {
    let err = DependencyGraph::build(
        &Signature::function("open").param::<Account>(),
        &registry,
        &FailingPool,
    )
    .unwrap_err();

    match err {
        BuildError::ResourcePool { requested, source } => {
            assert_eq!(requested, TypeInfo::of::<Account>());
            assert_eq!(source, PoolError::Unregistered(TypeInfo::of::<Account>()));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn materialized_copies_are_independent(registry: Arc<TypeRegistry>) {
    let pool = MemoryPool::new(registry.clone());
    pool.add_instance(Account { balance: 10 }).unwrap();
    let graph = build(&registry, &pool, Signature::function("pay").param::<Account>()).unwrap();
    let entry = graph.get_of::<Account>().unwrap();

    let mut first = entry.materialize();
    let second = entry.materialize();
    first.downcast_mut::<Account>().unwrap().balance -= 4;

    assert_eq!(first.downcast_ref::<Account>().unwrap().balance, 6);
    assert_eq!(second.downcast_ref::<Account>().unwrap().balance, 10);
    assert_eq!(
        entry.template().downcast_ref::<Account>().unwrap().balance,
        10
    );
}

/// Answers every request with an `Account`
struct AccountPool(Arc<TypeRegistry>);
impl ResourcePool for AccountPool {
    fn resolve(&self, requested: &TypeInfo) -> Result<Template, PoolError> {
        self.0
            .template(Account::default())
            .ok_or(PoolError::Unregistered(*requested))
    }
}

#[rstest]
fn pool_returning_another_type_is_rejected(registry: Arc<TypeRegistry>) {
    let pool = AccountPool(registry.clone());

    let err = DependencyGraph::build(
        &Signature::function("connect").param::<Database>(),
        &registry,
        &pool,
    )
    .unwrap_err();

    match err {
        BuildError::ResourcePool {
            requested,
            source: PoolError::Mismatch { actual, .. },
        } => {
            assert_eq!(requested, TypeInfo::of::<Database>());
            assert_eq!(actual, TypeInfo::of::<Account>());
        }
        other => panic!("unexpected error: {other}"),
    }
}
