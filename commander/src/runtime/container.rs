//! The component container and its per-invocation resolution scopes.

use super::scope::DisposeCallback;
use super::{CommandContext, ResolutionScope, ServiceArguments};
use crate::core::TypeKey;
use crate::errors::ResolutionError;
use crate::registration::{DefSource, Instance, ObjectDef};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use uuid::Uuid;

thread_local! {
    static BUILDING: RefCell<HashSet<TypeId>> = RefCell::new(HashSet::new());
}

/// Marks a service as under construction on the current thread.
struct BuildGuard(TypeId);

impl BuildGuard {
    fn enter(service: TypeKey) -> Result<Self, ResolutionError> {
        let fresh = BUILDING.with(|building| building.borrow_mut().insert(service.id()));
        if fresh {
            Ok(Self(service.id()))
        } else {
            Err(ResolutionError::circular(service.short_name()))
        }
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with(|building| {
            building.borrow_mut().remove(&self.0);
        });
    }
}

struct Registration {
    service: TypeKey,
    def: ObjectDef,
    singleton: Mutex<Option<Instance>>,
}

struct ContainerState {
    registrations: DashMap<TypeId, Arc<Registration>>,
    named: DashMap<String, ObjectDef>,
    initialize_singletons: AtomicBool,
}

/// Registry of component descriptors and owner of singleton instances.
///
/// Cloning a container is cheap; clones share their registrations.
#[derive(Clone)]
pub struct Container {
    state: Arc<ContainerState>,
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(ContainerState {
                registrations: DashMap::new(),
                named: DashMap::new(),
                initialize_singletons: AtomicBool::new(true),
            }),
        }
    }

    /// Disables eager singleton construction at bootstrap.
    #[must_use]
    pub fn do_not_initialize_singletons(self) -> Self {
        self.state.initialize_singletons.store(false, Ordering::SeqCst);
        self
    }

    /// Returns true if singletons are constructed at bootstrap.
    #[must_use]
    pub fn initializes_singletons(&self) -> bool {
        self.state.initialize_singletons.load(Ordering::SeqCst)
    }

    /// Registers `def` as the source of `service`, replacing any previous
    /// registration. A named descriptor is also reachable by name.
    pub fn register(&self, service: TypeKey, def: ObjectDef) {
        if let Some(name) = &def.name {
            self.state.named.insert(name.clone(), def.clone());
        }
        debug!(service = %service, singleton = def.is_singleton(), "Registering service");
        self.state.registrations.insert(
            service.id(),
            Arc::new(Registration {
                service,
                def,
                singleton: Mutex::new(None),
            }),
        );
    }

    /// Registers a given value for `T`.
    pub fn register_value<T: Any + Send + Sync>(&self, value: T) {
        self.register(TypeKey::of::<T>(), ObjectDef::value(value));
    }

    /// Registers a factory for `T` whose instance is shared process-wide.
    pub fn register_singleton<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&dyn ResolutionScope) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        self.register(TypeKey::of::<T>(), ObjectDef::factory(factory).singleton());
    }

    /// Registers a factory for `T` whose instance is shared within a scope.
    pub fn register_scoped<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&dyn ResolutionScope) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        self.register(TypeKey::of::<T>(), ObjectDef::factory(factory));
    }

    /// Registers a descriptor reachable only by name.
    pub fn register_named(&self, name: impl Into<String>, def: ObjectDef) {
        self.state.named.insert(name.into(), def);
    }

    /// Checks if `T` has a registration.
    #[must_use]
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.state.registrations.contains_key(&TypeId::of::<T>())
    }

    /// Opens a scope for one invocation.
    #[must_use]
    pub fn open_scope(&self, context: CommandContext) -> Arc<dyn ResolutionScope> {
        self.open_scope_with(context, ServiceArguments::new())
    }

    /// Opens a scope for one invocation with explicit overrides.
    ///
    /// The context is attached to the new scope, so entity builders can
    /// resolve services through it.
    #[must_use]
    pub fn open_scope_with(
        &self,
        context: CommandContext,
        arguments: ServiceArguments,
    ) -> Arc<dyn ResolutionScope> {
        let scope = Arc::new(Scope::new(self.clone(), Arc::new(context), arguments));
        let weak: Weak<dyn ResolutionScope> = Arc::downgrade(&scope) as Weak<Scope>;
        scope.context.attach_scope(weak);
        scope
    }

    /// Opens a scope with an empty context, used to build singletons.
    #[must_use]
    pub fn root_scope(&self) -> Arc<dyn ResolutionScope> {
        self.open_scope(CommandContext::new())
    }

    /// Returns the services registered as singletons.
    #[must_use]
    pub fn list_singletons(&self) -> Vec<TypeKey> {
        self.state
            .registrations
            .iter()
            .filter(|entry| entry.def.is_singleton())
            .map(|entry| entry.service)
            .collect()
    }

    /// Constructs every singleton built by a factory.
    ///
    /// # Errors
    ///
    /// Returns the first construction failure.
    pub fn initialize_singletons(&self) -> Result<usize, ResolutionError> {
        let pending: Vec<Arc<Registration>> = self
            .state
            .registrations
            .iter()
            .filter(|entry| {
                entry.def.is_singleton() && matches!(entry.def.source, DefSource::Factory(_))
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        debug!(count = pending.len(), "Found singletons");

        for registration in &pending {
            self.singleton(registration)?;
        }
        Ok(pending.len())
    }

    fn registration(&self, id: TypeId) -> Option<Arc<Registration>> {
        self.state
            .registrations
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
    }

    fn named(&self, name: &str) -> Option<ObjectDef> {
        self.state.named.get(name).map(|entry| entry.value().clone())
    }

    fn singleton(&self, registration: &Registration) -> Result<Instance, ResolutionError> {
        // Checked before locking; the slot lock is not re-entrant.
        let _building = BuildGuard::enter(registration.service)?;
        let mut slot = registration.singleton.lock();
        if let Some(instance) = slot.as_ref() {
            return Ok(Arc::clone(instance));
        }

        let instance = match &registration.def.source {
            DefSource::Value(value) => Arc::clone(value),
            DefSource::Factory(factory) => factory(&*self.root_scope())?,
            _ => return Err(not_a_service(registration.service)),
        };
        *slot = Some(Arc::clone(&instance));
        Ok(instance)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.state.registrations.len())
            .field("named", &self.state.named.len())
            .field("initialize_singletons", &self.initializes_singletons())
            .finish()
    }
}

fn not_a_service(service: TypeKey) -> ResolutionError {
    ResolutionError::new(service.short_name(), "registration does not describe a service")
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

/// The container's [`ResolutionScope`].
///
/// A scope resolves components for a single compiled command, caching
/// scoped instances. Disposing it runs its dispose callbacks in reverse
/// registration order and drops the cache. Dropping a scope disposes it.
pub(crate) struct Scope {
    id: Uuid,
    container: Container,
    context: Arc<CommandContext>,
    arguments: ServiceArguments,
    instances: Mutex<HashMap<TypeId, Instance>>,
    callbacks: Mutex<Vec<(Option<String>, DisposeCallback)>>,
    disposed: AtomicBool,
}

impl Scope {
    fn new(container: Container, context: Arc<CommandContext>, arguments: ServiceArguments) -> Self {
        Self {
            id: Uuid::now_v7(),
            container,
            context,
            arguments,
            instances: Mutex::new(HashMap::new()),
            callbacks: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }
}

impl ResolutionScope for Scope {
    fn id(&self) -> Uuid {
        self.id
    }

    fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Explicit arguments win over the context itself, which wins over
    /// container registrations.
    fn resolve_instance(&self, service: TypeKey) -> Result<Instance, ResolutionError> {
        if self.is_disposed() {
            return Err(ResolutionError::disposed(service.short_name()));
        }

        if let Some(instance) = self.arguments.instance(service.id()) {
            return Ok(instance);
        }

        if service.id() == TypeId::of::<CommandContext>() {
            return Ok(Arc::clone(&self.context) as Instance);
        }

        if let Some(instance) = self.instances.lock().get(&service.id()) {
            return Ok(Arc::clone(instance));
        }

        let registration = self
            .container
            .registration(service.id())
            .ok_or_else(|| ResolutionError::not_registered(service.short_name()))?;

        if registration.def.is_singleton() {
            return self.container.singleton(&registration);
        }

        let instance = match &registration.def.source {
            DefSource::Value(value) => return Ok(Arc::clone(value)),
            DefSource::Factory(factory) => {
                let _building = BuildGuard::enter(service)?;
                factory(self)?
            }
            _ => return Err(not_a_service(service)),
        };

        let mut instances = self.instances.lock();
        Ok(Arc::clone(instances.entry(service.id()).or_insert(instance)))
    }

    fn resolve_named(&self, name: &str) -> Result<ObjectDef, ResolutionError> {
        self.arguments
            .named(name)
            .cloned()
            .or_else(|| self.container.named(name))
            .ok_or_else(|| ResolutionError::not_registered(name))
    }

    fn add_dispose_callback(&self, callback: DisposeCallback, name: Option<&str>) {
        self.callbacks.lock().push((name.map(String::from), callback));
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let callbacks = std::mem::take(&mut *self.callbacks.lock());
        let count = callbacks.len();

        for (name, callback) in callbacks.into_iter().rev() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback));
            if let Err(panic) = result {
                warn!(
                    scope_id = %self.id,
                    callback = name.as_deref().unwrap_or("<unnamed>"),
                    error = %panic_message(panic.as_ref()),
                    "Dispose callback panicked"
                );
            }
        }

        self.instances.lock().clear();
        debug!(scope_id = %self.id, callbacks = count, "Scope disposed");
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("context_id", &self.context.id())
            .field("arguments", &self.arguments)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl super::Resolver for Container {
    fn register(&self, service: TypeKey, def: ObjectDef) {
        Container::register(self, service, def);
    }

    fn open_scope(
        &self,
        context: CommandContext,
        arguments: ServiceArguments,
    ) -> Arc<dyn ResolutionScope> {
        self.open_scope_with(context, arguments)
    }

    fn list_singletons(&self) -> Vec<TypeKey> {
        Container::list_singletons(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::FnStep;
    use crate::registration::{CommandCall, CommandChain};
    use crate::runtime::Resolver;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Repository {
        name: String,
    }

    struct Counter(AtomicUsize);

    #[test]
    fn test_resolve_value() {
        let container = Container::new();
        container.register_value(Repository {
            name: "orders".into(),
        });

        let scope = container.open_scope(CommandContext::new());
        assert_eq!(scope.resolve::<Repository>().unwrap().name, "orders");
    }

    #[test]
    fn test_resolve_unregistered_fails() {
        let scope = Container::new().root_scope();
        let err = scope.resolve::<Repository>().unwrap_err();

        assert_eq!(err.service, "Repository");
        assert!(err.reason.contains("no registration"));
    }

    #[test]
    fn test_scoped_instances_are_cached_per_scope() {
        let built = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        let counter = Arc::clone(&built);
        container.register_scoped(move |_scope| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Repository {
                name: "scoped".into(),
            })
        });

        let first = container.root_scope();
        let a = first.resolve::<Repository>().unwrap();
        let b = first.resolve::<Repository>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let second = container.root_scope();
        let c = second.resolve::<Repository>().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_singletons_are_shared_across_scopes() {
        let container = Container::new();
        container.register_singleton(|_scope| Ok(Counter(AtomicUsize::new(0))));

        let a = container.root_scope().resolve::<Counter>().unwrap();
        let b = container.root_scope().resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_initialize_singletons() {
        let built = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        let counter = Arc::clone(&built);
        container.register_singleton(move |_scope| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Counter(AtomicUsize::new(0)))
        });
        container.register_value(5_u32);
        container.register_scoped(|_scope| Ok(String::from("scoped")));

        assert_eq!(container.list_singletons().len(), 2);
        assert_eq!(container.initialize_singletons().unwrap(), 1);
        container.root_scope().resolve::<Counter>().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_do_not_initialize_singletons() {
        let container = Container::new();
        assert!(container.initializes_singletons());
        let container = container.do_not_initialize_singletons();
        assert!(!container.initializes_singletons());
    }

    #[test]
    fn test_arguments_take_precedence() {
        let container = Container::new();
        container.register_value(Repository {
            name: "registered".into(),
        });
        let args = ServiceArguments::new().with(Repository {
            name: "explicit".into(),
        });

        let scope = container.open_scope_with(CommandContext::new(), args);
        assert_eq!(scope.resolve::<Repository>().unwrap().name, "explicit");
    }

    #[test]
    fn test_context_resolves_to_itself() {
        let ctx = CommandContext::new();
        let id = ctx.id();
        let scope = Container::new().open_scope(ctx);

        assert_eq!(scope.resolve::<CommandContext>().unwrap().id(), id);
    }

    #[test]
    fn test_factory_can_resolve_dependencies() {
        let container = Container::new();
        container.register_value(String::from("orders"));
        container.register_scoped(|scope| {
            let name = scope.resolve::<String>()?;
            Ok(Repository {
                name: name.as_ref().clone(),
            })
        });

        let repo = container.root_scope().resolve::<Repository>().unwrap();
        assert_eq!(repo.name, "orders");
    }

    #[test]
    fn test_dispose_runs_callbacks_once_in_reverse() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let scope = Container::new().root_scope();

        for i in 0..3 {
            let order = Arc::clone(&order);
            scope.on_dispose(move || order.lock().push(i), None);
        }
        scope.on_dispose(|| panic!("callback failure"), Some("faulty"));

        scope.dispose();
        scope.dispose();

        assert_eq!(*order.lock(), vec![2, 1, 0]);
        assert!(scope.is_disposed());
        assert!(scope.resolve::<CommandContext>().is_err());
    }

    #[test]
    fn test_singleton_self_dependency_is_circular() {
        #[derive(Debug)]
        struct Svc;

        let container = Container::new();
        container.register_singleton(|scope| {
            scope.resolve::<Svc>()?;
            Ok(Svc)
        });

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = container.clone();
        std::thread::spawn(move || {
            let _ = tx.send(worker.root_scope().resolve::<Svc>().map(|_| ()));
        });

        let err = rx
            .recv_timeout(std::time::Duration::from_secs(3))
            .unwrap()
            .unwrap_err();
        assert_eq!(err.service, "Svc");
        assert_eq!(err.reason, "circular dependency");
        assert_eq!(container.initialize_singletons().unwrap_err().reason, "circular dependency");
    }

    #[test]
    fn test_singleton_cycle_through_scoped_dependency() {
        #[derive(Debug)]
        struct Left;
        #[derive(Debug)]
        struct Right;

        let container = Container::new();
        container.register_singleton(|scope| {
            scope.resolve::<Right>()?;
            Ok(Left)
        });
        container.register_scoped(|scope| {
            scope.resolve::<Left>()?;
            Ok(Right)
        });

        let scope = container.root_scope();
        let err = scope.resolve::<Left>().unwrap_err();
        assert_eq!(err.service, "Left");
        assert!(err.reason.contains("circular"));

        let err = scope.resolve::<Right>().unwrap_err();
        assert_eq!(err.service, "Right");
    }

    #[test]
    fn test_scoped_self_dependency_is_circular() {
        let container = Container::new();
        container.register_scoped(|scope| {
            let inner = scope.resolve::<Repository>()?;
            Ok(Repository {
                name: inner.name.clone(),
            })
        });

        let err = container.root_scope().resolve::<Repository>().unwrap_err();
        assert_eq!(err.reason, "circular dependency");
    }

    #[test]
    fn test_shared_dependency_is_not_a_cycle() {
        let container = Container::new();
        container.register_singleton(|_scope| Ok(Counter(AtomicUsize::new(0))));
        container.register_scoped(|scope| {
            scope.resolve::<Counter>()?;
            Ok(Repository {
                name: "first".into(),
            })
        });
        container.register_scoped(|scope| {
            scope.resolve::<Counter>()?;
            scope.resolve::<Repository>()?;
            Ok(String::from("second"))
        });

        let scope = container.root_scope();
        assert_eq!(*scope.resolve::<String>().unwrap(), "second");
    }

    #[test]
    fn test_panic_message_reads_string_payloads() {
        let payload = std::panic::catch_unwind(|| panic!("callback failure")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "callback failure");

        let payload =
            std::panic::catch_unwind(|| panic!("{} failure", "formatted")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "formatted failure");

        let payload = std::panic::catch_unwind(|| std::panic::panic_any(7_u8)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_drop_disposes() {
        let disposed = Arc::new(AtomicUsize::new(0));
        {
            let scope = Container::new().root_scope();
            let disposed = Arc::clone(&disposed);
            scope.on_dispose(
                move || {
                    disposed.fetch_add(1, Ordering::SeqCst);
                },
                Some("count"),
            );
        }
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_pipeline_rejects_placeholder() {
        let scope = Container::new().root_scope();
        let chain = CommandChain::for_entity::<Repository>();

        let err = scope.build_pipeline(&chain.to_object_def()).unwrap_err();
        assert!(err.reason.contains("placeholder"));
    }

    #[test]
    fn test_build_command_from_named_chain() {
        let container = Container::new();
        let mut chain = CommandChain::for_entity::<Repository>();
        chain
            .replace_placeholder(
                CommandCall::for_step(FnStep::new(|ctx: &CommandContext| {
                    ctx.set(1_u8);
                    Ok(())
                }))
                .with_description("mark"),
            )
            .unwrap();

        let mut args = ServiceArguments::new();
        args.register_named(chain.unique_id().to_string(), chain.to_object_def());

        let command = container
            .build_command(CommandContext::new(), args, chain.unique_id())
            .unwrap();
        assert_eq!(command.descriptions(), vec!["mark"]);

        command.execute().unwrap();
        assert_eq!(command.context().get::<u8>().unwrap(), 1);
    }

    #[test]
    fn test_build_command_unknown_chain() {
        let err = Container::new()
            .build_command(CommandContext::new(), ServiceArguments::new(), Uuid::new_v4())
            .unwrap_err();

        assert_eq!(err.kind(), "Resolution");
    }
}
