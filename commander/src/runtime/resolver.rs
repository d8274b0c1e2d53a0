//! The dependency resolver contract the compiler builds commands through.

use super::{CommandContext, CompiledCommand, ResolutionScope, ServiceArguments};
use crate::core::TypeKey;
use crate::errors::CommanderError;
use crate::registration::ObjectDef;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Builds compiled commands from registered chain descriptors.
///
/// [`Container`](super::Container) is the in-crate implementation; the
/// compiler only talks to this trait, and compiled commands only hold a
/// [`ResolutionScope`].
#[cfg_attr(test, mockall::automock)]
pub trait Resolver: Send + Sync {
    /// Registers a descriptor as the source of `service`.
    fn register(&self, service: TypeKey, def: ObjectDef);

    /// Opens an isolated scope seeded with `context` and `arguments`.
    fn open_scope(
        &self,
        context: CommandContext,
        arguments: ServiceArguments,
    ) -> Arc<dyn ResolutionScope>;

    /// Returns the services registered as singletons.
    fn list_singletons(&self) -> Vec<TypeKey>;

    /// Opens a scope, resolves the chain descriptor named by `chain_id` and
    /// binds every call in it.
    ///
    /// # Errors
    ///
    /// Returns any resolution failure; the scope is disposed before the
    /// error is returned.
    fn build_command(
        &self,
        context: CommandContext,
        arguments: ServiceArguments,
        chain_id: Uuid,
    ) -> Result<CompiledCommand, CommanderError> {
        let scope = self.open_scope(context, arguments);
        let pipeline = scope
            .resolve_named(&chain_id.to_string())
            .and_then(|def| scope.build_pipeline(&def));

        match pipeline {
            Ok(pipeline) => {
                debug!(%chain_id, scope_id = %scope.id(), steps = pipeline.len(), "Built command");
                Ok(CompiledCommand::new(chain_id, pipeline, scope))
            }
            Err(err) => {
                scope.dispose();
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandStep, DomainCommand};
    use crate::errors::ResolutionError;
    use crate::invoker::CommandInvoker;
    use crate::registration::{CommandCall, CommandChain, CommandGraph, DefSource, Instance};
    use crate::runtime::{CommandCompiler, DisposeCallback, EntityBuilderRegistry, InvocationResult};
    use parking_lot::Mutex;
    use std::any::TypeId;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// A resolver backed by plain maps, with no container involved.
    #[derive(Default)]
    struct MapResolver {
        values: Mutex<HashMap<TypeId, Instance>>,
        named: Mutex<HashMap<String, ObjectDef>>,
        disposed: Arc<AtomicUsize>,
    }

    struct MapScope {
        id: Uuid,
        context: CommandContext,
        arguments: ServiceArguments,
        values: HashMap<TypeId, Instance>,
        named: HashMap<String, ObjectDef>,
        callbacks: Mutex<Vec<DisposeCallback>>,
        disposed: AtomicBool,
        disposals: Arc<AtomicUsize>,
    }

    impl Resolver for MapResolver {
        fn register(&self, service: TypeKey, def: ObjectDef) {
            if let DefSource::Value(value) = &def.source {
                self.values.lock().insert(service.id(), Arc::clone(value));
            }
            if let Some(name) = def.name.clone() {
                self.named.lock().insert(name, def);
            }
        }

        fn open_scope(
            &self,
            context: CommandContext,
            arguments: ServiceArguments,
        ) -> Arc<dyn ResolutionScope> {
            Arc::new(MapScope {
                id: Uuid::new_v4(),
                context,
                arguments,
                values: self.values.lock().clone(),
                named: self.named.lock().clone(),
                callbacks: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
                disposals: Arc::clone(&self.disposed),
            })
        }

        fn list_singletons(&self) -> Vec<TypeKey> {
            Vec::new()
        }
    }

    impl ResolutionScope for MapScope {
        fn id(&self) -> Uuid {
            self.id
        }

        fn context(&self) -> &CommandContext {
            &self.context
        }

        fn resolve_instance(&self, service: TypeKey) -> Result<Instance, ResolutionError> {
            self.arguments
                .instance(service.id())
                .or_else(|| self.values.get(&service.id()).cloned())
                .ok_or_else(|| ResolutionError::not_registered(service.short_name()))
        }

        fn resolve_named(&self, name: &str) -> Result<ObjectDef, ResolutionError> {
            self.arguments
                .named(name)
                .or_else(|| self.named.get(name))
                .cloned()
                .ok_or_else(|| ResolutionError::not_registered(name))
        }

        fn add_dispose_callback(&self, callback: DisposeCallback, _name: Option<&str>) {
            self.callbacks.lock().push(callback);
        }

        fn dispose(&self) {
            if self.disposed.swap(true, Ordering::SeqCst) {
                return;
            }
            for callback in std::mem::take(&mut *self.callbacks.lock()).into_iter().rev() {
                callback();
            }
            self.disposals.fetch_add(1, Ordering::SeqCst);
        }

        fn is_disposed(&self) -> bool {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug, Default)]
    struct Ticket {
        seat: u32,
    }

    struct Assign;

    impl DomainCommand<Ticket> for Assign {
        fn execute(&self, entity: &mut Ticket) -> anyhow::Result<()> {
            entity.seat = 12;
            Ok(())
        }
    }

    struct Publish;

    impl CommandStep for Publish {
        fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
            let ticket = ctx.take::<Ticket>().unwrap_or_default();
            ctx.set(InvocationResult::success(ticket));
            Ok(())
        }
    }

    #[test]
    fn test_external_resolver_builds_and_runs_commands() {
        let resolver = Arc::new(MapResolver::default());
        resolver.register(TypeKey::of::<Publish>(), ObjectDef::value(Publish));

        let mut graph = CommandGraph::new();
        graph.add_chain_for_new(
            CommandChain::for_entity::<Ticket>().then(CommandCall::for_step_type::<Publish>()),
        );
        let builders = Arc::new(EntityBuilderRegistry::new());
        builders.register_default::<Ticket>();
        let compiler =
            CommandCompiler::with_builders(Arc::clone(&resolver) as Arc<dyn Resolver>, builders);
        let invoker = CommandInvoker::new(Arc::new(graph), Arc::new(compiler));

        let result = invoker.for_new::<Ticket, _>(Assign).unwrap();

        assert!(result.success);
        assert_eq!(result.entity.seat, 12);
        assert_eq!(resolver.disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_build_command_disposes_scope_on_failure() {
        let resolver = MapResolver::default();

        let err = resolver
            .build_command(CommandContext::new(), ServiceArguments::new(), Uuid::new_v4())
            .unwrap_err();

        assert_eq!(err.kind(), "Resolution");
        assert_eq!(resolver.disposed.load(Ordering::SeqCst), 1);
    }
}
