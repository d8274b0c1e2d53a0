//! Wiring a graph, a container and the engine together at startup.

use crate::config::CommanderSettings;
use crate::errors::Result;
use crate::invoker::CommandInvoker;
use crate::registration::CommandGraph;
use crate::runtime::{CommandCompiler, Container, EntityBuilderRegistry};
use std::sync::Arc;
use tracing::info;

/// A bootstrapped engine: the shared graph, the container holding its
/// services, and the compiler and invoker built over them.
#[derive(Debug, Clone)]
pub struct Commander {
    graph: Arc<CommandGraph>,
    container: Container,
    compiler: Arc<CommandCompiler>,
    invoker: CommandInvoker,
    settings: CommanderSettings,
}

impl Commander {
    /// Bootstraps with no entity builders.
    ///
    /// # Errors
    ///
    /// Returns any singleton construction failure.
    pub fn bootstrap(
        graph: CommandGraph,
        container: Container,
        settings: CommanderSettings,
    ) -> Result<Self> {
        Self::builder(graph)
            .container(container)
            .settings(settings)
            .build()
    }

    /// Starts a builder over `graph`.
    #[must_use]
    pub fn builder(graph: CommandGraph) -> CommanderBuilder {
        CommanderBuilder {
            graph,
            container: Container::new(),
            builders: EntityBuilderRegistry::new(),
            settings: CommanderSettings::default(),
        }
    }

    /// Returns the invoker.
    #[must_use]
    pub fn invoker(&self) -> &CommandInvoker {
        &self.invoker
    }

    /// Returns the compiler.
    #[must_use]
    pub fn compiler(&self) -> &Arc<CommandCompiler> {
        &self.compiler
    }

    /// Returns the graph.
    #[must_use]
    pub fn graph(&self) -> &Arc<CommandGraph> {
        &self.graph
    }

    /// Returns the container.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Returns the settings the engine was bootstrapped with.
    #[must_use]
    pub fn settings(&self) -> &CommanderSettings {
        &self.settings
    }
}

/// Builder for [`Commander`].
#[derive(Debug)]
pub struct CommanderBuilder {
    graph: CommandGraph,
    container: Container,
    builders: EntityBuilderRegistry,
    settings: CommanderSettings,
}

impl CommanderBuilder {
    /// Uses `container` instead of a fresh one.
    #[must_use]
    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    /// Uses `builders` to create missing entities.
    #[must_use]
    pub fn builders(mut self, builders: EntityBuilderRegistry) -> Self {
        self.builders = builders;
        self
    }

    /// Uses `settings`.
    #[must_use]
    pub fn settings(mut self, settings: CommanderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers the graph's services into the container, constructs
    /// singletons unless disabled, and builds the compiler and invoker.
    ///
    /// # Errors
    ///
    /// Returns any singleton construction failure.
    pub fn build(self) -> Result<Commander> {
        let Self {
            graph,
            mut container,
            builders,
            settings,
        } = self;

        let graph = Arc::new(graph);
        graph.each_service(|service, def| container.register(service, def));

        if !settings.initialize_singletons {
            container = container.do_not_initialize_singletons();
        }
        if container.initializes_singletons() {
            let count = container.initialize_singletons()?;
            info!(count, "Initialized singletons");
        }

        let compiler = Arc::new(CommandCompiler::with_builders(
            Arc::new(container.clone()),
            Arc::new(builders),
        ));
        let invoker = CommandInvoker::new(Arc::clone(&graph), Arc::clone(&compiler));

        info!(
            chains_for_new = graph.chains_for_new().len(),
            chains_for_existing = graph.chains_for_existing().len(),
            services = graph.services().len(),
            "Commander bootstrapped"
        );

        Ok(Commander {
            graph,
            container,
            compiler,
            invoker,
            settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ResolutionError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Clock;

    #[test]
    fn test_registers_graph_services_and_itself() {
        let mut graph = CommandGraph::new();
        graph.services_mut().add_value(7_u32);

        let commander = Commander::bootstrap(graph, Container::new(), CommanderSettings::default())
            .unwrap();

        assert!(commander.container().is_registered::<u32>());
        let scope = commander.container().root_scope();
        let resolved = scope.resolve::<CommandGraph>().unwrap();
        assert!(Arc::ptr_eq(&resolved, commander.graph()));
    }

    #[test]
    fn test_prewarms_singletons_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut graph = CommandGraph::new();
        graph.services_mut().add_singleton(move |_scope| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Clock)
        });

        let commander = Commander::bootstrap(graph, Container::new(), CommanderSettings::default())
            .unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);

        commander.container().root_scope().resolve::<Clock>().unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prewarm_can_be_disabled() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let mut graph = CommandGraph::new();
        graph.services_mut().add_singleton(move |_scope| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Clock)
        });

        let settings = CommanderSettings::default().with_initialize_singletons(false);
        let commander = Commander::bootstrap(graph, Container::new(), settings).unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 0);
        assert!(!commander.container().initializes_singletons());
    }

    #[test]
    fn test_failing_singleton_fails_bootstrap() {
        let mut graph = CommandGraph::new();
        graph
            .services_mut()
            .add_singleton(|_scope| -> std::result::Result<Clock, ResolutionError> {
                Err(ResolutionError::new("Clock", "no time source"))
            });

        let err = Commander::bootstrap(graph, Container::new(), CommanderSettings::default())
            .unwrap_err();
        assert_eq!(err.kind(), "Resolution");
    }
}
