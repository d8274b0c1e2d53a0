//! A test fixture that wires a graph, a container and an invoker.

use std::any::Any;

use crate::bootstrap::Commander;
use crate::config::CommanderSettings;
use crate::errors::Result;
use crate::registration::{CommandChain, CommandGraph};
use crate::runtime::{Container, EntityBuilderRegistry};

/// Builds a [`Commander`] from templates and registrations in a few lines.
#[derive(Debug, Default)]
pub struct TestFixture {
    /// The graph under test.
    pub graph: CommandGraph,
    /// The container services are registered into.
    pub container: Container,
    /// Entity builders handed to the compiler.
    pub builders: EntityBuilderRegistry,
    /// Bootstrap settings.
    pub settings: CommanderSettings,
}

impl TestFixture {
    /// Creates an empty fixture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a creation template.
    #[must_use]
    pub fn with_chain_for_new(mut self, chain: CommandChain) -> Self {
        self.graph.add_chain_for_new(chain);
        self
    }

    /// Registers a mutation template.
    #[must_use]
    pub fn with_chain_for_existing(mut self, chain: CommandChain) -> Self {
        self.graph.add_chain_for_existing(chain);
        self
    }

    /// Registers a service value.
    #[must_use]
    pub fn with_service<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.graph.services_mut().add_value(value);
        self
    }

    /// Builds missing `E` entities with `E::default`.
    #[must_use]
    pub fn with_default_entity<E: Any + Default + Send + Sync>(self) -> Self {
        self.builders.register_default::<E>();
        self
    }

    /// Bootstraps the commander.
    ///
    /// # Errors
    ///
    /// Returns any singleton construction failure.
    pub fn build(self) -> Result<Commander> {
        Commander::builder(self.graph)
            .container(self.container)
            .builders(self.builders)
            .settings(self.settings)
            .build()
    }
}
