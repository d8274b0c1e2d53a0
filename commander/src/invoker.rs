//! The entry point callers use to run a unit of work through its pipeline.

use crate::commands::{DomainCommand, EmptyDomainCommand};
use crate::core::TypeKey;
use crate::errors::{MissingResultError, Result};
use crate::registration::{CommandCall, CommandGraph};
use crate::runtime::{CommandCompiler, CommandContext, CompiledCommand, InvocationResult};
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

/// Runs units of work through the pipelines registered for their entity
/// type.
///
/// Every invocation compiles a fresh command in its own scope, executes it,
/// reads the [`InvocationResult`] the pipeline published and disposes the
/// scope, whether or not anything failed along the way.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    graph: Arc<CommandGraph>,
    compiler: Arc<CommandCompiler>,
}

impl CommandInvoker {
    /// Creates an invoker.
    #[must_use]
    pub fn new(graph: Arc<CommandGraph>, compiler: Arc<CommandCompiler>) -> Self {
        Self { graph, compiler }
    }

    /// Returns the graph of templates.
    #[must_use]
    pub fn graph(&self) -> &Arc<CommandGraph> {
        &self.graph
    }

    /// Returns the compiler.
    #[must_use]
    pub fn compiler(&self) -> &Arc<CommandCompiler> {
        &self.compiler
    }

    /// Runs `command` through the creation pipeline for `E`.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_new<E, C>(&self, command: C) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + 'static,
    {
        self.for_new_with(|_| {}, command)
    }

    /// Runs `command` through the creation pipeline for `E`, seeding the
    /// context with `configure` first.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_new_with<E, C, F>(&self, configure: F, command: C) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + 'static,
        F: FnOnce(&CommandContext),
    {
        self.invoke(configure, CommandCall::for_command::<E, C>(command), new_compile::<E, F>)
    }

    /// Runs a `C` resolved from the invocation's scope through the creation
    /// pipeline for `E`.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_new_type<E, C>(&self) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + Any + 'static,
    {
        self.for_new_type_with::<E, C, _>(|_| {})
    }

    /// Like [`for_new_type`](Self::for_new_type), seeding the context first.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_new_type_with<E, C, F>(&self, configure: F) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + Any + 'static,
        F: FnOnce(&CommandContext),
    {
        self.invoke(configure, CommandCall::for_type::<C, E>(), new_compile::<E, F>)
    }

    /// Runs the creation pipeline for `E` with a unit of work that does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_new_empty<E, F>(&self, configure: F) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        F: FnOnce(&CommandContext),
    {
        self.for_new_with(configure, EmptyDomainCommand::<E>::new())
    }

    /// Runs `command` through the mutation pipeline for `E`.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_existing<E, C>(&self, command: C) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + 'static,
    {
        self.for_existing_with(|_| {}, command)
    }

    /// Runs `command` through the mutation pipeline for `E`, seeding the
    /// context with `configure` first.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_existing_with<E, C, F>(
        &self,
        configure: F,
        command: C,
    ) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + 'static,
        F: FnOnce(&CommandContext),
    {
        self.invoke(
            configure,
            CommandCall::for_command::<E, C>(command),
            existing_compile::<E, F>,
        )
    }

    /// Runs a `C` resolved from the invocation's scope through the mutation
    /// pipeline for `E`.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_existing_type<E, C>(&self) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + Any + 'static,
    {
        self.for_existing_type_with::<E, C, _>(|_| {})
    }

    /// Like [`for_existing_type`](Self::for_existing_type), seeding the
    /// context first.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_existing_type_with<E, C, F>(&self, configure: F) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + Any + 'static,
        F: FnOnce(&CommandContext),
    {
        self.invoke(configure, CommandCall::for_type::<C, E>(), existing_compile::<E, F>)
    }

    /// Runs the mutation pipeline for `E` with a unit of work that does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns any compilation, execution or result extraction failure.
    pub fn for_existing_empty<E, F>(&self, configure: F) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        F: FnOnce(&CommandContext),
    {
        self.for_existing_with(configure, EmptyDomainCommand::<E>::new())
    }

    /// Compiles with `compile`, executes, and reads back the published
    /// `InvocationResult<E>`. The compiled command's scope is disposed on
    /// every path.
    ///
    /// # Errors
    ///
    /// Returns the compile or execution failure, or `MissingResult` if the
    /// pipeline finished without publishing a result.
    pub fn invoke<E, F, K>(
        &self,
        configure: F,
        call: CommandCall,
        compile: K,
    ) -> Result<InvocationResult<E>>
    where
        E: Any + Send + Sync,
        F: FnOnce(&CommandContext),
        K: FnOnce(&CommandCompiler, &CommandGraph, F, CommandCall) -> Result<CompiledCommand>,
    {
        let command = compile(&self.compiler, &self.graph, configure, call)?;

        let outcome = command.execute().and_then(|()| {
            command
                .context()
                .take::<InvocationResult<E>>()
                .ok_or_else(|| {
                    MissingResultError::new(TypeKey::of::<InvocationResult<E>>().short_name())
                        .into()
                })
        });

        command.dispose();
        debug!(
            chain_id = %command.chain_id(),
            success = outcome.is_ok(),
            "Invocation finished"
        );
        outcome
    }
}

fn new_compile<E: 'static, F: FnOnce(&CommandContext)>(
    compiler: &CommandCompiler,
    graph: &CommandGraph,
    configure: F,
    call: CommandCall,
) -> Result<CompiledCommand> {
    compiler.compile_new::<E, F>(graph, configure, call)
}

fn existing_compile<E: 'static, F: FnOnce(&CommandContext)>(
    compiler: &CommandCompiler,
    graph: &CommandGraph,
    configure: F,
    call: CommandCall,
) -> Result<CompiledCommand> {
    compiler.compile_existing::<E, F>(graph, configure, call)
}
