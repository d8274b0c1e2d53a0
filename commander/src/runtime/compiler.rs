//! Turns a template chain plus a unit of work into a runnable command.

use super::{CommandContext, CompiledCommand, EntityBuilderRegistry, Resolver, ServiceArguments};
use crate::core::{CompileMode, TypeKey};
use crate::errors::{CommanderError, Result, UnknownPipelineError};
use crate::registration::{CommandCall, CommandChain, CommandGraph};
use std::sync::Arc;
use tracing::debug;

/// Compiles template chains into per-invocation commands.
///
/// Each compile works on a clone of the template, so templates stay
/// untouched and concurrent compiles never share state.
pub struct CommandCompiler {
    resolver: Arc<dyn Resolver>,
    builders: Arc<EntityBuilderRegistry>,
}

impl CommandCompiler {
    /// Creates a compiler over `resolver` with no entity builders.
    #[must_use]
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self::with_builders(resolver, Arc::new(EntityBuilderRegistry::new()))
    }

    /// Creates a compiler whose contexts build missing entities from
    /// `builders`.
    #[must_use]
    pub fn with_builders(
        resolver: Arc<dyn Resolver>,
        builders: Arc<EntityBuilderRegistry>,
    ) -> Self {
        Self { resolver, builders }
    }

    /// Returns the entity builders shared with every context.
    #[must_use]
    pub fn builders(&self) -> &Arc<EntityBuilderRegistry> {
        &self.builders
    }

    /// Compiles the creation pipeline for `E`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPipeline` if no creation template exists for `E`, or
    /// any splice or resolution failure.
    pub fn compile_new<E, F>(
        &self,
        graph: &CommandGraph,
        configure: F,
        call: CommandCall,
    ) -> Result<CompiledCommand>
    where
        E: 'static,
        F: FnOnce(&CommandContext),
    {
        self.compile_for(CompileMode::New, TypeKey::of::<E>(), graph, configure, call)
    }

    /// Compiles the mutation pipeline for `E`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPipeline` if no mutation template exists for `E`, or
    /// any splice or resolution failure.
    pub fn compile_existing<E, F>(
        &self,
        graph: &CommandGraph,
        configure: F,
        call: CommandCall,
    ) -> Result<CompiledCommand>
    where
        E: 'static,
        F: FnOnce(&CommandContext),
    {
        self.compile_for(CompileMode::Existing, TypeKey::of::<E>(), graph, configure, call)
    }

    /// Compiles the template registered for `entity_type` in `mode`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownPipeline` if no such template exists, or any splice or
    /// resolution failure.
    pub fn compile_for<F>(
        &self,
        mode: CompileMode,
        entity_type: TypeKey,
        graph: &CommandGraph,
        configure: F,
        call: CommandCall,
    ) -> Result<CompiledCommand>
    where
        F: FnOnce(&CommandContext),
    {
        let context = self.context(configure);

        let chain = graph.chain_for(mode, entity_type).ok_or_else(|| {
            debug!(entity_type = %entity_type, %mode, "No pipeline registered");
            UnknownPipelineError::new(entity_type.short_name(), mode)
        })?;

        self.build(chain, context, call, ServiceArguments::new())
    }

    /// Compiles an already looked-up chain.
    ///
    /// `chain` should be a clone; it is consumed and spliced in place.
    ///
    /// # Errors
    ///
    /// Returns `MissingPlaceholder` if the chain has nowhere to splice
    /// `call`, or any resolution failure.
    pub fn compile<F>(
        &self,
        chain: CommandChain,
        configure: F,
        call: CommandCall,
        arguments: ServiceArguments,
    ) -> Result<CompiledCommand>
    where
        F: FnOnce(&CommandContext),
    {
        let context = self.context(configure);
        self.build(chain, context, call, arguments)
    }

    fn context<F: FnOnce(&CommandContext)>(&self, configure: F) -> CommandContext {
        let context = CommandContext::with_builders(Arc::clone(&self.builders));
        configure(&context);
        context
    }

    fn build(
        &self,
        mut chain: CommandChain,
        context: CommandContext,
        call: CommandCall,
        mut arguments: ServiceArguments,
    ) -> Result<CompiledCommand> {
        let description = call.description().to_string();
        chain.replace_placeholder(call)?;

        let chain_id = chain.unique_id();
        arguments.register_named(chain_id.to_string(), chain.to_object_def());

        debug!(
            entity_type = %chain.entity_type(),
            %chain_id,
            command = %description,
            nodes = chain.len(),
            "Compiling chain"
        );

        self.resolver
            .build_command(context, arguments, chain_id)
            .map_err(|err: CommanderError| {
                debug!(%chain_id, error = %err, "Compilation failed");
                err
            })
    }
}

impl std::fmt::Debug for CommandCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCompiler")
            .field("builders", &self.builders)
            .finish_non_exhaustive()
    }
}
