//! Concrete pipeline calls.

use crate::commands::{CommandStep, DomainCommand};
use crate::core::TypeKey;
use crate::errors::{CommanderError, ResolutionError};
use crate::registration::{CallTarget, ObjectDef};
use crate::runtime::{BoundStep, CommandContext, ResolutionScope};
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// A concrete invocation of a unit of work.
///
/// A call either wraps a ready-made instance or names a component type that
/// the resolver instantiates when the pipeline is built. Domain command
/// calls record the entity type they expect; the entity itself is read from
/// the invocation's context when the step runs.
#[derive(Clone)]
pub struct CommandCall {
    description: String,
    input_type: Option<TypeKey>,
    target: Arc<dyn CallTarget>,
}

impl CommandCall {
    /// Creates a call from its parts.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        input_type: Option<TypeKey>,
        target: Arc<dyn CallTarget>,
    ) -> Self {
        Self {
            description: description.into(),
            input_type,
            target,
        }
    }

    /// Calls a given domain command instance.
    #[must_use]
    pub fn for_command<E, C>(command: C) -> Self
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + 'static,
    {
        Self::new(
            command_description::<C, E>(),
            Some(TypeKey::of::<E>()),
            Arc::new(InstanceCommand::<E> {
                command: Arc::new(command),
            }),
        )
    }

    /// Calls a shared domain command instance.
    #[must_use]
    pub fn for_command_arc<E>(command: Arc<dyn DomainCommand<E>>) -> Self
    where
        E: Any + Send + Sync,
    {
        Self::new(
            format!("DomainCommand.execute({})", TypeKey::of::<E>().short_name()),
            Some(TypeKey::of::<E>()),
            Arc::new(InstanceCommand { command }),
        )
    }

    /// Calls a domain command of type `C`, resolved from the invocation's
    /// scope.
    #[must_use]
    pub fn for_type<C, E>() -> Self
    where
        E: Any + Send + Sync,
        C: DomainCommand<E> + Any + 'static,
    {
        Self::new(
            command_description::<C, E>(),
            Some(TypeKey::of::<E>()),
            Arc::new(ResolvedCommand::<C, E> {
                _types: PhantomData,
            }),
        )
    }

    /// Calls a given context step.
    #[must_use]
    pub fn for_step<S: CommandStep + 'static>(step: S) -> Self {
        Self::new(
            step_description::<S>(),
            None,
            Arc::new(InstanceStep {
                step: Arc::new(step),
            }),
        )
    }

    /// Calls a context step of type `S`, resolved from the invocation's scope.
    #[must_use]
    pub fn for_step_type<S: CommandStep + Any + 'static>() -> Self {
        Self::new(
            step_description::<S>(),
            None,
            Arc::new(ResolvedStep::<S> {
                _step: PhantomData,
            }),
        )
    }

    /// Replaces the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the entity type the call operates on, if any.
    #[must_use]
    pub fn input_type(&self) -> Option<TypeKey> {
        self.input_type
    }

    /// Returns true if the call operates on an entity.
    #[must_use]
    pub fn has_input(&self) -> bool {
        self.input_type.is_some()
    }

    /// Converts the call into a descriptor.
    #[must_use]
    pub fn to_object_def(&self) -> ObjectDef {
        ObjectDef::call(self.description.clone(), Arc::clone(&self.target))
    }
}

impl std::fmt::Debug for CommandCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCall")
            .field("description", &self.description)
            .field("input_type", &self.input_type)
            .finish()
    }
}

fn command_description<C: ?Sized + 'static, E: 'static>() -> String {
    format!(
        "{}.execute({})",
        TypeKey::of::<C>().short_name(),
        TypeKey::of::<E>().short_name()
    )
}

fn step_description<S: 'static>() -> String {
    format!("{}.execute(CommandContext)", TypeKey::of::<S>().short_name())
}

fn run_against_entity<E, C>(
    step: &str,
    command: &C,
    ctx: &CommandContext,
) -> Result<(), CommanderError>
where
    E: Any + Send + Sync,
    C: DomainCommand<E> + ?Sized,
{
    ctx.with_entity(|entity: &mut E| command.execute(entity))?
        .map_err(|source| CommanderError::command_failed(step, source))
}

struct InstanceCommand<E> {
    command: Arc<dyn DomainCommand<E>>,
}

impl<E: Any + Send + Sync> CallTarget for InstanceCommand<E> {
    fn bind(
        &self,
        description: &str,
        _scope: &dyn ResolutionScope,
    ) -> Result<BoundStep, ResolutionError> {
        let command = Arc::clone(&self.command);
        let step = description.to_string();
        Ok(BoundStep::new(description, move |ctx| {
            run_against_entity::<E, _>(&step, command.as_ref(), ctx)
        }))
    }
}

struct ResolvedCommand<C, E> {
    _types: PhantomData<fn() -> (C, E)>,
}

impl<C, E> CallTarget for ResolvedCommand<C, E>
where
    E: Any + Send + Sync,
    C: DomainCommand<E> + Any + 'static,
{
    fn bind(
        &self,
        description: &str,
        scope: &dyn ResolutionScope,
    ) -> Result<BoundStep, ResolutionError> {
        let command = scope.resolve::<C>()?;
        let step = description.to_string();
        Ok(BoundStep::new(description, move |ctx| {
            run_against_entity::<E, _>(&step, command.as_ref(), ctx)
        }))
    }
}

struct InstanceStep {
    step: Arc<dyn CommandStep>,
}

impl CallTarget for InstanceStep {
    fn bind(
        &self,
        description: &str,
        _scope: &dyn ResolutionScope,
    ) -> Result<BoundStep, ResolutionError> {
        let step = Arc::clone(&self.step);
        let name = description.to_string();
        Ok(BoundStep::new(description, move |ctx| {
            step.execute(ctx)
                .map_err(|source| CommanderError::command_failed(&name, source))
        }))
    }
}

struct ResolvedStep<S> {
    _step: PhantomData<fn() -> S>,
}

impl<S: CommandStep + Any + 'static> CallTarget for ResolvedStep<S> {
    fn bind(
        &self,
        description: &str,
        scope: &dyn ResolutionScope,
    ) -> Result<BoundStep, ResolutionError> {
        let step = scope.resolve::<S>()?;
        let name = description.to_string();
        Ok(BoundStep::new(description, move |ctx| {
            step.execute(ctx)
                .map_err(|source| CommanderError::command_failed(&name, source))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{EmptyDomainCommand, FnStep};

    struct Order;

    struct Recalculate;

    impl DomainCommand<Order> for Recalculate {
        fn execute(&self, _entity: &mut Order) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_command_call_records_input_type() {
        let call = CommandCall::for_command::<Order, _>(Recalculate);

        assert_eq!(call.description(), "Recalculate.execute(Order)");
        assert_eq!(call.input_type(), Some(TypeKey::of::<Order>()));
        assert!(call.has_input());
    }

    #[test]
    fn test_type_call_matches_instance_description() {
        let by_type = CommandCall::for_type::<Recalculate, Order>();
        let by_instance = CommandCall::for_command::<Order, _>(Recalculate);

        assert_eq!(by_type.description(), by_instance.description());
    }

    #[test]
    fn test_step_call_has_no_input() {
        let call = CommandCall::for_step(FnStep::new(|_ctx: &CommandContext| Ok(())));

        assert!(!call.has_input());
        assert!(call.description().ends_with(".execute(CommandContext)"));
    }

    #[test]
    fn test_descriptions_name_generic_and_unsized_types() {
        struct Audit<T>(PhantomData<fn() -> T>);

        assert_eq!(
            step_description::<Audit<Order>>(),
            "Audit<Order>.execute(CommandContext)"
        );
        assert_eq!(
            command_description::<dyn DomainCommand<Order>, Order>(),
            "dyn DomainCommand<Order>.execute(Order)"
        );
    }

    #[test]
    fn test_with_description() {
        let call = CommandCall::for_command::<Order, _>(EmptyDomainCommand::<Order>::new())
            .with_description("Nothing");

        assert_eq!(call.description(), "Nothing");
        assert_eq!(call.to_object_def().description, "Nothing");
    }
}
