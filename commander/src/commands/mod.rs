//! Units of work that a command pipeline runs.
//!
//! Two shapes exist: a [`DomainCommand`] operates on the entity the pipeline
//! targets, a [`CommandStep`] operates on the whole [`CommandContext`]
//! (validation, persistence, publishing the result).

use crate::runtime::CommandContext;
use std::fmt::Debug;
use std::marker::PhantomData;

/// A unit of work against an entity of type `E`.
pub trait DomainCommand<E>: Send + Sync {
    /// Applies the command to the entity.
    fn execute(&self, entity: &mut E) -> anyhow::Result<()>;
}

/// A step that operates on the command context.
pub trait CommandStep: Send + Sync {
    /// Runs the step.
    fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()>;
}

/// A domain command that does nothing.
///
/// Used when a caller only wants the template chain's own steps to run.
pub struct EmptyDomainCommand<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E> EmptyDomainCommand<E> {
    /// Creates a new empty command.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<E> Default for EmptyDomainCommand<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Debug for EmptyDomainCommand<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EmptyDomainCommand")
    }
}

impl<E> DomainCommand<E> for EmptyDomainCommand<E> {
    fn execute(&self, _entity: &mut E) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A closure-based domain command.
pub struct FnCommand<E, F>
where
    F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync,
{
    func: F,
    _entity: PhantomData<fn(&mut E)>,
}

impl<E, F> FnCommand<E, F>
where
    F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a new closure-based command.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _entity: PhantomData,
        }
    }
}

impl<E, F> Debug for FnCommand<E, F>
where
    F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnCommand")
    }
}

impl<E, F> DomainCommand<E> for FnCommand<E, F>
where
    F: Fn(&mut E) -> anyhow::Result<()> + Send + Sync,
{
    fn execute(&self, entity: &mut E) -> anyhow::Result<()> {
        (self.func)(entity)
    }
}

/// A closure-based context step.
pub struct FnStep<F>
where
    F: Fn(&CommandContext) -> anyhow::Result<()> + Send + Sync,
{
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&CommandContext) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a new closure-based step.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnStep<F>
where
    F: Fn(&CommandContext) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnStep")
    }
}

impl<F> CommandStep for FnStep<F>
where
    F: Fn(&CommandContext) -> anyhow::Result<()> + Send + Sync,
{
    fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        (self.func)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Order {
        total: u32,
    }

    #[test]
    fn test_empty_command_leaves_entity_untouched() {
        let mut order = Order { total: 3 };
        EmptyDomainCommand::<Order>::new().execute(&mut order).unwrap();

        assert_eq!(order.total, 3);
    }

    #[test]
    fn test_fn_command() {
        let command = FnCommand::new(|order: &mut Order| {
            order.total = 42;
            Ok(())
        });

        let mut order = Order::default();
        command.execute(&mut order).unwrap();
        assert_eq!(order.total, 42);
    }

    #[test]
    fn test_fn_step() {
        let step = FnStep::new(|ctx: &CommandContext| {
            ctx.set(5_u8);
            Ok(())
        });

        let ctx = CommandContext::new();
        step.execute(&ctx).unwrap();
        assert_eq!(ctx.get::<u8>().unwrap(), 5);
    }

    #[test]
    fn test_fn_step_error() {
        let step = FnStep::new(|_ctx: &CommandContext| anyhow::bail!("rejected"));

        let err = step.execute(&CommandContext::new()).unwrap_err();
        assert_eq!(err.to_string(), "rejected");
    }
}
