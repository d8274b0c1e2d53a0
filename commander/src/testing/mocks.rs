//! Steps and commands for testing pipelines.

use parking_lot::Mutex;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::commands::{CommandStep, DomainCommand};
use crate::core::TypeKey;
use crate::errors::ContextError;
use crate::registration::CommandCall;
use crate::runtime::{CommandContext, InvocationResult};

/// A shared, ordered record of executed steps.
///
/// Clones share the same record, so one log can be handed to every step of
/// a pipeline and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns a copy of the entries, in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// A context step that records its name when run.
#[derive(Debug, Clone)]
pub struct RecordingStep {
    name: String,
    log: ExecutionLog,
}

impl RecordingStep {
    /// Creates a recording step.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &ExecutionLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
        }
    }

    /// Creates a call to a recording step, described by `name`.
    #[must_use]
    pub fn call(name: impl Into<String>, log: &ExecutionLog) -> CommandCall {
        let name = name.into();
        CommandCall::for_step(Self::new(name.clone(), log)).with_description(name)
    }
}

impl CommandStep for RecordingStep {
    fn execute(&self, _ctx: &CommandContext) -> anyhow::Result<()> {
        self.log.record(self.name.clone());
        Ok(())
    }
}

/// A domain command that records its name, then applies an optional
/// mutation to the entity.
pub struct RecordingCommand<E> {
    name: String,
    log: ExecutionLog,
    apply: Option<Box<dyn Fn(&mut E) + Send + Sync>>,
}

impl<E> RecordingCommand<E> {
    /// Creates a recording command that leaves the entity untouched.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &ExecutionLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            apply: None,
        }
    }

    /// Sets the mutation applied to the entity.
    #[must_use]
    pub fn with_apply(mut self, apply: impl Fn(&mut E) + Send + Sync + 'static) -> Self {
        self.apply = Some(Box::new(apply));
        self
    }
}

impl<E: Any + Send + Sync> RecordingCommand<E> {
    /// Creates a call to this command, described by its name.
    #[must_use]
    pub fn into_call(self) -> CommandCall {
        let name = self.name.clone();
        CommandCall::for_command::<E, _>(self).with_description(name)
    }
}

impl<E> std::fmt::Debug for RecordingCommand<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<E> DomainCommand<E> for RecordingCommand<E> {
    fn execute(&self, entity: &mut E) -> anyhow::Result<()> {
        self.log.record(self.name.clone());
        if let Some(apply) = &self.apply {
            apply(entity);
        }
        Ok(())
    }
}

/// A context step that always fails.
#[derive(Debug, Clone)]
pub struct FailingStep {
    name: String,
    error: String,
}

impl FailingStep {
    /// Creates a failing step.
    #[must_use]
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }

    /// Creates a call to a failing step, described by `name`.
    #[must_use]
    pub fn call(name: impl Into<String>, error: impl Into<String>) -> CommandCall {
        let step = Self::new(name, error);
        let description = step.name.clone();
        CommandCall::for_step(step).with_description(description)
    }
}

impl CommandStep for FailingStep {
    fn execute(&self, _ctx: &CommandContext) -> anyhow::Result<()> {
        anyhow::bail!("{}", self.error)
    }
}

/// A context step that moves the entity `E` out of the context and
/// publishes it as a successful [`InvocationResult`].
pub struct PublishResult<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E: Any + Send + Sync> PublishResult<E> {
    /// Creates the step.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// Creates a call to the step.
    #[must_use]
    pub fn call() -> CommandCall {
        CommandCall::for_step(Self::new()).with_description("PublishResult")
    }
}

impl<E: Any + Send + Sync> Default for PublishResult<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for PublishResult<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PublishResult")
    }
}

impl<E: Any + Send + Sync> CommandStep for PublishResult<E> {
    fn execute(&self, ctx: &CommandContext) -> anyhow::Result<()> {
        // Builds the entity when the pipeline never touched it.
        ctx.with_entity(|_: &mut E| ())?;
        let entity = ctx
            .take::<E>()
            .ok_or_else(|| ContextError::missing_entity(TypeKey::of::<E>().short_name()))?;
        ctx.set(InvocationResult::success(entity));
        Ok(())
    }
}
