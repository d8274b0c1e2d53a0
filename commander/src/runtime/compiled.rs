//! Compiled pipelines: bound steps ready to run against a context.

use super::{CommandContext, ResolutionScope};
use crate::errors::{CommanderError, ResolutionError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

type StepFn = Box<dyn Fn(&CommandContext) -> Result<(), CommanderError> + Send + Sync>;

/// One pipeline step with every dependency already resolved.
pub struct BoundStep {
    description: String,
    invoke: StepFn,
}

impl BoundStep {
    /// Creates a bound step.
    pub fn new<F>(description: impl Into<String>, invoke: F) -> Self
    where
        F: Fn(&CommandContext) -> Result<(), CommanderError> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            invoke: Box::new(invoke),
        }
    }

    /// Returns the step description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Runs the step.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying unit of work fails with.
    pub fn run(&self, ctx: &CommandContext) -> Result<(), CommanderError> {
        (self.invoke)(ctx)
    }
}

impl std::fmt::Debug for BoundStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundStep")
            .field("description", &self.description)
            .finish()
    }
}

/// The ordered steps of one compiled chain.
#[derive(Debug, Default)]
pub struct CompiledPipeline {
    steps: Vec<BoundStep>,
}

impl CompiledPipeline {
    /// Creates a pipeline from bound steps.
    #[must_use]
    pub fn new(steps: Vec<BoundStep>) -> Self {
        Self { steps }
    }

    /// Appends a step.
    pub fn push(&mut self, step: BoundStep) {
        self.steps.push(step);
    }

    /// Appends every step of `other`.
    pub fn extend(&mut self, other: CompiledPipeline) {
        self.steps.extend(other.steps);
    }

    /// Runs every step in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first step failure.
    pub fn execute(&self, ctx: &CommandContext) -> Result<(), CommanderError> {
        for step in &self.steps {
            debug!(context_id = %ctx.id(), step = %step.description(), "Running step");
            step.run(ctx)?;
        }
        Ok(())
    }

    /// Returns the step descriptions, in order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<&str> {
        self.steps.iter().map(BoundStep::description).collect()
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A runnable pipeline bound to the scope it was built in.
///
/// The command owns its scope: dropping the command, or calling
/// [`dispose`](Self::dispose), drops the bound steps and disposes the scope.
/// A disposed command refuses to execute.
pub struct CompiledCommand {
    chain_id: Uuid,
    pipeline: Mutex<CompiledPipeline>,
    scope: Arc<dyn ResolutionScope>,
}

impl CompiledCommand {
    /// Creates a compiled command.
    #[must_use]
    pub fn new(chain_id: Uuid, pipeline: CompiledPipeline, scope: Arc<dyn ResolutionScope>) -> Self {
        Self {
            chain_id,
            pipeline: Mutex::new(pipeline),
            scope,
        }
    }

    /// Returns the id of the compiled chain.
    #[must_use]
    pub fn chain_id(&self) -> Uuid {
        self.chain_id
    }

    /// Returns the descriptions of the compiled steps, in order.
    #[must_use]
    pub fn descriptions(&self) -> Vec<String> {
        self.pipeline
            .lock()
            .descriptions()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Returns the number of compiled steps. Zero once disposed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipeline.lock().len()
    }

    /// Returns true if there are no steps to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipeline.lock().is_empty()
    }

    /// Returns the invocation's context.
    #[must_use]
    pub fn context(&self) -> &CommandContext {
        self.scope.context()
    }

    /// Returns the resolution scope.
    #[must_use]
    pub fn scope(&self) -> &dyn ResolutionScope {
        self.scope.as_ref()
    }

    /// Runs the pipeline against the invocation's context.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` once the command has been disposed,
    /// otherwise the first step failure.
    pub fn execute(&self) -> Result<(), CommanderError> {
        if self.scope.is_disposed() {
            return Err(ResolutionError::disposed(format!("chain {}", self.chain_id)).into());
        }

        let pipeline = self.pipeline.lock();
        debug!(
            chain_id = %self.chain_id,
            steps = pipeline.len(),
            "Executing compiled command"
        );
        pipeline.execute(self.context())
    }

    /// Drops the bound steps and disposes the scope. Disposing twice is a
    /// no-op.
    pub fn dispose(&self) {
        let steps = std::mem::take(&mut *self.pipeline.lock());
        drop(steps);
        self.scope.dispose();
    }
}

impl Drop for CompiledCommand {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for CompiledCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledCommand")
            .field("chain_id", &self.chain_id)
            .field("steps", &self.len())
            .field("scope_id", &self.scope.id())
            .field("disposed", &self.scope.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Container;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(name: &str, counter: &Arc<AtomicUsize>) -> BoundStep {
        let counter = Arc::clone(counter);
        BoundStep::new(name, move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_pipeline_runs_steps_in_order() {
        let ctx = CommandContext::new();
        let mut pipeline = CompiledPipeline::default();
        pipeline.push(BoundStep::new("first", |ctx| {
            ctx.set(vec!["first"]);
            Ok(())
        }));
        pipeline.push(BoundStep::new("second", |ctx| {
            let mut seen: Vec<&'static str> = ctx.get()?;
            seen.push("second");
            ctx.set(seen);
            Ok(())
        }));

        pipeline.execute(&ctx).unwrap();

        assert_eq!(ctx.get::<Vec<&'static str>>().unwrap(), vec!["first", "second"]);
        assert_eq!(pipeline.descriptions(), vec!["first", "second"]);
    }

    #[test]
    fn test_pipeline_stops_at_first_failure() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pipeline = CompiledPipeline::new(vec![counting("a", &counter)]);
        pipeline.push(BoundStep::new("fail", |_ctx| {
            Err(CommanderError::command_failed("fail", anyhow::anyhow!("boom")))
        }));
        pipeline.push(counting("b", &counter));

        let err = pipeline.execute(&CommandContext::new()).unwrap_err();

        assert_eq!(err.kind(), "CommandFailed");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disposed_command_does_not_execute() {
        let counter = Arc::new(AtomicUsize::new(0));
        let released = Arc::new(AtomicUsize::new(0));
        let scope = Container::new().root_scope();
        let held = Arc::clone(&released);
        let pipeline = CompiledPipeline::new(vec![
            counting("Work", &counter),
            BoundStep::new("Persist", move |_ctx| {
                held.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        ]);
        let command = CompiledCommand::new(Uuid::new_v4(), pipeline, scope);
        assert_eq!(Arc::strong_count(&released), 2);

        command.dispose();

        assert!(command.scope().is_disposed());
        assert!(command.is_empty());
        assert_eq!(Arc::strong_count(&released), 1);

        let err = command.execute().unwrap_err();
        assert_eq!(err.kind(), "Resolution");
        assert!(err.to_string().contains("disposed"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(released.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropping_command_disposes_scope() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let scope = Container::new().root_scope();
        let count = Arc::clone(&disposed);
        scope.on_dispose(
            move || {
                count.fetch_add(1, Ordering::SeqCst);
            },
            Some("count"),
        );

        let command = CompiledCommand::new(Uuid::new_v4(), CompiledPipeline::default(), scope);
        drop(command);

        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_extend_appends() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pipeline = CompiledPipeline::new(vec![counting("a", &counter)]);
        pipeline.extend(CompiledPipeline::new(vec![counting("b", &counter)]));

        assert_eq!(pipeline.descriptions(), vec!["a", "b"]);
        assert!(!pipeline.is_empty());
    }
}
