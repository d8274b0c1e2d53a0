//! The scope contract that pipeline calls and factories resolve through.

use super::{CommandContext, CompiledPipeline};
use crate::core::TypeKey;
use crate::errors::ResolutionError;
use crate::registration::{DefSource, Instance, ObjectDef};
use std::any::Any;
use std::sync::Arc;
use uuid::Uuid;

/// A callback run when a scope is disposed.
pub type DisposeCallback = Box<dyn FnOnce() + Send>;

/// One invocation's view of a resolver.
///
/// A scope resolves components for a single compiled command and owns
/// whatever it created for it. [`Container`](super::Container) hands out its
/// own scopes; other resolvers implement this trait for their scope type.
///
/// Typed helpers (`resolve`, `on_dispose`, `build_pipeline`) are defined on
/// `dyn ResolutionScope`, so they work for every implementation.
pub trait ResolutionScope: Send + Sync {
    /// Returns the scope id.
    fn id(&self) -> Uuid;

    /// Returns the invocation's context.
    fn context(&self) -> &CommandContext;

    /// Resolves the instance registered for `service`.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if `service` is unknown, cannot be built,
    /// or the scope has been disposed.
    fn resolve_instance(&self, service: TypeKey) -> Result<Instance, ResolutionError>;

    /// Returns the descriptor registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if no descriptor has that name.
    fn resolve_named(&self, name: &str) -> Result<ObjectDef, ResolutionError>;

    /// Registers a callback to run when the scope is disposed.
    fn add_dispose_callback(&self, callback: DisposeCallback, name: Option<&str>);

    /// Disposes the scope. Only the first call has any effect.
    fn dispose(&self);

    /// Returns true once the scope has been disposed.
    fn is_disposed(&self) -> bool;
}

impl<'s> dyn ResolutionScope + 's {
    /// Resolves a `T`.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if `T` cannot be resolved or the registered
    /// instance is not a `T`.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolutionError> {
        let service = TypeKey::of::<T>();
        self.resolve_instance(service)?
            .downcast::<T>()
            .map_err(|_| ResolutionError::type_mismatch(service.short_name()))
    }

    /// Registers a callback to run when the scope is disposed.
    pub fn on_dispose<F>(&self, callback: F, name: Option<&str>)
    where
        F: FnOnce() + Send + 'static,
    {
        self.add_dispose_callback(Box::new(callback), name);
    }

    /// Builds a runnable pipeline from a chain descriptor, binding every call
    /// to this scope's components.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if a call cannot be bound or the chain still
    /// holds a placeholder.
    pub fn build_pipeline(&self, def: &ObjectDef) -> Result<CompiledPipeline, ResolutionError> {
        let mut pipeline = CompiledPipeline::default();
        let mut current = Some(def);

        while let Some(def) = current {
            match &def.source {
                DefSource::Call(target) => pipeline.push(target.bind(&def.description, self)?),
                DefSource::Nested(nested) => pipeline.extend(self.build_pipeline(nested)?),
                DefSource::Empty => {}
                DefSource::Placeholder => {
                    return Err(ResolutionError::new(
                        def.name.as_deref().unwrap_or("Placeholder"),
                        "chain still holds an unfilled placeholder",
                    ))
                }
                DefSource::Value(_) | DefSource::Factory(_) => {
                    return Err(ResolutionError::new(
                        def.description.as_str(),
                        "descriptor is a service, not a pipeline step",
                    ))
                }
            }
            current = def.inner.as_deref();
        }

        Ok(pipeline)
    }
}
