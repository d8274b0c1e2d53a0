//! Construction descriptors consumed by the resolver.

use crate::core::TypeKey;
use crate::errors::ResolutionError;
use crate::runtime::{BoundStep, ResolutionScope};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

/// A shared, type-erased component instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds a component inside a resolution scope.
pub type Factory =
    Arc<dyn Fn(&dyn ResolutionScope) -> Result<Instance, ResolutionError> + Send + Sync>;

/// How long a resolved component lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// One instance per scope.
    #[default]
    Scoped,
    /// One instance for the whole process, shared by every scope.
    Singleton,
}

/// A pipeline call that can be bound to the components of a scope.
///
/// Binding happens when the pipeline is built, so missing dependencies fail
/// compilation rather than execution.
pub trait CallTarget: Send + Sync {
    /// Resolves what the call needs from `scope` and returns a runnable step.
    fn bind(
        &self,
        description: &str,
        scope: &dyn ResolutionScope,
    ) -> Result<BoundStep, ResolutionError>;
}

/// Where a descriptor's instance comes from.
#[derive(Clone)]
pub enum DefSource {
    /// A given instance.
    Value(Instance),
    /// Constructed on demand.
    Factory(Factory),
    /// A pipeline call.
    Call(Arc<dyn CallTarget>),
    /// A nested chain, run in place.
    Nested(Box<ObjectDef>),
    /// An unfilled placeholder.
    Placeholder,
    /// Nothing to build.
    Empty,
}

impl std::fmt::Debug for DefSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value"),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Call(_) => f.write_str("Call"),
            Self::Nested(def) => f.debug_tuple("Nested").field(def).finish(),
            Self::Placeholder => f.write_str("Placeholder"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// A declarative unit that tells the resolver how to produce or reuse an
/// instance.
///
/// Chains convert into a linked tree of descriptors: each node's descriptor
/// holds the descriptor of the node after it in `inner`.
#[derive(Debug, Clone)]
pub struct ObjectDef {
    /// Registration name, if any.
    pub name: Option<String>,
    /// Human-readable description of what is built.
    pub description: String,
    /// Instance lifetime.
    pub lifetime: Lifetime,
    /// Instance source.
    pub source: DefSource,
    /// The descriptor that follows this one in a chain.
    pub inner: Option<Box<ObjectDef>>,
}

impl ObjectDef {
    fn with_source(description: impl Into<String>, source: DefSource) -> Self {
        Self {
            name: None,
            description: description.into(),
            lifetime: Lifetime::Scoped,
            source,
            inner: None,
        }
    }

    /// Describes a given value, shared by every resolution.
    #[must_use]
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Self::value_arc(Arc::new(value))
    }

    /// Describes an already shared value.
    #[must_use]
    pub fn value_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        let mut def = Self::with_source(TypeKey::of::<T>().short_name(), DefSource::Value(value));
        def.lifetime = Lifetime::Singleton;
        def
    }

    /// Describes a component built by `factory`.
    #[must_use]
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&dyn ResolutionScope) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |scope: &dyn ResolutionScope| -> Result<Instance, ResolutionError> {
                Ok(Arc::new(factory(scope)?) as Instance)
            });
        Self::with_source(TypeKey::of::<T>().short_name(), DefSource::Factory(factory))
    }

    /// Describes a pipeline call.
    #[must_use]
    pub fn call(description: impl Into<String>, target: Arc<dyn CallTarget>) -> Self {
        Self::with_source(description, DefSource::Call(target))
    }

    /// Describes a nested chain.
    #[must_use]
    pub fn nested(def: ObjectDef) -> Self {
        let description = def.description.clone();
        Self::with_source(description, DefSource::Nested(Box::new(def)))
    }

    /// Describes an unfilled placeholder.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::with_source("Placeholder", DefSource::Placeholder)
    }

    /// Describes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_source("Empty", DefSource::Empty)
    }

    /// Sets the registration name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the descriptor singleton-scoped.
    #[must_use]
    pub fn singleton(mut self) -> Self {
        self.lifetime = Lifetime::Singleton;
        self
    }

    /// Sets the following descriptor.
    #[must_use]
    pub fn with_inner(mut self, inner: ObjectDef) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Returns true for a singleton-scoped descriptor.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        self.lifetime == Lifetime::Singleton
    }

    /// Returns the descriptions of this descriptor and every following one,
    /// flattening nested chains.
    #[must_use]
    pub fn describe_chain(&self) -> Vec<String> {
        let mut descriptions = Vec::new();
        let mut current = Some(self);
        while let Some(def) = current {
            match &def.source {
                DefSource::Nested(nested) => descriptions.extend(nested.describe_chain()),
                DefSource::Empty => {}
                _ => descriptions.push(def.description.clone()),
            }
            current = def.inner.as_deref();
        }
        descriptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_is_singleton() {
        let def = ObjectDef::value(5_u32);
        assert!(def.is_singleton());
        assert!(matches!(def.source, DefSource::Value(_)));
        assert_eq!(def.description, "u32");
    }

    #[test]
    fn test_factory_defaults_to_scoped() {
        let def = ObjectDef::factory(|_scope| Ok(String::from("built")));
        assert_eq!(def.lifetime, Lifetime::Scoped);
        assert!(def.singleton().is_singleton());
    }

    #[test]
    fn test_describe_chain_flattens_nested() {
        let nested = ObjectDef::placeholder().with_inner(ObjectDef::empty());
        let def = ObjectDef::empty()
            .named("chain")
            .with_inner(ObjectDef::nested(nested).with_inner(ObjectDef::placeholder()));

        assert_eq!(def.name.as_deref(), Some("chain"));
        assert_eq!(def.describe_chain(), vec!["Placeholder", "Placeholder"]);
    }
}
