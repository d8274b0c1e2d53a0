//! Explicit per-invocation overrides for the resolver.

use crate::core::TypeKey;
use crate::registration::{Instance, ObjectDef};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Instances and named descriptors that take precedence over the
/// container's registrations for a single scope.
///
/// The compiler registers each compiled chain here under the chain's unique
/// id, so concurrent invocations of the same template never see each
/// other's spliced command.
#[derive(Clone, Default)]
pub struct ServiceArguments {
    instances: HashMap<TypeId, (TypeKey, Instance)>,
    named: HashMap<String, ObjectDef>,
}

impl ServiceArguments {
    /// Creates empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance of `T`, builder style.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.set(value);
        self
    }

    /// Sets the instance of `T`, replacing any previous one.
    pub fn set<T: Any + Send + Sync>(&mut self, value: T) {
        self.set_arc(Arc::new(value));
    }

    /// Sets an already shared instance of `T`.
    pub fn set_arc<T: Any + Send + Sync>(&mut self, value: Arc<T>) {
        self.instances
            .insert(TypeId::of::<T>(), (TypeKey::of::<T>(), value));
    }

    /// Returns the instance of `T`, if one was given.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.instance(TypeId::of::<T>())
            .and_then(|instance| instance.downcast::<T>().ok())
    }

    /// Returns the type-erased instance registered under `id`.
    #[must_use]
    pub fn instance(&self, id: TypeId) -> Option<Instance> {
        self.instances
            .get(&id)
            .map(|(_, instance)| Arc::clone(instance))
    }

    /// Registers a named descriptor, replacing any previous one.
    pub fn register_named(&mut self, name: impl Into<String>, def: ObjectDef) {
        self.named.insert(name.into(), def);
    }

    /// Returns the named descriptor.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<&ObjectDef> {
        self.named.get(name)
    }

    /// Returns the number of instances and named descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len() + self.named.len()
    }

    /// Returns true if nothing was given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty() && self.named.is_empty()
    }
}

impl std::fmt::Debug for ServiceArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instances: Vec<&str> = self.instances.values().map(|(key, _)| key.name()).collect();
        let named: Vec<&String> = self.named.keys().collect();
        f.debug_struct("ServiceArguments")
            .field("instances", &instances)
            .field("named", &named)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Clock(u64);

    #[test]
    fn test_instances_by_type() {
        let args = ServiceArguments::new().with(Clock(42)).with(7_u8);

        assert_eq!(*args.get::<Clock>().unwrap(), Clock(42));
        assert_eq!(*args.get::<u8>().unwrap(), 7);
        assert!(args.get::<u16>().is_none());
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_set_replaces() {
        let mut args = ServiceArguments::new();
        args.set(Clock(1));
        args.set(Clock(2));

        assert_eq!(*args.get::<Clock>().unwrap(), Clock(2));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_named_descriptors() {
        let mut args = ServiceArguments::new();
        assert!(args.is_empty());

        args.register_named("chain", ObjectDef::empty());

        assert!(args.named("chain").is_some());
        assert!(args.named("other").is_none());
        assert!(!args.is_empty());
    }
}
