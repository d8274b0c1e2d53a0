//! Known pipeline types and non-pipeline service registrations.

use super::ObjectDef;
use crate::core::TypeKey;
use crate::errors::ResolutionError;
use crate::runtime::ResolutionScope;
use std::any::Any;
use std::collections::HashSet;

/// The set of types that take part in pipelines.
#[derive(Debug, Clone, Default)]
pub struct TypePool {
    types: HashSet<TypeKey>,
}

impl TypePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T` to the pool.
    pub fn add<T: ?Sized + 'static>(&mut self) {
        self.add_type(TypeKey::of::<T>());
    }

    /// Adds a type to the pool.
    pub fn add_type(&mut self, key: TypeKey) {
        self.types.insert(key);
    }

    /// Checks if `T` is in the pool.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.types.contains(&TypeKey::of::<T>())
    }

    /// Adds every type of `other` to this pool.
    pub fn merge(&mut self, other: &TypePool) {
        self.types.extend(other.types.iter().copied());
    }

    /// Iterates over the pooled types.
    pub fn iter(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.types.iter().copied()
    }

    /// Returns the number of pooled types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Service registrations that are not pipelines: repositories, validators,
/// the units of work a pipeline resolves by type.
///
/// Registrations are kept in order; a later registration for the same
/// service wins when they are applied to a container.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<(TypeKey, ObjectDef)>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration.
    pub fn add(&mut self, service: TypeKey, def: ObjectDef) {
        self.services.push((service, def));
    }

    /// Registers a given value for `T`.
    pub fn add_value<T: Any + Send + Sync>(&mut self, value: T) {
        self.add(TypeKey::of::<T>(), ObjectDef::value(value));
    }

    /// Registers a scoped factory for `T`.
    pub fn add_scoped<T, F>(&mut self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&dyn ResolutionScope) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        self.add(TypeKey::of::<T>(), ObjectDef::factory(factory));
    }

    /// Registers a singleton factory for `T`.
    pub fn add_singleton<T, F>(&mut self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&dyn ResolutionScope) -> Result<T, ResolutionError> + Send + Sync + 'static,
    {
        self.add(TypeKey::of::<T>(), ObjectDef::factory(factory).singleton());
    }

    /// Calls `action` for every registration, in registration order.
    pub fn each(&self, mut action: impl FnMut(TypeKey, &ObjectDef)) {
        for (service, def) in &self.services {
            action(*service, def);
        }
    }

    /// Appends every registration of `other`.
    pub fn merge(&mut self, other: &ServiceRegistry) {
        self.services.extend(other.services.iter().cloned());
    }

    /// Checks if a registration exists for `T`.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let key = TypeKey::of::<T>();
        self.services.iter().any(|(service, _)| *service == key)
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if there are no registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Repository;

    #[test]
    fn test_type_pool() {
        let mut pool = TypePool::new();
        pool.add::<Repository>();
        pool.add::<Repository>();

        assert!(pool.contains::<Repository>());
        assert!(!pool.contains::<u8>());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_type_pool_merge() {
        let mut a = TypePool::new();
        a.add::<u8>();
        let mut b = TypePool::new();
        b.add::<u16>();

        a.merge(&b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_service_registry_each_in_order() {
        let mut registry = ServiceRegistry::new();
        registry.add_value(1_u8);
        registry.add_scoped(|_scope| Ok(Repository));
        registry.add_singleton(|_scope| Ok(String::from("shared")));

        let mut seen = Vec::new();
        registry.each(|service, def| seen.push((service, def.is_singleton())));

        assert_eq!(
            seen,
            vec![
                (TypeKey::of::<u8>(), true),
                (TypeKey::of::<Repository>(), false),
                (TypeKey::of::<String>(), true),
            ]
        );
        assert!(registry.contains::<Repository>());
    }
}
