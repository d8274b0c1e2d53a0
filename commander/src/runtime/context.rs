//! The per-invocation command context and entity builders.

use super::ResolutionScope;
use crate::core::TypeKey;
use crate::errors::{ContextError, ResolutionError};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

type BoxedValue = Box<dyn Any + Send + Sync>;
type EntityBuilder = Arc<
    dyn Fn(Option<&dyn ResolutionScope>) -> Result<BoxedValue, ResolutionError> + Send + Sync,
>;

/// Registry of constructors for entities that a pipeline creates on demand.
///
/// A `for_new` pipeline usually starts without an entity in its context; the
/// first step that asks for one gets it from here. Builders registered with
/// [`register_resolved`](Self::register_resolved) run against the scope of
/// the invocation and can resolve its services.
#[derive(Default)]
pub struct EntityBuilderRegistry {
    builders: RwLock<HashMap<TypeId, (TypeKey, EntityBuilder)>>,
}

impl EntityBuilderRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder for `E`, replacing any previous one.
    pub fn register<E, F>(&self, builder: F)
    where
        E: Any + Send + Sync,
        F: Fn() -> E + Send + Sync + 'static,
    {
        self.insert::<E>(Arc::new(
            move |_scope: Option<&dyn ResolutionScope>| -> Result<BoxedValue, ResolutionError> {
                Ok(Box::new(builder()) as BoxedValue)
            },
        ));
    }

    /// Registers a builder for `E` that resolves what it needs from the
    /// invocation's scope, replacing any previous one.
    pub fn register_resolved<E, F>(&self, builder: F)
    where
        E: Any + Send + Sync,
        F: Fn(&dyn ResolutionScope) -> Result<E, ResolutionError> + Send + Sync + 'static,
    {
        self.insert::<E>(Arc::new(
            move |scope: Option<&dyn ResolutionScope>| -> Result<BoxedValue, ResolutionError> {
                let scope = scope.ok_or_else(|| {
                    ResolutionError::new(
                        TypeKey::of::<E>().short_name(),
                        "entity builder needs a resolution scope",
                    )
                })?;
                Ok(Box::new(builder(scope)?) as BoxedValue)
            },
        ));
    }

    /// Registers `E::default` as the builder for `E`.
    pub fn register_default<E>(&self)
    where
        E: Any + Default + Send + Sync,
    {
        self.register(E::default);
    }

    fn insert<E: Any>(&self, builder: EntityBuilder) {
        self.builders
            .write()
            .insert(TypeId::of::<E>(), (TypeKey::of::<E>(), builder));
    }

    /// Builds a new `E`, if a builder is registered.
    ///
    /// `scope` is handed to builders registered with
    /// [`register_resolved`](Self::register_resolved).
    ///
    /// # Errors
    ///
    /// Returns the builder's failure.
    pub fn build<E: Any + Send + Sync>(
        &self,
        scope: Option<&dyn ResolutionScope>,
    ) -> Option<Result<E, ResolutionError>> {
        let builder = self
            .builders
            .read()
            .get(&TypeId::of::<E>())
            .map(|(_, builder)| Arc::clone(builder))?;

        Some(builder(scope).and_then(|entity| {
            entity
                .downcast::<E>()
                .map(|entity| *entity)
                .map_err(|_| ResolutionError::type_mismatch(TypeKey::of::<E>().short_name()))
        }))
    }

    /// Checks if a builder is registered for `E`.
    #[must_use]
    pub fn contains<E: Any>(&self) -> bool {
        self.builders.read().contains_key(&TypeId::of::<E>())
    }

    /// Returns the entity types with a registered builder.
    #[must_use]
    pub fn entity_types(&self) -> Vec<TypeKey> {
        self.builders.read().values().map(|(key, _)| *key).collect()
    }
}

impl std::fmt::Debug for EntityBuilderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBuilderRegistry")
            .field("builder_count", &self.builders.read().len())
            .finish()
    }
}

/// A type-keyed attribute bag scoped to one invocation.
///
/// Callers seed it before compilation, steps read and write it while the
/// pipeline runs, and the invoker reads the typed result out of it. Each
/// type holds at most one value; `set` overwrites.
pub struct CommandContext {
    id: Uuid,
    values: RwLock<HashMap<TypeId, BoxedValue>>,
    builders: Arc<EntityBuilderRegistry>,
    scope: RwLock<Option<Weak<dyn ResolutionScope>>>,
}

impl CommandContext {
    /// Creates an empty context with no entity builders.
    #[must_use]
    pub fn new() -> Self {
        Self::with_builders(Arc::new(EntityBuilderRegistry::new()))
    }

    /// Creates an empty context that builds missing entities from `builders`.
    #[must_use]
    pub fn with_builders(builders: Arc<EntityBuilderRegistry>) -> Self {
        Self {
            id: Uuid::now_v7(),
            values: RwLock::new(HashMap::new()),
            builders,
            scope: RwLock::new(None),
        }
    }

    /// Attaches the scope that owns this context. Entity builders that
    /// resolve services run against it.
    pub fn attach_scope(&self, scope: Weak<dyn ResolutionScope>) {
        *self.scope.write() = Some(scope);
    }

    /// Returns the owning scope while it is alive.
    #[must_use]
    pub fn scope(&self) -> Option<Arc<dyn ResolutionScope>> {
        self.scope.read().as_ref().and_then(Weak::upgrade)
    }

    /// Returns the context id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stores a value, replacing any value of the same type.
    pub fn set<T: Any + Send + Sync>(&self, value: T) {
        self.values.write().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Gets a copy of the value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::MissingValue` if no such value was set.
    pub fn get<T: Any + Clone + Send + Sync>(&self) -> Result<T, ContextError> {
        self.try_get::<T>()
            .ok_or_else(|| ContextError::missing_value(TypeKey::of::<T>().short_name()))
    }

    /// Gets a copy of the value of type `T`, if present.
    #[must_use]
    pub fn try_get<T: Any + Clone + Send + Sync>(&self) -> Option<T> {
        self.with(T::clone)
    }

    /// Runs `f` against the value of type `T` without copying it.
    ///
    /// `f` runs under the context's read lock and must not write to this
    /// context.
    pub fn with<T: Any + Send + Sync, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let values = self.values.read();
        values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .map(f)
    }

    /// Removes and returns the value of type `T`.
    pub fn take<T: Any + Send + Sync>(&self) -> Option<T> {
        let value = self.values.write().remove(&TypeId::of::<T>())?;
        value.downcast::<T>().ok().map(|value| *value)
    }

    /// Checks if a value of type `T` is present.
    #[must_use]
    pub fn contains<T: Any>(&self) -> bool {
        self.values.read().contains_key(&TypeId::of::<T>())
    }

    /// Runs `f` against the entity of type `E`, mutably.
    ///
    /// When the context holds no `E`, one is built from the entity builder
    /// registry and kept in the context afterwards. The entity is moved out
    /// of the bag while `f` runs, so `f` is free to use the context.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::MissingEntity` if the entity is absent and no
    /// builder is registered, or `ContextError::EntityBuildFailed` if the
    /// builder fails.
    pub fn with_entity<E, R>(&self, f: impl FnOnce(&mut E) -> R) -> Result<R, ContextError>
    where
        E: Any + Send + Sync,
    {
        let mut entity = match self.take::<E>() {
            Some(entity) => entity,
            None => self.build_entity::<E>()?,
        };

        let result = f(&mut entity);
        self.set(entity);
        Ok(result)
    }

    fn build_entity<E: Any + Send + Sync>(&self) -> Result<E, ContextError> {
        let type_name = TypeKey::of::<E>().short_name();
        let scope = self.scope();
        self.builders
            .build::<E>(scope.as_deref())
            .ok_or_else(|| ContextError::missing_entity(type_name.clone()))?
            .map_err(|source| ContextError::entity_build_failed(type_name, source))
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("id", &self.id)
            .field("value_count", &self.len())
            .finish()
    }
}
